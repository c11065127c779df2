mod env;
pub mod exclusions;
pub mod ledger;
mod log;
pub mod serve;
pub mod supply;
pub mod units;

pub use env::{get_env_config, ConfigError, EnvConfig};
pub use serve::start_server;
