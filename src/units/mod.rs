mod token_amount;

pub use token_amount::DisplayAmount;
pub use token_amount::TokenAmount;

/// Base units per display unit is `10^TOKEN_DECIMALS`.
pub const TOKEN_DECIMALS: u32 = 18;
