use std::{net::SocketAddr, sync::Arc};

use axum::{http::StatusCode, response::IntoResponse, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tracing::info;

use crate::{
    env,
    exclusions::ExclusionSet,
    ledger::{Address, TokenContractNode, TOKEN_CONTRACT_ADDRESS},
    log,
    supply::{self, SnapshotStore},
};

pub type StateExtension = Extension<Arc<State>>;

pub struct State {
    pub store: SnapshotStore,
}

async fn circulating_supply(state: StateExtension) -> impl IntoResponse {
    state.store.current().circulating_supply.to_string()
}

async fn total_supply(state: StateExtension) -> impl IntoResponse {
    state.store.current().total_supply.to_string()
}

async fn not_found() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

/// Handlers only ever read the published snapshot, they never wait on a refresh.
pub fn router(shared_state: Arc<State>) -> Router {
    Router::new()
        .route("/", get(circulating_supply))
        .route("/total", get(total_supply))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(CompressionLayer::new())
                .layer(Extension(shared_state)),
        )
}

pub async fn start_server() -> anyhow::Result<()> {
    let config = env::get_env_config()?;

    log::init(config.log_json, config.log_perf);

    info!(
        rpc_url = config.rpc_url_obfuscated(),
        rpc_timeout_seconds = config.rpc_timeout.as_secs(),
        "connecting to token contract"
    );

    let contract = TOKEN_CONTRACT_ADDRESS.parse::<Address>()?;
    let ledger = TokenContractNode::new(&config.rpc_url, contract, config.rpc_timeout)?;
    let exclusions = ExclusionSet::new(config.burn_addresses)?;

    let shared_state = Arc::new(State {
        store: SnapshotStore::new(),
    });

    let app = router(shared_state.clone());

    let ip = if config.bind_public_interface {
        [0, 0, 0, 0]
    } else {
        [127, 0, 0, 1]
    };
    let socket_addr = SocketAddr::from((ip, config.port));
    let server = axum::Server::try_bind(&socket_addr)?.serve(app.into_make_service());

    info!(%socket_addr, "server listening");

    let refresh_loop = supply::run_refresh_loop(
        &ledger,
        &exclusions,
        &shared_state.store,
        config.refresh_interval,
    );

    // The refresh loop only ends with the process.
    tokio::select! {
        _ = refresh_loop => Ok(()),
        result = server => result.map_err(anyhow::Error::from),
    }
}
