use std::net::SocketAddr;

use rental_gateway::{http, AppState, Config};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let state = AppState::new(config);

    let _retry_worker = state.retry_queue.clone().spawn_worker();

    let listener = TcpListener::bind(addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {addr}: {err}"));

    tracing::info!(%addr, "rental gateway listening");

    axum::serve(listener, http::routes(state).into_make_service())
        .await
        .expect("server error");
}
