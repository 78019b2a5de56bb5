use lotwise_api::{app, build_state};
use lotwise_core::{MockGateway, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lotwise_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = lotwise_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Lotwise API on port {}", config.server.port);

    // The real push-payment transport is an external collaborator; this
    // binary ships with the mock adapter wired in.
    let state = build_state(
        config.business_rules.clone(),
        Arc::new(SystemClock),
        Arc::new(MockGateway::new()),
    );

    // Expiry runs as its own background job so holds and bookings resolve
    // even with no clients connected.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper_handle = tokio::spawn(state.sweeper.clone().run(shutdown_rx));

    let app = app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .unwrap();

    let _ = shutdown_tx.send(true);
    let _ = sweeper_handle.await;
}
