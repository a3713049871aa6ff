use tracing_subscriber::EnvFilter;

use triage_api::config::read_config;
use triage_api::domain::similarity::run_sync_worker;
use triage_api::{router, AppState};

#[tokio::main]
async fn main() {
    dotenvy::from_filename("./triage-api/.env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = read_config().expect("Failed to read configuration");

    let (app_state, sync_requests) =
        AppState::new(&settings).expect("Failed to build application state");

    tokio::spawn(run_sync_worker(
        app_state.pipeline.clone(),
        settings.sync.clone(),
        sync_requests,
    ));

    let app = router::create(app_state);

    let address = format!(
        "{}:{}",
        settings.application.host, settings.application.port
    );
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .expect("Failed to bind address");
    tracing::info!(%address, "Triage API listening");

    axum::serve(listener, app).await.expect("Server error");
}
