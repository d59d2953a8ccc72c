use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::{Mode, TriagePipeline};
use triage_server::{config::ServerConfig, router, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "triage_server=info,triage_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let mode = config.mode();
    match mode {
        Mode::Live if !config.llm.has_credential() => {
            tracing::warn!("live mode forced without GRADIENT_API_KEY; triage requests will fail")
        }
        Mode::Live => tracing::info!(model = %config.llm.model, base_url = %config.llm.base_url, "running in live mode"),
        Mode::Demo => tracing::info!("GRADIENT_API_KEY not set; running in demo mode"),
    }

    let state = AppState::new(TriagePipeline::for_mode(mode, config.llm.clone()), mode);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port)
        .parse()
        .expect("valid BIND_ADDR/PORT");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener");

    tracing::info!("triage-server listening on http://{}", addr);
    axum::serve(listener, app).await.expect("serve");
}
