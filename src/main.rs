//! IronRecover 特权进程入口
//! 只监听回环地址

use anyhow::{Context, Result};
use ironrecover::{api, app_state::AppState, config::Config, infrastructure::logging};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate()?;

    logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))?;

    let bind_addr = config.bind_addr()?;
    tracing::info!(
        bind_addr = %bind_addr,
        sdk_command = %config.sdk.command,
        "recovery_host_starting"
    );

    let state = std::sync::Arc::new(AppState::new(config));
    let app = api::routes(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!(bind_addr = %bind_addr, "recovery_host_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("recovery_host_stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "shutdown_signal_unavailable");
    }
}
