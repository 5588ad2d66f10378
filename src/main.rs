use parkcast_lib::config::load_config;
use parkcast_lib::logger;
use parkcast_lib::proxy::ParkingProxy;
use parkcast_lib::server::{run_server, AppState};
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = load_config()?;
    logger::init_logger(&config.logging);

    tracing::info!(
        "[SERVER] 目标站点: {} 超时: {}s",
        config.upstream.origin,
        config.upstream.request_timeout_secs
    );

    let proxy = ParkingProxy::from_config(config.upstream.clone())?;
    let state = AppState::new(proxy);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("[SERVER] 收到退出信号，正在关闭");
        }
        let _ = shutdown_tx.send(());
    });

    run_server(&config.server, state, shutdown_rx).await
}
