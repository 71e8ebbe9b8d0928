mod registry;

use anyhow::Result;
use lfs_core::{NodeConfig, StorageBackend, StorageCore};
use registry::BackendRegistry;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    info!("Starting lfs-node");

    // 加载配置
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/lfs-node.toml".to_string());
    let config = NodeConfig::load(&config_path).unwrap_or_else(|e| {
        info!(path = %config_path, error = %e, "Using default configuration");
        NodeConfig::default()
    });

    // 配置错误（空设备列表、未知后端、卷初始化失败）在这里
    // 以非零退出码终止进程，库代码自身从不退出
    let core = Arc::new(StorageCore::from_config(&config)?);
    let backend = BackendRegistry::with_defaults().build(&config, core.clone())?;
    backend.setup_node().await?;

    info!(
        backend = backend.backend_type(),
        devices = core.devices().len(),
        "Storage backend initialized"
    );

    // 有健康探测的后端启动监视任务
    let monitor_handle = backend.health_monitor().map(|monitor| monitor.spawn());
    if monitor_handle.is_some() {
        info!("Device health monitor started");
    }

    tokio::signal::ctrl_c().await?;

    if let Some(handle) = monitor_handle {
        handle.shutdown().await;
    }
    info!("lfs-node stopped");

    Ok(())
}
