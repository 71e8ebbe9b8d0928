use async_trait::async_trait;
use lfs_core::{Device, DeviceStatus, HealthMonitor, Result, StorageBackend, StorageCore};
use lfs_zfs::{VolumeClient, VolumeOptions, VolumeStatus, ZfsBackend, ZfsConfig};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// 可注入健康状态的卷客户端
#[derive(Default)]
struct FakeVolumeClient {
    health: Mutex<HashMap<String, String>>,
}

impl FakeVolumeClient {
    async fn set_health(&self, pool: &str, health: &str) {
        self.health
            .lock()
            .await
            .insert(pool.to_string(), health.to_string());
    }
}

#[async_trait]
impl VolumeClient for FakeVolumeClient {
    async fn exists(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }

    async fn create(
        &self,
        _name: &str,
        mountpoint: Option<&Path>,
        _options: &VolumeOptions,
    ) -> Result<()> {
        if let Some(mountpoint) = mountpoint {
            std::fs::create_dir_all(mountpoint)?;
        }
        Ok(())
    }

    async fn get_property(&self, _name: &str, _key: &str) -> Result<String> {
        Ok("lz4".to_string())
    }

    async fn set_property(&self, _name: &str, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn status(&self, pool: &str) -> Result<VolumeStatus> {
        Ok(VolumeStatus {
            health: self
                .health
                .lock()
                .await
                .get(pool)
                .cloned()
                .unwrap_or_else(|| "ONLINE".to_string()),
            mirror_count: 1,
        })
    }
}

/// 端到端：后端 + 监视器对故障的发现、通告与恢复
#[tokio::test]
async fn test_monitor_classifies_and_recovers() {
    let dir = tempfile::TempDir::new().unwrap();
    let core = Arc::new(
        StorageCore::new(
            dir.path(),
            "objects",
            vec![Device::new("sda1", 1), Device::new("sdb1", 1)],
        )
        .unwrap(),
    );
    let client = Arc::new(FakeVolumeClient::default());
    let config = ZfsConfig {
        topfs: "store".to_string(),
        check_interval_secs: 1,
        ..Default::default()
    };
    let backend = ZfsBackend::new(config, core.clone(), client.clone());
    backend.setup_node().await.unwrap();

    // 探测运行前全部默认 Online
    let statuses = core.get_device_status(None).await.unwrap();
    assert_eq!(statuses["sda1"], (DeviceStatus::Online, 1));
    assert_eq!(statuses["sdb1"], (DeviceStatus::Online, 1));

    // 用短周期监视器代替配置的探测间隔
    let probe = Arc::new(lfs_zfs::ZfsProbe::new(core.clone(), client.clone()));
    let monitor = HealthMonitor::new(Duration::from_millis(20), probe);
    let handle = monitor.spawn();

    client.set_health("sda1", "DEGRADED").await;
    tokio::time::sleep(Duration::from_millis(120)).await;

    let statuses = core.get_device_status(None).await.unwrap();
    assert_eq!(statuses["sda1"], (DeviceStatus::Degraded, 1));
    assert_eq!(statuses["sdb1"], (DeviceStatus::Online, 1));
    // zfs 回调通告后立即解除锁存
    assert!(!handle.is_latched());

    // 池恢复后下一轮探测回到 Online
    client.set_health("sda1", "ONLINE").await;
    tokio::time::sleep(Duration::from_millis(120)).await;

    let statuses = core.get_device_status(None).await.unwrap();
    assert_eq!(statuses["sda1"], (DeviceStatus::Online, 1));

    handle.shutdown().await;
}

/// 状态查询过滤与 NotFound 语义
#[tokio::test]
async fn test_status_query_filtering() {
    let dir = tempfile::TempDir::new().unwrap();
    let core = Arc::new(
        StorageCore::new(
            dir.path(),
            "objects",
            vec![Device::new("sda1", 1), Device::new("sdb1", 1)],
        )
        .unwrap(),
    );

    let filter = vec!["sda1".to_string()];
    let statuses = core.get_device_status(Some(&filter)).await.unwrap();
    assert_eq!(statuses.len(), 1);

    let filter = vec!["sdz1".to_string()];
    assert!(core.get_device_status(Some(&filter)).await.is_none());
}
