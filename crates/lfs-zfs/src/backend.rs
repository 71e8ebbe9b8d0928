use crate::client::{VolumeClient, VolumeOptions};
use crate::config::ZfsConfig;
use async_trait::async_trait;
use lfs_core::{
    FaultClass, FaultEvent, FaultLatch, HealthMonitor, HealthProbe, LfsError, Result,
    StorageBackend, StorageCore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// 受管卷后端
///
/// 每个设备对应一个 ZFS 池，顶层命名空间 topfs 下按配置
/// 细分到分区级/对象级数据集；健康分类来自卷管理器的池状态。
pub struct ZfsBackend {
    core: Arc<StorageCore>,
    client: Arc<dyn VolumeClient>,
    config: ZfsConfig,
}

impl ZfsBackend {
    pub fn new(config: ZfsConfig, core: Arc<StorageCore>, client: Arc<dyn VolumeClient>) -> Self {
        Self {
            core,
            client,
            config,
        }
    }

    fn volume_options(&self) -> VolumeOptions {
        VolumeOptions {
            compression: Some(self.config.compression.clone()),
        }
    }

    /// 顶层数据集：device/topfs
    fn topfs_dataset(&self, device: &str) -> String {
        format!("{}/{}", device, self.config.topfs)
    }

    /// 分区数据集：device/topfs/datadir/partition
    fn partition_dataset(&self, device: &str, partition: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            device,
            self.config.topfs,
            self.core.datadir(),
            partition
        )
    }

    /// 对象数据集：device/topfs/datadir/partition/name_hash
    fn object_dataset(&self, device: &str, partition: &str, name_hash: &str) -> String {
        format!("{}/{}", self.partition_dataset(device, partition), name_hash)
    }

    /// 创建对象目录
    ///
    /// 对象级卷启用时在哈希分片路径上按需创建数据集，
    /// 否则仅返回路径（目录由上层写入时创建）。
    pub async fn setup_objdir(
        &self,
        device: &str,
        partition: &str,
        name_hash: &str,
    ) -> Result<PathBuf> {
        StorageCore::validate_name(device)?;
        StorageCore::validate_name(partition)?;
        StorageCore::validate_name(name_hash)?;
        let path = self.core.device_path(device).join(StorageCore::storage_directory(
            self.core.datadir(),
            partition,
            name_hash,
        ));
        if self.config.fs_per_object && !path.exists() {
            let dataset = self.object_dataset(device, partition, name_hash);
            if !self.client.exists(&dataset).await? {
                self.client
                    .create(&dataset, Some(&path), &self.volume_options())
                    .await?;
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl StorageBackend for ZfsBackend {
    fn core(&self) -> &Arc<StorageCore> {
        &self.core
    }

    fn backend_type(&self) -> &str {
        "zfs"
    }

    /// 节点初始化：为每个设备确保顶层数据集存在并挂载
    ///
    /// 顶层命名空间缺失或卷创建后不可见属于配置错误，
    /// 节点在运维修复前不得开始服务。分区级数据集推迟到首次使用。
    async fn setup_node(&self) -> Result<()> {
        if self.config.topfs.is_empty() {
            return Err(LfsError::config(
                "cannot locate ZFS filesystem namespace for this node: topfs is not set",
            ));
        }
        tokio::fs::create_dir_all(self.core.devices_root()).await?;

        for device in self.core.devices() {
            let dataset = self.topfs_dataset(&device.id);
            let mountpoint = self.core.device_path(&device.id);
            if !self.client.exists(&dataset).await? {
                self.client
                    .create(&dataset, Some(&mountpoint), &self.volume_options())
                    .await
                    .map_err(|e| {
                        LfsError::config(format!(
                            "cannot create top level volume {}: {}",
                            dataset, e
                        ))
                    })?;
            }
            if !self.client.exists(&dataset).await? {
                return Err(LfsError::config(format!(
                    "top level volume {} exists but cannot be mounted",
                    dataset
                )));
            }
            // 已有数据集的压缩配置与声明不一致时校正
            match self.client.get_property(&dataset, "compression").await {
                Ok(current) if current != self.config.compression => {
                    if let Err(e) = self
                        .client
                        .set_property(&dataset, "compression", &self.config.compression)
                        .await
                    {
                        warn!(dataset = %dataset, error = %e, "Cannot update compression property");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(dataset = %dataset, error = %e, "Cannot read compression property");
                }
            }
            info!(device = %device.id, dataset = %dataset, "Device volume ready");
        }
        Ok(())
    }

    /// 创建分区目录
    ///
    /// 分区级卷禁用时退回基础目录布局；启用时按确定性
    /// 数据集名按需创建，返回挂载路径。
    async fn setup_partition(&self, device: &str, partition: &str) -> Result<PathBuf> {
        if !self.config.partition_volumes() {
            return self.core.setup_partition(device, partition).await;
        }
        StorageCore::validate_name(device)?;
        StorageCore::validate_name(partition)?;
        let path = self.core.partition_path(device, partition);
        if !path.exists() {
            let dataset = self.partition_dataset(device, partition);
            if !self.client.exists(&dataset).await? {
                self.client
                    .create(&dataset, Some(&path), &self.volume_options())
                    .await?;
            }
        }
        Ok(path)
    }

    /// 临时目录路径，按卷粒度分片
    fn tmp_dir(&self, device: &str, partition: &str, name_hash: &str) -> PathBuf {
        if self.config.fs_per_object {
            self.core
                .device_path(device)
                .join(StorageCore::storage_directory(
                    self.core.datadir(),
                    partition,
                    name_hash,
                ))
                .join("tmp")
        } else if self.config.partition_volumes() {
            self.core.partition_path(device, partition).join("tmp")
        } else {
            self.core.datadir_path(device).join("tmp")
        }
    }

    fn health_monitor(&self) -> Option<HealthMonitor> {
        let probe = Arc::new(ZfsProbe {
            core: self.core.clone(),
            client: self.client.clone(),
        });
        Some(HealthMonitor::new(self.config.check_interval(), probe))
    }
}

/// ZFS 池健康探测
pub struct ZfsProbe {
    core: Arc<StorageCore>,
    client: Arc<dyn VolumeClient>,
}

impl ZfsProbe {
    pub fn new(core: Arc<StorageCore>, client: Arc<dyn VolumeClient>) -> Self {
        Self { core, client }
    }
}

#[async_trait]
impl HealthProbe for ZfsProbe {
    async fn check(&self) -> anyhow::Result<Option<FaultEvent>> {
        let mut event = FaultEvent::default();
        for device in self.core.devices() {
            let status = match self.client.status(&device.id).await {
                Ok(status) => status,
                Err(e) => {
                    // 查询失败是瞬态错误，不得与降级/故障混淆：
                    // 本轮不改动任何状态集合，下个周期重试
                    warn!(pool = %device.id, error = %e, "Pool status query failed, skipping");
                    continue;
                }
            };

            // 先决定目标分类，再对故障集合做单次改写；
            // 两步式的"先清除再写入"会让并发读者看到瞬时 Online
            let health_class = match status.health.as_str() {
                "DEGRADED" => {
                    event.degraded.push(device.id.clone());
                    Some(FaultClass::Degraded)
                }
                "FAULTED" | "SPLIT" => {
                    event.faulted.push(device.id.clone());
                    Some(FaultClass::Faulted)
                }
                "UNAVAIL" => {
                    event.unavailable.push(device.id.clone());
                    Some(FaultClass::Unavailable)
                }
                "UNKNOWN" => {
                    // 瞬态/歧义状态：只回调不分类，等待下轮探测
                    event.unknown.push(device.id.clone());
                    None
                }
                _ => None,
            };
            // 健康故障优先；其次实际镜像数超过声明即为配置异常
            let class = health_class.or_else(|| {
                (status.mirror_count > device.mirror_copies).then_some(FaultClass::Misconfigured)
            });
            match class {
                Some(class) => self.core.set_fault(&device.id, class).await,
                None => self.core.clear_faults(&device.id).await,
            }
        }
        Ok(if event.is_empty() { None } else { Some(event) })
    }

    async fn on_fault(&self, event: FaultEvent, latch: &FaultLatch) {
        if !event.degraded.is_empty() {
            warn!(pools = ?event.degraded, "DEGRADED pools");
        }
        if !event.faulted.is_empty() {
            warn!(pools = ?event.faulted, "FAULTED pools");
        }
        if !event.unavailable.is_empty() {
            warn!(pools = ?event.unavailable, "UNAVAIL pools");
        }
        if !event.unknown.is_empty() {
            warn!(pools = ?event.unknown, "Pools in unknown state, re-probing");
        }
        // 通告已发出，解除锁存恢复探测
        latch.clear_fault();
    }
}
