use crate::error::Result;
use crate::monitor::HealthMonitor;
use crate::store::StorageCore;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// 存储后端抽象 trait
///
/// 一个后端对应一类卷管理策略（纯目录、每设备/每分区一个受管卷等），
/// 提供路径布局与可选的健康探测；默认实现全部委托给存储核心。
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// 底层存储核心
    fn core(&self) -> &Arc<StorageCore>;

    /// 后端类型名
    fn backend_type(&self) -> &str;

    /// 节点初始化
    ///
    /// 配置级失败（顶层卷命名空间缺失、卷创建后无法挂载）返回
    /// `Config` 错误，由进程入口决定退出；库代码不终止进程。
    async fn setup_node(&self) -> Result<()> {
        Ok(())
    }

    /// 创建数据目录
    async fn setup_datadir(&self, device: &str) -> Result<PathBuf> {
        self.core().setup_datadir(device).await
    }

    /// 创建临时目录
    async fn setup_tmp(&self, device: &str) -> Result<PathBuf> {
        self.core().setup_tmp(device).await
    }

    /// 创建分区目录
    async fn setup_partition(&self, device: &str, partition: &str) -> Result<PathBuf> {
        self.core().setup_partition(device, partition).await
    }

    /// 临时目录路径
    fn tmp_dir(&self, device: &str, partition: &str, name_hash: &str) -> PathBuf {
        self.core().tmp_dir(device, partition, name_hash)
    }

    /// 后端的健康监视器；None 表示该后端无健康探测
    fn health_monitor(&self) -> Option<HealthMonitor> {
        None
    }
}

/// 纯目录后端
///
/// 完全委托给存储核心的目录布局，不做健康探测。
pub struct PlainBackend {
    core: Arc<StorageCore>,
}

impl PlainBackend {
    pub fn new(core: Arc<StorageCore>) -> Self {
        Self { core }
    }
}

#[async_trait]
impl StorageBackend for PlainBackend {
    fn core(&self) -> &Arc<StorageCore> {
        &self.core
    }

    fn backend_type(&self) -> &str {
        "plain"
    }
}
