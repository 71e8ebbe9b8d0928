use lfs_core::{LfsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// ZFS 后端配置（配置文件的 [zfs] 段）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZfsConfig {
    /// 顶层 ZFS 文件系统命名空间（必填）
    #[serde(default)]
    pub topfs: String,

    /// 数据集压缩算法
    #[serde(default = "default_compression")]
    pub compression: String,

    /// 每个分区一个数据集
    #[serde(default)]
    pub fs_per_partition: bool,

    /// 每个对象一个数据集（隐含 fs_per_partition）
    #[serde(default)]
    pub fs_per_object: bool,

    /// 健康探测间隔（秒）
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

fn default_compression() -> String {
    "lz4".to_string()
}

fn default_check_interval_secs() -> u64 {
    30
}

impl Default for ZfsConfig {
    fn default() -> Self {
        Self {
            topfs: String::new(),
            compression: default_compression(),
            fs_per_partition: false,
            fs_per_object: false,
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

impl ZfsConfig {
    /// 从节点配置文件加载 [zfs] 段，缺失时取默认值
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        #[derive(Deserialize)]
        struct FileSection {
            #[serde(default)]
            zfs: Option<ZfsConfig>,
        }

        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let section: FileSection = toml::from_str(&content)
            .map_err(|e| LfsError::config(format!("cannot parse {:?}: {}", path, e)))?;
        Ok(section.zfs.unwrap_or_default())
    }

    /// 分区级数据集是否启用（对象级隐含分区级）
    pub fn partition_volumes(&self) -> bool {
        self.fs_per_partition || self.fs_per_object
    }

    /// 探测间隔
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}
