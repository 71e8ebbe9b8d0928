use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 节点存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// 设备挂载根目录
    #[serde(default = "default_devices_root")]
    pub devices_root: PathBuf,

    /// 数据目录名（按存储角色区分：accounts/containers/objects）
    #[serde(default = "default_datadir")]
    pub datadir: String,

    /// 存储后端名称，由注册表解析
    #[serde(default = "default_backend")]
    pub backend: String,

    /// 本节点拥有的设备列表
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    /// 配置文件路径，供后端加载自身的配置段
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// 设备配置条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// 设备标识
    pub id: String,

    /// 声明的镜像副本数
    #[serde(default = "default_mirror_copies")]
    pub mirror_copies: u32,
}

fn default_devices_root() -> PathBuf {
    PathBuf::from("/srv/node")
}

fn default_datadir() -> String {
    "objects".to_string()
}

fn default_backend() -> String {
    "plain".to_string()
}

fn default_mirror_copies() -> u32 {
    1
}

impl NodeConfig {
    /// 从文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| crate::LfsError::config(format!("cannot parse {:?}: {}", path, e)))?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            devices_root: default_devices_root(),
            datadir: default_datadir(),
            backend: default_backend(),
            devices: Vec::new(),
            source_path: None,
        }
    }
}
