use lfs_core::{LfsError, NodeConfig, PlainBackend, Result, StorageBackend, StorageCore};
use lfs_zfs::{ZfsBackend, ZfsCliClient, ZfsConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// 后端构造函数
pub type BackendFactory = fn(&NodeConfig, Arc<StorageCore>) -> Result<Arc<dyn StorageBackend>>;

/// 后端注册表
///
/// 启动时按配置的后端名解析构造函数，未知名称是配置错误。
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// 带内置后端的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("plain", plain_backend);
        registry.register("zfs", zfs_backend);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// 按配置构建后端
    pub fn build(
        &self,
        config: &NodeConfig,
        core: Arc<StorageCore>,
    ) -> Result<Arc<dyn StorageBackend>> {
        let factory = self.factories.get(&config.backend).ok_or_else(|| {
            let mut known: Vec<&str> = self.factories.keys().map(|k| k.as_str()).collect();
            known.sort_unstable();
            LfsError::config(format!(
                "cannot load storage backend, invalid backend: {}, known backends: {}",
                config.backend,
                known.join(", ")
            ))
        })?;
        factory(config, core)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn plain_backend(
    _config: &NodeConfig,
    core: Arc<StorageCore>,
) -> Result<Arc<dyn StorageBackend>> {
    Ok(Arc::new(PlainBackend::new(core)))
}

fn zfs_backend(config: &NodeConfig, core: Arc<StorageCore>) -> Result<Arc<dyn StorageBackend>> {
    // 从同一配置文件读取 [zfs] 段
    let zfs_config = match &config.source_path {
        Some(path) => ZfsConfig::load(path)?,
        None => ZfsConfig::default(),
    };
    Ok(Arc::new(ZfsBackend::new(
        zfs_config,
        core,
        Arc::new(ZfsCliClient::new()),
    )))
}
