use crate::config::NodeConfig;
use crate::device::{Device, DeviceStatus, FaultClass};
use crate::error::{LfsError, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// 故障分类集合
///
/// 四个集合两两互斥：insert 先从所有集合移除再写入，
/// 不在任何集合中的设备即为 Online。
#[derive(Debug, Default)]
struct FaultSets {
    faulted: HashSet<String>,
    degraded: HashSet<String>,
    unavailable: HashSet<String>,
    misconfigured: HashSet<String>,
}

impl FaultSets {
    fn remove(&mut self, device: &str) {
        self.faulted.remove(device);
        self.degraded.remove(device);
        self.unavailable.remove(device);
        self.misconfigured.remove(device);
    }

    fn insert(&mut self, device: &str, class: FaultClass) {
        self.remove(device);
        let set = match class {
            FaultClass::Faulted => &mut self.faulted,
            FaultClass::Degraded => &mut self.degraded,
            FaultClass::Unavailable => &mut self.unavailable,
            FaultClass::Misconfigured => &mut self.misconfigured,
        };
        set.insert(device.to_string());
    }

    fn status_of(&self, device: &str) -> DeviceStatus {
        if self.faulted.contains(device) {
            DeviceStatus::Faulted
        } else if self.degraded.contains(device) {
            DeviceStatus::Degraded
        } else if self.unavailable.contains(device) {
            DeviceStatus::Unavailable
        } else if self.misconfigured.contains(device) {
            DeviceStatus::Misconfigured
        } else {
            DeviceStatus::Online
        }
    }
}

/// 存储核心
///
/// 负责设备簿记与路径布局，与具体后端无关。
/// 故障集合仅由健康监视器的探测回写，状态查询方只读；
/// 单把锁保证查询得到一致的快照。
pub struct StorageCore {
    devices_root: PathBuf,
    datadir: String,
    devices: BTreeMap<String, u32>,
    faults: RwLock<FaultSets>,
}

impl StorageCore {
    /// 创建存储核心
    ///
    /// # 错误
    /// * `Config` - 设备列表为空
    /// * `InvalidArgument` - 设备标识非法
    pub fn new(
        devices_root: impl Into<PathBuf>,
        datadir: impl Into<String>,
        devices: Vec<Device>,
    ) -> Result<Self> {
        if devices.is_empty() {
            return Err(LfsError::config("no devices configured for this node"));
        }
        let mut map = BTreeMap::new();
        for device in devices {
            Self::validate_name(&device.id)?;
            if device.mirror_copies == 0 {
                return Err(LfsError::config(format!(
                    "device {} declares zero mirror copies",
                    device.id
                )));
            }
            map.insert(device.id, device.mirror_copies);
        }
        Ok(Self {
            devices_root: devices_root.into(),
            datadir: datadir.into(),
            devices: map,
            faults: RwLock::new(FaultSets::default()),
        })
    }

    /// 从节点配置构建
    pub fn from_config(config: &NodeConfig) -> Result<Self> {
        let devices = config
            .devices
            .iter()
            .map(|d| Device::new(d.id.clone(), d.mirror_copies))
            .collect();
        Self::new(config.devices_root.clone(), config.datadir.clone(), devices)
    }

    /// 校验设备/分区等路径段名称
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(LfsError::invalid_argument("name cannot be empty"));
        }
        if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            return Err(LfsError::invalid_argument(format!(
                "name contains path separators: {}",
                name
            )));
        }
        Ok(())
    }

    pub fn devices_root(&self) -> &Path {
        &self.devices_root
    }

    pub fn datadir(&self) -> &str {
        &self.datadir
    }

    /// 已知设备及其声明镜像数（id 升序）
    pub fn devices(&self) -> Vec<Device> {
        self.devices
            .iter()
            .map(|(id, mc)| Device::new(id.clone(), *mc))
            .collect()
    }

    /// 设备是否属于本节点
    pub fn is_known(&self, device: &str) -> bool {
        self.devices.contains_key(device)
    }

    /// 声明的镜像副本数
    pub fn mirror_copies(&self, device: &str) -> Option<u32> {
        self.devices.get(device).copied()
    }

    // ========== 路径布局 ==========

    /// 设备挂载点：devices_root/device
    pub fn device_path(&self, device: &str) -> PathBuf {
        self.devices_root.join(device)
    }

    /// 数据目录：devices_root/device/datadir
    pub fn datadir_path(&self, device: &str) -> PathBuf {
        self.device_path(device).join(&self.datadir)
    }

    /// 分区目录：devices_root/device/datadir/partition
    pub fn partition_path(&self, device: &str, partition: &str) -> PathBuf {
        self.datadir_path(device).join(partition)
    }

    /// 哈希分片目录：datadir/partition/<hash 后三位>/<hash>
    pub fn storage_directory(datadir: &str, partition: &str, name_hash: &str) -> PathBuf {
        // 哈希约定为十六进制，但切分仍须落在字符边界上
        let mut split = name_hash.len().saturating_sub(3);
        while !name_hash.is_char_boundary(split) {
            split -= 1;
        }
        let suffix = &name_hash[split..];
        Path::new(datadir).join(partition).join(suffix).join(name_hash)
    }

    /// 创建数据目录（幂等）
    pub async fn setup_datadir(&self, device: &str) -> Result<PathBuf> {
        Self::validate_name(device)?;
        let path = self.datadir_path(device);
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// 创建临时目录（幂等）：devices_root/device/tmp
    pub async fn setup_tmp(&self, device: &str) -> Result<PathBuf> {
        Self::validate_name(device)?;
        let path = self.device_path(device).join("tmp");
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// 创建分区目录（幂等）
    pub async fn setup_partition(&self, device: &str, partition: &str) -> Result<PathBuf> {
        Self::validate_name(device)?;
        Self::validate_name(partition)?;
        let path = self.partition_path(device, partition);
        tokio::fs::create_dir_all(&path).await?;
        Ok(path)
    }

    /// 临时目录路径
    ///
    /// 基础布局忽略 partition/name_hash，后端可按内容哈希分片临时空间。
    pub fn tmp_dir(&self, device: &str, _partition: &str, _name_hash: &str) -> PathBuf {
        self.datadir_path(device).join("tmp")
    }

    // ========== 故障分类 ==========

    /// 将设备写入指定故障集合（先移除再写入，保证互斥）
    ///
    /// 未知设备直接忽略。
    pub async fn set_fault(&self, device: &str, class: FaultClass) {
        if !self.is_known(device) {
            debug!(device = %device, "Ignoring fault for unknown device");
            return;
        }
        let mut faults = self.faults.write().await;
        faults.insert(device, class);
        debug!(device = %device, status = %class.status(), "Device classified");
    }

    /// 将设备从所有故障集合移除
    pub async fn clear_faults(&self, device: &str) {
        let mut faults = self.faults.write().await;
        faults.remove(device);
    }

    /// 查询设备状态
    ///
    /// * `filter` 为 None 时返回全部已知设备；
    /// * filter 中的未知设备静默跳过；
    /// * 结果为空时返回 None（区别于空映射），供调用方渲染 NotFound。
    pub async fn get_device_status(
        &self,
        filter: Option<&[String]>,
    ) -> Option<HashMap<String, (DeviceStatus, u32)>> {
        let faults = self.faults.read().await;
        let mut statuses = HashMap::new();
        match filter {
            Some(ids) => {
                for id in ids {
                    if let Some(mirror_copies) = self.mirror_copies(id) {
                        statuses.insert(id.clone(), (faults.status_of(id), mirror_copies));
                    }
                }
            }
            None => {
                for (id, mirror_copies) in &self.devices {
                    statuses.insert(id.clone(), (faults.status_of(id), *mirror_copies));
                }
            }
        }
        if statuses.is_empty() {
            None
        } else {
            Some(statuses)
        }
    }
}
