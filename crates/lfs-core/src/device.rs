use serde::{Deserialize, Serialize};
use std::fmt;

/// 设备状态
///
/// 规范的四态模型（Online/Degraded/Faulted/Misconfigured），
/// 另保留 Unavailable 以兼容旧调用方的状态字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// 在线
    Online,
    /// 降级（冗余丢失但可用）
    Degraded,
    /// 故障
    Faulted,
    /// 镜像数与声明不符
    Misconfigured,
    /// 不可用
    Unavailable,
}

impl DeviceStatus {
    /// 是否健康
    pub fn is_online(&self) -> bool {
        matches!(self, DeviceStatus::Online)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Degraded => "degraded",
            DeviceStatus::Faulted => "faulted",
            DeviceStatus::Misconfigured => "misconfigured",
            DeviceStatus::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// 故障分类集合的类别
///
/// 每个设备同一时刻至多属于一个集合，不在任何集合即视为 Online。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    Degraded,
    Faulted,
    Misconfigured,
    Unavailable,
}

impl FaultClass {
    /// 对应的设备状态
    pub fn status(&self) -> DeviceStatus {
        match self {
            FaultClass::Degraded => DeviceStatus::Degraded,
            FaultClass::Faulted => DeviceStatus::Faulted,
            FaultClass::Misconfigured => DeviceStatus::Misconfigured,
            FaultClass::Unavailable => DeviceStatus::Unavailable,
        }
    }
}

/// 本节点拥有的存储设备
///
/// 设备列表在构造时由外部设备源提供，进程生命周期内不变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// 设备标识
    pub id: String,

    /// 声明的镜像副本数
    pub mirror_copies: u32,
}

impl Device {
    pub fn new(id: impl Into<String>, mirror_copies: u32) -> Self {
        Self {
            id: id.into(),
            mirror_copies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(DeviceStatus::Online.to_string(), "online");
        assert_eq!(DeviceStatus::Degraded.to_string(), "degraded");
        assert_eq!(DeviceStatus::Faulted.to_string(), "faulted");
        assert_eq!(DeviceStatus::Misconfigured.to_string(), "misconfigured");
        assert_eq!(DeviceStatus::Unavailable.to_string(), "unavailable");
    }

    #[test]
    fn test_status_serialize_lowercase() {
        // 线上格式按小写字符串输出
        let s = serde_json::to_string(&DeviceStatus::Faulted).unwrap();
        assert_eq!(s, "\"faulted\"");
    }

    #[test]
    fn test_fault_class_status() {
        assert_eq!(FaultClass::Degraded.status(), DeviceStatus::Degraded);
        assert_eq!(FaultClass::Misconfigured.status(), DeviceStatus::Misconfigured);
    }
}
