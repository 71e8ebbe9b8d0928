use async_trait::async_trait;
use lfs_core::{LfsError, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// 卷状态：健康字符串与实际镜像数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeStatus {
    pub health: String,
    pub mirror_count: u32,
}

/// 卷创建选项
#[derive(Debug, Clone, Default)]
pub struct VolumeOptions {
    /// 压缩算法（如 lz4）
    pub compression: Option<String>,
}

/// 卷管理器客户端契约
///
/// 核心只消费该契约；传输/进程级失败以 `Volume` 错误返回，
/// 探测路径将其视为软失败，从不直接上抛给状态查询方。
#[async_trait]
pub trait VolumeClient: Send + Sync {
    /// 命名卷是否存在
    async fn exists(&self, name: &str) -> Result<bool>;

    /// 创建命名卷并挂载
    async fn create(
        &self,
        name: &str,
        mountpoint: Option<&Path>,
        options: &VolumeOptions,
    ) -> Result<()>;

    /// 读取卷属性
    async fn get_property(&self, name: &str, key: &str) -> Result<String>;

    /// 设置卷属性
    async fn set_property(&self, name: &str, key: &str, value: &str) -> Result<()>;

    /// 查询池状态
    async fn status(&self, pool: &str) -> Result<VolumeStatus>;
}

/// 基于 zfs/zpool 命令行的客户端
#[derive(Debug, Default)]
pub struct ZfsCliClient;

impl ZfsCliClient {
    pub fn new() -> Self {
        Self
    }

    async fn run(program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| LfsError::volume(format!("{} {}: {}", program, args.join(" "), e)))?;
        if !output.status.success() {
            return Err(LfsError::volume(format!(
                "{} {} failed: {}",
                program,
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VolumeClient for ZfsCliClient {
    async fn exists(&self, name: &str) -> Result<bool> {
        match Self::run("zfs", &["list", "-H", "-o", "name", name]).await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(dataset = %name, error = %e, "Dataset lookup failed, treating as absent");
                Ok(false)
            }
        }
    }

    async fn create(
        &self,
        name: &str,
        mountpoint: Option<&Path>,
        options: &VolumeOptions,
    ) -> Result<()> {
        let mut args: Vec<String> = vec!["create".to_string(), "-p".to_string()];
        if let Some(mountpoint) = mountpoint {
            args.push("-o".to_string());
            args.push(format!("mountpoint={}", mountpoint.display()));
        }
        if let Some(compression) = &options.compression {
            args.push("-o".to_string());
            args.push(format!("compression={}", compression));
        }
        args.push(name.to_string());
        let args: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        Self::run("zfs", &args).await?;
        debug!(dataset = %name, "Dataset created");
        Ok(())
    }

    async fn get_property(&self, name: &str, key: &str) -> Result<String> {
        let out = Self::run("zfs", &["get", "-H", "-o", "value", key, name]).await?;
        Ok(out.trim().to_string())
    }

    async fn set_property(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let assignment = format!("{}={}", key, value);
        Self::run("zfs", &["set", &assignment, name]).await?;
        Ok(())
    }

    async fn status(&self, pool: &str) -> Result<VolumeStatus> {
        let health = Self::run("zpool", &["list", "-H", "-o", "health", pool])
            .await?
            .trim()
            .to_string();
        let status_output = Self::run("zpool", &["status", pool]).await?;
        Ok(VolumeStatus {
            health,
            mirror_count: parse_mirror_count(&status_output),
        })
    }
}

/// 从 zpool status 输出解析镜像份数
///
/// 取配置段中第一个 mirror vdev 的子设备数；无镜像时为 1。
pub(crate) fn parse_mirror_count(output: &str) -> u32 {
    let mut mirror_indent: Option<usize> = None;
    let mut count = 0u32;
    for line in output.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            if mirror_indent.is_some() {
                break;
            }
            continue;
        }
        let indent = line.len() - trimmed.len();
        if let Some(mi) = mirror_indent {
            if indent > mi {
                count += 1;
                continue;
            }
            break;
        }
        if trimmed.starts_with("mirror") {
            mirror_indent = Some(indent);
        }
    }
    if count == 0 {
        1
    } else {
        count
    }
}
