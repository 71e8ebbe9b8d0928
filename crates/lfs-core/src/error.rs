use thiserror::Error;

/// 存储节点错误类型
#[derive(Error, Debug)]
pub enum LfsError {
    /// 配置错误（启动期致命，由进程入口决定退出）
    #[error("Configuration error: {0}")]
    Config(String),

    /// 调用方参数错误
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 目录创建等 I/O 错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 卷管理器操作失败
    #[error("Volume operation failed: {0}")]
    Volume(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 存储节点结果类型
pub type Result<T> = std::result::Result<T, LfsError>;

impl LfsError {
    /// 创建配置错误
    pub fn config(msg: impl Into<String>) -> Self {
        LfsError::Config(msg.into())
    }

    /// 创建参数错误
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        LfsError::InvalidArgument(msg.into())
    }

    /// 创建卷操作错误
    pub fn volume(msg: impl Into<String>) -> Self {
        LfsError::Volume(msg.into())
    }
}
