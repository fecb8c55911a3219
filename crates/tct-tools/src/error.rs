//! 工具层错误类型

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 工具层错误类型
#[derive(Error, Debug)]
pub enum ToolsError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML 解析错误
    #[error("Cannot parse configuration: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML 序列化错误
    #[error("Cannot serialize configuration: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// 配置校验失败
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 无法确定用户配置目录
    #[error("Cannot determine the user configuration directory")]
    NoConfigDir,

    /// 测量文件格式错误
    #[error("{path}:{line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// 通道长度不一致
    #[error("Channel {channel} has {actual} samples, expected {expected}")]
    LengthMismatch {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    /// 平均时没有输入
    #[error("Cannot average zero waveforms")]
    EmptyAverage,

    /// 目录已存在
    #[error("Run directory {0} already exists")]
    AlreadyExists(PathBuf),
}

impl ToolsError {
    /// 是否为输入 / 配置错误
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ToolsError::InvalidConfig(_)
                | ToolsError::LengthMismatch { .. }
                | ToolsError::EmptyAverage
        )
    }
}
