//! 示波器错误类型

use std::io;
use thiserror::Error;

/// 示波器错误类型
#[derive(Error, Debug)]
pub enum ScopeError {
    /// 通道号不在 1..=4
    #[error("Channel must be in {{1, 2, 3, 4}}, got {0}")]
    InvalidChannel(u8),

    /// 触发模式字符串无效
    #[error("Trigger mode must be one of AUTO, NORM, SINGLE, STOP, got {0:?}")]
    InvalidTriggerMode(String),

    /// 无法从应答中解析出期望的值
    #[error("Unexpected response to {command:?}: {response:?}")]
    InvalidResponse { command: String, response: String },

    /// 波形数据块比头部还短
    #[error("Waveform block too short: expected more than {expected} bytes, got {actual}")]
    ShortWaveform { expected: usize, actual: usize },

    /// 仪器连接失败
    #[error("Cannot connect to instrument {resource}: {reason}")]
    Connection { resource: String, reason: String },

    /// 传输帧格式错误（例如 VICP 头无效）
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// VISA 库错误
    #[error("VISA error: {0}")]
    Visa(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ScopeError {
    /// 是否为输入校验错误（发生在任何仪器 IO 之前）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScopeError::InvalidChannel(_) | ScopeError::InvalidTriggerMode(_)
        )
    }

    /// 检查是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ScopeError::Io(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_error_display() {
        let err = ScopeError::InvalidChannel(5);
        assert!(err.to_string().contains("{1, 2, 3, 4}"));
        assert!(err.to_string().contains('5'));

        let err = ScopeError::InvalidResponse {
            command: "C1:VDIV?".into(),
            response: "garbage".into(),
        };
        assert!(err.to_string().contains("C1:VDIV?"));
    }

    #[test]
    fn test_scope_error_predicates() {
        assert!(ScopeError::InvalidChannel(0).is_validation());
        assert!(ScopeError::InvalidTriggerMode("FAST".into()).is_validation());
        assert!(!ScopeError::Visa("x".into()).is_validation());

        let err: ScopeError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert!(err.is_timeout());
        let err: ScopeError = io::Error::other("broken").into();
        assert!(!err.is_timeout());
    }
}
