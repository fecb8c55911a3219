//! 触发模式

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScopeError;

/// 示波器触发模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerMode {
    Auto,
    Norm,
    Single,
    Stop,
}

impl TriggerMode {
    pub const ALL: [TriggerMode; 4] = [
        TriggerMode::Auto,
        TriggerMode::Norm,
        TriggerMode::Single,
        TriggerMode::Stop,
    ];

    /// SCPI 关键字
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerMode::Auto => "AUTO",
            TriggerMode::Norm => "NORM",
            TriggerMode::Single => "SINGLE",
            TriggerMode::Stop => "STOP",
        }
    }

    /// `TRIG_MODE <mode>`
    pub fn command(self) -> String {
        format!("TRIG_MODE {}", self.as_str())
    }

    /// 解析 `TRIG_MODE?` 应答，取最后一个词（兼容 `TRMD AUTO` 这类带命令头的应答）
    pub fn parse_response(response: &str) -> Result<Self, ScopeError> {
        response
            .split_whitespace()
            .last()
            .ok_or_else(|| ScopeError::InvalidTriggerMode(response.to_string()))?
            .parse()
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerMode {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(TriggerMode::Auto),
            "NORM" | "NORMAL" => Ok(TriggerMode::Norm),
            "SINGLE" => Ok(TriggerMode::Single),
            "STOP" => Ok(TriggerMode::Stop),
            _ => Err(ScopeError::InvalidTriggerMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_mode_roundtrip_names() {
        for mode in TriggerMode::ALL {
            assert_eq!(mode.as_str().parse::<TriggerMode>().unwrap(), mode);
        }
        assert_eq!("single".parse::<TriggerMode>().unwrap(), TriggerMode::Single);
        assert!("FAST".parse::<TriggerMode>().unwrap_err().is_validation());
    }

    #[test]
    fn test_trigger_mode_parse_response() {
        assert_eq!(TriggerMode::parse_response("TRMD AUTO").unwrap(), TriggerMode::Auto);
        assert_eq!(TriggerMode::parse_response("NORM\n").unwrap(), TriggerMode::Norm);
        assert!(TriggerMode::parse_response("").is_err());
    }

    #[test]
    fn test_trigger_mode_command() {
        assert_eq!(TriggerMode::Single.command(), "TRIG_MODE SINGLE");
    }
}
