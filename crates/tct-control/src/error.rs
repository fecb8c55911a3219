//! 扫描层错误类型

use tct_laser::LaserError;
use tct_scope::ScopeError;
use tct_stage::StageError;
use tct_tools::ToolsError;
use thiserror::Error;

/// 扫描层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Laser error: {0}")]
    Laser(#[from] LaserError),

    #[error("Oscilloscope error: {0}")]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Tools(#[from] ToolsError),

    /// 扫描参数不合法
    #[error("Invalid scan parameters: {0}")]
    InvalidScan(String),

    /// 坐标超过 1 m，几乎一定是单位写错了
    #[error("{name} = {value} m is more than one meter, check the units")]
    CoordinateOutOfRange { name: &'static str, value: f64 },
}

impl ControlError {
    /// 是否为参数错误（未触发任何硬件动作）
    pub fn is_validation(&self) -> bool {
        match self {
            ControlError::InvalidScan(_) | ControlError::CoordinateOutOfRange { .. } => true,
            ControlError::Stage(e) => e.is_validation(),
            ControlError::Laser(e) => e.is_validation(),
            ControlError::Scope(e) => e.is_validation(),
            ControlError::Tools(e) => e.is_validation(),
        }
    }
}
