//! 平移台错误类型

use std::path::PathBuf;
use thiserror::Error;

use crate::assembly::Axis;

/// 平移台错误类型
#[derive(Error, Debug)]
pub enum StageError {
    /// 位置不是有限数，或超出可寻址范围
    #[error("Invalid position: {value} m")]
    InvalidPosition { value: f64 },

    /// 微步超出 [0, 255]
    #[error("Microsteps must be within [0, 255], got {0}")]
    InvalidMicrosteps(i32),

    /// 目标位置超出软限位
    #[error("Position {value} m on axis {axis} is outside limits [{min}, {max}] m")]
    OutOfLimits {
        axis: Axis,
        value: f64,
        min: f64,
        max: f64,
    },

    /// 限位区间本身不合法
    #[error("Invalid limits: min {min} must not exceed max {max}")]
    InvalidLimits { min: f64, max: f64 },

    /// 设备无法打开
    #[error("Device not found: {uri}")]
    DeviceNotFound { uri: String },

    /// 端口已被其他进程占用
    #[error("Port {port} is already in use by another process (lock file: {})", lock_path.display())]
    PortBusy { port: String, lock_path: PathBuf },

    /// 厂商库调用返回错误码
    #[error("Backend call `{call}` failed with code {code}")]
    Backend { call: &'static str, code: i32 },

    /// 设备返回了无法理解的数据
    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),

    /// 串口枚举失败
    #[error("Serial port enumeration failed: {0}")]
    Enumeration(#[from] serialport::Error),

    /// 指定轴的控制器未连接
    #[error("No connected controller for axis {0}")]
    AxisNotConnected(Axis),

    /// 未知的控制器序列号
    #[error("Controller with serial number {0} is not assigned to any axis")]
    UnassignedSerial(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StageError {
    /// 是否为输入校验错误（发生在任何硬件 IO 之前）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StageError::InvalidPosition { .. }
                | StageError::InvalidMicrosteps(_)
                | StageError::OutOfLimits { .. }
                | StageError::InvalidLimits { .. }
        )
    }
}
