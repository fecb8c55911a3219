//! 激光器错误类型

use thiserror::Error;

/// 激光器错误类型
#[derive(Error, Debug)]
pub enum LaserError {
    /// USB 错误（来自 rusb）
    #[cfg(feature = "usb")]
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// 设备未找到
    #[error("Laser controller {vendor_id:04x}:{product_id:04x} not found among USB devices")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    /// 设备没有可用的 IN 端点
    #[error("Laser controller exposes no IN endpoint")]
    NoInEndpoint,

    /// 频率超出 [50, 100000] Hz
    #[error("Frequency must be within [50, 100000] Hz, got {0} Hz")]
    InvalidFrequency(f64),

    /// 频率字无法用 16 位表示
    #[error("Frequency {hz} Hz maps to tuning word {word}, which does not fit in 16 bits")]
    FrequencyWordOutOfRange { hz: f64, word: f64 },

    /// DAC 超出 [0, 1024)
    #[error("DAC must be within [0, 1024), got {0}")]
    InvalidIntensity(i64),

    /// 状态报告无法解析
    #[error("Cannot understand laser status byte {0:#04x}")]
    InvalidStatus(u8),

    /// 无效状态字符串
    #[error("Status must be either \"on\" or \"off\", got {0:?}")]
    InvalidStatusName(String),

    /// 状态报告长度不足
    #[error("Invalid report from device: expected at least {expected} bytes, got {actual}")]
    InvalidResponse { expected: usize, actual: usize },

    /// 传输层错误（非 USB 传输使用）
    #[error("Transport error: {0}")]
    Transport(String),
}

impl LaserError {
    /// 是否为输入校验错误（发生在任何硬件 IO 之前）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LaserError::InvalidFrequency(_)
                | LaserError::FrequencyWordOutOfRange { .. }
                | LaserError::InvalidIntensity(_)
                | LaserError::InvalidStatusName(_)
        )
    }

    /// 检查是否为超时错误
    pub fn is_timeout(&self) -> bool {
        #[cfg(feature = "usb")]
        if matches!(self, LaserError::Usb(rusb::Error::Timeout)) {
            return true;
        }
        false
    }
}
