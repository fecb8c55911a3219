//! # TCT Laser Layer
//!
//! 脉冲激光器控制器（USB HID，VID `0xC251` / PID `0x2201`）。
//!
//! - **协议层** (`protocol`): 命令字节、频率字换算、状态报告解析（纯函数）
//! - **传输层** (`transport`): [`LaserTransport`] trait，rusb 实现位于 `usb` 模块
//! - **控制器** (`controller`): [`LaserController`]，频率 / DAC 写穿缓存与开关机时序
//!
//! # 示例
//!
//! ```rust,ignore
//! use tct_laser::LaserController;
//!
//! let mut laser = LaserController::open()?;
//! laser.set_frequency(1e3)?;
//! laser.set_intensity(555)?;
//! laser.on()?;
//! ```

mod controller;
mod error;
pub mod protocol;
pub mod transport;

#[cfg(feature = "usb")]
pub mod usb;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use controller::{LaserController, LaserOptions};
pub use error::LaserError;
pub use protocol::{LaserCommand, LaserStatus, frequency_word};
pub use transport::LaserTransport;

#[cfg(feature = "usb")]
pub use usb::UsbLaserTransport;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockLaserTransport;
