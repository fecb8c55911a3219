//! TCT SDK - 瞬态电流技术（TCT）测量装置 Rust SDK
//!
//! 统一入口，按功能分层：
//!
//! - **平移台** (`stage`): 单位换算、端口锁、单轴 / 三轴控制、XIMC 设备发现
//! - **激光器** (`laser`): USB HID 协议与控制器
//! - **示波器** (`scope`): 传输层、波形解码、四通道采集
//! - **工具** (`tools`): 配置文件、测量文件格式、测量目录
//! - **扫描** (`control`): 线扫 / 网格 / 焦点扫描
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use tct_sdk::prelude::*;
//!
//! tct_sdk::init_logger();
//! let config = SetupConfig::load_or_default(SetupConfig::default_path()?)?;
//! ```
//!
//! # Features
//!
//! - `usb`（默认）：激光器 rusb 传输
//! - `ximc`：平移台 libximc 后端
//! - `visa`：示波器 VISA 传输
//! - `mock`：全部 Mock 设备

pub use tct_control as control;
pub use tct_laser as laser;
pub use tct_scope as scope;
pub use tct_stage as stage;
pub use tct_tools as tools;

mod logging;
pub mod prelude;

pub use logging::{DEFAULT_FILTER, init_logger, init_logger_with};

// --- 常用类型 ---

pub use tct_control::{ControlError, FocusScan, LinearScan, Scanner, XyScan};
pub use tct_laser::{LaserController, LaserError, LaserStatus};
pub use tct_scope::{Oscilloscope, ScopeError, TriggerMode, Waveform};
pub use tct_stage::{Axis, MultiAxisPosition, StageError, StageLimits, TctStages};
pub use tct_tools::{RunDirectory, SetupConfig, ToolsError};
