//! # TCT Control
//!
//! 把平移台、示波器和激光器组合成逐点扫描流程。
//!
//! - **设备接口** (`devices`): [`Positioner`] / [`WaveformSource`] / [`PulseSource`]
//! - **扫描计划** (`plan`): [`LinearScan`] / [`XyScan`] / [`FocusScan`]，纯数据
//! - **执行器** (`scanner`): [`Scanner`]，移动、采集、平均、写文件，支持停止标志
//!
//! # 示例
//!
//! ```rust,ignore
//! use tct_control::{FocusScan, Scanner};
//! use tct_tools::RunDirectory;
//!
//! let run_dir = RunDirectory::create(&config.measurements.base_path, "focus", true)?;
//! let plan = FocusScan { x: 21.16e-3, y: 37.32e-3, z_start: 49.3e-3, z_end: 58e-3, n_steps: 333, n_triggers: 11 };
//! let report = Scanner::new(stages, scope).with_pulses(laser).run_in(&plan, &run_dir)?;
//! ```

mod devices;
mod error;
pub mod plan;
mod scanner;

pub use devices::{Positioner, PulseSource, WaveformSource};
pub use error::ControlError;
pub use plan::{FocusScan, LinearScan, ScanPlan, ScanPoint, XyScan, linspace};
pub use scanner::{ScanOptions, ScanReport, Scanner};
