//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use tct_sdk::prelude::*;
//! ```

// 平移台
pub use crate::stage::{
    Axis, AxisLimits, AxisPorts, MultiAxisPosition, StageLimits, StageOptions, TctStages,
};

// 激光器
pub use crate::laser::{LaserController, LaserOptions, LaserStatus, LaserTransport};

// 示波器
pub use crate::scope::{InstrumentTransport, Oscilloscope, ScopeOptions, TriggerMode, Waveform};

// 配置与数据文件
pub use crate::tools::{MeasurementWriter, RunDirectory, SetupConfig};

// 扫描
pub use crate::control::{
    FocusScan, LinearScan, Positioner, PulseSource, ScanOptions, ScanPlan, Scanner,
    WaveformSource, XyScan,
};

// 错误类型
pub use crate::control::ControlError;
pub use crate::laser::LaserError;
pub use crate::scope::ScopeError;
pub use crate::stage::StageError;
pub use crate::tools::ToolsError;
