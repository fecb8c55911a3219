//! # TCT Tools
//!
//! 设备层之上的共享工具：
//!
//! - **配置** (`config`): [`SetupConfig`]，TOML 装置配置文件
//! - **测量文件** (`measurement`): 四通道制表符分隔文本的读写、多次触发平均
//! - **测量目录** (`run_dir`): [`RunDirectory`]，带时间戳的 raw / processed / scripts 目录

pub mod config;
mod error;
pub mod measurement;
pub mod run_dir;

pub use config::{
    LaserConfig, LimitsConfig, MeasurementsConfig, PortsConfig, ScopeConfig, ScopeTransportKind,
    SetupConfig, StagesConfig,
};
pub use error::ToolsError;
pub use measurement::{
    FourChannelTrace, MeasurementWriter, average_acquisitions, average_waveforms,
    grid_file_name, point_file_name, read_four_channels, write_four_channels,
};
pub use run_dir::RunDirectory;
