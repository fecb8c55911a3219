//! 命令定义和实现

pub mod config;
pub mod laser;
pub mod scan;
pub mod scope;
pub mod stage;

pub use config::ConfigCommand;
pub use laser::LaserCommand;
pub use scan::ScanCommand;
pub use scope::ScopeCommand;
pub use stage::StageCommand;
