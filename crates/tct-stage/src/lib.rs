//! # TCT Stage Layer
//!
//! 平移台控制层：单轴控制器、三轴组合、单位换算与端口互斥锁。
//!
//! # 架构
//!
//! - **单位换算** (`units`): 米 ⇄ (steps, microsteps)，纯函数
//! - **后端** (`backend`): 厂商库的窄接口 [`StageBackend`]
//! - **端口锁** (`lock`): 每个串口一个 OS 级咨询锁，防止两个进程同时打开同一轴
//! - **单轴** (`axis`): [`Stage`]，拥有一个设备句柄和对应的端口锁
//! - **三轴** (`assembly`): [`TctStages`]，软限位 + 三维移动
//! - **设备发现** (`discovery`): 通过串口枚举查找 XIMC 控制器
//!
//! # 示例
//!
//! ```rust,ignore
//! use tct_stage::{AxisPorts, StageLimits, StageOptions, TctStages};
//!
//! let ports = AxisPorts::new("/dev/ttyACM0", "/dev/ttyACM1", "/dev/ttyACM2");
//! let mut stages = TctStages::open(&ports, StageLimits::default(), &StageOptions::default())?;
//! stages.move_to(Some(10e-3), Some(-5e-3), None)?;
//! println!("{}", stages.position()?);
//! ```

mod assembly;
mod axis;
pub mod backend;
pub mod discovery;
mod error;
pub mod lock;
pub mod units;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "ximc")]
pub mod ximc;

pub use assembly::{Axis, AxisLimits, AxisPorts, MultiAxisPosition, StageLimits, TctStages};
pub use axis::{PositionReading, Stage, StageOptions};
pub use backend::{DeviceId, DeviceInformation, RawPosition, StageBackend, stage_uri};
pub use discovery::{XimcDevice, find_ximc_devices, map_axes_to_ports};
pub use error::StageError;
pub use lock::PortLock;
pub use units::{
    MICROSTEPS_PER_STEP, RESOLUTION_M, STEP_LENGTH_M, StepPosition, meters_to_steps,
    steps_to_meters,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCall, MockStageBackend};

#[cfg(feature = "ximc")]
pub use ximc::XimcBackend;
