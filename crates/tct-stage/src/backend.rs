//! 平移台后端接口
//!
//! 厂商库（libximc）只作为外部协作者出现在这个窄接口之后，
//! 不在本 crate 中重新实现其串口协议。

use std::fmt;
use std::time::Duration;

use crate::error::StageError;
use crate::units::StepPosition;

/// 厂商库分配的设备标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub i32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 控制器上报的原始位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawPosition {
    pub steps: i32,
    /// 厂商库以 `int` 上报，正常情况下在 [0, 255] 内
    pub microsteps: i32,
    /// 编码器读数（厂商未定义其物理含义）
    pub encoder: i64,
}

/// 设备元信息
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInformation {
    pub manufacturer: String,
    pub manufacturer_id: String,
    pub product_description: String,
    pub major: u32,
    pub minor: u32,
    pub release: u32,
}

impl fmt::Display for DeviceInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}) v{}.{}.{}",
            self.manufacturer,
            self.product_description,
            self.manufacturer_id,
            self.major,
            self.minor,
            self.release
        )
    }
}

/// 单轴控制器后端
///
/// 每个 [`Stage`](crate::Stage) 独占一个后端实例。所有方法都是阻塞调用，
/// 失败直接返回错误，本层不做重试。
pub trait StageBackend {
    /// 打开设备，`uri` 见 [`stage_uri`]
    fn open(&mut self, uri: &str) -> Result<DeviceId, StageError>;

    fn close(&mut self, device: DeviceId) -> Result<(), StageError>;

    /// 绝对移动
    fn move_to(&mut self, device: DeviceId, target: StepPosition) -> Result<(), StageError>;

    /// 相对移动
    fn move_by(&mut self, device: DeviceId, delta: StepPosition) -> Result<(), StageError>;

    /// 阻塞直到电机停止，`refresh` 为轮询间隔
    fn wait_for_stop(&mut self, device: DeviceId, refresh: Duration) -> Result<(), StageError>;

    fn position(&mut self, device: DeviceId) -> Result<RawPosition, StageError>;

    fn serial_number(&mut self, device: DeviceId) -> Result<u32, StageError>;

    fn device_information(&mut self, device: DeviceId) -> Result<DeviceInformation, StageError>;

    /// 回零：先到两端限位，再到定义的零点
    fn home(&mut self, device: DeviceId) -> Result<(), StageError>;
}

impl<B: StageBackend + ?Sized> StageBackend for Box<B> {
    fn open(&mut self, uri: &str) -> Result<DeviceId, StageError> {
        (**self).open(uri)
    }

    fn close(&mut self, device: DeviceId) -> Result<(), StageError> {
        (**self).close(device)
    }

    fn move_to(&mut self, device: DeviceId, target: StepPosition) -> Result<(), StageError> {
        (**self).move_to(device, target)
    }

    fn move_by(&mut self, device: DeviceId, delta: StepPosition) -> Result<(), StageError> {
        (**self).move_by(device, delta)
    }

    fn wait_for_stop(&mut self, device: DeviceId, refresh: Duration) -> Result<(), StageError> {
        (**self).wait_for_stop(device, refresh)
    }

    fn position(&mut self, device: DeviceId) -> Result<RawPosition, StageError> {
        (**self).position(device)
    }

    fn serial_number(&mut self, device: DeviceId) -> Result<u32, StageError> {
        (**self).serial_number(device)
    }

    fn device_information(&mut self, device: DeviceId) -> Result<DeviceInformation, StageError> {
        (**self).device_information(device)
    }

    fn home(&mut self, device: DeviceId) -> Result<(), StageError> {
        (**self).home(device)
    }
}

/// 串口名 → 厂商库 URI
///
/// - Windows: `xi-com:\\.\COM3`
/// - 其他平台: `xi-com:/dev/ttyACM0`
pub fn stage_uri(port: &str) -> String {
    if cfg!(windows) {
        format!(r"xi-com:\\.\{}", port)
    } else {
        format!("xi-com:{}", port)
    }
}
