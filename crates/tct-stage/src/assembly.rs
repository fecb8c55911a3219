//! 三轴平移台组合
//!
//! 固定轴标签 {x, y, z}，每轴独立的闭区间软限位。
//! 任何一个坐标越界时，整次移动在发出任何硬件命令之前被拒绝。

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use tracing::{info, warn};

use crate::axis::{Stage, StageOptions};
use crate::backend::StageBackend;
use crate::error::StageError;

/// 轴标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// 固定的移动顺序
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis `{}` (expected x, y or z)", other)),
        }
    }
}

/// 单轴软限位，闭区间 `[min, max]`（米）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimits {
    min: f64,
    max: f64,
}

impl AxisLimits {
    pub fn new(min: f64, max: f64) -> Result<Self, StageError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(StageError::InvalidLimits { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// 端点包含在内
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// 三轴软限位
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageLimits {
    pub x: AxisLimits,
    pub y: AxisLimits,
    pub z: AxisLimits,
}

impl Default for StageLimits {
    /// x, y ∈ [-50 mm, 50 mm]，z ∈ [0, 90 mm]
    fn default() -> Self {
        Self {
            x: AxisLimits { min: -50e-3, max: 50e-3 },
            y: AxisLimits { min: -50e-3, max: 50e-3 },
            z: AxisLimits { min: 0.0, max: 90e-3 },
        }
    }
}

impl StageLimits {
    pub fn get(&self, axis: Axis) -> AxisLimits {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// 校验单个坐标
    pub fn check(&self, axis: Axis, value: f64) -> Result<(), StageError> {
        if !value.is_finite() {
            return Err(StageError::InvalidPosition { value });
        }
        let limits = self.get(axis);
        if !limits.contains(value) {
            return Err(StageError::OutOfLimits {
                axis,
                value,
                min: limits.min,
                max: limits.max,
            });
        }
        Ok(())
    }
}

/// 三维位置（米）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MultiAxisPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MultiAxisPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }
}

impl Add for MultiAxisPosition {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl fmt::Display for MultiAxisPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:e}, {:e}, {:e}) m", self.x, self.y, self.z)
    }
}

/// 三个轴对应的串口
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisPorts {
    pub x: String,
    pub y: String,
    pub z: String,
}

impl AxisPorts {
    pub fn new(x: impl Into<String>, y: impl Into<String>, z: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            z: z.into(),
        }
    }

    pub fn get(&self, axis: Axis) -> &str {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

/// 三轴平移台
///
/// 单线程调用者使用；相对移动基于实时读取的当前位置换算为绝对移动，
/// 与同一轴的外部并发运动之间不是原子的。
pub struct TctStages<B: StageBackend> {
    x: Stage<B>,
    y: Stage<B>,
    z: Stage<B>,
    limits: StageLimits,
}

impl<B: StageBackend> TctStages<B> {
    pub fn new(x: Stage<B>, y: Stage<B>, z: Stage<B>, limits: StageLimits) -> Self {
        Self { x, y, z, limits }
    }

    /// 依次打开三个轴，`backend` 为每个轴构造一个后端实例
    pub fn open_with<F>(
        ports: &AxisPorts,
        limits: StageLimits,
        options: &StageOptions,
        mut backend: F,
    ) -> Result<Self, StageError>
    where
        F: FnMut(Axis) -> B,
    {
        let x = Stage::open_with(backend(Axis::X), ports.get(Axis::X), options)?;
        let y = Stage::open_with(backend(Axis::Y), ports.get(Axis::Y), options)?;
        let z = Stage::open_with(backend(Axis::Z), ports.get(Axis::Z), options)?;
        Ok(Self::new(x, y, z, limits))
    }

    pub fn limits(&self) -> &StageLimits {
        &self.limits
    }

    pub fn set_limits(&mut self, limits: StageLimits) {
        self.limits = limits;
    }

    pub fn stage(&mut self, axis: Axis) -> &mut Stage<B> {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }

    /// 绝对移动
    ///
    /// 先校验所有给定坐标，任一越界则不移动任何轴；
    /// 之后按 x, y, z 顺序逐轴阻塞移动，未给定的轴保持不动。
    pub fn move_to(&mut self, x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Result<(), StageError> {
        let targets = [(Axis::X, x), (Axis::Y, y), (Axis::Z, z)];

        for (axis, target) in targets {
            if let Some(value) = target {
                self.limits.check(axis, value)?;
            }
        }

        for (axis, target) in targets {
            if let Some(value) = target {
                self.stage(axis).move_to_meters(value, true)?;
            }
        }
        Ok(())
    }

    /// 相对移动
    ///
    /// 换算为 `move_to(当前位置 + 偏移)`，因此同样受软限位约束。
    /// 偏移为零或未给定的轴不读取、不移动。
    pub fn move_relative(
        &mut self,
        dx: Option<f64>,
        dy: Option<f64>,
        dz: Option<f64>,
    ) -> Result<(), StageError> {
        let mut targets = [None; 3];
        for (slot, (axis, delta)) in targets
            .iter_mut()
            .zip([(Axis::X, dx), (Axis::Y, dy), (Axis::Z, dz)])
        {
            match delta {
                Some(d) if !d.is_finite() => return Err(StageError::InvalidPosition { value: d }),
                Some(d) if d != 0.0 => {
                    *slot = Some(self.stage(axis).position_meters()? + d);
                },
                _ => {},
            }
        }

        if targets.iter().all(Option::is_none) {
            return Ok(());
        }
        self.move_to(targets[0], targets[1], targets[2])
    }

    /// 当前三维位置（每次调用都实时查询三个轴）
    pub fn position(&mut self) -> Result<MultiAxisPosition, StageError> {
        Ok(MultiAxisPosition {
            x: self.x.position_meters()?,
            y: self.y.position_meters()?,
            z: self.z.position_meters()?,
        })
    }

    /// 三轴依次回零
    ///
    /// ⚠️ 耗时很长，且运动范围内有障碍物时有危险，调用前必须确认行程空旷。
    pub fn reset_position(&mut self) -> Result<(), StageError> {
        warn!("Homing all stages, make sure the travel range is clear");
        for axis in Axis::ALL {
            self.stage(axis).home()?;
            info!("Axis {} homed", axis);
        }
        Ok(())
    }
}

#[cfg(feature = "ximc")]
impl TctStages<crate::ximc::XimcBackend> {
    /// 使用 libximc 打开三个轴
    pub fn open(
        ports: &AxisPorts,
        limits: StageLimits,
        options: &StageOptions,
    ) -> Result<Self, StageError> {
        Self::open_with(ports, limits, options, |_| crate::ximc::XimcBackend::new())
    }
}
