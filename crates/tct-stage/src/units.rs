//! 位置单位换算
//!
//! 控制器使用两段式整数编码位置：粗步数 `steps` 与细分微步 `microsteps`。
//!
//! - 1 step = 2.5 µm
//! - 1 step = 256 microsteps
//! - 分辨率（量子）= 2.5 µm / 256 ≈ 9.8 nm
//!
//! 不变量：`microsteps` 永远在 `[0, 256)` 内，负位置通过负的 `steps` 表示，
//! 例如 -1 µm = (-1 step, 154 microsteps)。

use std::fmt;

use crate::error::StageError;

/// 单步长度（米）
pub const STEP_LENGTH_M: f64 = 2.5e-6;

/// 每步微步数
pub const MICROSTEPS_PER_STEP: u32 = 256;

/// 位置分辨率（米），即一个微步的长度
pub const RESOLUTION_M: f64 = STEP_LENGTH_M / MICROSTEPS_PER_STEP as f64;

/// 控制器原生位置编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct StepPosition {
    pub steps: i32,
    pub microsteps: u8,
}

impl StepPosition {
    pub const ZERO: Self = StepPosition {
        steps: 0,
        microsteps: 0,
    };

    /// 从任意整数构造，校验微步范围
    pub fn new(steps: i32, microsteps: i32) -> Result<Self, StageError> {
        let microsteps =
            u8::try_from(microsteps).map_err(|_| StageError::InvalidMicrosteps(microsteps))?;
        Ok(StepPosition { steps, microsteps })
    }

    /// 从米换算
    #[inline]
    pub fn from_meters(m: f64) -> Result<Self, StageError> {
        meters_to_steps(m)
    }

    /// 换算为米
    #[inline]
    pub fn to_meters(self) -> f64 {
        steps_to_meters(self.steps, self.microsteps)
    }

    /// 以微步为单位的总量
    #[inline]
    pub fn total_microsteps(self) -> i64 {
        i64::from(self.steps) * i64::from(MICROSTEPS_PER_STEP) + i64::from(self.microsteps)
    }

    /// 由微步总量还原；超出 `i32` 步数范围时返回 `None`
    pub fn from_total_microsteps(total: i64) -> Option<Self> {
        let per_step = i64::from(MICROSTEPS_PER_STEP);
        let steps = i32::try_from(total.div_euclid(per_step)).ok()?;
        Some(StepPosition {
            steps,
            microsteps: total.rem_euclid(per_step) as u8,
        })
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl fmt::Display for StepPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} steps + {}/256", self.steps, self.microsteps)
    }
}

/// 米 → (steps, microsteps)
///
/// `steps = floor(m·1e6/2.5)`，`microsteps = round(余数 · 256)`。
/// 四舍五入得到 256 时进位为 `(steps + 1, 0)`，保证 `microsteps < 256`。
///
/// # 错误
/// - 非有限数（NaN / ±∞）
/// - 步数超出 `i32` 范围
pub fn meters_to_steps(m: f64) -> Result<StepPosition, StageError> {
    if !m.is_finite() {
        return Err(StageError::InvalidPosition { value: m });
    }

    let total = m * 1e6 / 2.5;
    let floor = total.floor();
    // 留一个步数的余量给进位
    if floor < f64::from(i32::MIN) || floor >= f64::from(i32::MAX) {
        return Err(StageError::InvalidPosition { value: m });
    }

    let mut steps = floor as i32;
    let mut microsteps = ((total - floor) * f64::from(MICROSTEPS_PER_STEP)).round() as u32;
    if microsteps >= MICROSTEPS_PER_STEP {
        steps += 1;
        microsteps = 0;
    }

    Ok(StepPosition {
        steps,
        microsteps: microsteps as u8,
    })
}

/// (steps, microsteps) → 米
#[inline]
pub fn steps_to_meters(steps: i32, microsteps: u8) -> f64 {
    f64::from(steps) * STEP_LENGTH_M + f64::from(microsteps) * RESOLUTION_M
}
