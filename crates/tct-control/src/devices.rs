//! # 扫描用到的设备接口
//!
//! 扫描流程只需要三种能力：移动到某点、采集四通道波形、开关激光脉冲。
//! 三个 trait 分别由 [`TctStages`]、[`Oscilloscope`] 和 [`LaserController`] 实现，
//! 测试可以换成任意 Mock。

use tct_laser::{LaserController, LaserTransport};
use tct_scope::{InstrumentTransport, Oscilloscope, Waveform};
use tct_stage::{MultiAxisPosition, StageBackend, TctStages};

use crate::error::ControlError;

/// 三维定位
pub trait Positioner {
    /// 移动到目标点，`None` 的轴保持不动
    fn move_to(&mut self, x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Result<(), ControlError>;

    /// 当前位置（米）
    fn position(&mut self) -> Result<MultiAxisPosition, ControlError>;
}

/// 四通道波形采集（一次触发）
pub trait WaveformSource {
    fn acquire(&mut self) -> Result<[Waveform; 4], ControlError>;
}

/// 脉冲光源
pub trait PulseSource {
    fn pulses_on(&mut self) -> Result<(), ControlError>;
    fn pulses_off(&mut self) -> Result<(), ControlError>;
}

impl<B: StageBackend> Positioner for TctStages<B> {
    fn move_to(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    ) -> Result<(), ControlError> {
        Ok(TctStages::move_to(self, x, y, z)?)
    }

    fn position(&mut self) -> Result<MultiAxisPosition, ControlError> {
        Ok(TctStages::position(self)?)
    }
}

impl<T: InstrumentTransport> WaveformSource for Oscilloscope<T> {
    fn acquire(&mut self) -> Result<[Waveform; 4], ControlError> {
        Ok(self.acquire_all_channels()?)
    }
}

impl<T: LaserTransport> PulseSource for LaserController<T> {
    fn pulses_on(&mut self) -> Result<(), ControlError> {
        Ok(self.on()?)
    }

    fn pulses_off(&mut self) -> Result<(), ControlError> {
        Ok(self.off()?)
    }
}

impl<P: Positioner + ?Sized> Positioner for &mut P {
    fn move_to(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    ) -> Result<(), ControlError> {
        (**self).move_to(x, y, z)
    }

    fn position(&mut self) -> Result<MultiAxisPosition, ControlError> {
        (**self).position()
    }
}

impl<W: WaveformSource + ?Sized> WaveformSource for &mut W {
    fn acquire(&mut self) -> Result<[Waveform; 4], ControlError> {
        (**self).acquire()
    }
}

impl<L: PulseSource + ?Sized> PulseSource for &mut L {
    fn pulses_on(&mut self) -> Result<(), ControlError> {
        (**self).pulses_on()
    }

    fn pulses_off(&mut self) -> Result<(), ControlError> {
        (**self).pulses_off()
    }
}

impl<L: PulseSource + ?Sized> PulseSource for Box<L> {
    fn pulses_on(&mut self) -> Result<(), ControlError> {
        (**self).pulses_on()
    }

    fn pulses_off(&mut self) -> Result<(), ControlError> {
        (**self).pulses_off()
    }
}
