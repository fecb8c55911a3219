//! 单轴平移台
//!
//! 状态机：`Closed -> Open`（构造时）`-> Closed`（`Drop` 时，无论之前是否出错）。
//! 打开设备之前先获取端口锁；锁被占用时直接失败，不会调用厂商库的 `open`。

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::{DeviceId, DeviceInformation, StageBackend, stage_uri};
use crate::error::StageError;
use crate::lock::{PortLock, default_lock_dir};
use crate::units::{StepPosition, meters_to_steps};

/// 打开单轴时的选项
#[derive(Debug, Clone)]
pub struct StageOptions {
    /// 端口锁文件目录
    pub lock_dir: PathBuf,
    /// 阻塞移动时的停止轮询间隔
    pub wait_refresh: Duration,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            lock_dir: default_lock_dir(),
            wait_refresh: Duration::from_millis(10),
        }
    }
}

/// 一次位置读取
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReading {
    pub position: StepPosition,
    pub encoder: i64,
}

impl PositionReading {
    pub fn meters(&self) -> f64 {
        self.position.to_meters()
    }
}

/// 单轴平移台
///
/// 独占一个设备句柄和对应的端口锁，生命周期与对象一致。
pub struct Stage<B: StageBackend> {
    backend: B,
    device: DeviceId,
    port: String,
    wait_refresh: Duration,
    // 在 Drop::drop 关闭设备之后才释放
    _lock: PortLock,
}

impl<B: StageBackend> Stage<B> {
    /// 使用给定后端打开一个轴
    ///
    /// # 错误
    /// - `PortBusy`: 端口锁被其他持有者占用（此时不会调用后端 `open`）
    /// - `DeviceNotFound`: 后端无法打开设备
    pub fn open_with(mut backend: B, port: &str, options: &StageOptions) -> Result<Self, StageError> {
        let lock = PortLock::acquire(&options.lock_dir, port)?;

        let uri = stage_uri(port);
        let device = backend.open(&uri)?;
        info!("Opened stage {} on {}", device, port);

        Ok(Self {
            backend,
            device,
            port: port.to_string(),
            wait_refresh: options.wait_refresh,
            _lock: lock,
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn device_id(&self) -> DeviceId {
        self.device
    }

    /// 绝对移动到原生编码位置
    pub fn move_absolute(&mut self, target: StepPosition, blocking: bool) -> Result<(), StageError> {
        debug!("Stage {}: move to {}", self.port, target);
        self.backend.move_to(self.device, target)?;
        if blocking {
            self.backend.wait_for_stop(self.device, self.wait_refresh)?;
        }
        Ok(())
    }

    /// 相对移动
    ///
    /// 换算后为零（低于分辨率）时不发送命令，只记录警告。
    pub fn move_relative(&mut self, delta: StepPosition, blocking: bool) -> Result<(), StageError> {
        if delta.is_zero() {
            warn!(
                "Stage {}: relative move below resolution, ignoring",
                self.port
            );
            return Ok(());
        }
        debug!("Stage {}: move by {}", self.port, delta);
        self.backend.move_by(self.device, delta)?;
        if blocking {
            self.backend.wait_for_stop(self.device, self.wait_refresh)?;
        }
        Ok(())
    }

    /// 绝对移动到 `m` 米
    pub fn move_to_meters(&mut self, m: f64, blocking: bool) -> Result<(), StageError> {
        let target = meters_to_steps(m)?;
        self.move_absolute(target, blocking)
    }

    /// 相对移动 `dm` 米
    pub fn move_by_meters(&mut self, dm: f64, blocking: bool) -> Result<(), StageError> {
        let delta = meters_to_steps(dm)?;
        self.move_relative(delta, blocking)
    }

    /// 读取原生位置和编码器读数
    pub fn get_position(&mut self) -> Result<PositionReading, StageError> {
        let raw = self.backend.position(self.device)?;
        let position = StepPosition::new(raw.steps, raw.microsteps).map_err(|_| {
            StageError::InvalidResponse(format!(
                "microsteps {} reported by {} out of range",
                raw.microsteps, self.port
            ))
        })?;
        Ok(PositionReading {
            position,
            encoder: raw.encoder,
        })
    }

    /// 当前位置（米）
    pub fn position_meters(&mut self) -> Result<f64, StageError> {
        Ok(self.get_position()?.meters())
    }

    /// 回零
    ///
    /// 长时间运行的恢复操作，用于修正坐标漂移，不属于正常扫描流程。
    pub fn home(&mut self) -> Result<(), StageError> {
        info!("Stage {}: homing", self.port);
        self.backend.home(self.device)
    }

    pub fn serial_number(&mut self) -> Result<u32, StageError> {
        self.backend.serial_number(self.device)
    }

    pub fn device_info(&mut self) -> Result<DeviceInformation, StageError> {
        self.backend.device_information(self.device)
    }
}

impl<B: StageBackend> Drop for Stage<B> {
    fn drop(&mut self) {
        if let Err(e) = self.backend.close(self.device) {
            warn!("Failed to close stage on {}: {}", self.port, e);
        } else {
            debug!("Closed stage on {}", self.port);
        }
    }
}
