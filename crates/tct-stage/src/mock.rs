//! Mock 平移台后端
//!
//! 在内存中模拟一个单轴控制器，记录所有调用，供测试检查命令序列。
//! 克隆出的句柄共享同一份状态，测试代码持有一个克隆即可观察被 `Stage` 拥有的后端。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::backend::{DeviceId, DeviceInformation, RawPosition, StageBackend};
use crate::error::StageError;
use crate::units::StepPosition;

/// 记录下来的后端调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Open(String),
    Close,
    MoveTo(StepPosition),
    MoveBy(StepPosition),
    WaitForStop,
    Position,
    SerialNumber,
    DeviceInformation,
    Home,
}

impl MockCall {
    /// 是否会让电机运动
    pub fn is_motion(&self) -> bool {
        matches!(self, MockCall::MoveTo(_) | MockCall::MoveBy(_) | MockCall::Home)
    }
}

#[derive(Debug)]
struct MockAxisState {
    /// 当前位置（微步总量）
    position: i64,
    open: bool,
    present: bool,
    serial_number: u32,
    calls: Vec<MockCall>,
}

/// 内存中的单轴控制器
#[derive(Debug, Clone)]
pub struct MockStageBackend {
    state: Arc<Mutex<MockAxisState>>,
}

impl Default for MockStageBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStageBackend {
    pub fn new() -> Self {
        Self::with_serial(0x3A57)
    }

    pub fn with_serial(serial_number: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockAxisState {
                position: 0,
                open: false,
                present: true,
                serial_number,
                calls: Vec::new(),
            })),
        }
    }

    /// 模拟未连接的设备（`open` 失败）
    pub fn unplugged() -> Self {
        let backend = Self::new();
        backend.lock().present = false;
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MockAxisState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// 运动类命令数量
    pub fn motion_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| c.is_motion()).count()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn current_position(&self) -> StepPosition {
        StepPosition::from_total_microsteps(self.lock().position).unwrap_or_default()
    }

    pub fn set_position(&self, position: StepPosition) {
        self.lock().position = position.total_microsteps();
    }

    fn record(&self, call: MockCall) -> MutexGuard<'_, MockAxisState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }

    fn check_open(state: &MockAxisState) -> Result<(), StageError> {
        if state.open {
            Ok(())
        } else {
            Err(StageError::Backend {
                call: "mock",
                code: -4,
            })
        }
    }
}

impl StageBackend for MockStageBackend {
    fn open(&mut self, uri: &str) -> Result<DeviceId, StageError> {
        let mut state = self.record(MockCall::Open(uri.to_string()));
        if !state.present {
            return Err(StageError::DeviceNotFound {
                uri: uri.to_string(),
            });
        }
        state.open = true;
        Ok(DeviceId(1))
    }

    fn close(&mut self, _device: DeviceId) -> Result<(), StageError> {
        let mut state = self.record(MockCall::Close);
        state.open = false;
        Ok(())
    }

    fn move_to(&mut self, _device: DeviceId, target: StepPosition) -> Result<(), StageError> {
        let mut state = self.record(MockCall::MoveTo(target));
        Self::check_open(&state)?;
        state.position = target.total_microsteps();
        Ok(())
    }

    fn move_by(&mut self, _device: DeviceId, delta: StepPosition) -> Result<(), StageError> {
        let mut state = self.record(MockCall::MoveBy(delta));
        Self::check_open(&state)?;
        state.position += delta.total_microsteps();
        Ok(())
    }

    fn wait_for_stop(&mut self, _device: DeviceId, _refresh: Duration) -> Result<(), StageError> {
        let state = self.record(MockCall::WaitForStop);
        Self::check_open(&state)
    }

    fn position(&mut self, _device: DeviceId) -> Result<RawPosition, StageError> {
        let state = self.record(MockCall::Position);
        Self::check_open(&state)?;
        let pos = StepPosition::from_total_microsteps(state.position).ok_or_else(|| {
            StageError::InvalidResponse(format!("position {} out of range", state.position))
        })?;
        Ok(RawPosition {
            steps: pos.steps,
            microsteps: i32::from(pos.microsteps),
            encoder: state.position,
        })
    }

    fn serial_number(&mut self, _device: DeviceId) -> Result<u32, StageError> {
        let state = self.record(MockCall::SerialNumber);
        Self::check_open(&state)?;
        Ok(state.serial_number)
    }

    fn device_information(&mut self, _device: DeviceId) -> Result<DeviceInformation, StageError> {
        let state = self.record(MockCall::DeviceInformation);
        Self::check_open(&state)?;
        Ok(DeviceInformation {
            manufacturer: "XIMC".to_string(),
            manufacturer_id: "SM".to_string(),
            product_description: "MockAxis".to_string(),
            major: 1,
            minor: 0,
            release: 0,
        })
    }

    fn home(&mut self, _device: DeviceId) -> Result<(), StageError> {
        let mut state = self.record(MockCall::Home);
        Self::check_open(&state)?;
        state.position = 0;
        Ok(())
    }
}
