//! Mock 激光器传输（无硬件测试）
//!
//! 模拟固件最小行为：`[91]` 出光，`[90]` 关断；状态报告第 6 字节反映开关状态。
//! 克隆体共享同一份状态，测试可以在控制器持有传输的同时检查已发送的命令。

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::LaserError;
use crate::protocol::{LaserCommand, REPORT_LEN, STATUS_BYTE};
use crate::transport::LaserTransport;

#[derive(Debug, Default)]
struct MockLaserState {
    on: bool,
    packets: Vec<Vec<u8>>,
    reports_read: usize,
    /// 每次写入后首次读取返回的垃圾状态字节
    stale_status: Option<u8>,
    stale_pending: bool,
    /// 每次写入最多接受的字节数
    accept_limit: Option<usize>,
    fail_writes: bool,
}

/// Mock 激光器传输
#[derive(Debug, Clone, Default)]
pub struct MockLaserTransport {
    state: Arc<Mutex<MockLaserState>>,
}

impl MockLaserTransport {
    /// 初始为关闭状态
    pub fn new() -> Self {
        Self::default()
    }

    /// 初始为开启状态
    pub fn new_on() -> Self {
        let mock = Self::default();
        mock.lock().on = true;
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockLaserState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 每条命令后的第一次读取返回 `byte`（模拟固件首读不可靠）
    pub fn with_stale_first_read(self, byte: u8) -> Self {
        self.lock().stale_status = Some(byte);
        self
    }

    /// 限制每次写入接受的字节数（模拟短写）
    pub fn with_accept_limit(self, limit: usize) -> Self {
        self.lock().accept_limit = Some(limit);
        self
    }

    /// 让后续写入返回传输错误
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// 模拟前面板手动开关
    pub fn set_on(&self, on: bool) {
        self.lock().on = on;
    }

    pub fn is_on(&self) -> bool {
        self.lock().on
    }

    /// 已发送的全部命令
    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.lock().packets.clone()
    }

    pub fn clear_packets(&self) {
        self.lock().packets.clear();
    }

    /// 已读取的报告数
    pub fn reports_read(&self) -> usize {
        self.lock().reports_read
    }
}

impl LaserTransport for MockLaserTransport {
    fn write_command(&mut self, packet: &[u8]) -> Result<usize, LaserError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(LaserError::Transport("mock write failure".into()));
        }
        state.packets.push(packet.to_vec());
        state.stale_pending = state.stale_status.is_some();

        match packet.first().copied().map(LaserCommand::try_from) {
            Some(Ok(LaserCommand::HardwareSequenceEnable)) => state.on = true,
            Some(Ok(LaserCommand::Disable)) => state.on = false,
            _ => {},
        }

        Ok(state.accept_limit.map_or(packet.len(), |limit| packet.len().min(limit)))
    }

    fn read_report(&mut self, report: &mut [u8; REPORT_LEN]) -> Result<usize, LaserError> {
        let mut state = self.lock();
        state.reports_read += 1;
        report.fill(0);
        report[STATUS_BYTE] = match (state.stale_pending, state.stale_status) {
            (true, Some(byte)) => {
                state.stale_pending = false;
                byte
            },
            _ => u8::from(state.on),
        };
        Ok(REPORT_LEN)
    }
}
