//! Mock 示波器（无硬件测试）
//!
//! 按 LeCroy 命令集应答：查询命令入队一条应答，`read` / `read_raw` 依次取出。
//! 克隆体共享状态。

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ScopeError;
use crate::transport::InstrumentTransport;
use crate::trigger::TriggerMode;
use crate::waveform::DEFAULT_HEADER_LEN;

#[derive(Debug)]
enum Response {
    Text(String),
    Raw(Vec<u8>),
}

#[derive(Debug)]
struct MockScopeState {
    idn: String,
    trigger_mode: TriggerMode,
    mode_history: Vec<TriggerMode>,
    vdiv: [f64; 4],
    offset: [f64; 4],
    tdiv: f64,
    sample_rate: f64,
    raw: [Vec<u8>; 4],
    failing_channel: Option<u8>,
    written: Vec<String>,
    pending: VecDeque<Response>,
}

impl Default for MockScopeState {
    fn default() -> Self {
        let flat = waveform_block(&[0; 8]);
        Self {
            idn: "LECROY,WR640ZI,MOCK0001,8.1.0".to_string(),
            trigger_mode: TriggerMode::Norm,
            mode_history: Vec::new(),
            vdiv: [0.1; 4],
            offset: [0.0; 4],
            tdiv: 1e-9,
            sample_rate: 1e10,
            raw: [flat.clone(), flat.clone(), flat.clone(), flat],
            failing_channel: None,
            written: Vec::new(),
            pending: VecDeque::new(),
        }
    }
}

/// 用默认头长度包装采样字节：360 字节描述头 + 采样点 + `\n`
pub fn waveform_block(samples: &[u8]) -> Vec<u8> {
    let mut raw = vec![0xA5; DEFAULT_HEADER_LEN];
    raw.extend_from_slice(samples);
    raw.push(b'\n');
    raw
}

/// Mock 示波器
#[derive(Debug, Clone, Default)]
pub struct MockInstrument {
    state: Arc<Mutex<MockScopeState>>,
}

impl MockInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockScopeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn index(channel: u8) -> usize {
        usize::from(channel.clamp(1, 4) - 1)
    }

    /// 设置通道采样字节（自动加头尾）
    pub fn set_samples(&self, channel: u8, samples: &[u8]) {
        self.lock().raw[Self::index(channel)] = waveform_block(samples);
    }

    /// 设置通道原始应答块
    pub fn set_raw(&self, channel: u8, raw: Vec<u8>) {
        self.lock().raw[Self::index(channel)] = raw;
    }

    pub fn set_scale(&self, channel: u8, vdiv: f64, offset: f64) {
        let mut state = self.lock();
        state.vdiv[Self::index(channel)] = vdiv;
        state.offset[Self::index(channel)] = offset;
    }

    pub fn set_timebase(&self, tdiv: f64, sample_rate: f64) {
        let mut state = self.lock();
        state.tdiv = tdiv;
        state.sample_rate = sample_rate;
    }

    pub fn set_trigger_mode(&self, mode: TriggerMode) {
        self.lock().trigger_mode = mode;
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.lock().trigger_mode
    }

    /// 通过 `TRIG_MODE <mode>` 设置过的模式序列
    pub fn mode_history(&self) -> Vec<TriggerMode> {
        self.lock().mode_history.clone()
    }

    /// 读取该通道波形时返回 IO 错误
    pub fn fail_channel(&self, channel: Option<u8>) {
        self.lock().failing_channel = channel;
    }

    /// 已写入的全部命令
    pub fn written(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    pub fn clear_written(&self) {
        self.lock().written.clear();
    }
}

fn channel_query(command: &str, suffix: &str) -> Option<usize> {
    let rest = command.strip_prefix('C')?.strip_suffix(suffix)?;
    let channel: u8 = rest.parse().ok()?;
    (1..=4).contains(&channel).then(|| usize::from(channel - 1))
}

impl InstrumentTransport for MockInstrument {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        let mut state = self.lock();
        state.written.push(command.to_string());
        let upper = command.trim().to_ascii_uppercase();

        let response = if upper == "*IDN?" {
            Some(Response::Text(state.idn.clone()))
        } else if upper == "TRIG_MODE?" {
            Some(Response::Text(format!("TRMD {}", state.trigger_mode)))
        } else if let Some(mode) = upper.strip_prefix("TRIG_MODE ") {
            let mode: TriggerMode = mode.parse()?;
            state.trigger_mode = mode;
            state.mode_history.push(mode);
            None
        } else if upper == "TDIV?" {
            Some(Response::Text(format!("TDIV {:E}S", state.tdiv)))
        } else if upper == "SARA?" {
            Some(Response::Text(format!("SARA {:E}Sa/s", state.sample_rate)))
        } else if let Some(i) = channel_query(&upper, ":VDIV?") {
            Some(Response::Text(format!("C{}:VDIV {:E}V", i + 1, state.vdiv[i])))
        } else if let Some(i) = channel_query(&upper, ":OFST?") {
            Some(Response::Text(format!("C{}:OFST {:E}V", i + 1, state.offset[i])))
        } else if let Some(i) = channel_query(&upper, ":WF?") {
            if state.failing_channel == Some(i as u8 + 1) {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "mock waveform timeout").into());
            }
            Some(Response::Raw(state.raw[i].clone()))
        } else {
            None
        };

        if let Some(response) = response {
            state.pending.push_back(response);
        }
        Ok(())
    }

    fn read(&mut self) -> Result<String, ScopeError> {
        match self.lock().pending.pop_front() {
            Some(Response::Text(text)) => Ok(text),
            Some(Response::Raw(raw)) => Ok(String::from_utf8_lossy(&raw).into_owned()),
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "no pending response").into()),
        }
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, ScopeError> {
        match self.lock().pending.pop_front() {
            Some(Response::Raw(raw)) => Ok(raw),
            Some(Response::Text(text)) => Ok(text.into_bytes()),
            None => Err(io::Error::new(io::ErrorKind::TimedOut, "no pending response").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_queries() {
        let mut mock = MockInstrument::new();
        assert!(mock.query("*IDN?").unwrap().starts_with("LECROY"));
        assert_eq!(mock.query("TRIG_MODE?").unwrap(), "TRMD NORM");
        assert_eq!(mock.query("C2:VDIV?").unwrap(), "C2:VDIV 1E-1V");

        mock.write("TRIG_MODE AUTO").unwrap();
        assert_eq!(mock.trigger_mode(), TriggerMode::Auto);
        assert_eq!(mock.mode_history(), vec![TriggerMode::Auto]);
    }

    #[test]
    fn test_mock_read_without_query_times_out() {
        let mut mock = MockInstrument::new();
        assert!(mock.read().unwrap_err().is_timeout());
    }

    #[test]
    fn test_waveform_block_layout() {
        let raw = waveform_block(&[1, 2]);
        assert_eq!(raw.len(), DEFAULT_HEADER_LEN + 3);
        assert_eq!(&raw[DEFAULT_HEADER_LEN..], &[1, 2, b'\n']);
    }
}
