//! 示波器客户端（LeCroy WaveRunner 系列命令集）

use std::time::Duration;

use tracing::{debug, info};

use crate::error::ScopeError;
use crate::tcp::TcpInstrument;
use crate::transport::InstrumentTransport;
use crate::trigger::TriggerMode;
use crate::vicp::VicpInstrument;
use crate::waveform::{
    self, ChannelScale, DEFAULT_DIVISIONS, DEFAULT_HEADER_LEN, SampleEncoding, Timebase, Waveform,
};

#[cfg(feature = "visa")]
use crate::visa::VisaInstrument;

/// 通道数
pub const CHANNEL_COUNT: u8 = 4;

/// 客户端参数
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeOptions {
    /// 波形块描述头长度
    pub header_len: usize,
    /// 字节 → 码值换算
    pub encoding: SampleEncoding,
    /// 屏幕水平格数
    pub divisions: f64,
    /// 切换到 AUTO 后、进入 SINGLE 前的等待时间
    pub settle_delay: Duration,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            header_len: DEFAULT_HEADER_LEN,
            encoding: SampleEncoding::default(),
            divisions: DEFAULT_DIVISIONS,
            settle_delay: Duration::from_millis(100),
        }
    }
}

/// 示波器客户端
pub struct Oscilloscope<T: InstrumentTransport> {
    transport: T,
    options: ScopeOptions,
}

impl Oscilloscope<VicpInstrument> {
    /// 通过 LeCroy VICP 连接（`host`，或 `host:port`）
    pub fn connect_vicp(
        address: &str,
        timeout: Duration,
        options: ScopeOptions,
    ) -> Result<Self, ScopeError> {
        Ok(Self::new(VicpInstrument::connect(address, timeout)?, options))
    }
}

impl Oscilloscope<TcpInstrument> {
    /// 通过原始 SCPI 套接字连接（`host:port`，不适用于 VICP 端口 1861）
    pub fn connect_tcp(
        address: &str,
        timeout: Duration,
        options: ScopeOptions,
    ) -> Result<Self, ScopeError> {
        Ok(Self::new(TcpInstrument::connect(address, timeout)?, options))
    }
}

#[cfg(feature = "visa")]
impl Oscilloscope<VisaInstrument> {
    /// 通过 VISA 资源字符串连接
    pub fn open_visa(
        resource: &str,
        timeout: Duration,
        options: ScopeOptions,
    ) -> Result<Self, ScopeError> {
        Ok(Self::new(VisaInstrument::open(resource, timeout)?, options))
    }
}

impl<T: InstrumentTransport> Oscilloscope<T> {
    pub fn new(transport: T, options: ScopeOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &ScopeOptions {
        &self.options
    }

    /// 取回传输层
    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        self.transport.write(command)
    }

    pub fn read(&mut self) -> Result<String, ScopeError> {
        self.transport.read()
    }

    pub fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        self.transport.query(command)
    }

    /// `*IDN?`
    pub fn idn(&mut self) -> Result<String, ScopeError> {
        self.query("*IDN?")
    }

    fn query_number(&mut self, command: &str) -> Result<f64, ScopeError> {
        let response = self.query(command)?;
        waveform::parse_scpi_number(&response).ok_or_else(|| ScopeError::InvalidResponse {
            command: command.to_string(),
            response,
        })
    }

    /// 查询通道垂直刻度（`C{n}:VDIV?`, `C{n}:OFST?`）
    pub fn channel_scale(&mut self, channel: u8) -> Result<ChannelScale, ScopeError> {
        validate_channel(channel)?;
        Ok(ChannelScale {
            volts_per_division: self.query_number(&format!("C{channel}:VDIV?"))?,
            offset: self.query_number(&format!("C{channel}:OFST?"))?,
        })
    }

    /// 查询时基（`TDIV?`, `SARA?`）
    pub fn timebase(&mut self) -> Result<Timebase, ScopeError> {
        let seconds_per_division = self.query_number("TDIV?")?;
        let sample_rate = self.query_number("SARA?")?;
        if sample_rate <= 0.0 {
            return Err(ScopeError::InvalidResponse {
                command: "SARA?".into(),
                response: sample_rate.to_string(),
            });
        }
        Ok(Timebase {
            seconds_per_division,
            sample_rate,
            divisions: self.options.divisions,
        })
    }

    /// 读取单通道波形
    pub fn get_waveform(&mut self, channel: u8) -> Result<Waveform, ScopeError> {
        validate_channel(channel)?;

        self.write(&format!("C{channel}:WF?"))?;
        let raw = self.transport.read_raw()?;

        let scale = self.channel_scale(channel)?;
        let voltage =
            waveform::decode_voltages(&raw, self.options.header_len, self.options.encoding, scale)?;
        let time = self.timebase()?.axis(voltage.len());

        debug!(
            "C{}: {} samples ({} raw bytes), {:?}",
            channel,
            voltage.len(),
            raw.len(),
            scale
        );
        Ok(Waveform { time, voltage })
    }

    /// 当前触发模式（`TRIG_MODE?`）
    pub fn trigger_mode(&mut self) -> Result<TriggerMode, ScopeError> {
        let response = self.query("TRIG_MODE?")?;
        TriggerMode::parse_response(&response)
    }

    /// 设置触发模式（`TRIG_MODE <mode>`）
    pub fn set_trigger_mode(&mut self, mode: TriggerMode) -> Result<(), ScopeError> {
        self.write(&mode.command())
    }

    /// 同一次触发采集四个通道
    ///
    /// 记住当前触发模式，切到 AUTO 等待稳定，再切到 SINGLE 读取全部通道，最后恢复原模式。
    /// 读取失败时同样尝试恢复。
    pub fn acquire_all_channels(&mut self) -> Result<[Waveform; 4], ScopeError> {
        let original = self.trigger_mode()?;

        let result = self.acquire_single();
        let restored = self.set_trigger_mode(original);

        let waveforms = result?;
        restored?;
        info!("Acquired 4 channels, trigger mode restored to {}", original);
        Ok(waveforms)
    }

    fn acquire_single(&mut self) -> Result<[Waveform; 4], ScopeError> {
        self.set_trigger_mode(TriggerMode::Auto)?;
        spin_sleep::sleep(self.options.settle_delay);
        self.set_trigger_mode(TriggerMode::Single)?;
        Ok([
            self.get_waveform(1)?,
            self.get_waveform(2)?,
            self.get_waveform(3)?,
            self.get_waveform(4)?,
        ])
    }
}

/// 校验通道号 1..=4
pub fn validate_channel(channel: u8) -> Result<(), ScopeError> {
    if (1..=CHANNEL_COUNT).contains(&channel) {
        Ok(())
    } else {
        Err(ScopeError::InvalidChannel(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_channel() {
        assert!(validate_channel(0).is_err());
        assert!(validate_channel(1).is_ok());
        assert!(validate_channel(4).is_ok());
        assert!(matches!(validate_channel(5), Err(ScopeError::InvalidChannel(5))));
    }

    #[test]
    fn test_default_options() {
        let options = ScopeOptions::default();
        assert_eq!(options.header_len, 360);
        assert_eq!(options.encoding, SampleEncoding::TwosComplement);
        assert_eq!(options.divisions, 10.0);
    }
}
