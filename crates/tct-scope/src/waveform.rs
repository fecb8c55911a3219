//! 波形数据解码
//!
//! `C{n}:WF?` 返回的原始块由固定长度的描述头、每字节一个采样点、以及一个结尾字节组成。
//! 采样点为 8 位有符号码值，满量程 ±128 对应 ±5.12 格（每格 25 个码值）。

use serde::{Deserialize, Serialize};

use crate::error::ScopeError;

/// 默认描述头长度（字节）
pub const DEFAULT_HEADER_LEN: usize = 360;

/// 每垂直格的码值数
pub const CODES_PER_DIVISION: f64 = 25.0;

/// 默认水平格数
pub const DEFAULT_DIVISIONS: f64 = 10.0;

/// 无符号字节 → 有符号码值的换算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleEncoding {
    /// 二进制补码：`b > 127` 时减 256
    #[default]
    TwosComplement,
    /// 旧脚本的换算：`b > 127` 时减 255（0xFF 映射为 0）
    Legacy255,
}

impl SampleEncoding {
    pub fn decode(self, byte: u8) -> i16 {
        let value = i16::from(byte);
        if byte <= 127 {
            return value;
        }
        match self {
            SampleEncoding::TwosComplement => value - 256,
            SampleEncoding::Legacy255 => value - 255,
        }
    }
}

/// 单通道垂直刻度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelScale {
    /// V/div
    pub volts_per_division: f64,
    /// 偏置（V）
    pub offset: f64,
}

impl ChannelScale {
    /// `volts = code / 25 * vdiv - offset`
    pub fn to_volts(&self, code: i16) -> f64 {
        f64::from(code) / CODES_PER_DIVISION * self.volts_per_division - self.offset
    }
}

/// 水平时基
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timebase {
    /// s/div
    pub seconds_per_division: f64,
    /// 采样率（Sa/s）
    pub sample_rate: f64,
    /// 屏幕水平格数
    pub divisions: f64,
}

impl Timebase {
    /// 第 `index` 个采样点的时间：`-tdiv * divisions / 2 + index / sample_rate`
    pub fn time_at(&self, index: usize) -> f64 {
        -self.seconds_per_division * self.divisions / 2.0 + index as f64 / self.sample_rate
    }

    /// 长度为 `len` 的时间轴
    pub fn axis(&self, len: usize) -> Vec<f64> {
        (0..len).map(|i| self.time_at(i)).collect()
    }
}

/// 单通道波形（时间与电压等长）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    pub time: Vec<f64>,
    pub voltage: Vec<f64>,
}

impl Waveform {
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    /// (t, V) 迭代器
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.voltage.iter().copied())
    }
}

/// 去掉描述头与结尾字节，返回采样点字节
pub fn sample_bytes(raw: &[u8], header_len: usize) -> Result<&[u8], ScopeError> {
    if raw.len() <= header_len {
        return Err(ScopeError::ShortWaveform {
            expected: header_len,
            actual: raw.len(),
        });
    }
    Ok(&raw[header_len..raw.len() - 1])
}

/// 原始块 → 电压序列
pub fn decode_voltages(
    raw: &[u8],
    header_len: usize,
    encoding: SampleEncoding,
    scale: ChannelScale,
) -> Result<Vec<f64>, ScopeError> {
    let samples = sample_bytes(raw, header_len)?;
    Ok(samples
        .iter()
        .map(|&b| scale.to_volts(encoding.decode(b)))
        .collect())
}

/// 从 SCPI 应答中提取数值
///
/// 兼容带命令头和单位的应答，例如 `C1:VDIV 5.00E-01V`、`SARA 1.00E+10Sa/s`、`0.5`。
pub fn parse_scpi_number(response: &str) -> Option<f64> {
    response
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            token
                .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '/')
                .parse::<f64>()
                .ok()
        })
        .filter(|value| value.is_finite())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_sample_encoding() {
        assert_eq!(SampleEncoding::TwosComplement.decode(0), 0);
        assert_eq!(SampleEncoding::TwosComplement.decode(127), 127);
        assert_eq!(SampleEncoding::TwosComplement.decode(128), -128);
        assert_eq!(SampleEncoding::TwosComplement.decode(255), -1);

        assert_eq!(SampleEncoding::Legacy255.decode(128), -127);
        assert_eq!(SampleEncoding::Legacy255.decode(255), 0);
        assert_eq!(SampleEncoding::Legacy255.decode(100), 100);
    }

    #[test]
    fn test_channel_scale() {
        let scale = ChannelScale {
            volts_per_division: 0.5,
            offset: 0.1,
        };
        assert_relative_eq!(scale.to_volts(25), 0.4);
        assert_relative_eq!(scale.to_volts(-50), -1.1);
        assert_relative_eq!(scale.to_volts(0), -0.1);
    }

    #[test]
    fn test_timebase_axis() {
        let timebase = Timebase {
            seconds_per_division: 1e-9,
            sample_rate: 1e10,
            divisions: DEFAULT_DIVISIONS,
        };
        let axis = timebase.axis(3);
        assert_abs_diff_eq!(axis[0], -5e-9, epsilon = 1e-18);
        assert_abs_diff_eq!(axis[1], -4.9e-9, epsilon = 1e-18);
        assert_abs_diff_eq!(axis[2], -4.8e-9, epsilon = 1e-18);
    }

    #[test]
    fn test_sample_bytes_strips_header_and_trailer() {
        let mut raw = vec![0xAAu8; 4];
        raw.extend_from_slice(&[1, 2, 3]);
        raw.push(b'\n');
        assert_eq!(sample_bytes(&raw, 4).unwrap(), &[1, 2, 3]);

        assert!(matches!(
            sample_bytes(&raw[..4], 4),
            Err(ScopeError::ShortWaveform { expected: 4, actual: 4 })
        ));
        // 只有头和结尾字节：零个采样点
        assert!(sample_bytes(&raw[..5], 4).unwrap().is_empty());
    }

    #[test]
    fn test_decode_voltages() {
        let raw = [9, 9, 25, 0xE7, 0];
        let scale = ChannelScale {
            volts_per_division: 1.0,
            offset: 0.0,
        };
        let volts = decode_voltages(&raw, 2, SampleEncoding::TwosComplement, scale).unwrap();
        assert_eq!(volts.len(), 2);
        assert_relative_eq!(volts[0], 1.0);
        assert_relative_eq!(volts[1], -1.0);
    }

    #[test]
    fn test_parse_scpi_number() {
        assert_eq!(parse_scpi_number("C1:VDIV 5.00E-01V"), Some(0.5));
        assert_eq!(parse_scpi_number("C2:OFST -1.2E-02V"), Some(-0.012));
        assert_eq!(parse_scpi_number("TDIV 5.00E-09S"), Some(5e-9));
        assert_eq!(parse_scpi_number("SARA 1.00E+10Sa/s"), Some(1e10));
        assert_eq!(parse_scpi_number("0.25\n"), Some(0.25));
        assert_eq!(parse_scpi_number("TRMD AUTO"), None);
        assert_eq!(parse_scpi_number(""), None);
    }
}
