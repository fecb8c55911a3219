//! 激光器 HID 命令协议
//!
//! 所有命令都是通过 HID SET_REPORT 控制传输发送的短字节数组：
//!
//! | 命令 | 字节 | 说明 |
//! |------|------|------|
//! | Disable | `[90]` | 清除使能位 |
//! | OffSelect | `[4]` | 关断选择 |
//! | HardwareSequenceEnable | `[91]` | 硬件时序使能（出光） |
//! | EnableIntensity | `[92]` | 使能 DAC 子系统 |
//! | DisableIntensity | `[93]` | 关闭 DAC 子系统 |
//! | SetIntensity | `[94, lo, hi]` | 设置 DAC |
//! | SetFrequency | `[99, lo, hi]` | 设置频率字 |
//!
//! 状态通过 64 字节输入报告读取，第 6 字节为开关状态。

use std::fmt;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::LaserError;

/// USB Vendor ID（Keil Software, "LASER Driver IJS"）
pub const VENDOR_ID: u16 = 0xC251;

/// USB Product ID
pub const PRODUCT_ID: u16 = 0x2201;

/// `bmRequestType`: Host-to-device | Class | Interface
pub const REQUEST_TYPE_OUT: u8 = 0x21;

/// `bRequest`: HID SET_REPORT
pub const REQUEST_SET_REPORT: u8 = 9;

/// `wValue`: Output report, ID 0
pub const REPORT_VALUE: u16 = 0x200;

/// `wIndex`
pub const REPORT_INDEX: u16 = 0;

/// 输入报告长度（同时也是 wMaxPacketSize）
pub const REPORT_LEN: usize = 64;

/// 状态字节在输入报告中的偏移
pub const STATUS_BYTE: usize = 6;

/// 频率范围（Hz）
pub const MIN_FREQUENCY_HZ: f64 = 50.0;
pub const MAX_FREQUENCY_HZ: f64 = 100e3;

/// DAC 上界（不含）
pub const DAC_LIMIT: u16 = 1024;

/// 命令操作码
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum LaserCommand {
    OffSelect = 4,
    Disable = 90,
    HardwareSequenceEnable = 91,
    EnableIntensity = 92,
    DisableIntensity = 93,
    SetIntensity = 94,
    SetFrequency = 99,
}

impl LaserCommand {
    /// 单字节命令包
    pub fn packet(self) -> Vec<u8> {
        vec![u8::from(self)]
    }

    /// 带 16 位小端参数的命令包
    pub fn packet_with(self, value: u16) -> Vec<u8> {
        let [lo, hi] = value.to_le_bytes();
        vec![u8::from(self), lo, hi]
    }
}

/// 激光器开关状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaserStatus {
    Off,
    On,
}

impl LaserStatus {
    pub fn is_on(self) -> bool {
        self == LaserStatus::On
    }
}

impl fmt::Display for LaserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaserStatus::Off => f.write_str("off"),
            LaserStatus::On => f.write_str("on"),
        }
    }
}

impl FromStr for LaserStatus {
    type Err = LaserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" | "ON" => Ok(LaserStatus::On),
            "off" | "OFF" => Ok(LaserStatus::Off),
            other => Err(LaserError::InvalidStatusName(other.to_string())),
        }
    }
}

/// 校验频率范围
pub fn validate_frequency(hz: f64) -> Result<(), LaserError> {
    if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&hz) {
        return Err(LaserError::InvalidFrequency(hz));
    }
    Ok(())
}

/// 校验 DAC 范围
pub fn validate_intensity(code: i64) -> Result<u16, LaserError> {
    u16::try_from(code)
        .ok()
        .filter(|&c| c < DAC_LIMIT)
        .ok_or(LaserError::InvalidIntensity(code))
}

/// 频率 → 16 位频率字
///
/// `word = round((5e8 / hz - 440) / 180)`
pub fn frequency_word(hz: f64) -> Result<u16, LaserError> {
    validate_frequency(hz)?;
    let word = ((5e8 / hz - 440.0) / 180.0).round();
    if !(0.0..=f64::from(u16::MAX)).contains(&word) {
        return Err(LaserError::FrequencyWordOutOfRange { hz, word });
    }
    Ok(word as u16)
}

/// 频率字 → 实际频率（Hz）
pub fn word_frequency(word: u16) -> f64 {
    5e8 / (f64::from(word) * 180.0 + 440.0)
}

/// 设置频率命令
pub fn frequency_packet(hz: f64) -> Result<Vec<u8>, LaserError> {
    Ok(LaserCommand::SetFrequency.packet_with(frequency_word(hz)?))
}

/// 关机序列：`[90]`, `[4]`
pub fn turn_off_sequence() -> Vec<Vec<u8>> {
    vec![
        LaserCommand::Disable.packet(),
        LaserCommand::OffSelect.packet(),
    ]
}

/// 设置 DAC 的固定时序
///
/// 关机 → 使能 DAC → 写 DAC → 硬件时序使能。固件会忽略乱序写入，顺序不可调整。
pub fn intensity_sequence(code: u16) -> Vec<Vec<u8>> {
    let mut sequence = turn_off_sequence();
    sequence.push(LaserCommand::EnableIntensity.packet());
    sequence.push(LaserCommand::SetIntensity.packet_with(code));
    sequence.push(LaserCommand::HardwareSequenceEnable.packet());
    sequence
}

/// 完整开机序列：频率 + DAC 时序 + 硬件使能
pub fn turn_on_sequence(hz: f64, code: u16) -> Result<Vec<Vec<u8>>, LaserError> {
    let mut sequence = vec![frequency_packet(hz)?];
    sequence.extend(intensity_sequence(code));
    sequence.push(LaserCommand::HardwareSequenceEnable.packet());
    Ok(sequence)
}

/// 解析 64 字节输入报告
pub fn parse_status(report: &[u8]) -> Result<LaserStatus, LaserError> {
    let byte = *report
        .get(STATUS_BYTE)
        .ok_or(LaserError::InvalidResponse {
            expected: STATUS_BYTE + 1,
            actual: report.len(),
        })?;
    match byte {
        0 => Ok(LaserStatus::Off),
        1 => Ok(LaserStatus::On),
        other => Err(LaserError::InvalidStatus(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_opcodes() {
        assert_eq!(u8::from(LaserCommand::Disable), 90);
        assert_eq!(u8::from(LaserCommand::OffSelect), 4);
        assert_eq!(u8::from(LaserCommand::SetFrequency), 0x63);
        assert_eq!(LaserCommand::try_from(94u8).unwrap(), LaserCommand::SetIntensity);
        assert!(LaserCommand::try_from(5u8).is_err());
    }

    #[test]
    fn test_frequency_word() {
        // (5e8/1e3 - 440)/180 = 2775.33 → 2775
        assert_eq!(frequency_word(1e3).unwrap(), 2775);
        // (5e8/50 - 440)/180 = 55553.1 → 55553
        assert_eq!(frequency_word(50.0).unwrap(), 55553);
        // (5000 - 440)/180 = 25.33 → 25
        assert_eq!(frequency_word(100e3).unwrap(), 25);
    }

    #[test]
    fn test_frequency_word_rejects_out_of_range() {
        assert!(matches!(frequency_word(49.9), Err(LaserError::InvalidFrequency(_))));
        assert!(matches!(frequency_word(100_001.0), Err(LaserError::InvalidFrequency(_))));
        assert!(frequency_word(f64::NAN).is_err());
    }

    #[test]
    fn test_frequency_packet_little_endian() {
        // 2775 = 0x0AD7
        assert_eq!(frequency_packet(1e3).unwrap(), vec![0x63, 0xD7, 0x0A]);
    }

    #[test]
    fn test_word_frequency_inverse() {
        let word = frequency_word(10e3).unwrap();
        assert!((word_frequency(word) - 10e3).abs() / 10e3 < 0.01);
    }

    #[test]
    fn test_validate_intensity() {
        assert_eq!(validate_intensity(0).unwrap(), 0);
        assert_eq!(validate_intensity(1023).unwrap(), 1023);
        assert!(matches!(validate_intensity(1024), Err(LaserError::InvalidIntensity(1024))));
        assert!(matches!(validate_intensity(-1), Err(LaserError::InvalidIntensity(-1))));
    }

    #[test]
    fn test_intensity_sequence() {
        assert_eq!(
            intensity_sequence(555),
            vec![vec![90], vec![4], vec![92], vec![94, 0x2B, 0x02], vec![91]]
        );
    }

    #[test]
    fn test_turn_on_sequence() {
        let sequence = turn_on_sequence(1e3, 0).unwrap();
        assert_eq!(sequence.first(), Some(&vec![0x63, 0xD7, 0x0A]));
        assert_eq!(sequence.last(), Some(&vec![91]));
        assert_eq!(sequence.len(), 7);
    }

    #[test]
    fn test_parse_status() {
        let mut report = [0u8; REPORT_LEN];
        assert_eq!(parse_status(&report).unwrap(), LaserStatus::Off);
        report[STATUS_BYTE] = 1;
        assert_eq!(parse_status(&report).unwrap(), LaserStatus::On);
        report[STATUS_BYTE] = 2;
        assert!(matches!(parse_status(&report), Err(LaserError::InvalidStatus(2))));
        assert!(matches!(
            parse_status(&report[..4]),
            Err(LaserError::InvalidResponse { expected: 7, actual: 4 })
        ));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("on".parse::<LaserStatus>().unwrap(), LaserStatus::On);
        assert_eq!("OFF".parse::<LaserStatus>().unwrap(), LaserStatus::Off);
        assert!("maybe".parse::<LaserStatus>().is_err());
        assert_eq!(LaserStatus::On.to_string(), "on");
    }
}
