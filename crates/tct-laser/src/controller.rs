//! 激光器控制器
//!
//! 频率与 DAC 为写穿缓存：激光开启时 setter 立即重新编程设备，否则只缓存到下一次 `on()`。

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::LaserError;
use crate::protocol::{self, LaserStatus, REPORT_LEN};
use crate::transport::LaserTransport;

#[cfg(feature = "usb")]
use crate::usb::UsbLaserTransport;

/// 控制器初始化参数
#[derive(Debug, Clone, PartialEq)]
pub struct LaserOptions {
    /// 构造时写入设备的频率（Hz）
    pub initial_frequency: f64,
    /// 构造时写入设备的 DAC
    pub initial_dac: u16,
    /// 每条命令后的固定延时
    pub command_delay: Duration,
}

impl Default for LaserOptions {
    fn default() -> Self {
        Self {
            initial_frequency: 1e3,
            initial_dac: 0,
            command_delay: Duration::from_millis(10),
        }
    }
}

/// 脉冲激光器控制器
pub struct LaserController<T: LaserTransport> {
    transport: T,
    frequency: f64,
    dac: u16,
    command_delay: Duration,
}

#[cfg(feature = "usb")]
impl LaserController<UsbLaserTransport> {
    /// 打开 USB 激光器（默认参数）
    pub fn open() -> Result<Self, LaserError> {
        Self::open_with_options(LaserOptions::default())
    }

    pub fn open_with_options(options: LaserOptions) -> Result<Self, LaserError> {
        let transport = UsbLaserTransport::open()?;
        Self::with_transport(transport, options)
    }
}

impl<T: LaserTransport> LaserController<T> {
    /// 在给定传输上构造控制器
    ///
    /// 读取当前状态后强制完整编程一次（频率 + DAC + 硬件使能），
    /// 若设备原本处于关闭状态则再关断，使设备与缓存值一致。
    pub fn with_transport(transport: T, options: LaserOptions) -> Result<Self, LaserError> {
        protocol::frequency_word(options.initial_frequency)?;
        let dac = protocol::validate_intensity(i64::from(options.initial_dac))?;

        let mut controller = Self {
            transport,
            frequency: options.initial_frequency,
            dac,
            command_delay: options.command_delay,
        };

        let initial = controller.status()?;
        controller.turn_on()?;
        if !initial.is_on() {
            controller.turn_off()?;
        }

        info!(
            "Laser controller ready: {} Hz, DAC {}, {}",
            controller.frequency, controller.dac, initial
        );
        Ok(controller)
    }

    /// 当前缓存的频率（Hz）
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// 当前缓存的 DAC
    pub fn dac(&self) -> u16 {
        self.dac
    }

    /// 设置脉冲频率 [50, 100000] Hz
    ///
    /// 开启状态下立即重新编程；IO 失败时缓存保持原值。
    pub fn set_frequency(&mut self, hz: f64) -> Result<(), LaserError> {
        protocol::frequency_word(hz)?;
        let previous = self.frequency;
        self.frequency = hz;
        if let Err(e) = self.reprogram_if_on() {
            self.frequency = previous;
            return Err(e);
        }
        debug!("Laser frequency set to {} Hz", hz);
        Ok(())
    }

    /// 设置 DAC [0, 1024)
    ///
    /// 开启状态下立即重新编程；IO 失败时缓存保持原值。
    pub fn set_intensity(&mut self, code: i64) -> Result<(), LaserError> {
        let dac = protocol::validate_intensity(code)?;
        let previous = self.dac;
        self.dac = dac;
        if let Err(e) = self.reprogram_if_on() {
            self.dac = previous;
            return Err(e);
        }
        debug!("Laser DAC set to {}", self.dac);
        Ok(())
    }

    fn reprogram_if_on(&mut self) -> Result<(), LaserError> {
        if self.status()?.is_on() {
            self.turn_on()?;
        }
        Ok(())
    }

    /// 开启（仅当当前关闭）
    pub fn on(&mut self) -> Result<(), LaserError> {
        if !self.status()?.is_on() {
            self.turn_on()?;
            info!("Laser on");
        }
        Ok(())
    }

    /// 关闭（仅当当前开启）
    pub fn off(&mut self) -> Result<(), LaserError> {
        if self.status()?.is_on() {
            self.turn_off()?;
            info!("Laser off");
        }
        Ok(())
    }

    /// 读取开关状态
    ///
    /// 命令之后的第一次读取不可靠，因此连续读两次并丢弃第一次。
    pub fn status(&mut self) -> Result<LaserStatus, LaserError> {
        let mut report = [0u8; REPORT_LEN];
        self.transport.read_report(&mut report)?;
        let read = self.transport.read_report(&mut report)?;
        protocol::parse_status(&report[..read])
    }

    /// 按状态开关
    pub fn set_status(&mut self, status: LaserStatus) -> Result<(), LaserError> {
        match status {
            LaserStatus::On => self.on(),
            LaserStatus::Off => self.off(),
        }
    }

    /// 取回传输层
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn turn_on(&mut self) -> Result<(), LaserError> {
        for packet in protocol::turn_on_sequence(self.frequency, self.dac)? {
            self.send_packet(&packet)?;
        }
        Ok(())
    }

    fn turn_off(&mut self) -> Result<(), LaserError> {
        for packet in protocol::turn_off_sequence() {
            self.send_packet(&packet)?;
        }
        Ok(())
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<usize, LaserError> {
        debug!("Laser TX: {}", hex::encode(packet));
        let sent = self.transport.write_command(packet)?;
        if sent != packet.len() {
            warn!(
                "Tried to send {} bytes to the laser but only {} were accepted",
                packet.len(),
                sent
            );
        }
        spin_sleep::sleep(self.command_delay);
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLaserTransport;

    fn fast() -> LaserOptions {
        LaserOptions {
            command_delay: Duration::ZERO,
            ..LaserOptions::default()
        }
    }

    #[test]
    fn test_init_restores_off() {
        let mock = MockLaserTransport::new();
        let laser = LaserController::with_transport(mock.clone(), fast()).unwrap();

        assert!(!mock.is_on());
        assert_eq!(laser.frequency(), 1e3);
        assert_eq!(laser.dac(), 0);

        let packets = mock.packets();
        assert_eq!(packets.first(), Some(&vec![99, 0xD7, 0x0A]));
        assert_eq!(&packets[packets.len() - 2..], &[vec![90], vec![4]]);
    }

    #[test]
    fn test_init_keeps_on() {
        let mock = MockLaserTransport::new_on();
        LaserController::with_transport(mock.clone(), fast()).unwrap();
        assert!(mock.is_on());
        assert_eq!(mock.packets().last(), Some(&vec![91]));
    }

    #[test]
    fn test_init_rejects_bad_options_before_io() {
        let mock = MockLaserTransport::new();
        let options = LaserOptions {
            initial_dac: 1024,
            ..fast()
        };
        let err = LaserController::with_transport(mock.clone(), options).err().unwrap();
        assert!(err.is_validation());
        assert_eq!(mock.reports_read(), 0);
        assert!(mock.packets().is_empty());
    }

    #[test]
    fn test_status_reads_twice() {
        let mock = MockLaserTransport::new();
        let mut laser = LaserController::with_transport(mock.clone(), fast()).unwrap();
        let before = mock.reports_read();
        laser.status().unwrap();
        assert_eq!(mock.reports_read(), before + 2);
    }
}
