//! rusb 传输实现
//!
//! 设备是标准 HID 类，只有一个接口和一个 Interrupt IN 端点；命令走 EP0 控制传输。

use std::time::Duration;

use rusb::{DeviceHandle, GlobalContext};
use tracing::{debug, info, trace};

use crate::error::LaserError;
use crate::protocol::*;
use crate::transport::LaserTransport;

/// 控制 / 中断传输超时
const USB_TIMEOUT: Duration = Duration::from_millis(1000);

/// USB HID 激光器传输
pub struct UsbLaserTransport {
    handle: DeviceHandle<GlobalContext>,
    interface_number: u8,
    endpoint_in: u8,
    interface_claimed: bool,
    timeout: Duration,
}

impl UsbLaserTransport {
    /// 打开第一个匹配 VID/PID 的设备
    pub fn open() -> Result<Self, LaserError> {
        Self::open_with_ids(VENDOR_ID, PRODUCT_ID)
    }

    /// 按指定 VID/PID 打开设备
    pub fn open_with_ids(vendor_id: u16, product_id: u16) -> Result<Self, LaserError> {
        let handle = rusb::open_device_with_vid_pid(vendor_id, product_id).ok_or(
            LaserError::DeviceNotFound {
                vendor_id,
                product_id,
            },
        )?;

        let device = handle.device();
        let config = device.active_config_descriptor()?;
        let (interface_number, endpoint_in) = config
            .interfaces()
            .flat_map(|iface| iface.descriptors())
            .find_map(|desc| {
                desc.endpoint_descriptors()
                    .find(|ep| {
                        ep.direction() == rusb::Direction::In
                            && ep.transfer_type() == rusb::TransferType::Interrupt
                    })
                    .map(|ep| (desc.interface_number(), ep.address()))
            })
            .ok_or(LaserError::NoInEndpoint)?;

        let mut transport = Self {
            handle,
            interface_number,
            endpoint_in,
            interface_claimed: false,
            timeout: USB_TIMEOUT,
        };
        transport.prepare_interface()?;

        info!(
            "Laser controller opened: {:04x}:{:04x}, interface {}, IN endpoint {:#04x}",
            vendor_id, product_id, interface_number, endpoint_in
        );
        Ok(transport)
    }

    /// 设置传输超时
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn prepare_interface(&mut self) -> Result<(), LaserError> {
        if self.interface_claimed {
            return Ok(());
        }

        // hid 内核驱动会抢占接口
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            if self.handle.kernel_driver_active(self.interface_number).unwrap_or(false) {
                self.handle.detach_kernel_driver(self.interface_number)?;
                debug!("Detached kernel driver from interface {}", self.interface_number);
            }
        }

        self.handle.claim_interface(self.interface_number)?;
        self.interface_claimed = true;
        Ok(())
    }

    fn release_interface(&mut self) {
        if self.interface_claimed {
            let _ = self.handle.release_interface(self.interface_number);
            self.interface_claimed = false;
            trace!("Laser USB interface released");
        }
    }
}

impl LaserTransport for UsbLaserTransport {
    fn write_command(&mut self, packet: &[u8]) -> Result<usize, LaserError> {
        // Windows HID 栈要求完整 64 字节报告
        #[cfg(target_os = "windows")]
        let padded = {
            let mut padded = [0u8; REPORT_LEN];
            let len = packet.len().min(REPORT_LEN);
            padded[..len].copy_from_slice(&packet[..len]);
            padded
        };
        #[cfg(target_os = "windows")]
        let payload: &[u8] = &padded;
        #[cfg(not(target_os = "windows"))]
        let payload = packet;

        let written = self.handle.write_control(
            REQUEST_TYPE_OUT,
            REQUEST_SET_REPORT,
            REPORT_VALUE,
            REPORT_INDEX,
            payload,
            self.timeout,
        )?;
        // 填充字节不计入
        Ok(written.min(packet.len()))
    }

    fn read_report(&mut self, report: &mut [u8; REPORT_LEN]) -> Result<usize, LaserError> {
        let read = self.handle.read_interrupt(self.endpoint_in, report, self.timeout)?;
        Ok(read)
    }
}

impl Drop for UsbLaserTransport {
    fn drop(&mut self) {
        self.release_interface();
    }
}
