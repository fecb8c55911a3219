//! XIMC 控制器发现
//!
//! XIMC 控制器以 USB 虚拟串口出现，制造商字段为 `XIMC`。
//! 每个控制器接在哪根轴上取决于接线，由序列号 → 轴的映射表决定。

use std::collections::HashMap;

use serialport::{SerialPortInfo, SerialPortType};
use tracing::debug;

use crate::assembly::{Axis, AxisPorts};
use crate::error::StageError;

/// XIMC 制造商字符串
pub const XIMC_MANUFACTURER: &str = "XIMC";

/// 一个已连接的 XIMC 控制器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XimcDevice {
    pub port: String,
    pub description: Option<String>,
    pub serial_number: Option<String>,
}

/// 列出所有已连接的 XIMC 控制器
pub fn find_ximc_devices() -> Result<Vec<XimcDevice>, StageError> {
    let ports = serialport::available_ports()?;
    let devices = filter_ximc_ports(ports);
    debug!("Found {} XIMC controller(s)", devices.len());
    Ok(devices)
}

/// 从串口列表中筛选 XIMC 控制器
pub fn filter_ximc_ports(ports: Vec<SerialPortInfo>) -> Vec<XimcDevice> {
    ports
        .into_iter()
        .filter_map(|port| match port.port_type {
            SerialPortType::UsbPort(info)
                if info.manufacturer.as_deref() == Some(XIMC_MANUFACTURER) =>
            {
                Some(XimcDevice {
                    port: port.port_name,
                    description: info.product,
                    serial_number: info.serial_number,
                })
            },
            _ => None,
        })
        .collect()
}

/// 按序列号把控制器映射到轴
///
/// `serial_to_axis` 例如 `{"00003A57": x, "00003A48": y, "000038CE": z}`。
///
/// # 错误
/// - `UnassignedSerial`: 发现了未在映射表中的控制器
/// - `AxisNotConnected`: x, y, z 中有轴没有找到控制器
pub fn map_axes_to_ports(
    devices: &[XimcDevice],
    serial_to_axis: &HashMap<String, Axis>,
) -> Result<AxisPorts, StageError> {
    let mut found: HashMap<Axis, String> = HashMap::new();

    for device in devices {
        let serial = device.serial_number.clone().unwrap_or_default();
        let axis = serial_to_axis
            .get(&serial)
            .copied()
            .ok_or_else(|| StageError::UnassignedSerial(serial.clone()))?;
        found.insert(axis, device.port.clone());
    }

    let mut take = |axis: Axis| found.remove(&axis).ok_or(StageError::AxisNotConnected(axis));
    Ok(AxisPorts {
        x: take(Axis::X)?,
        y: take(Axis::Y)?,
        z: take(Axis::Z)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    fn usb_port(name: &str, manufacturer: &str, serial: &str) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid: 0x1CBE,
                pid: 0x0007,
                serial_number: Some(serial.to_string()),
                manufacturer: Some(manufacturer.to_string()),
                product: Some("XIMC Motor Controller".to_string()),
            }),
        }
    }

    fn serial_map() -> HashMap<String, Axis> {
        HashMap::from([
            ("00003A57".to_string(), Axis::X),
            ("00003A48".to_string(), Axis::Y),
            ("000038CE".to_string(), Axis::Z),
        ])
    }

    #[test]
    fn test_filter_ximc_ports() {
        let ports = vec![
            usb_port("/dev/ttyACM2", "XIMC", "00003A57"),
            usb_port("/dev/ttyUSB0", "FTDI", "A12345"),
            SerialPortInfo {
                port_name: "/dev/ttyS0".to_string(),
                port_type: SerialPortType::Unknown,
            },
        ];
        let devices = filter_ximc_ports(ports);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].port, "/dev/ttyACM2");
        assert_eq!(devices[0].serial_number.as_deref(), Some("00003A57"));
    }

    #[test]
    fn test_map_axes_to_ports() {
        let devices = filter_ximc_ports(vec![
            usb_port("/dev/ttyACM1", "XIMC", "000038CE"),
            usb_port("/dev/ttyACM2", "XIMC", "00003A57"),
            usb_port("/dev/ttyACM3", "XIMC", "00003A48"),
        ]);
        let ports = map_axes_to_ports(&devices, &serial_map()).unwrap();
        assert_eq!(ports, AxisPorts::new("/dev/ttyACM2", "/dev/ttyACM3", "/dev/ttyACM1"));
    }

    #[test]
    fn test_map_axes_missing_axis() {
        let devices = filter_ximc_ports(vec![
            usb_port("/dev/ttyACM1", "XIMC", "000038CE"),
            usb_port("/dev/ttyACM2", "XIMC", "00003A57"),
        ]);
        let err = map_axes_to_ports(&devices, &serial_map()).unwrap_err();
        assert!(matches!(err, StageError::AxisNotConnected(Axis::Y)));
    }

    #[test]
    fn test_map_axes_unknown_serial() {
        let devices = filter_ximc_ports(vec![usb_port("/dev/ttyACM9", "XIMC", "DEADBEEF")]);
        let err = map_axes_to_ports(&devices, &serial_map()).unwrap_err();
        assert!(matches!(err, StageError::UnassignedSerial(ref s) if s == "DEADBEEF"));
    }
}
