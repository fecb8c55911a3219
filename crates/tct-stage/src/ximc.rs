//! libximc 后端
//!
//! 通过 FFI 调用厂商提供的 libximc 动态库。需要系统已安装 libximc，
//! 并在构建时启用 `ximc` feature。
//!
//! 参考：<https://libximc.xisupport.com/doc-en/ximc_8h.html>

use std::ffi::{CStr, CString, c_char, c_int, c_uint};
use std::time::Duration;

use tracing::trace;

use crate::backend::{DeviceId, DeviceInformation, RawPosition, StageBackend};
use crate::error::StageError;
use crate::units::StepPosition;

/// `device_undefined`
const DEVICE_UNDEFINED: c_int = -1;

/// `result_ok`
const RESULT_OK: c_int = 0;

#[repr(C)]
#[derive(Debug, Default)]
struct GetPositionT {
    position: c_int,
    u_position: c_int,
    enc_position: i64,
}

#[repr(C)]
#[derive(Debug, Default)]
struct DeviceInformationT {
    manufacturer: [c_char; 5],
    manufacturer_id: [c_char; 3],
    product_description: [c_char; 9],
    major: c_uint,
    minor: c_uint,
    release: c_uint,
}

#[link(name = "ximc")]
unsafe extern "C" {
    fn open_device(uri: *const c_char) -> c_int;
    fn close_device(id: *mut c_int) -> c_int;
    fn command_move(id: c_int, position: c_int, u_position: c_int) -> c_int;
    fn command_movr(id: c_int, delta_position: c_int, u_delta_position: c_int) -> c_int;
    fn command_wait_for_stop(id: c_int, refresh_interval_ms: u32) -> c_int;
    fn command_homezero(id: c_int) -> c_int;
    fn get_position(id: c_int, position: *mut GetPositionT) -> c_int;
    fn get_serial_number(id: c_int, serial_number: *mut c_uint) -> c_int;
    fn get_device_information(id: c_int, info: *mut DeviceInformationT) -> c_int;
}

fn check(call: &'static str, code: c_int) -> Result<(), StageError> {
    trace!("libximc {} -> {}", call, code);
    if code == RESULT_OK {
        Ok(())
    } else {
        Err(StageError::Backend { call, code })
    }
}

fn fixed_string(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw.iter().map(|&c| c as u8).collect();
    match CStr::from_bytes_until_nul(&bytes) {
        Ok(s) => s.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// libximc 后端（无状态，设备状态由厂商库维护）
#[derive(Debug, Default, Clone, Copy)]
pub struct XimcBackend;

impl XimcBackend {
    pub fn new() -> Self {
        XimcBackend
    }
}

impl StageBackend for XimcBackend {
    fn open(&mut self, uri: &str) -> Result<DeviceId, StageError> {
        let c_uri = CString::new(uri).map_err(|_| StageError::DeviceNotFound {
            uri: uri.to_string(),
        })?;
        // SAFETY: c_uri 在调用期间有效且以 NUL 结尾
        let id = unsafe { open_device(c_uri.as_ptr()) };
        if id == DEVICE_UNDEFINED {
            return Err(StageError::DeviceNotFound {
                uri: uri.to_string(),
            });
        }
        Ok(DeviceId(id))
    }

    fn close(&mut self, device: DeviceId) -> Result<(), StageError> {
        let mut id = device.0;
        // SAFETY: 指向栈上的有效 c_int
        check("close_device", unsafe { close_device(&mut id) })
    }

    fn move_to(&mut self, device: DeviceId, target: StepPosition) -> Result<(), StageError> {
        // SAFETY: 纯值参数
        let code =
            unsafe { command_move(device.0, target.steps, c_int::from(target.microsteps)) };
        check("command_move", code)
    }

    fn move_by(&mut self, device: DeviceId, delta: StepPosition) -> Result<(), StageError> {
        // SAFETY: 纯值参数
        let code = unsafe { command_movr(device.0, delta.steps, c_int::from(delta.microsteps)) };
        check("command_movr", code)
    }

    fn wait_for_stop(&mut self, device: DeviceId, refresh: Duration) -> Result<(), StageError> {
        let refresh_ms = u32::try_from(refresh.as_millis()).unwrap_or(u32::MAX);
        // SAFETY: 纯值参数
        check("command_wait_for_stop", unsafe {
            command_wait_for_stop(device.0, refresh_ms)
        })
    }

    fn position(&mut self, device: DeviceId) -> Result<RawPosition, StageError> {
        let mut pos = GetPositionT::default();
        // SAFETY: pos 为 repr(C) 结构体，布局与 get_position_t 一致
        check("get_position", unsafe { get_position(device.0, &mut pos) })?;
        Ok(RawPosition {
            steps: pos.position,
            microsteps: pos.u_position,
            encoder: pos.enc_position,
        })
    }

    fn serial_number(&mut self, device: DeviceId) -> Result<u32, StageError> {
        let mut serial: c_uint = 0;
        // SAFETY: 指向栈上的有效 c_uint
        check("get_serial_number", unsafe {
            get_serial_number(device.0, &mut serial)
        })?;
        Ok(serial)
    }

    fn device_information(&mut self, device: DeviceId) -> Result<DeviceInformation, StageError> {
        let mut info = DeviceInformationT::default();
        // SAFETY: info 为 repr(C) 结构体，布局与 device_information_t 一致
        check("get_device_information", unsafe {
            get_device_information(device.0, &mut info)
        })?;
        Ok(DeviceInformation {
            manufacturer: fixed_string(&info.manufacturer),
            manufacturer_id: fixed_string(&info.manufacturer_id),
            product_description: fixed_string(&info.product_description),
            major: info.major,
            minor: info.minor,
            release: info.release,
        })
    }

    fn home(&mut self, device: DeviceId) -> Result<(), StageError> {
        // SAFETY: 纯值参数
        check("command_homezero", unsafe { command_homezero(device.0) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_string() {
        let raw: [c_char; 5] = [b'X' as c_char, b'I' as c_char, b'M' as c_char, b'C' as c_char, 0];
        assert_eq!(fixed_string(&raw), "XIMC");

        // 无 NUL 结尾时取全部字节
        let raw: [c_char; 3] = [b'S' as c_char, b'M' as c_char, b'C' as c_char];
        assert_eq!(fixed_string(&raw), "SMC");
    }

    #[test]
    fn test_check() {
        assert!(check("command_move", RESULT_OK).is_ok());
        assert!(matches!(
            check("command_move", -3),
            Err(StageError::Backend { call: "command_move", code: -3 })
        ));
    }
}
