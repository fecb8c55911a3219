//! 激光器传输层抽象
//!
//! 控制器只依赖这两个原语，便于在没有硬件时用 Mock 替换 USB 实现。

use crate::error::LaserError;
use crate::protocol::REPORT_LEN;

/// 激光器传输层
pub trait LaserTransport {
    /// 发送一条命令（HID SET_REPORT 控制传输）
    ///
    /// 返回设备接受的字节数。少于命令长度不是错误，由调用方决定是否告警。
    fn write_command(&mut self, packet: &[u8]) -> Result<usize, LaserError>;

    /// 读取一个输入报告，返回实际读取的字节数
    fn read_report(&mut self, report: &mut [u8; REPORT_LEN]) -> Result<usize, LaserError>;
}

impl<T: LaserTransport + ?Sized> LaserTransport for Box<T> {
    fn write_command(&mut self, packet: &[u8]) -> Result<usize, LaserError> {
        (**self).write_command(packet)
    }

    fn read_report(&mut self, report: &mut [u8; REPORT_LEN]) -> Result<usize, LaserError> {
        (**self).read_report(report)
    }
}
