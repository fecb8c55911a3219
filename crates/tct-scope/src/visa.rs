//! VISA 传输（visa-rs）
//!
//! 资源字符串例如 `USB0::0x05FF::0x1023::2810N60091::INSTR`。

use std::ffi::CString;
use std::io::{BufRead, BufReader, Read, Write};
use std::time::Duration;

use tracing::{debug, trace};
use visa_rs::prelude::*;

use crate::error::ScopeError;
use crate::transport::{InstrumentTransport, raw_reply_complete};

/// 单次原始读取的块大小
const RAW_CHUNK: usize = 64 * 1024;

/// VISA 仪器会话
pub struct VisaInstrument {
    // 文本与原始读取共用同一个缓冲，跨调用不丢字节
    reader: BufReader<Instrument>,
    resource: String,
    // 会话关闭前资源管理器必须存活
    _rm: DefaultRM,
}

impl VisaInstrument {
    /// 打开 VISA 资源
    pub fn open(resource: &str, timeout: Duration) -> Result<Self, ScopeError> {
        let connection_error = |reason: String| ScopeError::Connection {
            resource: resource.to_string(),
            reason,
        };

        let rm = DefaultRM::new().map_err(|e| ScopeError::Visa(e.to_string()))?;
        let name = CString::new(resource).map_err(|e| connection_error(e.to_string()))?;
        let instrument = rm
            .open(&name.into(), AccessMode::NO_LOCK, timeout)
            .map_err(|e| connection_error(e.to_string()))?;

        debug!("Opened VISA resource {}", resource);
        Ok(Self {
            reader: BufReader::new(instrument),
            resource: resource.to_string(),
            _rm: rm,
        })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl InstrumentTransport for VisaInstrument {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        trace!("SCPI TX: {}", command);
        let instrument = self.reader.get_mut();
        instrument.write_all(command.as_bytes())?;
        instrument.write_all(b"\n")?;
        Ok(())
    }

    fn read(&mut self) -> Result<String, ScopeError> {
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        trace!("SCPI RX: {}", line);
        Ok(line)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, ScopeError> {
        let mut data = Vec::new();
        let mut chunk = vec![0u8; RAW_CHUNK];
        loop {
            // 缓冲里的剩余字节先读完，之后才是 viRead，它在 END 处短读
            let from_buffer = !self.reader.buffer().is_empty();
            let n = self.reader.read(&mut chunk)?;
            data.extend_from_slice(&chunk[..n]);
            let short_read = !from_buffer && n < chunk.len();
            if n == 0 || raw_reply_complete(&data, short_read) {
                break;
            }
        }
        trace!("SCPI RX: {} raw bytes", data.len());
        Ok(data)
    }
}
