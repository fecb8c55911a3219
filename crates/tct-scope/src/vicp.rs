//! LeCroy VICP 传输（TCP 端口 1861）
//!
//! 每条消息前有 8 字节头：
//!
//! | 字节 | 含义 |
//! |------|------|
//! | 0 | 操作位（DATA / REMOTE / EOI ...） |
//! | 1 | 协议版本 |
//! | 2 | 序号 |
//! | 3 | 保留 |
//! | 4..8 | 数据长度（大端 u32） |
//!
//! 一个应答可能拆成多个数据块，带 EOI 位的块为最后一块。

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::ScopeError;
use crate::transport::InstrumentTransport;

/// VICP 服务端口
pub const VICP_PORT: u16 = 1861;

/// 头长度
pub const HEADER_LEN: usize = 8;

/// 协议版本 1A
pub const PROTOCOL_VERSION: u8 = 0x01;

pub const OP_DATA: u8 = 0x80;
pub const OP_REMOTE: u8 = 0x40;
pub const OP_CLEAR: u8 = 0x10;
/// 服务请求通知，不属于应答数据
pub const OP_SRQ: u8 = 0x08;
pub const OP_EOI: u8 = 0x01;

/// 单块数据长度上限（防止损坏的头导致巨量分配）
const MAX_BLOCK_LEN: usize = 256 * 1024 * 1024;

/// VICP 头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VicpHeader {
    pub operation: u8,
    pub sequence: u8,
    pub len: u32,
}

impl VicpHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let len = self.len.to_be_bytes();
        [
            self.operation,
            PROTOCOL_VERSION,
            self.sequence,
            0,
            len[0],
            len[1],
            len[2],
            len[3],
        ]
    }

    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, ScopeError> {
        if bytes[1] != PROTOCOL_VERSION {
            return Err(ScopeError::Protocol(format!(
                "unsupported VICP version 0x{:02X}",
                bytes[1]
            )));
        }
        Ok(Self {
            operation: bytes[0],
            sequence: bytes[2],
            len: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    pub fn is_eoi(&self) -> bool {
        self.operation & OP_EOI != 0
    }
}

/// 下一个序号（1..=255 循环，跳过 0）
fn next_sequence(current: u8) -> u8 {
    if current == u8::MAX { 1 } else { current + 1 }
}

/// 从流中读出一个完整应答（直到 EOI 块）
pub fn read_message<R: Read>(reader: &mut R) -> Result<Vec<u8>, ScopeError> {
    let mut data = Vec::new();
    loop {
        let mut raw = [0u8; HEADER_LEN];
        reader.read_exact(&mut raw)?;
        let header = VicpHeader::decode(&raw)?;
        let len = header.len as usize;
        if len > MAX_BLOCK_LEN {
            return Err(ScopeError::Protocol(format!("VICP block of {len} bytes")));
        }

        let mut block = vec![0u8; len];
        reader.read_exact(&mut block)?;
        if header.operation & OP_SRQ != 0 {
            trace!("VICP SRQ ignored ({} bytes)", len);
            continue;
        }
        data.extend_from_slice(&block);
        if header.is_eoi() {
            return Ok(data);
        }
    }
}

/// VICP 仪器连接
pub struct VicpInstrument {
    stream: TcpStream,
    address: String,
    sequence: u8,
}

impl VicpInstrument {
    /// 连接到 `host` 或 `host:port`（缺省端口 1861）
    pub fn connect(address: &str, timeout: Duration) -> Result<Self, ScopeError> {
        let address = with_default_port(address);
        let connection_error = |reason: String| ScopeError::Connection {
            resource: address.clone(),
            reason,
        };

        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| connection_error(e.to_string()))?
            .next()
            .ok_or_else(|| connection_error("address resolved to nothing".into()))?;

        let stream = TcpStream::connect_timeout(&socket_addr, timeout)
            .map_err(|e| connection_error(e.to_string()))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        debug!("Connected to VICP instrument at {}", address);
        Ok(Self {
            stream,
            address,
            sequence: 0,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// 设备清除（丢弃仪器输出缓冲）
    pub fn device_clear(&mut self) -> Result<(), ScopeError> {
        self.send(OP_CLEAR | OP_EOI, &[])
    }

    fn send(&mut self, operation: u8, payload: &[u8]) -> Result<(), ScopeError> {
        let len = u32::try_from(payload.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "VICP payload too long"))?;
        self.sequence = next_sequence(self.sequence);
        let header = VicpHeader {
            operation,
            sequence: self.sequence,
            len,
        };
        self.stream.write_all(&header.encode())?;
        self.stream.write_all(payload)?;
        self.stream.flush()?;
        Ok(())
    }
}

fn with_default_port(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{address}:{VICP_PORT}")
    }
}

impl InstrumentTransport for VicpInstrument {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        trace!("VICP TX: {}", command);
        self.send(OP_DATA | OP_REMOTE | OP_EOI, command.as_bytes())
    }

    fn read(&mut self) -> Result<String, ScopeError> {
        let data = read_message(&mut self.stream)?;
        let line = String::from_utf8_lossy(&data)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        trace!("VICP RX: {}", line);
        Ok(line)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, ScopeError> {
        let data = read_message(&mut self.stream)?;
        trace!("VICP RX: {} raw bytes", data.len());
        Ok(data)
    }
}
