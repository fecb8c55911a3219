//! 原始 TCP 套接字传输（`TCPIP::<host>::<port>::SOCKET` 风格）
//!
//! 只适用于收发裸 SCPI 文本的端口（例如 5025）。LeCroy 的 1861 端口使用 VICP 帧，
//! 见 [`crate::vicp`]。
//!
//! 文本应答以 `\n` 结尾。二进制应答优先按 IEEE 488.2 定长块（`#<n><len><data>`）判定结束，
//! 否则以读超时作为结束标志。

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::ScopeError;
use crate::transport::InstrumentTransport;

/// 默认读写超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// 原始 TCP 仪器连接
pub struct TcpInstrument {
    reader: BufReader<TcpStream>,
    address: String,
}

impl TcpInstrument {
    /// 连接到 `host:port`
    pub fn connect(address: &str, timeout: Duration) -> Result<Self, ScopeError> {
        let connection_error = |reason: String| ScopeError::Connection {
            resource: address.to_string(),
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

        debug!("Connected to instrument at {}", address);
        Ok(Self {
            reader: BufReader::new(stream),
            address: address.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl InstrumentTransport for TcpInstrument {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        trace!("SCPI TX: {}", command);
        let stream = self.reader.get_mut();
        stream.write_all(command.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
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
        let mut chunk = [0u8; 4096];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    data.extend_from_slice(&chunk[..n]);
                    if let Some(total) = block_total_len(&data)
                        && data.len() >= total
                    {
                        break;
                    }
                },
                Err(e)
                    if !data.is_empty()
                        && matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) =>
                {
                    break;
                },
                Err(e) => return Err(e.into()),
            }
        }
        trace!("SCPI RX: {} raw bytes", data.len());
        Ok(data)
    }
}

/// 若 `data` 含有完整的 IEEE 488.2 定长块头，返回整个应答的期望长度（含结尾的 `\n`）
///
/// 头部之前的文本（例如 `C1:WF ALL,`）一并计入。
pub fn block_total_len(data: &[u8]) -> Option<usize> {
    let hash = data.iter().position(|&b| b == b'#')?;
    let digits = char::from(*data.get(hash + 1)?).to_digit(10)? as usize;
    if digits == 0 {
        return None;
    }
    let len_field = data.get(hash + 2..hash + 2 + digits)?;
    let len: usize = std::str::from_utf8(len_field).ok()?.parse().ok()?;
    Some(hash + 2 + digits + len + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_block_total_len() {
        assert_eq!(block_total_len(b"#15hello\n"), Some(9));
        assert_eq!(block_total_len(b"C1:WF ALL,#9000000004abcd\n"), Some(26));
        // 头部不完整
        assert_eq!(block_total_len(b"C1:WF ALL,#90000"), None);
        assert_eq!(block_total_len(b"no block"), None);
        // 不定长块
        assert_eq!(block_total_len(b"#0abc"), None);
    }

    #[test]
    fn test_tcp_query_and_raw_block() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();

            reader.read_line(&mut line).unwrap();
            assert_eq!(line, "*IDN?\n");
            reader.get_mut().write_all(b"LECROY,WR640ZI,1234,8.1\n").unwrap();

            line.clear();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, "C1:WF?\n");
            reader.get_mut().write_all(b"C1:WF ALL,#13\x01\n\xff\n").unwrap();
        });

        let mut scope = TcpInstrument::connect(&address, Duration::from_secs(2)).unwrap();
        assert_eq!(scope.query("*IDN?").unwrap(), "LECROY,WR640ZI,1234,8.1");

        scope.write("C1:WF?").unwrap();
        let raw = scope.read_raw().unwrap();
        assert_eq!(raw, b"C1:WF ALL,#13\x01\n\xff\n");

        server.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpInstrument::connect(&address, Duration::from_millis(200))
            .err()
            .unwrap();
        assert!(matches!(err, ScopeError::Connection { .. }));
    }
}
