//! 消息式仪器连接抽象

use crate::error::ScopeError;

/// 消息式仪器连接（VISA 会话或原始 TCP 套接字）
pub trait InstrumentTransport {
    /// 发送一条命令（不含终止符）
    fn write(&mut self, command: &str) -> Result<(), ScopeError>;

    /// 读取一条文本应答（去掉终止符）
    fn read(&mut self) -> Result<String, ScopeError>;

    /// 读取一个原始二进制应答
    fn read_raw(&mut self) -> Result<Vec<u8>, ScopeError>;

    /// 写 + 读
    fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        self.write(command)?;
        self.read()
    }
}

impl<T: InstrumentTransport + ?Sized> InstrumentTransport for Box<T> {
    fn write(&mut self, command: &str) -> Result<(), ScopeError> {
        (**self).write(command)
    }

    fn read(&mut self) -> Result<String, ScopeError> {
        (**self).read()
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, ScopeError> {
        (**self).read_raw()
    }

    fn query(&mut self, command: &str) -> Result<String, ScopeError> {
        (**self).query(command)
    }
}

/// 分块读取原始应答时判断是否已读完
///
/// 含 IEEE 488.2 定长块时按块长度判断：读满整个应答即结束；数据块已完整、
/// 只差结尾 `\n` 时，若本次是短读（END）也结束。没有定长块头时以短读为准。
pub fn raw_reply_complete(data: &[u8], short_read: bool) -> bool {
    match crate::tcp::block_total_len(data) {
        Some(total) => data.len() >= total || (short_read && data.len() + 1 >= total),
        None => short_read,
    }
}
