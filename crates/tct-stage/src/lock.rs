//! 串口互斥锁
//!
//! 每个平移台串口对应一个锁文件，打开轴之前必须先拿到排他锁。
//! 使用 OS 咨询锁（flock / LockFileEx），持有者进程退出或崩溃时锁自动释放，
//! 不会留下需要手动清理的残留标记。

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StageError;

/// 获取默认锁目录
///
/// 优先使用用户可写的目录：
/// 1. XDG_RUNTIME_DIR（Linux，通常为 /run/user/{uid}）
/// 2. 系统临时目录
pub fn default_lock_dir() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        let path = PathBuf::from(runtime_dir);
        if path.is_dir() {
            return path;
        }
    }
    std::env::temp_dir()
}

/// 端口名 → 锁文件名
///
/// `/dev/ttyACM0` → `tct-stage-dev_ttyACM0.lock`，`COM3` → `tct-stage-COM3.lock`
pub fn lock_file_name(port: &str) -> String {
    let sanitized: String = port
        .trim_start_matches(['/', '\\', '.'])
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("tct-stage-{}.lock", sanitized)
}

/// 单个串口的排他锁
///
/// 锁在 `Drop` 时释放；文件本身保留（只有锁状态有意义）。
#[derive(Debug)]
pub struct PortLock {
    file: File,
    port: String,
    path: PathBuf,
}

impl PortLock {
    /// 尝试获取端口锁（非阻塞）
    ///
    /// # 返回
    /// - `Ok(Self)`: 成功获取锁
    /// - `Err(StageError::PortBusy)`: 锁已被持有
    /// - `Err(StageError::Io)`: 文件操作失败
    pub fn acquire(lock_dir: impl AsRef<Path>, port: &str) -> Result<Self, StageError> {
        let path = lock_dir.as_ref().join(lock_file_name(port));

        // 拿到锁之前不能截断
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .read(true)
            .open(&path)?;

        if !file.try_lock_exclusive()? {
            return Err(StageError::PortBusy {
                port: port.to_string(),
                lock_path: path,
            });
        }

        // 写入持有者 PID（仅用于排查）
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(&file, "{}", std::process::id())?;
        file.sync_all()?;

        debug!("Acquired port lock {}", path.display());
        Ok(Self {
            file,
            port: port.to_string(),
            path,
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 显式释放
    pub fn release(self) -> io::Result<()> {
        self.file.unlock()
    }
}

impl Drop for PortLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
