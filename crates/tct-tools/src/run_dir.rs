//! # 测量目录
//!
//! 每次测量一个独立目录：
//!
//! ```text
//! <base>/20261016143005_my_measurement/
//! ├── raw/         原始波形文件
//! ├── processed/   分析结果
//! └── scripts/     脚本副本与参数
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::error::ToolsError;

/// 时间戳格式
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// 参数文件名（位于 `scripts/`）
pub const PARAMETERS_FILE: &str = "parameters.toml";

/// 一次测量的目录结构
#[derive(Debug, Clone)]
pub struct RunDirectory {
    name: String,
    root: PathBuf,
}

impl RunDirectory {
    /// 创建测量目录
    ///
    /// `prepend_timestamp` 为真时目录名为 `YYYYMMDDhhmmss_<name>`。
    /// 目录已存在时返回 [`ToolsError::AlreadyExists`]，不会覆盖旧数据。
    pub fn create(
        base: impl AsRef<Path>,
        name: &str,
        prepend_timestamp: bool,
    ) -> Result<Self, ToolsError> {
        let name = if prepend_timestamp {
            format!("{}_{name}", Local::now().format(TIMESTAMP_FORMAT))
        } else {
            name.to_string()
        };
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(ToolsError::InvalidConfig(format!(
                "invalid measurement name {name:?}"
            )));
        }

        let root = base.as_ref().join(&name);
        if root.exists() {
            return Err(ToolsError::AlreadyExists(root));
        }

        let dir = Self { name, root };
        for sub in [dir.raw_dir(), dir.processed_dir(), dir.scripts_dir()] {
            fs::create_dir_all(sub)?;
        }
        info!("Created measurement directory {}", dir.root.display());
        Ok(dir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("scripts")
    }

    /// 把文件复制到 `scripts/`，首行加上来源说明
    pub fn archive_file(&self, source: impl AsRef<Path>) -> Result<PathBuf, ToolsError> {
        let source = source.as_ref();
        let content = fs::read_to_string(source)?;
        let file_name = source.file_name().ok_or_else(|| {
            ToolsError::InvalidConfig(format!("{} has no file name", source.display()))
        })?;

        let target = self.scripts_dir().join(file_name);
        let note = format!(
            "# This is a copy of {} archived with measurement {} on {}\n",
            source.display(),
            self.name,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
        );
        fs::write(&target, note + &content)?;
        Ok(target)
    }

    /// 把运行参数写入 `scripts/parameters.toml`
    pub fn save_parameters<T: Serialize>(&self, parameters: &T) -> Result<PathBuf, ToolsError> {
        let target = self.scripts_dir().join(PARAMETERS_FILE);
        fs::write(&target, toml::to_string_pretty(parameters)?)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_layout() {
        let base = tempfile::tempdir().unwrap();
        let dir = RunDirectory::create(base.path(), "beta_scan", false).unwrap();

        assert_eq!(dir.name(), "beta_scan");
        assert_eq!(dir.path(), base.path().join("beta_scan"));
        assert!(dir.raw_dir().is_dir());
        assert!(dir.processed_dir().is_dir());
        assert!(dir.scripts_dir().is_dir());
    }

    #[test]
    fn test_create_with_timestamp() {
        let base = tempfile::tempdir().unwrap();
        let dir = RunDirectory::create(base.path(), "focus", true).unwrap();

        let (stamp, rest) = dir.name().split_once('_').unwrap();
        assert_eq!(rest, "focus");
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_create_refuses_existing() {
        let base = tempfile::tempdir().unwrap();
        RunDirectory::create(base.path(), "twice", false).unwrap();
        let err = RunDirectory::create(base.path(), "twice", false).unwrap_err();
        assert!(matches!(err, ToolsError::AlreadyExists(_)));
    }

    #[test]
    fn test_create_rejects_bad_names() {
        let base = tempfile::tempdir().unwrap();
        assert!(RunDirectory::create(base.path(), "", false).unwrap_err().is_validation());
        assert!(RunDirectory::create(base.path(), "a/b", false).unwrap_err().is_validation());
    }

    #[test]
    fn test_archive_file() {
        let base = tempfile::tempdir().unwrap();
        let dir = RunDirectory::create(base.path(), "archive", false).unwrap();
        let script = base.path().join("scan.toml");
        fs::write(&script, "n_steps = 11\n").unwrap();

        let copy = dir.archive_file(&script).unwrap();
        assert_eq!(copy, dir.scripts_dir().join("scan.toml"));

        let content = fs::read_to_string(copy).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("# This is a copy of"));
        assert_eq!(lines.next(), Some("n_steps = 11"));
    }

    #[test]
    fn test_save_parameters() {
        #[derive(Serialize)]
        struct Params {
            n_steps: usize,
            n_triggers: usize,
        }

        let base = tempfile::tempdir().unwrap();
        let dir = RunDirectory::create(base.path(), "params", false).unwrap();
        let path = dir
            .save_parameters(&Params {
                n_steps: 11,
                n_triggers: 4,
            })
            .unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("n_steps = 11"));
        assert!(content.contains("n_triggers = 4"));
    }
}
