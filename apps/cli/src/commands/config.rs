//! 配置管理命令
//!
//! 装置配置文件 `setup.toml` 的查看、生成和检查

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tct_sdk::SetupConfig;

use crate::devices::{config_path, load_config};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前生效的配置（TOML）
    Show,

    /// 写出默认配置文件
    Init {
        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },

    /// 检查配置文件
    Check,
}

impl ConfigCommand {
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::show(explicit),
            ConfigCommand::Init { force } => Self::init(explicit, force),
            ConfigCommand::Check => Self::check(explicit),
        }
    }

    fn show(explicit: Option<&Path>) -> Result<()> {
        let (path, config) = load_config(explicit)?;
        println!("# {}", path.display());
        print!("{}", config.to_toml()?);
        Ok(())
    }

    fn init(explicit: Option<&Path>, force: bool) -> Result<()> {
        let path = config_path(explicit)?;
        if path.exists() && !force {
            anyhow::bail!("{} 已存在（使用 --force 覆盖）", path.display());
        }
        SetupConfig::default()
            .save(&path)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    fn check(explicit: Option<&Path>) -> Result<()> {
        let path = config_path(explicit)?;
        if !path.exists() {
            println!("配置文件 {} 不存在，将使用默认值", path.display());
        }
        let (_, config) = load_config(explicit)?;
        config.validate()?;

        let limits = config.stage_limits()?;
        println!("配置文件: {}", path.display());
        println!(
            "  平移台限位: x [{}, {}] y [{}, {}] z [{}, {}] m",
            limits.x.min(),
            limits.x.max(),
            limits.y.min(),
            limits.y.max(),
            limits.z.min(),
            limits.z.max()
        );
        if config.stages.serials.is_empty() {
            let ports = config.axis_ports();
            println!("  平移台端口: x={} y={} z={}", ports.x, ports.y, ports.z);
        } else {
            println!("  平移台序列号: {:?}", config.stages.serials);
        }
        println!(
            "  激光器: {} Hz, DAC {}",
            config.laser.frequency_hz, config.laser.dac
        );
        println!(
            "  示波器: {:?} {}",
            config.scope.transport, config.scope.resource
        );
        println!("  测量目录: {}", config.measurements.base_path.display());
        println!("✅ 配置有效");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tct").join("setup.toml");

        ConfigCommand::Init { force: false }.execute(Some(&path)).unwrap();
        assert!(path.exists());
        // 已存在时需要 --force
        assert!(ConfigCommand::Init { force: false }.execute(Some(&path)).is_err());
        ConfigCommand::Init { force: true }.execute(Some(&path)).unwrap();

        ConfigCommand::Check.execute(Some(&path)).unwrap();
        ConfigCommand::Show.execute(Some(&path)).unwrap();
    }

    #[test]
    fn test_check_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.toml");
        std::fs::write(&path, "[laser]\ndac = 5000\n").unwrap();
        assert!(ConfigCommand::Check.execute(Some(&path)).is_err());
    }
}
