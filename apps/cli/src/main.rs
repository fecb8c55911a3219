//! # TCT CLI
//!
//! TCT 测量装置命令行工具。每个命令独立执行：读取配置 → 打开设备 → 执行 → 释放。
//!
//! ```bash
//! # 生成并检查配置（~/.config/tct/setup.toml）
//! tct-cli config init
//! tct-cli config check
//!
//! # 单设备操作
//! tct-cli laser set --frequency 1000 --dac 555 --status on
//! tct-cli stage move -x 0.0212 -y 0.0371
//! tct-cli scope acquire -n 10 -o pulse.txt --with-stages
//!
//! # 扫描（Ctrl+C 在当前点结束后停止）
//! tct-cli scan focus --x 0.02116 --y 0.03732 --z-start 0.0493 --z-end 0.058 --steps 333 -n 11 --name focus
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod devices;

use commands::{ConfigCommand, LaserCommand, ScanCommand, ScopeCommand, StageCommand};

/// TCT CLI - 瞬态电流技术测量装置命令行工具
#[derive(Parser, Debug)]
#[command(name = "tct-cli")]
#[command(about = "Command-line interface for the TCT laboratory setup", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/tct/setup.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 激光器
    #[command(subcommand)]
    Laser(LaserCommand),

    /// 平移台
    #[command(subcommand)]
    Stage(StageCommand),

    /// 示波器
    #[command(subcommand)]
    Scope(ScopeCommand),

    /// 扫描测量
    #[command(subcommand)]
    Scan(ScanCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tct_cli=info".parse()?)
                .add_directive("tct_control=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(config),
        Commands::Laser(cmd) => cmd.execute(config),
        Commands::Stage(cmd) => cmd.execute(config),
        Commands::Scope(cmd) => cmd.execute(config),
        Commands::Scan(cmd) => cmd.execute(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_stage_move() {
        let cli = Cli::try_parse_from(["tct-cli", "stage", "move", "-x", "0.01", "-y", "-0.005"])
            .unwrap();
        match cli.command {
            Commands::Stage(StageCommand::Move { x, y, z }) => {
                assert_eq!(x, Some(0.01));
                assert_eq!(y, Some(-0.005));
                assert_eq!(z, None);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_linear_scan() {
        let cli = Cli::try_parse_from([
            "tct-cli", "--config", "setup.toml", "scan", "linear", "--start", "-0.0048", "-0.0262",
            "0.0676", "--end", "-0.0048", "-0.0219", "0.0676", "--steps", "100", "-n", "33",
            "--name", "edge",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("setup.toml")));
        match cli.command {
            Commands::Scan(ScanCommand::Linear {
                start,
                end,
                steps,
                common,
            }) => {
                assert_eq!(start, vec![-0.0048, -0.0262, 0.0676]);
                assert_eq!(end[1], -0.0219);
                assert_eq!(steps, 100);
                assert_eq!(common.triggers, 33);
                assert_eq!(common.name, "edge");
                assert!(!common.no_laser);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_laser_set() {
        let cli = Cli::try_parse_from([
            "tct-cli", "laser", "set", "--frequency", "1000", "--dac", "555", "--status", "on",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Laser(LaserCommand::Set {
                frequency: Some(_),
                dac: Some(555),
                status: Some(tct_sdk::LaserStatus::On),
            })
        ));
    }

    #[test]
    fn test_acquire_with_stages_requires_output() {
        assert!(Cli::try_parse_from(["tct-cli", "scope", "acquire", "--with-stages"]).is_err());
    }
}
