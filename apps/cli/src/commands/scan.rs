//! 扫描命令
//!
//! 创建测量目录 → 打开平移台 / 示波器 / 激光器 → 逐点采集。
//! Ctrl+C 在当前点结束后停止扫描，已写入的文件保留。

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tct_sdk::control::{ScanOptions, ScanPlan};
use tct_sdk::{FocusScan, LinearScan, RunDirectory, Scanner, SetupConfig, XyScan};

use crate::devices::{load_config, open_laser, open_scope, open_stages};

/// 各种扫描共用的参数
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// 测量名称（目录名，空格替换为下划线）
    #[arg(long)]
    pub name: String,

    /// 每点触发次数（逐点平均）
    #[arg(short = 'n', long, default_value_t = 1)]
    pub triggers: usize,

    /// 到位后等待（毫秒）
    #[arg(long, default_value_t = 10)]
    pub settle_ms: u64,

    /// 不控制激光器（外部触发光源）
    #[arg(long)]
    pub no_laser: bool,
}

/// 扫描命令（坐标单位：米）
#[derive(Subcommand, Debug)]
pub enum ScanCommand {
    /// 起点到终点的直线扫描
    Linear {
        /// 起点
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true, required = true)]
        start: Vec<f64>,

        /// 终点
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true, required = true)]
        end: Vec<f64>,

        /// 点数
        #[arg(long)]
        steps: usize,

        #[command(flatten)]
        common: ScanArgs,
    },

    /// 固定 z 的 xy 方形网格
    Xy {
        #[arg(long, allow_negative_numbers = true)]
        x_start: f64,
        #[arg(long, allow_negative_numbers = true)]
        x_end: f64,
        #[arg(long, allow_negative_numbers = true)]
        y_start: f64,
        #[arg(long, allow_negative_numbers = true)]
        y_end: f64,
        /// 焦点高度
        #[arg(long, allow_negative_numbers = true)]
        z: f64,
        /// 每个方向的点数
        #[arg(long)]
        steps: usize,

        #[command(flatten)]
        common: ScanArgs,
    },

    /// 固定 x, y 沿 z 扫描找焦点
    Focus {
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long, allow_negative_numbers = true)]
        z_start: f64,
        #[arg(long, allow_negative_numbers = true)]
        z_end: f64,
        #[arg(long)]
        steps: usize,

        #[command(flatten)]
        common: ScanArgs,
    },
}

fn point(values: &[f64], name: &str) -> Result<[f64; 3]> {
    values
        .try_into()
        .map_err(|_| anyhow::anyhow!("--{} 需要 3 个坐标", name))
}

impl ScanCommand {
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        match self {
            ScanCommand::Linear {
                start,
                end,
                steps,
                common,
            } => {
                let plan = LinearScan {
                    start: point(&start, "start")?,
                    end: point(&end, "end")?,
                    n_steps: steps,
                    n_triggers: common.triggers,
                };
                run_scan(&plan, &common, explicit)
            },
            ScanCommand::Xy {
                x_start,
                x_end,
                y_start,
                y_end,
                z,
                steps,
                common,
            } => {
                let plan = XyScan {
                    x_start,
                    x_end,
                    y_start,
                    y_end,
                    z,
                    n_steps: steps,
                    n_triggers: common.triggers,
                };
                run_scan(&plan, &common, explicit)
            },
            ScanCommand::Focus {
                x,
                y,
                z_start,
                z_end,
                steps,
                common,
            } => {
                let plan = FocusScan {
                    x,
                    y,
                    z_start,
                    z_end,
                    n_steps: steps,
                    n_triggers: common.triggers,
                };
                run_scan(&plan, &common, explicit)
            },
        }
    }
}

/// 创建测量目录，存档配置文件
fn prepare_run_dir(
    common: &ScanArgs,
    config: &SetupConfig,
    config_file: &Path,
) -> Result<RunDirectory> {
    let name = common.name.trim().replace(' ', "_");
    let run_dir = RunDirectory::create(
        &config.measurements.base_path,
        &name,
        config.measurements.prepend_timestamp,
    )
    .context("创建测量目录失败")?;
    if config_file.exists() {
        run_dir.archive_file(config_file)?;
    }
    Ok(run_dir)
}

fn run_scan<S: ScanPlan>(plan: &S, common: &ScanArgs, explicit: Option<&Path>) -> Result<()> {
    // 参数错误在打开任何设备之前报告
    plan.validate()?;

    let (config_file, config) = load_config(explicit)?;
    let stages = open_stages(&config)?;
    let scope = open_scope(&config)?;
    let run_dir = prepare_run_dir(common, &config, &config_file)?;
    println!("📁 测量目录: {}", run_dir.path().display());

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
        eprintln!("\n收到退出信号，当前点结束后停止...");
    })
    .context("无法安装 Ctrl+C 处理器")?;

    let mut scanner = Scanner::new(stages, scope)
        .with_stop_flag(stop)
        .with_options(ScanOptions {
            settle_time: Duration::from_millis(common.settle_ms),
        });
    if !common.no_laser {
        scanner = scanner.with_pulses(open_laser(&config)?);
    }

    println!(
        "⏳ {} 扫描: {} 个点 × {} 次触发",
        plan.kind(),
        plan.points().len(),
        plan.n_triggers()
    );
    let report = scanner.run_in(plan, &run_dir)?;

    println!();
    println!("📊 扫描结果:");
    println!("  完成: {}/{} 个点", report.completed_points(), report.total_points);
    println!("  耗时: {:.1} 秒", report.duration.as_secs_f64());
    if report.stopped {
        println!("⚠️  扫描被中断");
    } else {
        println!("✅ 扫描完成");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_requires_three_values() {
        assert_eq!(point(&[1e-3, -2e-3, 0.05], "start").unwrap(), [1e-3, -2e-3, 0.05]);
        assert!(point(&[1e-3, 2e-3], "start").is_err());
    }

    #[test]
    fn test_prepare_run_dir_archives_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("setup.toml");
        let mut config = SetupConfig::default();
        config.measurements.base_path = dir.path().join("data");
        config.measurements.prepend_timestamp = false;
        config.save(&config_file).unwrap();

        let common = ScanArgs {
            name: "pin diode focus".into(),
            triggers: 1,
            settle_ms: 10,
            no_laser: true,
        };
        let run_dir = prepare_run_dir(&common, &config, &config_file).unwrap();
        assert_eq!(run_dir.name(), "pin_diode_focus");
        assert!(run_dir.scripts_dir().join("setup.toml").exists());
    }
}
