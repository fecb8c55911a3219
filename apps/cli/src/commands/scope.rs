//! 示波器命令

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Subcommand;
use tct_sdk::scope::CHANNEL_COUNT;
use tct_sdk::stage::MultiAxisPosition;
use tct_sdk::tools::{average_acquisitions, write_four_channels};
use tct_sdk::{TriggerMode, Waveform};

use crate::devices::{load_config, open_scope, open_stages};

/// 示波器命令
#[derive(Subcommand, Debug)]
pub enum ScopeCommand {
    /// 查询仪器标识（*IDN?）
    Idn,

    /// 单次触发采集四个通道
    Acquire {
        /// 平均的触发次数
        #[arg(short = 'n', long, default_value_t = 1)]
        triggers: usize,

        /// 写入测量文件
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 从平移台读取位置写入文件头（否则记为原点）
        #[arg(long, requires = "output")]
        with_stages: bool,
    },

    /// 查询或设置触发模式
    Trigger {
        /// AUTO / NORM / SINGLE / STOP
        #[arg(value_parser = parse_trigger_mode)]
        mode: Option<TriggerMode>,
    },
}

fn parse_trigger_mode(s: &str) -> Result<TriggerMode, String> {
    s.parse::<TriggerMode>().map_err(|e| e.to_string())
}

fn summarize(channel: usize, waveform: &Waveform) {
    let (min, max) = waveform
        .voltage
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    println!(
        "  CH{}: {} 点, 电压 [{:.4e}, {:.4e}] V",
        channel,
        waveform.len(),
        min,
        max
    );
}

impl ScopeCommand {
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        let (_, config) = load_config(explicit)?;
        let mut scope = open_scope(&config)?;

        match self {
            ScopeCommand::Idn => println!("{}", scope.idn()?),
            ScopeCommand::Acquire {
                triggers,
                output,
                with_stages,
            } => {
                if triggers == 0 {
                    anyhow::bail!("--triggers 至少为 1");
                }
                let acquisitions = (0..triggers)
                    .map(|_| scope.acquire_all_channels())
                    .collect::<Result<Vec<_>, _>>()?;
                let waveforms = average_acquisitions(&acquisitions)?;

                println!("📊 {} 次触发平均:", triggers);
                for (i, wf) in waveforms.iter().enumerate().take(CHANNEL_COUNT as usize) {
                    summarize(i + 1, wf);
                }

                if let Some(path) = output {
                    let position = if with_stages {
                        open_stages(&config)?.position()?
                    } else {
                        MultiAxisPosition::default()
                    };
                    write_four_channels(&path, position, &waveforms)?;
                    println!("💾 已保存: {}", path.display());
                }
            },
            ScopeCommand::Trigger { mode } => {
                if let Some(mode) = mode {
                    scope.set_trigger_mode(mode)?;
                }
                println!("触发模式: {}", scope.trigger_mode()?);
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trigger_mode() {
        assert_eq!(parse_trigger_mode("single").unwrap(), TriggerMode::Single);
        assert_eq!(parse_trigger_mode("NORM").unwrap(), TriggerMode::Norm);
        assert!(parse_trigger_mode("fast").is_err());
    }
}
