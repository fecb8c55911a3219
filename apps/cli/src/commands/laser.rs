//! 激光器命令

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use tct_sdk::LaserStatus;

use crate::devices::{load_config, open_laser};

/// 激光器命令
///
/// 打开设备时控制器会用配置中的频率和 DAC 重新编程激光器，并保持原来的开关状态。
#[derive(Subcommand, Debug)]
pub enum LaserCommand {
    /// 查询开关状态
    Status,

    /// 开启脉冲
    On,

    /// 关闭脉冲
    Off,

    /// 设置频率 / 强度
    Set {
        /// 重复频率（Hz），范围 [50, 100000]
        #[arg(short, long)]
        frequency: Option<f64>,

        /// 强度 DAC 码，范围 [0, 1023]（数值越大光越弱）
        #[arg(short, long)]
        dac: Option<i64>,

        /// 设置后开启或关闭
        #[arg(long, value_parser = parse_status)]
        status: Option<LaserStatus>,
    },
}

fn parse_status(s: &str) -> Result<LaserStatus, String> {
    s.parse::<LaserStatus>().map_err(|e| e.to_string())
}

impl LaserCommand {
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        let (_, config) = load_config(explicit)?;
        let mut laser = open_laser(&config)?;

        match self {
            LaserCommand::Status => {},
            LaserCommand::On => laser.on()?,
            LaserCommand::Off => laser.off()?,
            LaserCommand::Set {
                frequency,
                dac,
                status,
            } => {
                if let Some(hz) = frequency {
                    laser.set_frequency(hz)?;
                }
                if let Some(code) = dac {
                    laser.set_intensity(code)?;
                }
                if let Some(status) = status {
                    laser.set_status(status)?;
                }
            },
        }

        println!("激光器: {}", laser.status()?);
        println!("  频率: {} Hz", laser.frequency());
        println!("  DAC: {}", laser.dac());
        Ok(())
    }
}
