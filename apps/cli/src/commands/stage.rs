//! 平移台命令

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use tct_sdk::Axis;

use crate::devices::{load_config, open_stages, resolve_ports};

/// 平移台命令（坐标单位：米）
#[derive(Subcommand, Debug)]
pub enum StageCommand {
    /// 列出已连接的 XIMC 控制器
    List,

    /// 查询当前位置
    Position,

    /// 绝对移动，未给出的轴不动
    Move {
        #[arg(short, long, allow_negative_numbers = true)]
        x: Option<f64>,
        #[arg(short, long, allow_negative_numbers = true)]
        y: Option<f64>,
        #[arg(short, long, allow_negative_numbers = true)]
        z: Option<f64>,
    },

    /// 相对移动
    MoveRel {
        #[arg(long, allow_negative_numbers = true)]
        dx: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        dy: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        dz: Option<f64>,
    },

    /// 回零（不指定轴时三轴依次回零）
    Home {
        #[arg(short, long, value_parser = parse_axis)]
        axis: Option<Axis>,
    },
}

fn parse_axis(s: &str) -> Result<Axis, String> {
    s.parse::<Axis>().map_err(|e| e.to_string())
}

impl StageCommand {
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        let (_, config) = load_config(explicit)?;

        if let StageCommand::List = self {
            return Self::list(&config);
        }

        let mut stages = open_stages(&config)?;
        match self {
            StageCommand::List | StageCommand::Position => {},
            StageCommand::Move { x, y, z } => {
                println!("⏳ 移动到 x={:?} y={:?} z={:?} m", x, y, z);
                stages.move_to(x, y, z)?;
            },
            StageCommand::MoveRel { dx, dy, dz } => {
                println!("⏳ 相对移动 dx={:?} dy={:?} dz={:?} m", dx, dy, dz);
                stages.move_relative(dx, dy, dz)?;
            },
            StageCommand::Home { axis } => {
                let axes = axis.map_or(Axis::ALL.to_vec(), |a| vec![a]);
                for axis in axes {
                    println!("⏳ {} 轴回零...", axis);
                    stages.stage(axis).home().with_context(|| format!("{} 轴回零失败", axis))?;
                }
            },
        }

        println!("📍 当前位置: {}", stages.position()?);
        Ok(())
    }

    fn list(config: &tct_sdk::SetupConfig) -> Result<()> {
        let devices = tct_sdk::stage::find_ximc_devices()?;
        if devices.is_empty() {
            println!("未找到 XIMC 控制器");
        }
        for device in &devices {
            println!(
                "{}\t{}\tserial={}",
                device.port,
                device.description.as_deref().unwrap_or("-"),
                device.serial_number.as_deref().unwrap_or("-"),
            );
        }

        match resolve_ports(config) {
            Ok(ports) => println!("轴分配: x={} y={} z={}", ports.x, ports.y, ports.z),
            Err(e) => println!("⚠️  无法分配轴: {:#}", e),
        }
        Ok(())
    }
}
