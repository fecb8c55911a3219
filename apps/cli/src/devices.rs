//! 设备打开
//!
//! 每个命令独立执行：读取配置 → 打开用到的设备 → 执行 → 释放（端口锁随之释放）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tct_sdk::scope::{InstrumentTransport, TcpInstrument, VicpInstrument};
use tct_sdk::stage::{AxisPorts, StageBackend};
use tct_sdk::tools::ScopeTransportKind;
use tct_sdk::{Oscilloscope, SetupConfig};
use tracing::info;

/// 配置文件路径（命令行优先）
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => SetupConfig::default_path().context("无法确定配置文件路径"),
    }
}

/// 加载配置，文件不存在时使用默认值
pub fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, SetupConfig)> {
    let path = config_path(explicit)?;
    let config = SetupConfig::load_or_default(&path)
        .with_context(|| format!("加载配置失败: {}", path.display()))?;
    Ok((path, config))
}

/// 三个轴的串口
///
/// 配置了序列号映射时按序列号查找 XIMC 控制器，否则使用固定端口。
pub fn resolve_ports(config: &SetupConfig) -> Result<AxisPorts> {
    if config.stages.serials.is_empty() {
        return Ok(config.axis_ports());
    }
    let serials = config.serial_map()?;
    let devices = tct_sdk::stage::find_ximc_devices().context("枚举串口失败")?;
    let ports = tct_sdk::stage::map_axes_to_ports(&devices, &serials)
        .context("无法按序列号找到全部三个轴")?;
    info!("Stages: x={} y={} z={}", ports.x, ports.y, ports.z);
    Ok(ports)
}

pub type Stages = tct_sdk::TctStages<Box<dyn StageBackend>>;

/// 打开三轴平移台
#[cfg(feature = "ximc")]
pub fn open_stages(config: &SetupConfig) -> Result<Stages> {
    let ports = resolve_ports(config)?;
    let stages = tct_sdk::TctStages::open_with(
        &ports,
        config.stage_limits()?,
        &config.stage_options(),
        |_| Box::new(tct_sdk::stage::XimcBackend::new()) as Box<dyn StageBackend>,
    )
    .context("打开平移台失败")?;
    Ok(stages)
}

#[cfg(not(feature = "ximc"))]
pub fn open_stages(_config: &SetupConfig) -> Result<Stages> {
    anyhow::bail!("tct-cli 未启用 `ximc` feature，无法控制平移台")
}

pub type Laser = tct_sdk::LaserController<tct_sdk::laser::UsbLaserTransport>;

/// 打开激光器
pub fn open_laser(config: &SetupConfig) -> Result<Laser> {
    tct_sdk::LaserController::open_with_options(config.laser_options())
        .context("打开激光器失败（VID 0xC251 / PID 0x2201）")
}

pub type Scope = Oscilloscope<Box<dyn InstrumentTransport>>;

/// 按配置连接示波器（VICP、裸 SCPI 套接字或 VISA）
pub fn open_scope(config: &SetupConfig) -> Result<Scope> {
    let resource = config.scope.resource.as_str();
    let timeout = config.scope_timeout();
    let transport: Box<dyn InstrumentTransport> = match config.scope.transport {
        ScopeTransportKind::Vicp => Box::new(VicpInstrument::connect(resource, timeout)?),
        ScopeTransportKind::Tcp => Box::new(TcpInstrument::connect(resource, timeout)?),
        ScopeTransportKind::Visa => open_visa(resource, timeout)?,
    };
    info!("Connected to oscilloscope at {}", resource);
    Ok(Oscilloscope::new(transport, config.scope_options()))
}

#[cfg(feature = "visa")]
fn open_visa(resource: &str, timeout: Duration) -> Result<Box<dyn InstrumentTransport>> {
    Ok(Box::new(tct_sdk::scope::VisaInstrument::open(resource, timeout)?))
}

#[cfg(not(feature = "visa"))]
fn open_visa(resource: &str, _timeout: Duration) -> Result<Box<dyn InstrumentTransport>> {
    anyhow::bail!(
        "{} 需要 VISA 传输，但 tct-cli 未启用 `visa` feature（或在配置中改用 transport = \"vicp\"）",
        resource
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.toml");
        let (loaded_path, config) = load_config(Some(&path)).unwrap();
        assert_eq!(loaded_path, path);
        assert_eq!(config, SetupConfig::default());
    }

    #[test]
    fn test_resolve_ports_without_serials() {
        let config = SetupConfig::default();
        let ports = resolve_ports(&config).unwrap();
        assert_eq!(ports.x, "COM3");
        assert_eq!(ports.z, "COM5");
    }

    #[cfg(not(feature = "visa"))]
    #[test]
    fn test_visa_requires_feature() {
        let config = SetupConfig::default();
        let err = open_scope(&config).err().unwrap();
        assert!(err.to_string().contains("visa"));
    }
}
