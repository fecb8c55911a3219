//! # 装置配置
//!
//! TCT 装置的共享配置：平移台端口与软限位、激光器默认值、示波器连接参数、测量数据目录。
//!
//! 配置文件路径：
//! - Linux: `~/.config/tct/setup.toml`
//! - macOS: `~/Library/Application Support/tct/setup.toml`
//! - Windows: `%APPDATA%\tct\setup.toml`
//!
//! 缺省字段取默认值，因此只需要写出与默认不同的项：
//!
//! ```toml
//! [stages]
//! ports = { x = "/dev/ttyACM2", y = "/dev/ttyACM3", z = "/dev/ttyACM1" }
//!
//! [stages.serials]
//! 00003A57 = "x"
//! 00003A48 = "y"
//! 000038CE = "z"
//!
//! [scope]
//! transport = "vicp"
//! resource = "192.168.1.50"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tct_laser::LaserOptions;
use tct_scope::{SampleEncoding, ScopeOptions};
use tct_stage::{Axis, AxisLimits, AxisPorts, StageLimits, StageOptions};
use tracing::debug;

use crate::error::ToolsError;

/// 完整装置配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    pub stages: StagesConfig,
    pub laser: LaserConfig,
    pub scope: ScopeConfig,
    pub measurements: MeasurementsConfig,
}

/// 平移台配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    /// 端口锁目录，缺省为 XDG_RUNTIME_DIR 或系统临时目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_dir: Option<PathBuf>,
    /// 阻塞移动的轮询间隔（ms）
    pub wait_refresh_ms: u64,
    /// 各轴串口
    pub ports: PortsConfig,
    /// 控制器序列号 → 轴（非空时通过串口枚举自动确定端口）
    pub serials: BTreeMap<String, String>,
    /// 软限位（m）
    pub limits: LimitsConfig,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            lock_dir: None,
            wait_refresh_ms: 10,
            ports: PortsConfig::default(),
            serials: BTreeMap::new(),
            limits: LimitsConfig::default(),
        }
    }
}

/// 各轴串口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortsConfig {
    pub x: String,
    pub y: String,
    pub z: String,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            x: "COM3".to_string(),
            y: "COM4".to_string(),
            z: "COM5".to_string(),
        }
    }
}

/// 各轴闭区间 `[min, max]`（m）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            x: [-50e-3, 50e-3],
            y: [-50e-3, 50e-3],
            z: [0.0, 90e-3],
        }
    }
}

/// 激光器默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaserConfig {
    pub frequency_hz: f64,
    pub dac: u16,
    pub command_delay_ms: u64,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 1e3,
            dac: 0,
            command_delay_ms: 10,
        }
    }
}

/// 示波器连接方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeTransportKind {
    /// VISA 资源字符串
    #[default]
    Visa,
    /// LeCroy VICP over TCP，`host` 或 `host:port`（缺省端口 1861）
    Vicp,
    /// 裸 SCPI 套接字，`host:port`（例如 5025），不带 VICP 帧
    Tcp,
}

/// 示波器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub transport: ScopeTransportKind,
    pub resource: String,
    pub timeout_ms: u64,
    /// 波形块描述头长度
    pub header_len: usize,
    pub sample_encoding: SampleEncoding,
    pub divisions: f64,
    pub settle_delay_ms: u64,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            transport: ScopeTransportKind::Visa,
            resource: "USB0::0x05FF::0x1023::4751N40408::INSTR".to_string(),
            timeout_ms: 5000,
            header_len: tct_scope::waveform::DEFAULT_HEADER_LEN,
            sample_encoding: SampleEncoding::default(),
            divisions: tct_scope::waveform::DEFAULT_DIVISIONS,
            settle_delay_ms: 100,
        }
    }
}

/// 测量数据目录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementsConfig {
    pub base_path: PathBuf,
    pub prepend_timestamp: bool,
}

impl Default for MeasurementsConfig {
    fn default() -> Self {
        let base_path = dirs::data_dir()
            .map(|dir| dir.join("tct").join("measurements"))
            .unwrap_or_else(|| PathBuf::from("tct_measurements"));
        Self {
            base_path,
            prepend_timestamp: true,
        }
    }
}

impl SetupConfig {
    /// 默认配置文件路径 `<config_dir>/tct/setup.toml`
    pub fn default_path() -> Result<PathBuf, ToolsError> {
        let dir = dirs::config_dir().ok_or(ToolsError::NoConfigDir)?;
        Ok(dir.join("tct").join("setup.toml"))
    }

    /// 从 TOML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ToolsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// 文件不存在时返回默认配置
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ToolsError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_toml(content: &str) -> Result<Self, ToolsError> {
        let config: SetupConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ToolsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存到 TOML 文件（自动创建父目录）
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ToolsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// 校验配置
    ///
    /// 限位有序且有限，激光默认值在范围内，序列号映射到合法轴标签，示波器时基参数为正。
    pub fn validate(&self) -> Result<(), ToolsError> {
        self.stage_limits()?;
        self.serial_map()?;

        tct_laser::protocol::frequency_word(self.laser.frequency_hz)
            .map_err(|e| ToolsError::InvalidConfig(format!("laser.frequency_hz: {e}")))?;
        tct_laser::protocol::validate_intensity(i64::from(self.laser.dac))
            .map_err(|e| ToolsError::InvalidConfig(format!("laser.dac: {e}")))?;

        if !(self.scope.divisions.is_finite() && self.scope.divisions > 0.0) {
            return Err(ToolsError::InvalidConfig(format!(
                "scope.divisions must be positive, got {}",
                self.scope.divisions
            )));
        }
        if self.scope.resource.trim().is_empty() {
            return Err(ToolsError::InvalidConfig("scope.resource is empty".into()));
        }
        Ok(())
    }

    /// 软限位
    pub fn stage_limits(&self) -> Result<StageLimits, ToolsError> {
        let axis = |name: &str, [min, max]: [f64; 2]| {
            AxisLimits::new(min, max)
                .map_err(|e| ToolsError::InvalidConfig(format!("stages.limits.{name}: {e}")))
        };
        Ok(StageLimits {
            x: axis("x", self.stages.limits.x)?,
            y: axis("y", self.stages.limits.y)?,
            z: axis("z", self.stages.limits.z)?,
        })
    }

    /// 固定端口
    pub fn axis_ports(&self) -> AxisPorts {
        let ports = &self.stages.ports;
        AxisPorts::new(&ports.x, &ports.y, &ports.z)
    }

    /// 序列号 → 轴
    pub fn serial_map(&self) -> Result<HashMap<String, Axis>, ToolsError> {
        self.stages
            .serials
            .iter()
            .map(|(serial, axis)| {
                let axis = axis.parse::<Axis>().map_err(|e| {
                    ToolsError::InvalidConfig(format!("stages.serials.{serial}: {e}"))
                })?;
                Ok((serial.clone(), axis))
            })
            .collect()
    }

    pub fn stage_options(&self) -> StageOptions {
        let mut options = StageOptions::default();
        if let Some(dir) = &self.stages.lock_dir {
            options.lock_dir = dir.clone();
        }
        options.wait_refresh = Duration::from_millis(self.stages.wait_refresh_ms);
        options
    }

    pub fn laser_options(&self) -> LaserOptions {
        LaserOptions {
            initial_frequency: self.laser.frequency_hz,
            initial_dac: self.laser.dac,
            command_delay: Duration::from_millis(self.laser.command_delay_ms),
        }
    }

    pub fn scope_options(&self) -> ScopeOptions {
        ScopeOptions {
            header_len: self.scope.header_len,
            encoding: self.scope.sample_encoding,
            divisions: self.scope.divisions,
            settle_delay: Duration::from_millis(self.scope.settle_delay_ms),
        }
    }

    pub fn scope_timeout(&self) -> Duration {
        Duration::from_millis(self.scope.timeout_ms)
    }
}
