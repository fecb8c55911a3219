//! # 扫描计划
//!
//! 计划只描述“去哪些点、每点触发几次、文件叫什么”，不碰硬件。
//! 三种计划：
//!
//! - [`LinearScan`]: 起点到终点的直线，`n_steps` 个点，文件 `00000.txt` ...
//! - [`XyScan`]: 固定 z 的 `n_steps × n_steps` 方形网格，文件 `nx-ny.txt`
//! - [`FocusScan`]: 固定 x, y 沿 z 扫描，用于找焦点

use serde::{Deserialize, Serialize};
use tct_tools::{grid_file_name, point_file_name};

use crate::error::ControlError;

/// 坐标绝对值上限（米）
pub const MAX_COORDINATE_M: f64 = 1.0;

/// 一个扫描点
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPoint {
    /// 输出文件名（位于 `raw/`）
    pub file_name: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

/// 扫描计划
pub trait ScanPlan: Serialize {
    /// 计划名（日志与目录名）
    fn kind(&self) -> &'static str;

    /// 起始位置，三轴都会移动
    fn start(&self) -> [f64; 3];

    /// 依次访问的点
    fn points(&self) -> Vec<ScanPoint>;

    /// 每点触发次数
    fn n_triggers(&self) -> usize;

    /// 检查参数（不访问硬件）
    fn validate(&self) -> Result<(), ControlError>;
}

/// `[start, end]` 上 `n` 个等距点，首尾精确
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        start + (end - start) * i as f64 / last
                    }
                })
                .collect()
        }
    }
}

/// 拒绝非有限值和超过 1 m 的坐标
pub fn check_coordinate(name: &'static str, value: f64) -> Result<(), ControlError> {
    if !value.is_finite() || value.abs() > MAX_COORDINATE_M {
        return Err(ControlError::CoordinateOutOfRange { name, value });
    }
    Ok(())
}

fn check_counts(n_steps: usize, n_triggers: usize) -> Result<(), ControlError> {
    if n_steps == 0 {
        return Err(ControlError::InvalidScan("n_steps must be at least 1".into()));
    }
    if n_triggers == 0 {
        return Err(ControlError::InvalidScan("n_triggers must be at least 1".into()));
    }
    Ok(())
}

fn default_triggers() -> usize {
    1
}

/// 直线扫描
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScan {
    /// 起点 `[x, y, z]`（米）
    pub start: [f64; 3],
    /// 终点 `[x, y, z]`（米）
    pub end: [f64; 3],
    pub n_steps: usize,
    #[serde(default = "default_triggers")]
    pub n_triggers: usize,
}

impl ScanPlan for LinearScan {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn start(&self) -> [f64; 3] {
        self.start
    }

    fn points(&self) -> Vec<ScanPoint> {
        let axes: Vec<Vec<f64>> = (0..3)
            .map(|i| linspace(self.start[i], self.end[i], self.n_steps))
            .collect();
        // 起点终点相同的轴在起始移动后就不再动
        let moving = |i: usize, n: usize| (self.start[i] != self.end[i]).then(|| axes[i][n]);

        (0..self.n_steps)
            .map(|n| ScanPoint {
                file_name: point_file_name(n),
                x: moving(0, n),
                y: moving(1, n),
                z: moving(2, n),
            })
            .collect()
    }

    fn n_triggers(&self) -> usize {
        self.n_triggers
    }

    fn validate(&self) -> Result<(), ControlError> {
        check_counts(self.n_steps, self.n_triggers)?;
        let names = [
            ("x_start", self.start[0]),
            ("y_start", self.start[1]),
            ("z_start", self.start[2]),
            ("x_end", self.end[0]),
            ("y_end", self.end[1]),
            ("z_end", self.end[2]),
        ];
        for (name, value) in names {
            check_coordinate(name, value)?;
        }
        Ok(())
    }
}

/// 固定 z 的 xy 方形网格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XyScan {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
    /// 焦点高度
    pub z: f64,
    /// 每个方向的点数
    pub n_steps: usize,
    #[serde(default = "default_triggers")]
    pub n_triggers: usize,
}

impl ScanPlan for XyScan {
    fn kind(&self) -> &'static str {
        "xy"
    }

    fn start(&self) -> [f64; 3] {
        [self.x_start, self.y_start, self.z]
    }

    fn points(&self) -> Vec<ScanPoint> {
        let xs = linspace(self.x_start, self.x_end, self.n_steps);
        let ys = linspace(self.y_start, self.y_end, self.n_steps);

        let mut points = Vec::with_capacity(xs.len() * ys.len());
        for (nx, &x) in xs.iter().enumerate() {
            for (ny, &y) in ys.iter().enumerate() {
                points.push(ScanPoint {
                    file_name: grid_file_name(nx, ny),
                    x: Some(x),
                    y: Some(y),
                    z: None,
                });
            }
        }
        points
    }

    fn n_triggers(&self) -> usize {
        self.n_triggers
    }

    fn validate(&self) -> Result<(), ControlError> {
        check_counts(self.n_steps, self.n_triggers)?;
        check_coordinate("x_start", self.x_start)?;
        check_coordinate("x_end", self.x_end)?;
        check_coordinate("y_start", self.y_start)?;
        check_coordinate("y_end", self.y_end)?;
        check_coordinate("z", self.z)
    }
}

/// 沿 z 扫描找焦点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusScan {
    pub x: f64,
    pub y: f64,
    pub z_start: f64,
    pub z_end: f64,
    pub n_steps: usize,
    #[serde(default = "default_triggers")]
    pub n_triggers: usize,
}

impl ScanPlan for FocusScan {
    fn kind(&self) -> &'static str {
        "focus"
    }

    fn start(&self) -> [f64; 3] {
        [self.x, self.y, self.z_start]
    }

    fn points(&self) -> Vec<ScanPoint> {
        linspace(self.z_start, self.z_end, self.n_steps)
            .into_iter()
            .enumerate()
            .map(|(nz, z)| ScanPoint {
                file_name: point_file_name(nz),
                x: None,
                y: None,
                z: Some(z),
            })
            .collect()
    }

    fn n_triggers(&self) -> usize {
        self.n_triggers
    }

    fn validate(&self) -> Result<(), ControlError> {
        check_counts(self.n_steps, self.n_triggers)?;
        check_coordinate("x", self.x)?;
        check_coordinate("y", self.y)?;
        check_coordinate("z_start", self.z_start)?;
        check_coordinate("z_end", self.z_end)
    }
}
