//! # 扫描执行器
//!
//! 每个点：移动 → 稳定等待 → 触发 `n_triggers` 次并逐点平均 → 读回实际位置 → 写
//! `raw/<file>`。两点之间检查停止标志（Ctrl+C）。
//!
//! 给定脉冲光源时，扫描前开启、扫描后关闭，出错时也会关闭。

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tct_tools::{MeasurementWriter, RunDirectory, average_acquisitions};
use tracing::{debug, info, warn};

use crate::devices::{Positioner, PulseSource, WaveformSource};
use crate::error::ControlError;
use crate::plan::{ScanPlan, ScanPoint};

/// 扫描选项
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// 到位后、采集前的等待
    pub settle_time: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            settle_time: Duration::from_millis(10),
        }
    }
}

/// 扫描结果
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub kind: &'static str,
    pub total_points: usize,
    /// 已写入的文件（按扫描顺序）
    pub files: Vec<PathBuf>,
    /// 是否被停止标志中断
    pub stopped: bool,
    pub duration: Duration,
}

impl ScanReport {
    pub fn completed_points(&self) -> usize {
        self.files.len()
    }
}

/// 扫描执行器
///
/// 拥有（或借用，见 `&mut T` 的 trait 实现）定位台和示波器，激光器可选。
pub struct Scanner<P, W> {
    positioner: P,
    source: W,
    pulses: Option<Box<dyn PulseSource>>,
    options: ScanOptions,
    stop: Arc<AtomicBool>,
}

impl<P: Positioner, W: WaveformSource> Scanner<P, W> {
    pub fn new(positioner: P, source: W) -> Self {
        Self {
            positioner,
            source,
            pulses: None,
            options: ScanOptions::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 扫描期间开启的脉冲光源
    pub fn with_pulses(mut self, pulses: impl PulseSource + 'static) -> Self {
        self.pulses = Some(Box::new(pulses));
        self
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    /// 共享外部停止标志（例如 Ctrl+C 处理器持有的那个）
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// 停止标志，置为 `true` 后在下一个点之前结束
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn positioner(&mut self) -> &mut P {
        &mut self.positioner
    }

    pub fn into_parts(self) -> (P, W, Option<Box<dyn PulseSource>>) {
        (self.positioner, self.source, self.pulses)
    }

    /// 在测量目录中执行扫描：参数写入 `scripts/parameters.toml`，数据写入 `raw/`
    pub fn run_in<S: ScanPlan>(
        &mut self,
        plan: &S,
        run_dir: &RunDirectory,
    ) -> Result<ScanReport, ControlError> {
        plan.validate()?;
        run_dir.save_parameters(plan)?;
        let writer = MeasurementWriter::new(run_dir.raw_dir())?;
        self.run(plan, &writer)
    }

    /// 执行扫描
    pub fn run<S: ScanPlan>(
        &mut self,
        plan: &S,
        writer: &MeasurementWriter,
    ) -> Result<ScanReport, ControlError> {
        plan.validate()?;

        if let Some(pulses) = self.pulses.as_mut() {
            pulses.pulses_on()?;
        }
        let result = self.scan(plan, writer);
        if let Some(pulses) = self.pulses.as_mut() {
            match pulses.pulses_off() {
                Ok(()) => {},
                Err(e) if result.is_ok() => return Err(e),
                Err(e) => warn!("Cannot turn the laser off after a failed scan: {}", e),
            }
        }
        result
    }

    fn scan<S: ScanPlan>(
        &mut self,
        plan: &S,
        writer: &MeasurementWriter,
    ) -> Result<ScanReport, ControlError> {
        let started = Instant::now();
        let points = plan.points();
        let mut report = ScanReport {
            kind: plan.kind(),
            total_points: points.len(),
            files: Vec::with_capacity(points.len()),
            stopped: false,
            duration: Duration::ZERO,
        };

        let [x, y, z] = plan.start();
        info!("Moving to start position ({}, {}, {}) m", x, y, z);
        self.positioner.move_to(Some(x), Some(y), Some(z))?;

        for (n, point) in points.iter().enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                warn!("Scan stopped after {}/{} points", n, points.len());
                report.stopped = true;
                break;
            }
            info!("Point {}/{}: {}", n + 1, points.len(), point.file_name);
            let path = self.measure_point(point, plan.n_triggers(), writer)?;
            report.files.push(path);
        }

        report.duration = started.elapsed();
        info!(
            "{} scan finished: {}/{} points in {:.1} s",
            report.kind,
            report.completed_points(),
            report.total_points,
            report.duration.as_secs_f64()
        );
        Ok(report)
    }

    fn measure_point(
        &mut self,
        point: &ScanPoint,
        n_triggers: usize,
        writer: &MeasurementWriter,
    ) -> Result<PathBuf, ControlError> {
        self.positioner.move_to(point.x, point.y, point.z)?;
        if !self.options.settle_time.is_zero() {
            spin_sleep::sleep(self.options.settle_time);
        }

        let acquisitions = (0..n_triggers)
            .map(|_| self.source.acquire())
            .collect::<Result<Vec<_>, _>>()?;
        let averaged = average_acquisitions(&acquisitions)?;

        let position = self.positioner.position()?;
        debug!("Measured {} triggers at {}", n_triggers, position);
        Ok(writer.write_four_channels(&point.file_name, position, &averaged)?)
    }
}
