//! 扫描流程集成测试（Mock 平移台 / 示波器 / 激光器）

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use tct_control::{
    ControlError, FocusScan, LinearScan, ScanOptions, Scanner, WaveformSource, XyScan,
};
use tct_laser::{LaserController, LaserOptions, MockLaserTransport};
use tct_scope::{MockInstrument, Oscilloscope, ScopeOptions, TriggerMode, Waveform};
use tct_stage::{
    AxisPorts, MockStageBackend, RESOLUTION_M, StageError, StageLimits, StageOptions, TctStages,
};
use tct_tools::{MeasurementWriter, RunDirectory, read_four_channels};

struct Rig {
    stages: TctStages<MockStageBackend>,
    z: MockStageBackend,
    scope: MockInstrument,
    laser: MockLaserTransport,
    dir: tempfile::TempDir,
}

fn rig() -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let options = StageOptions {
        lock_dir: dir.path().join("locks"),
        wait_refresh: Duration::from_millis(1),
    };
    std::fs::create_dir_all(&options.lock_dir).unwrap();
    let backends = [
        MockStageBackend::with_serial(1),
        MockStageBackend::with_serial(2),
        MockStageBackend::with_serial(3),
    ];
    let z = backends[2].clone();
    let ports = AxisPorts::new("ttyACM0", "ttyACM1", "ttyACM2");
    let stages = TctStages::open_with(&ports, StageLimits::default(), &options, |axis| {
        backends[axis as usize].clone()
    })
    .unwrap();

    Rig {
        stages,
        z,
        scope: MockInstrument::new(),
        laser: MockLaserTransport::new(),
        dir,
    }
}

fn oscilloscope(mock: &MockInstrument) -> Oscilloscope<MockInstrument> {
    Oscilloscope::new(
        mock.clone(),
        ScopeOptions {
            settle_delay: Duration::ZERO,
            ..ScopeOptions::default()
        },
    )
}

fn laser(mock: &MockLaserTransport) -> LaserController<MockLaserTransport> {
    let options = LaserOptions {
        command_delay: Duration::ZERO,
        ..LaserOptions::default()
    };
    let laser = LaserController::with_transport(mock.clone(), options).unwrap();
    mock.clear_packets();
    laser
}

fn fast() -> ScanOptions {
    ScanOptions {
        settle_time: Duration::ZERO,
    }
}

#[test]
fn test_focus_scan_writes_one_file_per_point() {
    let mut rig = rig();
    rig.scope.set_samples(1, &[25, 50, 0, 0]);
    for channel in 2..=4 {
        rig.scope.set_samples(channel, &[0; 4]);
    }
    let writer = MeasurementWriter::new(rig.dir.path().join("raw")).unwrap();
    let plan = FocusScan {
        x: 10e-3,
        y: -5e-3,
        z_start: 20e-3,
        z_end: 30e-3,
        n_steps: 3,
        n_triggers: 2,
    };

    let report = Scanner::new(&mut rig.stages, oscilloscope(&rig.scope))
        .with_options(fast())
        .run(&plan, &writer)
        .unwrap();

    assert!(!report.stopped);
    assert_eq!(report.kind, "focus");
    assert_eq!(report.total_points, 3);
    assert_eq!(report.completed_points(), 3);
    assert_eq!(report.files[2], writer.dir().join("00002.txt"));

    let trace = read_four_channels(&report.files[1]).unwrap();
    assert_abs_diff_eq!(trace.position.x, 10e-3, epsilon = RESOLUTION_M);
    assert_abs_diff_eq!(trace.position.y, -5e-3, epsilon = RESOLUTION_M);
    assert_abs_diff_eq!(trace.position.z, 25e-3, epsilon = RESOLUTION_M);
    assert_eq!(trace.len(), 4);
    assert_relative_eq!(trace.channels[0][0], 0.1);
    assert_relative_eq!(trace.channels[0][1], 0.2);

    // 3 个点 × 2 次触发，每次都恢复原触发模式
    let singles = rig
        .scope
        .mode_history()
        .iter()
        .filter(|m| **m == TriggerMode::Single)
        .count();
    assert_eq!(singles, 6);
    assert_eq!(rig.scope.trigger_mode(), TriggerMode::Norm);

    let final_position = rig.stages.position().unwrap();
    assert_abs_diff_eq!(final_position.z, 30e-3, epsilon = RESOLUTION_M);
}

#[test]
fn test_xy_scan_grid_files() {
    let mut rig = rig();
    let writer = MeasurementWriter::new(rig.dir.path().join("raw")).unwrap();
    let plan = XyScan {
        x_start: 0.0,
        x_end: 1e-3,
        y_start: 0.0,
        y_end: 1e-3,
        z: 54.5e-3,
        n_steps: 2,
        n_triggers: 1,
    };

    let z_before = rig.z.motion_count();
    let report = Scanner::new(&mut rig.stages, oscilloscope(&rig.scope))
        .with_options(fast())
        .run(&plan, &writer)
        .unwrap();

    let names: Vec<String> = report
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        ["00000-00000.txt", "00000-00001.txt", "00001-00000.txt", "00001-00001.txt"]
    );
    // z 只在起始移动时动一次
    assert_eq!(rig.z.motion_count() - z_before, 1);

    let corner = read_four_channels(&report.files[3]).unwrap();
    assert_abs_diff_eq!(corner.position.x, 1e-3, epsilon = RESOLUTION_M);
    assert_abs_diff_eq!(corner.position.y, 1e-3, epsilon = RESOLUTION_M);
    assert_abs_diff_eq!(corner.position.z, 54.5e-3, epsilon = RESOLUTION_M);
}

#[test]
fn test_laser_on_during_scan_and_off_afterwards() {
    let mut rig = rig();
    let writer = MeasurementWriter::new(rig.dir.path().join("raw")).unwrap();
    let plan = LinearScan {
        start: [0.0, 0.0, 10e-3],
        end: [2e-3, 0.0, 10e-3],
        n_steps: 2,
        n_triggers: 1,
    };

    assert!(!rig.laser.is_on());
    Scanner::new(&mut rig.stages, oscilloscope(&rig.scope))
        .with_pulses(laser(&rig.laser))
        .with_options(fast())
        .run(&plan, &writer)
        .unwrap();

    let packets = rig.laser.packets();
    assert_eq!(packets.last(), Some(&vec![4]));
    assert!(packets.contains(&vec![91]));
    assert!(!rig.laser.is_on());
}

#[test]
fn test_laser_turned_off_when_scan_fails() {
    let mut rig = rig();
    rig.scope.fail_channel(Some(3));
    let writer = MeasurementWriter::new(rig.dir.path().join("raw")).unwrap();
    let plan = FocusScan {
        x: 0.0,
        y: 0.0,
        z_start: 10e-3,
        z_end: 20e-3,
        n_steps: 2,
        n_triggers: 1,
    };

    let err = Scanner::new(&mut rig.stages, oscilloscope(&rig.scope))
        .with_pulses(laser(&rig.laser))
        .with_options(fast())
        .run(&plan, &writer)
        .unwrap_err();

    assert!(matches!(err, ControlError::Scope(_)));
    assert!(!rig.laser.is_on());
    assert_eq!(rig.scope.trigger_mode(), TriggerMode::Norm);
    assert!(!writer.dir().join("00000.txt").exists());
}

#[test]
fn test_point_outside_stage_limits_aborts_scan() {
    let mut rig = rig();
    let writer = MeasurementWriter::new(rig.dir.path().join("raw")).unwrap();
    // z 软限位 [0, 90 mm]
    let plan = FocusScan {
        x: 0.0,
        y: 0.0,
        z_start: 80e-3,
        z_end: 120e-3,
        n_steps: 3,
        n_triggers: 1,
    };

    let err = Scanner::new(&mut rig.stages, oscilloscope(&rig.scope))
        .with_pulses(laser(&rig.laser))
        .with_options(fast())
        .run(&plan, &writer)
        .unwrap_err();

    assert!(matches!(err, ControlError::Stage(StageError::OutOfLimits { .. })));
    assert!(err.is_validation());
    assert!(writer.dir().join("00000.txt").exists());
    assert!(!writer.dir().join("00001.txt").exists());
    assert!(!rig.laser.is_on());
}

#[test]
fn test_unit_mistake_rejected_before_any_motion() {
    let mut rig = rig();
    let writer = MeasurementWriter::new(rig.dir.path().join("raw")).unwrap();
    let plan = FocusScan {
        x: 0.0,
        y: 0.0,
        z_start: 49.3,
        z_end: 58e-3,
        n_steps: 3,
        n_triggers: 1,
    };
    rig.z.clear_calls();

    let err = Scanner::new(&mut rig.stages, oscilloscope(&rig.scope))
        .with_pulses(laser(&rig.laser))
        .run(&plan, &writer)
        .unwrap_err();

    assert!(matches!(err, ControlError::CoordinateOutOfRange { name: "z_start", .. }));
    assert_eq!(rig.z.motion_count(), 0);
    assert!(rig.laser.packets().is_empty());
}

/// 采集若干次后置位停止标志
struct StopAfter<W> {
    inner: W,
    remaining: usize,
    stop: Arc<AtomicBool>,
}

impl<W: WaveformSource> WaveformSource for StopAfter<W> {
    fn acquire(&mut self) -> Result<[Waveform; 4], ControlError> {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.stop.store(true, Ordering::SeqCst);
        }
        self.inner.acquire()
    }
}

#[test]
fn test_stop_flag_ends_scan_between_points() {
    let mut rig = rig();
    let stop = Arc::new(AtomicBool::new(false));
    let source = StopAfter {
        inner: oscilloscope(&rig.scope),
        remaining: 2,
        stop: Arc::clone(&stop),
    };
    let writer = MeasurementWriter::new(rig.dir.path().join("raw")).unwrap();
    let plan = LinearScan {
        start: [0.0, 0.0, 0.0],
        end: [4e-3, 0.0, 0.0],
        n_steps: 5,
        n_triggers: 1,
    };

    let report = Scanner::new(&mut rig.stages, source)
        .with_stop_flag(stop)
        .with_options(fast())
        .run(&plan, &writer)
        .unwrap();

    assert!(report.stopped);
    assert_eq!(report.total_points, 5);
    assert_eq!(report.completed_points(), 2);
}

#[test]
fn test_run_in_directory_archives_parameters() {
    let mut rig = rig();
    let run_dir = RunDirectory::create(rig.dir.path(), "focus_test", false).unwrap();
    let plan = FocusScan {
        x: 0.0,
        y: 0.0,
        z_start: 10e-3,
        z_end: 11e-3,
        n_steps: 2,
        n_triggers: 3,
    };

    let report = Scanner::new(&mut rig.stages, oscilloscope(&rig.scope))
        .with_options(fast())
        .run_in(&plan, &run_dir)
        .unwrap();

    assert_eq!(report.files[0], run_dir.raw_dir().join("00000.txt"));
    let saved = std::fs::read_to_string(run_dir.scripts_dir().join("parameters.toml")).unwrap();
    let parsed: FocusScan = toml::from_str(&saved).unwrap();
    assert_eq!(parsed, plan);
}
