//! # 测量文件格式
//!
//! 每个扫描点一个制表符分隔的文本文件：
//!
//! ```text
//! # x_position = 0.0212
//! # y_position = 0.0371
//! # z_position = 0.0542
//! # Time (s)	CH1 (V)	CH2 (V)	CH3 (V)	CH4 (V)
//! -5e-9	0.001	-0.002	0	0.0004
//! ...
//! ```
//!
//! 时间列取自 CH1。

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tct_scope::Waveform;
use tct_stage::MultiAxisPosition;
use tracing::debug;

use crate::error::ToolsError;

/// 列标题行
pub const COLUMN_HEADER: &str = "# Time (s)\tCH1 (V)\tCH2 (V)\tCH3 (V)\tCH4 (V)";

/// 单点测量文件内容
#[derive(Debug, Clone, PartialEq)]
pub struct FourChannelTrace {
    pub position: MultiAxisPosition,
    pub time: Vec<f64>,
    pub channels: [Vec<f64>; 4],
}

impl FourChannelTrace {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// 第 `channel` 通道（1..=4）的波形
    pub fn waveform(&self, channel: usize) -> Option<Waveform> {
        let voltage = self.channels.get(channel.checked_sub(1)?)?.clone();
        Some(Waveform {
            time: self.time.clone(),
            voltage,
        })
    }
}

/// 线扫 / 焦点扫描文件名：`00042.txt`
pub fn point_file_name(index: usize) -> String {
    format!("{index:05}.txt")
}

/// 网格扫描文件名：`00003-00017.txt`
pub fn grid_file_name(nx: usize, ny: usize) -> String {
    format!("{nx:05}-{ny:05}.txt")
}

fn check_lengths(waveforms: &[Waveform; 4]) -> Result<usize, ToolsError> {
    let expected = waveforms[0].time.len();
    for (i, wf) in waveforms.iter().enumerate() {
        for actual in [wf.time.len(), wf.voltage.len()] {
            if actual != expected {
                return Err(ToolsError::LengthMismatch {
                    channel: i + 1,
                    expected,
                    actual,
                });
            }
        }
    }
    Ok(expected)
}

/// 写入四通道测量文件
pub fn write_four_channels(
    path: impl AsRef<Path>,
    position: MultiAxisPosition,
    waveforms: &[Waveform; 4],
) -> Result<(), ToolsError> {
    let path = path.as_ref();
    let len = check_lengths(waveforms)?;

    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# x_position = {}", position.x)?;
    writeln!(out, "# y_position = {}", position.y)?;
    writeln!(out, "# z_position = {}", position.z)?;
    writeln!(out, "{COLUMN_HEADER}")?;
    for i in 0..len {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            waveforms[0].time[i],
            waveforms[0].voltage[i],
            waveforms[1].voltage[i],
            waveforms[2].voltage[i],
            waveforms[3].voltage[i],
        )?;
    }
    out.flush()?;

    debug!("Wrote {} samples to {}", len, path.display());
    Ok(())
}

/// 读取四通道测量文件
pub fn read_four_channels(path: impl AsRef<Path>) -> Result<FourChannelTrace, ToolsError> {
    let path = path.as_ref();
    let parse_error = |line: usize, reason: String| ToolsError::Parse {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let reader = BufReader::new(File::open(path)?);
    let mut position = [None; 3];
    let mut time = Vec::new();
    let mut channels: [Vec<f64>; 4] = Default::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('#') {
            if let Some((key, value)) = comment.split_once('=') {
                let slot = match key.trim() {
                    "x_position" => 0,
                    "y_position" => 1,
                    "z_position" => 2,
                    _ => continue,
                };
                let value = value
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| parse_error(line_no, format!("{}: {e}", key.trim())))?;
                position[slot] = Some(value);
            }
            continue;
        }

        let values = trimmed
            .split('\t')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| parse_error(line_no, e.to_string()))?;
        if values.len() != 5 {
            return Err(parse_error(
                line_no,
                format!("expected 5 columns, got {}", values.len()),
            ));
        }
        time.push(values[0]);
        for (channel, value) in channels.iter_mut().zip(&values[1..]) {
            channel.push(*value);
        }
    }

    let [x, y, z] = position;
    let (Some(x), Some(y), Some(z)) = (x, y, z) else {
        return Err(parse_error(0, "missing position header".into()));
    };

    Ok(FourChannelTrace {
        position: MultiAxisPosition::new(x, y, z),
        time,
        channels,
    })
}

/// 多次触发的逐点平均（时间轴取第一条）
pub fn average_waveforms(waveforms: &[Waveform]) -> Result<Waveform, ToolsError> {
    let first = waveforms.first().ok_or(ToolsError::EmptyAverage)?;
    let len = first.voltage.len();

    let mut sum = vec![0.0; len];
    for (i, wf) in waveforms.iter().enumerate() {
        if wf.voltage.len() != len {
            return Err(ToolsError::LengthMismatch {
                channel: i + 1,
                expected: len,
                actual: wf.voltage.len(),
            });
        }
        for (acc, v) in sum.iter_mut().zip(&wf.voltage) {
            *acc += v;
        }
    }

    let n = waveforms.len() as f64;
    Ok(Waveform {
        time: first.time.clone(),
        voltage: sum.into_iter().map(|v| v / n).collect(),
    })
}

/// 四通道逐通道平均
pub fn average_acquisitions(acquisitions: &[[Waveform; 4]]) -> Result<[Waveform; 4], ToolsError> {
    if acquisitions.is_empty() {
        return Err(ToolsError::EmptyAverage);
    }
    let channel = |c: usize| -> Result<Waveform, ToolsError> {
        let traces: Vec<Waveform> = acquisitions.iter().map(|a| a[c].clone()).collect();
        average_waveforms(&traces)
    };
    Ok([channel(0)?, channel(1)?, channel(2)?, channel(3)?])
}

/// 写入某个目录下的测量文件
#[derive(Debug, Clone)]
pub struct MeasurementWriter {
    dir: PathBuf,
}

impl MeasurementWriter {
    /// 目录不存在时自动创建
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ToolsError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入 `<dir>/<file_name>`，返回完整路径
    pub fn write_four_channels(
        &self,
        file_name: &str,
        position: MultiAxisPosition,
        waveforms: &[Waveform; 4],
    ) -> Result<PathBuf, ToolsError> {
        let path = self.dir.join(file_name);
        write_four_channels(&path, position, waveforms)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn waveform(time: &[f64], voltage: &[f64]) -> Waveform {
        Waveform {
            time: time.to_vec(),
            voltage: voltage.to_vec(),
        }
    }

    fn four(len: usize) -> [Waveform; 4] {
        let time: Vec<f64> = (0..len).map(|i| i as f64 * 1e-10 - 5e-9).collect();
        std::array::from_fn(|c| Waveform {
            time: time.clone(),
            voltage: (0..len).map(|i| (c + 1) as f64 * 1e-3 * i as f64).collect(),
        })
    }

    #[test]
    fn test_file_names() {
        assert_eq!(point_file_name(42), "00042.txt");
        assert_eq!(grid_file_name(3, 17), "00003-00017.txt");
    }

    #[test]
    fn test_write_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00000.txt");
        let waveforms = [
            waveform(&[0.0, 1e-9], &[0.5, -0.25]),
            waveform(&[0.0, 1e-9], &[1.0, 2.0]),
            waveform(&[0.0, 1e-9], &[0.0, 0.0]),
            waveform(&[0.0, 1e-9], &[-1.0, 3.5]),
        ];
        write_four_channels(&path, MultiAxisPosition::new(0.01, -0.005, 0.02), &waveforms)
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "# x_position = 0.01");
        assert_eq!(lines[1], "# y_position = -0.005");
        assert_eq!(lines[2], "# z_position = 0.02");
        assert_eq!(lines[3], COLUMN_HEADER);
        assert_eq!(lines[4], "0\t0.5\t1\t0\t-1");
        assert_eq!(lines[5], "0.000000001\t-0.25\t2\t0\t3.5");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MeasurementWriter::new(dir.path().join("raw")).unwrap();
        let waveforms = four(100);
        let position = MultiAxisPosition::new(21.2e-3, 37.1e-3, 54.27e-3);

        let path = writer
            .write_four_channels(&grid_file_name(1, 2), position, &waveforms)
            .unwrap();
        let trace = read_four_channels(&path).unwrap();

        assert_eq!(trace.position, position);
        assert_eq!(trace.len(), 100);
        assert_eq!(trace.time, waveforms[0].time);
        for c in 0..4 {
            assert_eq!(trace.channels[c], waveforms[c].voltage);
        }
        assert_eq!(trace.waveform(2).unwrap(), waveforms[1]);
        assert!(trace.waveform(0).is_none());
        assert!(trace.waveform(5).is_none());
    }

    #[test]
    fn test_write_rejects_mismatched_channels() {
        let dir = tempfile::tempdir().unwrap();
        let mut waveforms = four(10);
        waveforms[2].voltage.pop();
        let err = write_four_channels(
            dir.path().join("bad.txt"),
            MultiAxisPosition::default(),
            &waveforms,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ToolsError::LengthMismatch { channel: 3, expected: 10, actual: 9 }
        ));
        assert!(!dir.path().join("bad.txt").exists());
    }

    #[test]
    fn test_read_rejects_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        fs::write(
            &path,
            "# x_position = 0\n# y_position = 0\n# z_position = 0\n# Time (s)\tCH1 (V)\n1\t2\t3\n",
        )
        .unwrap();
        let err = read_four_channels(&path).unwrap_err();
        assert!(matches!(err, ToolsError::Parse { line: 5, .. }));

        fs::write(&path, "1\t2\t3\t4\t5\n").unwrap();
        assert!(matches!(read_four_channels(&path), Err(ToolsError::Parse { .. })));
    }

    #[test]
    fn test_average_waveforms() {
        let avg = average_waveforms(&[
            waveform(&[0.0, 1.0], &[1.0, 2.0]),
            waveform(&[0.0, 1.0], &[3.0, 6.0]),
        ])
        .unwrap();
        assert_eq!(avg.time, vec![0.0, 1.0]);
        assert_relative_eq!(avg.voltage[0], 2.0);
        assert_relative_eq!(avg.voltage[1], 4.0);

        assert!(matches!(average_waveforms(&[]), Err(ToolsError::EmptyAverage)));
        assert!(
            average_waveforms(&[waveform(&[0.0], &[1.0]), waveform(&[0.0, 1.0], &[1.0, 2.0])])
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn test_average_acquisitions_single_is_identity() {
        let acquisition = four(8);
        let avg = average_acquisitions(std::slice::from_ref(&acquisition)).unwrap();
        assert_eq!(avg, acquisition);
    }
}
