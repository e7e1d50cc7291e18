//! Writers for the per-run report files.
//!
//! Three files land in each run's output directory: the report record as a
//! single JSON document, and the latency records and loss series as
//! line-delimited JSON, one record per line, in the same spirit as the
//! capture files themselves.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use lagline_core::repair::CorrectedCounterPoint;
use serde::Serialize;

use crate::evaluator::RunEvaluation;

/// File name of the report record.
pub const PERFORMANCE_FILE: &str = "performance.json";
/// File name of the per-sequence latency records.
pub const LATENCIES_FILE: &str = "latencies.jsonl";
/// File name of the loss-over-time series.
pub const LOSS_SERIES_FILE: &str = "loss_series.jsonl";

/// Errors produced by [`write_run`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error writing a report file.
    #[error("Failed to write report file {path:?}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Error serializing a report record.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// One line of the loss-over-time series file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct LossRow {
    /// Seconds since run start.
    elapsed_seconds: f64,
    /// Cumulative datagrams sent.
    total: u64,
    /// Corrected cumulative losses.
    losses: u64,
    /// Losses since the previous row.
    delta: u64,
}

impl From<&CorrectedCounterPoint> for LossRow {
    fn from(point: &CorrectedCounterPoint) -> Self {
        Self {
            elapsed_seconds: point.elapsed_time,
            total: point.observed_total,
            losses: point.cumulative_value,
            delta: point.delta,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> Error {
    let path = path.to_path_buf();
    move |source| Error::Io {
        path,
        source: Box::new(source),
    }
}

fn write_lines<T: Serialize>(path: &Path, records: impl Iterator<Item = T>) -> Result<(), Error> {
    let file = File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n").map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))
}

/// Write one run's report files beneath `output_dir`, creating it as
/// needed. The latency record file is written only when `latency_records`
/// is set.
///
/// # Errors
///
/// Returns an error when a directory or file cannot be created or a record
/// cannot be serialized.
pub fn write_run(
    output_dir: &Path,
    evaluation: &RunEvaluation,
    latency_records: bool,
) -> Result<(), Error> {
    std::fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;

    let performance_path = output_dir.join(PERFORMANCE_FILE);
    let file = File::create(&performance_path).map_err(io_error(&performance_path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &evaluation.report)?;
    writer.write_all(b"\n").map_err(io_error(&performance_path))?;
    writer.flush().map_err(io_error(&performance_path))?;

    if latency_records {
        write_lines(
            &output_dir.join(LATENCIES_FILE),
            evaluation.latencies.iter(),
        )?;
    }

    write_lines(
        &output_dir.join(LOSS_SERIES_FILE),
        evaluation.loss_series.iter().map(LossRow::from),
    )
}

#[cfg(test)]
mod test {
    use lagline_core::{
        reconcile::{LatencyRecord, LatencyStats, RunStatistics},
        repair::CorrectedCounterPoint,
    };

    use super::{LATENCIES_FILE, LOSS_SERIES_FILE, PERFORMANCE_FILE, write_run};
    use crate::evaluator::{Basic, Measured, RunEvaluation, RunReport};

    fn evaluation() -> RunEvaluation {
        RunEvaluation {
            report: RunReport {
                basic: Basic {
                    run_uid: "r1".to_string(),
                    datagram_size: 80,
                    cycle_time_us: 1_000,
                },
                test: Measured {
                    duration_seconds: 10.0,
                    datagrams: 2,
                    bandwidth_bits_per_second: 128.0,
                },
                statistics: RunStatistics {
                    packet_loss: false,
                    in_order: true,
                    latency: LatencyStats {
                        mean: 0.15,
                        std_dev: 0.05,
                        min: 0.1,
                        max: 0.2,
                        range: 0.1,
                        mean_abs_deviation: 0.05,
                    },
                },
            },
            latencies: vec![
                LatencyRecord {
                    sequence: 0,
                    latency: 0.2,
                },
                LatencyRecord {
                    sequence: 1,
                    latency: 0.1,
                },
            ],
            loss_series: vec![CorrectedCounterPoint {
                cumulative_value: 1,
                observed_total: 2,
                delta: 1,
                elapsed_time: 10.0,
            }],
        }
    }

    #[test]
    fn writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        write_run(dir.path(), &evaluation(), true).unwrap();

        let performance: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(PERFORMANCE_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(performance["basic"]["run_uid"], "r1");
        assert_eq!(performance["statistics"]["packet_loss"], false);
        // LatencyStats flattens into the statistics block.
        assert_eq!(performance["statistics"]["mean"], 0.15);

        let latencies = std::fs::read_to_string(dir.path().join(LATENCIES_FILE)).unwrap();
        assert_eq!(latencies.lines().count(), 2);

        let series = std::fs::read_to_string(dir.path().join(LOSS_SERIES_FILE)).unwrap();
        let row: serde_json::Value = serde_json::from_str(series.lines().next().unwrap()).unwrap();
        assert_eq!(row["losses"], 1);
        assert_eq!(row["total"], 2);
        assert_eq!(row["delta"], 1);
    }

    #[test]
    fn latency_records_are_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        write_run(dir.path(), &evaluation(), false).unwrap();

        assert!(dir.path().join(PERFORMANCE_FILE).is_file());
        assert!(!dir.path().join(LATENCIES_FILE).exists());
        assert!(dir.path().join(LOSS_SERIES_FILE).is_file());
    }
}
