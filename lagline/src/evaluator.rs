//! Per-run evaluation.
//!
//! Composes the core reconciliation and counter repair over one run's pair
//! of captures and derives the headline numbers for the report: duration,
//! datagram count, achieved bandwidth, latency statistics and the repaired
//! loss-over-time series.

use lagline_capture::{
    description::RunDescription,
    json::{PollLine, TimestampLine},
    reader::RunCapture,
};
use lagline_core::{
    reconcile::{self, LatencyRecord, RunStatistics, Timestamp, TimestampRecord},
    repair::{CorrectedCounterPoint, PollSample, repair_counter_series},
};
use serde::Serialize;

/// Errors produced by [`evaluate`]. Every variant means "skip this run";
/// none of them may abort a batch.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The captures could not be reconciled.
    #[error(transparent)]
    Reconcile(#[from] reconcile::Error),
    /// The client summary carries no elapsed time, so neither bandwidth nor
    /// the loss series can be anchored.
    #[error("client summary has no elapsed time")]
    MissingDuration,
}

/// Identity block of a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Basic {
    /// Campaign-unique run identifier.
    pub run_uid: String,
    /// Datagram payload size in bytes.
    pub datagram_size: u32,
    /// Microseconds between consecutive datagrams.
    pub cycle_time_us: u64,
}

/// Measured run numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measured {
    /// Run duration in seconds, per the client summary.
    pub duration_seconds: f64,
    /// Datagrams sent, per the client summary.
    pub datagrams: u64,
    /// Achieved bandwidth derived from the three numbers above.
    pub bandwidth_bits_per_second: f64,
}

/// The per-run report record persisted for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Identity block.
    pub basic: Basic,
    /// Measured numbers.
    pub test: Measured,
    /// Reconciled latency statistics.
    pub statistics: RunStatistics,
}

/// Everything evaluation yields for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEvaluation {
    /// The report record.
    pub report: RunReport,
    /// Per-sequence latencies backing the statistics, in ascending
    /// sequence order.
    pub latencies: Vec<LatencyRecord>,
    /// Repaired loss-over-time series.
    pub loss_series: Vec<CorrectedCounterPoint>,
}

fn timestamp_record(line: &TimestampLine) -> TimestampRecord {
    TimestampRecord {
        sequence: line.sequence,
        time: Timestamp {
            secs: line.secs,
            nanos: line.nanos,
        },
    }
}

fn poll_sample(line: &PollLine) -> PollSample {
    PollSample {
        cumulative_value: line.losses,
        observed_total: line.total,
        elapsed_time: line.elapsed_seconds,
    }
}

/// Evaluate one run from its description and two captures.
///
/// The client is the origin observation point, the server the
/// destination. Loss polls are taken from the client capture and anchored
/// to the client summary's authoritative totals.
///
/// # Errors
///
/// Returns an error when the run cannot be evaluated -- empty captures,
/// total loss or a missing duration. Callers skip the run and move on.
pub fn evaluate(
    description: &RunDescription,
    client: &RunCapture,
    server: &RunCapture,
) -> Result<RunEvaluation, Error> {
    let duration_seconds = client
        .summary
        .elapsed_seconds
        .ok_or(Error::MissingDuration)?;
    let datagrams = client.summary.total;
    let bandwidth_bits_per_second = datagrams as f64
        * f64::from(description.connection.datagram_size)
        * 8.0
        / duration_seconds;

    let origin: Vec<TimestampRecord> = client.timestamps.iter().map(timestamp_record).collect();
    let destination: Vec<TimestampRecord> =
        server.timestamps.iter().map(timestamp_record).collect();

    let reconciliation = reconcile::reconcile(&origin, &destination)?;
    let latency = reconcile::statistics(&reconciliation.latencies)?;
    let statistics = RunStatistics {
        packet_loss: reconciliation.packet_loss,
        in_order: reconciliation.in_order,
        latency,
    };

    let polls: Vec<PollSample> = client.polls.iter().map(poll_sample).collect();
    let loss_series = repair_counter_series(
        &polls,
        client.summary.losses,
        client.summary.total,
        duration_seconds,
    );

    Ok(RunEvaluation {
        report: RunReport {
            basic: Basic {
                run_uid: description.metadata.run_uid.clone(),
                datagram_size: description.connection.datagram_size,
                cycle_time_us: description.connection.cycle_time_us,
            },
            test: Measured {
                duration_seconds,
                datagrams,
                bandwidth_bits_per_second,
            },
            statistics,
        },
        latencies: reconciliation.latencies,
        loss_series,
    })
}
