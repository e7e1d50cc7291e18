//! JSON form of a lagline capture line, meant to be read line by line from
//! a file.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exit status reported by the capture-side test process.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run completed normally.
    Success,
    /// The run aborted; totals may be partial.
    Error,
}

/// The structure of a capture file line.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Line {
    /// The end-of-run summary, written once per capture.
    Summary(SummaryLine),
    /// One timestamped observation of a sequence-numbered datagram.
    Timestamp(TimestampLine),
    /// One status poll of the cumulative loss counter. Polls are delivered
    /// without ordering guarantees; their position in the file is their
    /// arrival order, nothing more.
    Poll(PollLine),
}

/// Authoritative end-of-run totals for one observation point.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SummaryLine {
    /// An id that is mostly unique to this run, allowing us to distinguish
    /// duplications of the same observational setup.
    pub run_id: Uuid,
    /// How the test process ended.
    pub status: RunStatus,
    /// Total datagrams handled at this observation point.
    pub total: u64,
    /// Total datagrams recorded as lost.
    pub losses: u64,
    /// Send timer deadlines missed by the test process.
    pub timer_misses: u64,
    /// Run duration in seconds, absent when the process could not measure
    /// it.
    pub elapsed_seconds: Option<f64>,
}

/// One timestamped datagram observation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TimestampLine {
    /// Sequence number carried by the datagram.
    pub sequence: u64,
    /// Whole seconds of the observation clock.
    pub secs: u64,
    /// Nanosecond remainder of the observation clock.
    pub nanos: u32,
}

/// One loss-counter status poll.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PollLine {
    /// Cumulative losses at poll time.
    pub losses: u64,
    /// Cumulative datagrams sent at poll time.
    pub total: u64,
    /// Seconds since run start at which the poll was recorded.
    pub elapsed_seconds: f64,
}
