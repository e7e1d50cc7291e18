//! Reads one observation point's capture file.

use std::{
    io,
    path::{Path, PathBuf},
};

use crate::json::{Line, PollLine, SummaryLine, TimestampLine};

/// Errors produced by [`read`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error reading the capture file.
    #[error("Failed to read capture file {path:?}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Error deserializing a capture line.
    #[error("Failed to deserialize capture line in {path:?}: {source}")]
    Deserialize {
        /// File path
        path: PathBuf,
        /// Underlying deserialization error
        #[source]
        source: Box<serde_json::Error>,
    },
    /// The capture carried no end-of-run summary.
    #[error("Capture file {path:?} has no summary line")]
    MissingSummary {
        /// File path
        path: PathBuf,
    },
}

/// One observation point's capture, split by record kind. Timestamps and
/// polls keep their file order -- arrival order is load-bearing for both
/// the order classification and the counter repair.
#[derive(Debug, Clone, PartialEq)]
pub struct RunCapture {
    /// Authoritative end-of-run totals.
    pub summary: SummaryLine,
    /// Timestamped datagram observations, in capture order.
    pub timestamps: Vec<TimestampLine>,
    /// Loss-counter polls, in arrival order.
    pub polls: Vec<PollLine>,
}

/// Read and split the capture file at `path`.
///
/// # Errors
///
/// Returns an error when the file cannot be read, a line does not
/// deserialize or no summary line is present.
pub fn read(path: &Path) -> Result<RunCapture, Error> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;

    let mut summary = None;
    let mut timestamps = Vec::new();
    let mut polls = Vec::new();
    for line in serde_json::Deserializer::from_str(&contents).into_iter::<Line>() {
        let line = line.map_err(|source| Error::Deserialize {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        match line {
            Line::Summary(line) => summary = Some(line),
            Line::Timestamp(line) => timestamps.push(line),
            Line::Poll(line) => polls.push(line),
        }
    }

    let summary = summary.ok_or_else(|| Error::MissingSummary {
        path: path.to_path_buf(),
    })?;
    Ok(RunCapture {
        summary,
        timestamps,
        polls,
    })
}

#[cfg(test)]
mod test {
    use super::{Error, read};

    #[test]
    fn capture_splits_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"kind":"poll","losses":0,"total":10,"elapsed_seconds":0.5}"#,
                "\n",
                r#"{"kind":"timestamp","sequence":0,"secs":1,"nanos":0}"#,
                "\n",
                r#"{"kind":"timestamp","sequence":1,"secs":2,"nanos":0}"#,
                "\n",
                r#"{"kind":"poll","losses":1,"total":20,"elapsed_seconds":1.5}"#,
                "\n",
                r#"{"kind":"summary","run_id":"4b4ab4fa-3e07-4a1c-8dfb-52b3b7a9f37e","status":"success","total":20,"losses":1,"timer_misses":0,"elapsed_seconds":2.0}"#,
            ),
        )
        .unwrap();

        let capture = read(&path).unwrap();
        assert_eq!(capture.summary.total, 20);
        assert_eq!(capture.timestamps.len(), 2);
        assert_eq!(capture.timestamps[0].sequence, 0);
        assert_eq!(capture.polls.len(), 2);
        assert_eq!(capture.polls[1].losses, 1);
    }

    #[test]
    fn missing_summary_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_summary.jsonl");
        std::fs::write(
            &path,
            concat!(r#"{"kind":"timestamp","sequence":0,"secs":1,"nanos":0}"#, "\n"),
        )
        .unwrap();

        assert!(matches!(read(&path), Err(Error::MissingSummary { .. })));
    }
}
