//! The YAML run description left beside each capture.

use std::{
    io,
    net::IpAddr,
    path::{Path, PathBuf},
};

use serde::Deserialize;

/// Errors produced when loading a [`RunDescription`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error reading the description file.
    #[error("Failed to read description file {path:?}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize description file {path:?}: {source}")]
    SerdeYaml {
        /// File path
        path: PathBuf,
        /// Underlying deserialization error
        #[source]
        source: Box<serde_yaml::Error>,
    },
}

/// How a run drove the link.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    /// Custom datagram exchange with explicit cycle time and size.
    Custom,
}

/// Identity of a run within its campaign.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    /// The capture method used by this run.
    pub method: Method,
    /// Campaign-unique run identifier, also the output directory name.
    pub run_uid: String,
}

/// The datagram exchange exercised by the run.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Connection {
    /// Address the client sent from.
    pub client_ip: IpAddr,
    /// Address the server received on.
    pub server_ip: IpAddr,
    /// UDP port of the exchange.
    pub port: u16,
    /// Microseconds between consecutive datagrams.
    pub cycle_time_us: u64,
    /// Datagram payload size in bytes.
    pub datagram_size: u32,
    /// Whether QoS marking was enabled.
    #[serde(default)]
    pub qos: bool,
}

/// Interface names at both observation points.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Interfaces {
    /// Client-side interface.
    pub client: String,
    /// Server-side interface.
    pub server: String,
}

/// Which end of the link carried the background stress load.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StressLocation {
    /// Stress ran on the client.
    Client,
    /// Stress ran on the server.
    Server,
    /// Stress ran on both ends.
    Both,
}

/// Background load applied while the run was captured.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Stress {
    /// Stress workload name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Worker count of the stress workload.
    pub intensity: u32,
    /// Where the stress workload ran.
    pub location: StressLocation,
}

/// One run's description document.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunDescription {
    /// Run identity.
    pub metadata: Metadata,
    /// Planned run duration in seconds.
    pub duration_seconds: u64,
    /// Datagram exchange parameters.
    pub connection: Connection,
    /// Interfaces in play.
    pub interfaces: Interfaces,
    /// Background stress configuration.
    pub stress: Stress,
}

/// Load a [`RunDescription`] from `path`.
///
/// # Errors
///
/// Returns an error when the file cannot be read or does not deserialize.
pub fn load(path: &Path) -> Result<RunDescription, Error> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    serde_yaml::from_str(&contents).map_err(|source| Error::SerdeYaml {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}
