//! This module controls configuration parsing from the end user, providing
//! a convenience mechanism for the rest of the program.

use std::{
    io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread,
};

use serde::Deserialize;

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error reading the config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

/// Main configuration struct for this program
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory the per-run reports are written beneath.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Whether to also write the per-sequence latency record file for each
    /// run. Off by default; the file is large and only some analyses want
    /// it.
    #[serde(default)]
    pub latency_records: bool,
    /// How many runs to evaluate at once. Defaults to the host's available
    /// parallelism.
    #[serde(default)]
    pub concurrency: Option<NonZeroUsize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            latency_records: false,
            concurrency: None,
        }
    }
}

impl Config {
    /// Load a [`Config`] from the YAML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or does not
    /// deserialize.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// The effective run-evaluation concurrency.
    #[must_use]
    pub fn concurrency_or_available(&self) -> NonZeroUsize {
        self.concurrency
            .unwrap_or_else(|| thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
    }
}
