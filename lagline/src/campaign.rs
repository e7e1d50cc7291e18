//! Discovery of runs within a campaign directory.
//!
//! A campaign is laid out on disk as
//! `campaign/{client,server}/<scenario>/<run>/`, with each run directory
//! holding a description document and a capture file. Both observation
//! points must be present for a run to be evaluated; reconciliation is
//! meaningless with one side missing.

use std::{
    io,
    path::{Path, PathBuf},
};

use tracing::warn;

/// File name of the per-run description document.
pub const DESCRIPTION_FILE: &str = "description.yaml";
/// File name of the per-run capture.
pub const CAPTURE_FILE: &str = "capture.jsonl";

const CLIENT_DIR: &str = "client";
const SERVER_DIR: &str = "server";

/// Errors produced by [`discover`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The campaign directory has no client side at all.
    #[error("Campaign {path:?} has no {CLIENT_DIR} directory")]
    NoClientData {
        /// Campaign path
        path: PathBuf,
    },
    /// Error reading directory entries
    #[error("Failed to read directory entries from {path:?}: {source}")]
    ReadDir {
        /// Directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
}

/// Filesystem locations of one run's two captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    /// Campaign directory name.
    pub campaign: String,
    /// Scenario directory name.
    pub scenario: String,
    /// Run directory name.
    pub run: String,
    /// Client-side run directory.
    pub client_dir: PathBuf,
    /// Server-side run directory.
    pub server_dir: PathBuf,
}

impl RunPaths {
    /// Path of the client-side description document.
    #[must_use]
    pub fn description(&self) -> PathBuf {
        self.client_dir.join(DESCRIPTION_FILE)
    }

    /// Path of the client-side capture.
    #[must_use]
    pub fn client_capture(&self) -> PathBuf {
        self.client_dir.join(CAPTURE_FILE)
    }

    /// Path of the server-side capture.
    #[must_use]
    pub fn server_capture(&self) -> PathBuf {
        self.server_dir.join(CAPTURE_FILE)
    }
}

/// List visible sub-directories of `path`, sorted by name. Hidden entries
/// and plain files -- editor droppings, archives -- are skipped.
fn visible_dirs(path: &Path) -> Result<Vec<(String, PathBuf)>, Error> {
    let entries = std::fs::read_dir(path).map_err(|source| Error::ReadDir {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::ReadDir {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }
        dirs.push((name, entry.path()));
    }
    dirs.sort();
    Ok(dirs)
}

/// Discover every evaluable run beneath `campaign_root`.
///
/// Runs missing their capture file or their server-side counterpart are
/// logged and left out; the remainder is returned in deterministic
/// (scenario, run) order.
///
/// # Errors
///
/// Returns an error when the client tree itself cannot be traversed.
pub fn discover(campaign_root: &Path) -> Result<Vec<RunPaths>, Error> {
    let campaign = campaign_root
        .file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned());

    let client_root = campaign_root.join(CLIENT_DIR);
    if !client_root.is_dir() {
        return Err(Error::NoClientData {
            path: campaign_root.to_path_buf(),
        });
    }
    let server_root = campaign_root.join(SERVER_DIR);

    let mut runs = Vec::new();
    for (scenario, scenario_dir) in visible_dirs(&client_root)? {
        for (run, client_dir) in visible_dirs(&scenario_dir)? {
            if !client_dir.join(CAPTURE_FILE).is_file() {
                warn!(%scenario, %run, "run has no client capture, skipping");
                continue;
            }
            let server_dir = server_root.join(&scenario).join(&run);
            if !server_dir.join(CAPTURE_FILE).is_file() {
                warn!(%scenario, %run, "run has no server capture, skipping");
                continue;
            }
            runs.push(RunPaths {
                campaign: campaign.clone(),
                scenario: scenario.clone(),
                run,
                client_dir,
                server_dir,
            });
        }
    }
    Ok(runs)
}
