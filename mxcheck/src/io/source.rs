//! Snapshot sources: where raw per-process records come from.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tracing::{debug, instrument};

use crate::core::record::RawRecord;
use crate::core::types::ProcessId;

/// Abstraction over record providers.
pub trait SnapshotSource {
    /// Every process's record, in a deterministic order.
    fn records(&self) -> Result<Vec<RawRecord>>;
}

/// Reads `process_<id>.txt` files from one directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotSource for DirSource {
    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    fn records(&self) -> Result<Vec<RawRecord>> {
        if !self.dir.is_dir() {
            return Err(anyhow!("missing snapshot directory {}", self.dir.display()));
        }
        let mut records = Vec::new();
        for entry in
            fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))?
        {
            let entry = entry.context("read entry")?;
            let path = entry.path();
            let name = entry.file_name();
            let Some(process) = process_id_from_file_name(&name.to_string_lossy()) else {
                debug!(file = %path.display(), "skipping non-process file");
                continue;
            };
            if !path.is_file() {
                continue;
            }
            let text =
                fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            debug!(process, lines = text.lines().count(), "read process record");
            records.push(RawRecord::from_text(process, &text));
        }
        records.sort_by_key(|record| record.process);
        Ok(records)
    }
}

/// Extract the process id from a `process_<id>.txt` file name.
pub fn process_id_from_file_name(name: &str) -> Option<ProcessId> {
    static FILE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^process_(\d+)\.txt$").unwrap());
    FILE_RE.captures(name)?[1].parse().ok()
}
