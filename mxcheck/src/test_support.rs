//! Test-only helpers for building process states and snapshot directories.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::assembler::GlobalSnapshot;
use crate::core::record::RawRecord;
use crate::core::types::{MxState, ProcessId, ProcessState, Waiting};
use crate::io::source::SnapshotSource;

/// Snapshot id used by the builders below.
pub const SNAPSHOT: i64 = 1;

/// Create a deterministic process state with zeroed counters and no deferrals.
pub fn process(id: ProcessId, state: MxState) -> ProcessState {
    ProcessState {
        process: id,
        snapshot: SNAPSHOT,
        state,
        logical_clock: 0,
        request_timestamp: 0,
        waiting: Waiting::default(),
        pending_replies: 0,
        in_transit: Vec::new(),
    }
}

/// Replace the waiting flags (position `i` is process `i`).
pub fn with_waiting(mut state: ProcessState, flags: &[bool]) -> ProcessState {
    state.waiting = Waiting::from_flags(flags.iter().copied());
    state
}

/// Build a global snapshot from states sharing [`SNAPSHOT`].
pub fn snapshot(states: Vec<ProcessState>) -> GlobalSnapshot {
    let mut snapshot = GlobalSnapshot::new(SNAPSHOT);
    for state in states {
        snapshot.insert(state);
    }
    snapshot
}

/// In-memory source returning fixed records.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub records: Vec<RawRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }
}

impl SnapshotSource for MemorySource {
    fn records(&self) -> Result<Vec<RawRecord>> {
        Ok(self.records.clone())
    }
}

/// Temporary directory laid out like a DIMEX snapshot dump.
pub struct SnapshotDir {
    temp: TempDir,
}

impl SnapshotDir {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        fs::create_dir_all(temp.path().join("snapshots")).context("create snapshots dir")?;
        Ok(Self { temp })
    }

    /// Root of the temporary directory (use as working directory).
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Directory holding the `process_<id>.txt` files.
    pub fn dir(&self) -> PathBuf {
        self.temp.path().join("snapshots")
    }

    pub fn write_process(&self, process: ProcessId, contents: &str) -> Result<PathBuf> {
        let path = self.dir().join(format!("process_{process}.txt"));
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

/// One DIMEX-formatted section, as the process-side dumper writes it.
pub fn dimex_section(
    snapshot: i64,
    state: u8,
    clock: i64,
    request_ts: i64,
    waiting: &str,
    replies: i64,
    messages: &[&str],
) -> String {
    let mut buf = format!(
        "Snapshot {snapshot}\nEstado: {state}\nRelógio Lógico: {clock}\n\
         Timestamp de Requisição: {request_ts}\nReceive resps: [true true true]\n\
         Waiting: {waiting}\nNbrResps: {replies}\nMensagens:\n"
    );
    for message in messages {
        buf.push_str(message);
        buf.push('\n');
    }
    buf.push('\n');
    buf
}
