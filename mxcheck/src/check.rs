//! Orchestration for `mxcheck check` and `mxcheck list`.
//!
//! Pulls records from a [`SnapshotSource`] and assembles global snapshots,
//! then evaluates every invariant per snapshot and hands each verdict block to
//! a [`ReportSink`]. Assembly finishes before any report output is produced.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::assembler::{SnapshotSet, assemble};
use crate::core::invariants::check_snapshot;
use crate::io::report::{ReportSink, SnapshotReport};
use crate::io::source::SnapshotSource;

/// Totals for one check run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub snapshots: usize,
    /// Snapshots with at least one violated invariant.
    pub violated_snapshots: usize,
    /// Violated invariants summed over all snapshots.
    pub violated_invariants: usize,
    /// Snapshots missing at least one expected process.
    pub incomplete: usize,
}

impl CheckSummary {
    pub fn clean(&self) -> bool {
        self.violated_invariants == 0
    }
}

/// Read every record and assemble global snapshots.
pub fn load_snapshots(source: &dyn SnapshotSource) -> Result<SnapshotSet> {
    let records = source.records().context("read snapshot records")?;
    debug!(records = records.len(), "records loaded");
    let assembly = assemble(&records).context("assemble snapshots")?;
    for (snapshot, process) in &assembly.replaced {
        warn!(
            snapshot,
            process, "process recorded the same snapshot twice; keeping the later section"
        );
    }
    info!(snapshots = assembly.snapshots.len(), "snapshots assembled");
    Ok(assembly.snapshots)
}

/// Check every assembled snapshot in iteration order and report each one.
pub fn run_check(
    snapshots: &SnapshotSet,
    process_count: u32,
    sink: &mut dyn ReportSink,
) -> Result<CheckSummary> {
    let mut summary = CheckSummary::default();

    for snapshot in snapshots {
        if !snapshot.is_complete(process_count) {
            summary.incomplete += 1;
            warn!(
                snapshot = snapshot.id(),
                missing = ?snapshot.missing_processes(process_count),
                "snapshot is incomplete; checking the processes present"
            );
        }
        let verdict = check_snapshot(snapshot, process_count);
        let violated = verdict.violated_count();
        debug!(snapshot = snapshot.id(), held = ?verdict.held_vector(), "snapshot checked");

        summary.snapshots += 1;
        summary.violated_invariants += violated;
        if violated > 0 {
            summary.violated_snapshots += 1;
        }
        sink.record(&SnapshotReport::new(snapshot, &verdict, process_count))
            .with_context(|| format!("report snapshot {}", snapshot.id()))?;
    }

    sink.finish().context("finish report")?;
    info!(
        snapshots = summary.snapshots,
        violated = summary.violated_snapshots,
        "check complete"
    );
    Ok(summary)
}
