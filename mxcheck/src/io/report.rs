//! Report sinks: one verdict block per checked snapshot.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::assembler::GlobalSnapshot;
use crate::core::invariants::SnapshotVerdict;
use crate::core::types::{ProcessId, SnapshotId};

/// Verdicts for one snapshot, flattened for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotReport {
    pub snapshot: SnapshotId,
    /// Processes that contributed a state.
    pub processes: Vec<ProcessId>,
    /// Expected processes that did not.
    pub missing: Vec<ProcessId>,
    pub invariants: Vec<InvariantReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantReport {
    pub invariant: u8,
    pub name: &'static str,
    pub held: bool,
    pub violations: Vec<String>,
}

impl SnapshotReport {
    pub fn new(snapshot: &GlobalSnapshot, verdict: &SnapshotVerdict, process_count: u32) -> Self {
        Self {
            snapshot: snapshot.id(),
            processes: snapshot.process_ids(),
            missing: snapshot.missing_processes(process_count),
            invariants: verdict
                .verdicts
                .iter()
                .map(|v| InvariantReport {
                    invariant: v.invariant.number(),
                    name: v.invariant.name(),
                    held: v.held(),
                    violations: v.violations.clone(),
                })
                .collect(),
        }
    }
}

/// Destination for snapshot reports, called in snapshot iteration order.
pub trait ReportSink {
    fn record(&mut self, report: &SnapshotReport) -> Result<()>;

    /// Flush anything buffered. Called once after the last snapshot.
    fn finish(&mut self) -> Result<()>;
}

/// Render the text block for one snapshot.
///
/// ```text
///
/// Snapshot 3:
///  - Invariant 1: held
///  - Invariant 2: VIOLATED
/// ```
pub fn render_text(report: &SnapshotReport, explain: bool) -> String {
    let mut buf = format!("\nSnapshot {}:\n", report.snapshot);
    if explain && !report.missing.is_empty() {
        let missing: Vec<String> = report.missing.iter().map(u32::to_string).collect();
        buf.push_str(&format!("   (missing processes: {})\n", missing.join(", ")));
    }
    for inv in &report.invariants {
        let status = if inv.held { "held" } else { "VIOLATED" };
        buf.push_str(&format!(" - Invariant {}: {}\n", inv.invariant, status));
        if explain {
            for violation in &inv.violations {
                buf.push_str(&format!("     * {violation}\n"));
            }
        }
    }
    buf
}

/// Plain-text report, optionally echoed to stdout.
pub struct TextReport<W: Write> {
    out: W,
    explain: bool,
    echo: bool,
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W, explain: bool, echo: bool) -> Self {
        Self { out, explain, echo }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for TextReport<W> {
    fn record(&mut self, report: &SnapshotReport) -> Result<()> {
        let block = render_text(report, self.explain);
        if self.echo {
            print!("{block}");
        }
        self.out
            .write_all(block.as_bytes())
            .context("write text report")
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush().context("flush text report")
    }
}

/// JSON array of every snapshot report, written on [`ReportSink::finish`].
pub struct JsonReport<W: Write> {
    out: W,
    reports: Vec<SnapshotReport>,
}

impl<W: Write> JsonReport<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            reports: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn record(&mut self, report: &SnapshotReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut payload =
            serde_json::to_string_pretty(&self.reports).context("serialize json report")?;
        payload.push('\n');
        self.out
            .write_all(payload.as_bytes())
            .context("write json report")?;
        self.out.flush().context("flush json report")
    }
}
