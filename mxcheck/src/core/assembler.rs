//! Reconstruction of global snapshots from per-process records.
//!
//! Each record is streamed through a [`SectionBuilder`], an explicit state
//! machine that accumulates one section at a time and freezes it into a
//! [`ProcessState`] when the next marker (or end of input) closes it. Frozen
//! states are then grouped by snapshot id into [`GlobalSnapshot`]s.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::core::record::{Field, Line, RawRecord, classify};
use crate::core::types::{MxState, ProcessId, ProcessState, SnapshotId, Waiting};

/// Structural error raised while freezing a section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("process {process}, snapshot {snapshot}: section has no `{field}` line")]
    MissingField {
        process: ProcessId,
        snapshot: SnapshotId,
        field: &'static str,
    },
}

/// Fields accumulated for the currently open section.
#[derive(Debug, Clone)]
struct SectionDraft {
    snapshot: SnapshotId,
    state: Option<MxState>,
    logical_clock: Option<i64>,
    request_timestamp: Option<i64>,
    waiting: Option<Waiting>,
    pending_replies: Option<i64>,
    in_transit: Vec<String>,
}

impl SectionDraft {
    fn open(snapshot: SnapshotId) -> Self {
        Self {
            snapshot,
            state: None,
            logical_clock: None,
            request_timestamp: None,
            waiting: None,
            pending_replies: None,
            in_transit: Vec::new(),
        }
    }

    /// Later occurrences of a field overwrite earlier ones.
    fn apply(&mut self, field: Field) {
        match field {
            Field::State(state) => self.state = Some(state),
            Field::LogicalClock(clock) => self.logical_clock = Some(clock),
            Field::RequestTimestamp(ts) => self.request_timestamp = Some(ts),
            Field::Waiting(waiting) => self.waiting = Some(waiting),
            Field::PendingReplies(count) => self.pending_replies = Some(count),
        }
    }

    fn freeze(self, process: ProcessId) -> Result<ProcessState, AssembleError> {
        let missing = |field| AssembleError::MissingField {
            process,
            snapshot: self.snapshot,
            field,
        };
        Ok(ProcessState {
            process,
            snapshot: self.snapshot,
            state: self.state.ok_or_else(|| missing("State"))?,
            logical_clock: self.logical_clock.ok_or_else(|| missing("LogicalClock"))?,
            request_timestamp: self
                .request_timestamp
                .ok_or_else(|| missing("RequestTimestamp"))?,
            waiting: self.waiting.unwrap_or_default(),
            pending_replies: self.pending_replies.unwrap_or(0),
            in_transit: self.in_transit,
        })
    }
}

#[derive(Debug, Clone)]
enum BuilderState {
    /// No marker seen yet; everything but a marker is ignored.
    CollectingHeader,
    CollectingFields(SectionDraft),
    /// Input ended; a later marker reopens collection.
    SectionClosed,
}

/// Per-process section builder.
#[derive(Debug, Clone)]
pub struct SectionBuilder {
    process: ProcessId,
    state: BuilderState,
}

impl SectionBuilder {
    pub fn new(process: ProcessId) -> Self {
        Self {
            process,
            state: BuilderState::CollectingHeader,
        }
    }

    /// Feed one line. Returns the previous section when a marker closes it.
    pub fn feed(&mut self, raw: &str) -> Result<Option<ProcessState>, AssembleError> {
        let line = classify(raw);
        if let Line::Marker(snapshot) = line {
            let previous = std::mem::replace(
                &mut self.state,
                BuilderState::CollectingFields(SectionDraft::open(snapshot)),
            );
            return self.freeze(previous);
        }
        if let BuilderState::CollectingFields(draft) = &mut self.state {
            match line {
                Line::Field(field) => draft.apply(field),
                Line::Message(message) => draft.in_transit.push(message.to_string()),
                Line::Marker(_) | Line::Ignored => {}
            }
        }
        Ok(None)
    }

    /// Signal end of input, returning the open section if any.
    pub fn close(&mut self) -> Result<Option<ProcessState>, AssembleError> {
        let previous = std::mem::replace(&mut self.state, BuilderState::SectionClosed);
        self.freeze(previous)
    }

    fn freeze(&self, previous: BuilderState) -> Result<Option<ProcessState>, AssembleError> {
        match previous {
            BuilderState::CollectingFields(draft) => draft.freeze(self.process).map(Some),
            BuilderState::CollectingHeader | BuilderState::SectionClosed => Ok(None),
        }
    }
}

/// Parse every section of one record, in capture order.
pub fn parse_record(record: &RawRecord) -> Result<Vec<ProcessState>, AssembleError> {
    let mut builder = SectionBuilder::new(record.process);
    let mut sections = Vec::new();
    for line in &record.lines {
        if let Some(section) = builder.feed(line)? {
            sections.push(section);
        }
    }
    if let Some(section) = builder.close()? {
        sections.push(section);
    }
    Ok(sections)
}

/// All processes' states at one snapshot point, keyed by process id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalSnapshot {
    id: SnapshotId,
    processes: BTreeMap<ProcessId, ProcessState>,
}

impl GlobalSnapshot {
    pub(crate) fn new(id: SnapshotId) -> Self {
        Self {
            id,
            processes: BTreeMap::new(),
        }
    }

    /// Insert a state, returning the one it replaced.
    pub(crate) fn insert(&mut self, state: ProcessState) -> Option<ProcessState> {
        debug_assert_eq!(state.snapshot, self.id);
        self.processes.insert(state.process, state)
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    pub fn get(&self, process: ProcessId) -> Option<&ProcessState> {
        self.processes.get(&process)
    }

    /// States in ascending process id order.
    pub fn processes(&self) -> impl Iterator<Item = &ProcessState> {
        self.processes.values()
    }

    pub fn process_ids(&self) -> Vec<ProcessId> {
        self.processes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Ids in `0..process_count` that did not contribute a state.
    pub fn missing_processes(&self, process_count: u32) -> Vec<ProcessId> {
        (0..process_count)
            .filter(|id| !self.processes.contains_key(id))
            .collect()
    }

    pub fn is_complete(&self, process_count: u32) -> bool {
        self.missing_processes(process_count).is_empty()
    }
}

/// Global snapshots in the order their ids were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSet {
    snapshots: Vec<GlobalSnapshot>,
    index: HashMap<SnapshotId, usize>,
}

impl SnapshotSet {
    pub(crate) fn insert(&mut self, state: ProcessState) -> Option<ProcessState> {
        let slot = match self.index.get(&state.snapshot) {
            Some(slot) => *slot,
            None => {
                self.snapshots.push(GlobalSnapshot::new(state.snapshot));
                let slot = self.snapshots.len() - 1;
                self.index.insert(state.snapshot, slot);
                slot
            }
        };
        self.snapshots[slot].insert(state)
    }

    pub fn get(&self, id: SnapshotId) -> Option<&GlobalSnapshot> {
        self.index.get(&id).map(|slot| &self.snapshots[*slot])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GlobalSnapshot> {
        self.snapshots.iter()
    }

    pub fn ids(&self) -> Vec<SnapshotId> {
        self.snapshots.iter().map(GlobalSnapshot::id).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl<'a> IntoIterator for &'a SnapshotSet {
    type Item = &'a GlobalSnapshot;
    type IntoIter = std::slice::Iter<'a, GlobalSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Result of assembling every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub snapshots: SnapshotSet,
    /// `(snapshot, process)` pairs where a later section replaced an earlier one.
    pub replaced: Vec<(SnapshotId, ProcessId)>,
}

/// Group every finalized section of every record by snapshot id.
///
/// Records are consumed in the given order; snapshot iteration order is the
/// order in which each snapshot id first received a section.
pub fn assemble<'a, I>(records: I) -> Result<Assembly, AssembleError>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut assembly = Assembly::default();
    for record in records {
        for state in parse_record(record)? {
            let key = (state.snapshot, state.process);
            if assembly.snapshots.insert(state).is_some() {
                assembly.replaced.push(key);
            }
        }
    }
    Ok(assembly)
}

#[cfg(test)]
mod tests {
    use super::*;

    const P0: &str = "\
Snapshot 1
Estado: 0
Relógio Lógico: 2
Timestamp de Requisição: 1
Receive resps: [true true true]
Waiting: [false false false]
NbrResps: 0
Mensagens:

Snapshot 2
Estado: 1
Relógio Lógico: 5
Timestamp de Requisição: 4
Waiting: [false true false]
NbrResps: 1
Mensagens:
respOK:2:6
";

    const P1: &str = "\
Snapshot 1
State: IN_MX
LogicalClock: 3
RequestTimestamp: 2
Waiting: [true false false]
NbrResps: 2
Snapshot 2
State: NO_MX
LogicalClock: 7
RequestTimestamp: 2
Waiting: [false false false]
NbrResps: 0
";

    fn records() -> Vec<RawRecord> {
        vec![RawRecord::from_text(0, P0), RawRecord::from_text(1, P1)]
    }

    #[test]
    fn assembles_two_processes_two_snapshots_verbatim() {
        let assembly = assemble(&records()).expect("assemble");
        let snapshots = assembly.snapshots;
        assert!(assembly.replaced.is_empty());
        assert_eq!(snapshots.ids(), vec![1, 2]);

        let first = snapshots.get(1).expect("snapshot 1");
        assert_eq!(first.process_ids(), vec![0, 1]);
        let p1 = first.get(1).expect("process 1");
        assert_eq!(p1.state, MxState::InMx);
        assert_eq!(p1.logical_clock, 3);
        assert_eq!(p1.request_timestamp, 2);
        assert_eq!(p1.pending_replies, 2);
        assert_eq!(p1.waiting.deferred_peers().collect::<Vec<_>>(), vec![0]);

        let second = snapshots.get(2).expect("snapshot 2");
        assert_eq!(second.len(), 2);
        let p0 = second.get(0).expect("process 0");
        assert_eq!(p0.state, MxState::WantMx);
        assert_eq!(p0.logical_clock, 5);
        assert_eq!(p0.request_timestamp, 4);
        assert_eq!(p0.pending_replies, 1);
        assert_eq!(p0.in_transit, vec!["respOK:2:6".to_string()]);
        assert_eq!(p0.waiting.deferred_peers().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn record_without_marker_produces_nothing() {
        let record = RawRecord::from_text(3, "State: 1\nLogicalClock: 2\nRequestTimestamp: 1\n");
        let assembly = assemble(&[record]).expect("assemble");
        assert!(assembly.snapshots.is_empty());
    }

    #[test]
    fn iteration_follows_first_seen_order() {
        let record = RawRecord::from_text(
            0,
            "Snapshot 5\nState: 0\nLogicalClock: 1\nRequestTimestamp: 0\n\
             Snapshot 2\nState: 0\nLogicalClock: 2\nRequestTimestamp: 0\n",
        );
        let assembly = assemble(&[record]).expect("assemble");
        assert_eq!(assembly.snapshots.ids(), vec![5, 2]);
    }

    #[test]
    fn missing_state_aborts_with_context() {
        let record = RawRecord::from_text(2, "Snapshot 7\nLogicalClock: 1\nRequestTimestamp: 0\n");
        let err = assemble(&[record]).expect_err("missing state");
        assert_eq!(
            err,
            AssembleError::MissingField {
                process: 2,
                snapshot: 7,
                field: "State",
            }
        );
        assert!(err.to_string().contains("no `State` line"));
    }

    #[test]
    fn optional_fields_default() {
        let record = RawRecord::from_text(0, "Snapshot 1\nState: 0\nLogicalClock: 1\nRequestTimestamp: 0");
        let assembly = assemble(&[record]).expect("assemble");
        let state = assembly.snapshots.get(1).and_then(|s| s.get(0)).expect("state");
        assert!(state.waiting.is_empty());
        assert_eq!(state.pending_replies, 0);
        assert!(state.in_transit.is_empty());
    }

    #[test]
    fn duplicate_section_last_write_wins() {
        let record = RawRecord::from_text(
            1,
            "Snapshot 1\nState: 0\nLogicalClock: 1\nRequestTimestamp: 0\n\
             Snapshot 1\nState: 1\nLogicalClock: 4\nRequestTimestamp: 3\n",
        );
        let assembly = assemble(&[record]).expect("assemble");
        assert_eq!(assembly.replaced, vec![(1, 1)]);
        let state = assembly.snapshots.get(1).and_then(|s| s.get(1)).expect("state");
        assert_eq!(state.state, MxState::WantMx);
    }

    #[test]
    fn builder_ignores_fields_before_first_marker() {
        let mut builder = SectionBuilder::new(0);
        assert_eq!(builder.feed("State: 2").expect("feed"), None);
        assert_eq!(builder.feed("Snapshot 1").expect("feed"), None);
        builder.feed("State: 0").expect("feed");
        builder.feed("LogicalClock: 0").expect("feed");
        builder.feed("RequestTimestamp: 0").expect("feed");
        let closed = builder.close().expect("close").expect("section");
        assert_eq!(closed.state, MxState::NoMx);
        assert_eq!(builder.close().expect("close again"), None);
    }

    #[test]
    fn completeness_against_process_count() {
        let assembly = assemble(&records()).expect("assemble");
        let snapshot = assembly.snapshots.get(1).expect("snapshot");
        assert!(snapshot.is_complete(2));
        assert!(!snapshot.is_complete(3));
        assert_eq!(snapshot.missing_processes(3), vec![2]);
    }
}
