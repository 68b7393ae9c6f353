//! Global safety invariants of the timestamp-based mutual-exclusion protocol.
//!
//! Every predicate is a pure function of one [`GlobalSnapshot`] (plus the
//! configured process count where needed) and returns the list of violations
//! it found. An empty list means the invariant holds.

use crate::core::assembler::GlobalSnapshot;
use crate::core::types::{MxState, ProcessId, ProcessState, SnapshotId};

/// The six checked invariants, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invariant {
    /// At most one process is `IN_MX`.
    MutualExclusion,
    /// All `NO_MX` implies no deferred replies and no messages in flight.
    Quiescence,
    /// A process only defers replies while it is contending.
    WaitingImpliesContending,
    /// Replies received + in flight + deferred equals `N - 1` for each requester.
    ReplyAccounting,
    /// Nobody defers a reply to the critical-section holder.
    HolderNotDeferred,
    /// Requesters carry timestamps above every idle process's timestamp.
    TimestampOrdering,
}

impl Invariant {
    pub const ALL: [Invariant; 6] = [
        Invariant::MutualExclusion,
        Invariant::Quiescence,
        Invariant::WaitingImpliesContending,
        Invariant::ReplyAccounting,
        Invariant::HolderNotDeferred,
        Invariant::TimestampOrdering,
    ];

    /// 1-based number used in reports.
    pub fn number(self) -> u8 {
        match self {
            Invariant::MutualExclusion => 1,
            Invariant::Quiescence => 2,
            Invariant::WaitingImpliesContending => 3,
            Invariant::ReplyAccounting => 4,
            Invariant::HolderNotDeferred => 5,
            Invariant::TimestampOrdering => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Invariant::MutualExclusion => "mutual_exclusion",
            Invariant::Quiescence => "quiescence",
            Invariant::WaitingImpliesContending => "waiting_implies_contending",
            Invariant::ReplyAccounting => "reply_accounting",
            Invariant::HolderNotDeferred => "holder_not_deferred",
            Invariant::TimestampOrdering => "timestamp_ordering",
        }
    }

    pub fn evaluate(self, snapshot: &GlobalSnapshot, process_count: u32) -> Verdict {
        let violations = match self {
            Invariant::MutualExclusion => mutual_exclusion(snapshot),
            Invariant::Quiescence => quiescence(snapshot),
            Invariant::WaitingImpliesContending => waiting_implies_contending(snapshot),
            Invariant::ReplyAccounting => reply_accounting(snapshot, process_count),
            Invariant::HolderNotDeferred => holder_not_deferred(snapshot),
            Invariant::TimestampOrdering => timestamp_ordering(snapshot),
        };
        Verdict {
            invariant: self,
            violations,
        }
    }
}

/// Outcome of one invariant on one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub invariant: Invariant,
    pub violations: Vec<String>,
}

impl Verdict {
    pub fn held(&self) -> bool {
        self.violations.is_empty()
    }
}

/// All six verdicts for one snapshot, in [`Invariant::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotVerdict {
    pub snapshot: SnapshotId,
    pub verdicts: Vec<Verdict>,
}

impl SnapshotVerdict {
    pub fn all_held(&self) -> bool {
        self.verdicts.iter().all(Verdict::held)
    }

    pub fn held_vector(&self) -> Vec<bool> {
        self.verdicts.iter().map(Verdict::held).collect()
    }

    pub fn violated_count(&self) -> usize {
        self.verdicts.iter().filter(|verdict| !verdict.held()).count()
    }
}

/// Evaluate every invariant; none short-circuits another.
pub fn check_snapshot(snapshot: &GlobalSnapshot, process_count: u32) -> SnapshotVerdict {
    SnapshotVerdict {
        snapshot: snapshot.id(),
        verdicts: Invariant::ALL
            .iter()
            .map(|invariant| invariant.evaluate(snapshot, process_count))
            .collect(),
    }
}

fn ids_in(snapshot: &GlobalSnapshot, state: MxState) -> Vec<ProcessId> {
    snapshot
        .processes()
        .filter(|p| p.state == state)
        .map(|p| p.process)
        .collect()
}

/// Inv 1: at most one process holds the critical section.
pub fn mutual_exclusion(snapshot: &GlobalSnapshot) -> Vec<String> {
    let holders = ids_in(snapshot, MxState::InMx);
    if holders.len() > 1 {
        return vec![format!("processes {holders:?} are all IN_MX")];
    }
    Vec::new()
}

/// Inv 2: when every process is `NO_MX`, nothing is deferred or in flight.
pub fn quiescence(snapshot: &GlobalSnapshot) -> Vec<String> {
    if !snapshot.processes().all(|p| p.state == MxState::NoMx) {
        return Vec::new();
    }
    let mut errors = Vec::new();
    for p in snapshot.processes() {
        if p.waiting.any() {
            let peers: Vec<_> = p.waiting.deferred_peers().collect();
            errors.push(format!(
                "process {} defers replies to {:?} while every process is NO_MX",
                p.process, peers
            ));
        }
        if !p.in_transit.is_empty() {
            errors.push(format!(
                "process {} has {} reply message(s) in transit while every process is NO_MX",
                p.process,
                p.in_transit.len()
            ));
        }
    }
    errors
}

/// Inv 3: a process defers replies only while `WANT_MX` or `IN_MX`.
pub fn waiting_implies_contending(snapshot: &GlobalSnapshot) -> Vec<String> {
    let mut errors = Vec::new();
    for p in snapshot.processes() {
        if p.state.is_contending() {
            continue;
        }
        let peers: Vec<_> = p.waiting.deferred_peers().collect();
        if !peers.is_empty() {
            errors.push(format!(
                "process {} is {} but defers replies to {:?}",
                p.process, p.state, peers
            ));
        }
    }
    errors
}

/// Inv 4: for each `WANT_MX` process, replies received, replies in flight and
/// peers deferring to it add up to `N - 1`.
pub fn reply_accounting(snapshot: &GlobalSnapshot, process_count: u32) -> Vec<String> {
    let expected = i64::from(process_count) - 1;
    let mut errors = Vec::new();
    for q in snapshot.processes().filter(|p| p.state == MxState::WantMx) {
        let deferring = deferring_to(snapshot, q).count() as i64;
        let in_transit = q.in_transit.len() as i64;
        let total = q
            .pending_replies
            .checked_add(in_transit)
            .and_then(|sum| sum.checked_add(deferring));
        match total {
            Some(total) if total == expected => {}
            Some(total) => errors.push(format!(
                "process {}: {} replies + {} in transit + {} deferring = {}, expected {}",
                q.process, q.pending_replies, in_transit, deferring, total, expected
            )),
            None => errors.push(format!(
                "process {}: {} replies + {} in transit + {} deferring overflows, expected {}",
                q.process, q.pending_replies, in_transit, deferring, expected
            )),
        }
    }
    errors
}

/// Inv 5: no process defers a reply to the `IN_MX` process.
pub fn holder_not_deferred(snapshot: &GlobalSnapshot) -> Vec<String> {
    let mut errors = Vec::new();
    for holder in snapshot.processes().filter(|p| p.state == MxState::InMx) {
        for q in deferring_to(snapshot, holder) {
            errors.push(format!(
                "process {} defers a reply to process {}, which is IN_MX",
                q.process, holder.process
            ));
        }
    }
    errors
}

/// Inv 6: every `WANT_MX` timestamp is strictly above every `NO_MX` timestamp.
pub fn timestamp_ordering(snapshot: &GlobalSnapshot) -> Vec<String> {
    let mut errors = Vec::new();
    for p in snapshot.processes().filter(|p| p.state == MxState::WantMx) {
        for q in snapshot
            .processes()
            .filter(|q| q.state == MxState::NoMx && q.request_timestamp >= p.request_timestamp)
        {
            errors.push(format!(
                "NO_MX process {} has request timestamp {} >= {} of WANT_MX process {}",
                q.process, q.request_timestamp, p.request_timestamp, p.process
            ));
        }
    }
    errors
}

/// Other processes with a waiting flag set for `target`.
fn deferring_to<'a>(
    snapshot: &'a GlobalSnapshot,
    target: &'a ProcessState,
) -> impl Iterator<Item = &'a ProcessState> {
    snapshot
        .processes()
        .filter(move |p| p.process != target.process && p.waiting.is_deferring(target.process))
}
