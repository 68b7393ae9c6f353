//! Shared deterministic types for the snapshot checker.
//!
//! These types describe what one process recorded at one snapshot point. They
//! carry no I/O and are immutable once the assembler has frozen them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Stable identity of a participating process.
pub type ProcessId = u32;

/// Identity of one logical global cut.
pub type SnapshotId = i64;

/// Mutual-exclusion state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MxState {
    /// Not requesting the critical section.
    NoMx,
    /// Requesting the critical section.
    WantMx,
    /// Holding the critical section.
    InMx,
}

impl MxState {
    /// Parse a recorded state value.
    ///
    /// Accepts the numeric encoding written by the process-side dumper
    /// (`0`, `1`, `2`) as well as symbolic names.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "0" | "NO_MX" | "noMX" => Some(Self::NoMx),
            "1" | "WANT_MX" | "wantMX" => Some(Self::WantMx),
            "2" | "IN_MX" | "inMX" => Some(Self::InMx),
            _ => None,
        }
    }

    /// True for `WANT_MX` and `IN_MX`.
    pub fn is_contending(self) -> bool {
        matches!(self, Self::WantMx | Self::InMx)
    }
}

impl fmt::Display for MxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoMx => "NO_MX",
            Self::WantMx => "WANT_MX",
            Self::InMx => "IN_MX",
        };
        f.write_str(label)
    }
}

/// Peers a process is deferring replies to, keyed by peer process id.
///
/// Peers absent from the mapping are not being deferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Waiting(BTreeMap<ProcessId, bool>);

impl Waiting {
    /// Build from a positional flag list where position `i` is process `i`.
    pub fn from_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self(
            flags
                .into_iter()
                .enumerate()
                .map(|(index, flag)| (index as ProcessId, flag))
                .collect(),
        )
    }

    pub fn is_deferring(&self, peer: ProcessId) -> bool {
        self.0.get(&peer).copied().unwrap_or(false)
    }

    /// Peer ids with a set flag, ascending.
    pub fn deferred_peers(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.0
            .iter()
            .filter(|(_, flag)| **flag)
            .map(|(peer, _)| *peer)
    }

    pub fn any(&self) -> bool {
        self.0.values().any(|flag| *flag)
    }

    /// Number of peers the flag list covered, set or not.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One process's recorded state at one snapshot point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessState {
    pub process: ProcessId,
    pub snapshot: SnapshotId,
    pub state: MxState,
    /// Lamport clock at capture time.
    pub logical_clock: i64,
    /// Timestamp of the pending or held request.
    pub request_timestamp: i64,
    pub waiting: Waiting,
    /// `NbrResps` as recorded by the process.
    pub pending_replies: i64,
    /// Reply messages recorded in flight toward this process.
    pub in_transit: Vec<String>,
}
