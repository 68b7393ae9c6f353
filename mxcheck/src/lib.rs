//! Offline verifier for distributed mutual-exclusion snapshots.
//!
//! Processes running a timestamp-based mutual-exclusion protocol dump their
//! local state at numbered snapshot points. This crate reassembles those dumps
//! into global snapshots and checks six safety invariants on each. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (line classification, snapshot
//!   assembly, invariant predicates). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, snapshot directories,
//!   report output). Isolated behind traits so tests can substitute them.
//!
//! [`check`] coordinates core logic with I/O to implement CLI commands.

pub mod check;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
