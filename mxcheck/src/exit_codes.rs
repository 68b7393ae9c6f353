//! Stable exit codes for mxcheck CLI commands.

/// Command succeeded. Violations alone do not change this.
pub const OK: i32 = 0;
/// Command failed due to invalid config, unreadable input or an incomplete section.
pub const INVALID: i32 = 1;
/// `mxcheck check --fail-on-violation` found at least one violated invariant.
pub const VIOLATED: i32 = 2;
