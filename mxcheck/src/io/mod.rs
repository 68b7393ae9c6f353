//! I/O helpers for verifier commands.

pub mod config;
pub mod report;
pub mod source;
