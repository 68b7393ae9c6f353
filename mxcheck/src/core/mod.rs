//! Deterministic, pure logic for snapshot assembly and invariant checking.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod assembler;
pub mod invariants;
pub mod record;
pub mod types;
