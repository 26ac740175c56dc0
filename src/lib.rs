//! Purpose: Library crate behind the `clidocgen` and `clidocgen-populate` binaries.
//! Exports: `core` (execution, sessions, rendering, sanitizing, persistence), `script`,
//! `target`, `generate`, `populate`, `report`.
//! Role: Keeps binaries thin; every behavior is reachable and testable from here.
//! Invariants: Steps execute strictly in order on the calling thread.
pub mod core;
pub mod generate;
pub mod populate;
pub mod report;
pub mod script;
pub mod target;
