//! Core domain types
//!
//! These types are produced by the runner and the orchestrator and consumed
//! by the presentation layer. They are plain data: every one of them is
//! immutable once built and serializes to JSON.

pub mod backup;
pub mod command;
pub mod deployment;
pub mod document;
