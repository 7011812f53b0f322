//! Service Module
//!
//! Deploy workflow and the read-only queries around it.

pub mod deployment;
pub mod log_tail;
pub mod template;

pub use deployment::DeploymentService;
pub use log_tail::{LogTail, LogTailService};
