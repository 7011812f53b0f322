//! Confgate Orchestrator
//!
//! Owns the live configuration file and its backups, and drives a deploy
//! through write, validation and restart or rollback.

pub mod config;
pub mod error;
pub mod repository;
pub mod service;

pub use config::Config;
pub use error::{DeployError, StoreError, StoreOperation};
pub use repository::{ConfigStore, FileConfigStore};
pub use service::{DeploymentService, LogTail, LogTailService};
