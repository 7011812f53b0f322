//! Repository Module
//!
//! Storage layer for the orchestrator: the live configuration file, its
//! backups, and the lock that serializes deploys across processes.

pub mod config_store;
pub mod deploy_lock;

// Re-export for convenience
pub use config_store::{ConfigStore, FileConfigStore};
pub use deploy_lock::DeployLock;
