//! Live configuration document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The single live pipeline configuration
///
/// `last_modified` is `None` when no document has been written yet, in which
/// case `content` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationDocument {
    pub path: PathBuf,
    pub content: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ConfigurationDocument {
    /// Whether a document currently exists on disk
    pub fn exists(&self) -> bool {
        self.last_modified.is_some()
    }
}
