//! Deploy DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::deployment::DeploymentOutcome;
use crate::domain::document::ConfigurationDocument;

/// Deploy outcome plus the live document's location and modification time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployReport {
    #[serde(flatten)]
    pub outcome: DeploymentOutcome,
    pub pipeline_path: PathBuf,
    pub last_modified: Option<DateTime<Utc>>,
}

impl DeployReport {
    pub fn new(outcome: DeploymentOutcome, document: &ConfigurationDocument) -> Self {
        Self {
            outcome,
            pipeline_path: document.path.clone(),
            last_modified: document.last_modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::command::CommandResult;
    use crate::domain::deployment::DeploymentStatus;

    #[test]
    fn test_report_flattens_outcome() {
        let outcome = DeploymentOutcome {
            attempt_id: uuid::Uuid::new_v4(),
            status: DeploymentStatus::ValidationSkippedAndSaved,
            message: "saved".to_string(),
            validation: CommandResult::skipped("no test command"),
            restart: None,
            backup: None,
            restored_from: None,
            finished_at: Utc::now(),
        };
        let document = ConfigurationDocument {
            path: PathBuf::from("/etc/logstash/pipeline.conf"),
            content: "input {}".to_string(),
            last_modified: None,
        };

        let json = serde_json::to_value(DeployReport::new(outcome, &document)).unwrap();
        assert_eq!(json["status"], "validation_skipped_and_saved");
        assert_eq!(json["pipeline_path"], "/etc/logstash/pipeline.conf");
        assert_eq!(json["validation"]["status"]["kind"], "skipped");
        assert!(json["last_modified"].is_null());
    }
}
