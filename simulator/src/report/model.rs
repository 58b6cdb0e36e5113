use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::workflow::runner::WorkflowResult;

/// JSON document written after an offline session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub generated_at: DateTime<Utc>,
    pub feed: String,
    #[serde(flatten)]
    pub result: WorkflowResult,
}

impl SessionReport {
    pub fn new(feed: impl Into<String>, result: WorkflowResult) -> Self {
        Self {
            generated_at: Utc::now(),
            feed: feed.into(),
            result,
        }
    }

    /// One-line digest appended to the session log.
    pub fn summary_line(&self) -> String {
        let metrics = &self.result.metrics;
        format!(
            "{} feed={} accepted={} dropped={} steps={} selections={} decisions={} \
             notifications={}\n",
            self.generated_at.to_rfc3339(),
            self.feed,
            self.result.load.accepted,
            self.result.load.dropped,
            self.result.steps.len(),
            metrics.selections,
            metrics.decisions,
            self.result.notifications.len(),
        )
    }
}
