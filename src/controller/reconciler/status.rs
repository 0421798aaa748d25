//! # Status Conditions
//!
//! Progress conditions published through the status sink at pipeline checkpoints.

use crate::controller::reconciler::types::{DesiredConfig, SyncError};
use crate::crd::OperatorStatusCondition;
use std::fmt;

/// Kind of progress condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Working,
    Done,
    Degraded,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Working => "Working",
            ConditionKind::Done => "Done",
            ConditionKind::Degraded => "Degraded",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named condition with a human-readable message. Last write wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCondition {
    pub kind: ConditionKind,
    pub message: String,
}

impl StatusCondition {
    pub fn working(config: &DesiredConfig) -> Self {
        Self {
            kind: ConditionKind::Working,
            message: format!("Working towards {config}"),
        }
    }

    pub fn done(config: &DesiredConfig) -> Self {
        Self {
            kind: ConditionKind::Done,
            message: format!("Done applying {config}"),
        }
    }

    /// Condition carrying the error that exhausted the retry ladder
    pub fn degraded(err: &SyncError) -> Self {
        Self {
            kind: ConditionKind::Degraded,
            message: err.to_string(),
        }
    }
}

impl From<&StatusCondition> for OperatorStatusCondition {
    fn from(condition: &StatusCondition) -> Self {
        Self {
            r#type: condition.kind.as_str().to_string(),
            message: condition.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::types::Stage;
    use uuid::Uuid;

    fn config() -> DesiredConfig {
        DesiredConfig {
            namespace: "ns".to_string(),
            name: "version".to_string(),
            upstream: "http://localhost:8080/graph".to_string(),
            channel: "fast".to_string(),
            cluster_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_working_and_done_name_the_config() {
        let config = config();
        let working = StatusCondition::working(&config);
        assert_eq!(working.kind, ConditionKind::Working);
        assert_eq!(working.message, format!("Working towards {config}"));

        let done = StatusCondition::done(&config);
        assert_eq!(done.kind, ConditionKind::Done);
        assert_eq!(done.message, format!("Done applying {config}"));
    }

    #[test]
    fn test_degraded_carries_error() {
        let err = SyncError::transient(Stage::Apply, "apiserver unavailable");
        let degraded = StatusCondition::degraded(&err);
        assert_eq!(degraded.kind, ConditionKind::Degraded);
        assert_eq!(degraded.message, "apply stage failed: apiserver unavailable");
    }

    #[test]
    fn test_into_operator_status_condition() {
        let condition = StatusCondition::done(&config());
        let converted = OperatorStatusCondition::from(&condition);
        assert_eq!(converted.r#type, "Done");
        assert_eq!(converted.message, condition.message);
    }
}
