/// Job lifecycle states
///
/// The state machine is `pending -> in_progress -> {completed,
/// completed_with_errors, failed, cancelled}`. The four right-hand states
/// are terminal: no transition ever leaves them.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created but not yet picked up by a runner
    Pending,

    /// Claimed exclusively by one runner; the crawl is underway
    InProgress,

    /// Frontier fully drained and every page fetched successfully
    Completed,

    /// Frontier fully drained, but some pages were unreachable
    CompletedWithErrors,

    /// An unrecoverable condition aborted the run before the frontier
    /// drained
    Failed,

    /// An external cancellation request was observed at a checkpoint
    Cancelled,
}

impl JobStatus {
    /// Returns true if no further transition can leave this state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }

    /// Returns true if the job finished by draining its frontier
    pub fn is_drained(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithErrors)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "completed_with_errors" => Some(Self::CompletedWithErrors),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::InProgress,
            Self::Completed,
            Self::CompletedWithErrors,
            Self::Failed,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(s).ok_or_else(|| format!("unknown job status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());

        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::CompletedWithErrors.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_is_drained() {
        assert!(JobStatus::Completed.is_drained());
        assert!(JobStatus::CompletedWithErrors.is_drained());

        assert!(!JobStatus::Pending.is_drained());
        assert!(!JobStatus::InProgress.is_drained());
        assert!(!JobStatus::Failed.is_drained());
        assert!(!JobStatus::Cancelled.is_drained());
    }

    #[test]
    fn test_roundtrip_db_string() {
        for status in JobStatus::all_statuses() {
            let db_str = status.to_db_string();
            let parsed = JobStatus::from_db_string(db_str);
            assert_eq!(Some(status), parsed, "Failed roundtrip for {:?}", status);
        }
    }

    #[test]
    fn test_from_db_string_invalid() {
        assert_eq!(JobStatus::from_db_string("running"), None);
        assert_eq!(JobStatus::from_db_string(""), None);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&JobStatus::CompletedWithErrors).unwrap();
        assert_eq!(json, "\"completed_with_errors\"");
        let back: JobStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, JobStatus::CompletedWithErrors);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", JobStatus::InProgress), "in_progress");
        assert_eq!(format!("{}", JobStatus::Cancelled), "cancelled");
    }

    #[test]
    fn test_all_statuses_complete() {
        let all = JobStatus::all_statuses();
        assert_eq!(all.len(), 6);
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j], "Duplicate status found");
            }
        }
    }
}
