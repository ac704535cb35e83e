use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod settings;

pub use settings::{ActionPreference, ParseEnumError, Settings, Theme};

/// One row of the sender preview: the first promotional message seen from a sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoSender {
    pub message_id: String,
    pub sender_email: String,
    pub sender_display: String,
    pub subject: String,
    /// Raw `Date` header, formatted for display by the caller
    pub date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsubscribeStatus {
    Pending,
    DryRun,
    Skipped,
    Success,
    Failed,
    PartialFailure,
    Error,
}

impl UnsubscribeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            UnsubscribeStatus::Pending => "pending",
            UnsubscribeStatus::DryRun => "dry_run",
            UnsubscribeStatus::Skipped => "skipped",
            UnsubscribeStatus::Success => "success",
            UnsubscribeStatus::Failed => "failed",
            UnsubscribeStatus::PartialFailure => "partial_failure",
            UnsubscribeStatus::Error => "error",
        }
    }

    /// Statuses counted as failures in the run summary
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UnsubscribeStatus::Failed
                | UnsubscribeStatus::PartialFailure
                | UnsubscribeStatus::Error
        )
    }
}

/// A single try at one unsubscribe link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribeAttempt {
    pub link: String,
    pub status: UnsubscribeStatus,
    pub message: String,
}

/// Accumulated unsubscribe outcome for one sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderUnsubscribeResult {
    pub sender: String,
    pub status: UnsubscribeStatus,
    pub message: String,
    pub attempts: Vec<UnsubscribeAttempt>,
    pub success: bool,
    pub dry_run: bool,
}

impl SenderUnsubscribeResult {
    pub fn pending(sender: &str, dry_run: bool) -> Self {
        Self {
            sender: sender.to_string(),
            status: UnsubscribeStatus::Pending,
            message: "Processing not started".to_string(),
            attempts: Vec::new(),
            success: false,
            dry_run,
        }
    }

    pub fn skipped(sender: &str, message: impl Into<String>, dry_run: bool) -> Self {
        Self {
            status: UnsubscribeStatus::Skipped,
            message: message.into(),
            ..Self::pending(sender, dry_run)
        }
    }
}

/// Outcome of deleting everything from one sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub sender: String,
    pub success: bool,
    pub deleted_count: usize,
    pub errors: Vec<String>,
    pub message: String,
    pub dry_run: bool,
}

/// Per-user activity counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "diesel", derive(diesel::Queryable))]
pub struct UserActivity {
    pub email: String,
    pub unsubs_count: i64,
    pub deleted_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_match_serde() {
        for status in [
            UnsubscribeStatus::Pending,
            UnsubscribeStatus::DryRun,
            UnsubscribeStatus::Skipped,
            UnsubscribeStatus::Success,
            UnsubscribeStatus::Failed,
            UnsubscribeStatus::PartialFailure,
            UnsubscribeStatus::Error,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_failure_statuses() {
        assert!(UnsubscribeStatus::PartialFailure.is_failure());
        assert!(UnsubscribeStatus::Error.is_failure());
        assert!(!UnsubscribeStatus::Skipped.is_failure());
        assert!(!UnsubscribeStatus::DryRun.is_failure());
    }

    #[test]
    fn test_skipped_result() {
        let result = SenderUnsubscribeResult::skipped("a@example.com", "No link", true);
        assert_eq!(result.status, UnsubscribeStatus::Skipped);
        assert_eq!(result.sender, "a@example.com");
        assert!(result.attempts.is_empty());
        assert!(!result.success);
        assert!(result.dry_run);
    }
}
