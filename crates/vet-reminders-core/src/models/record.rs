//! Sent record models (append-only dispatch log).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Sent,
    Failed,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStatus::Sent => "sent",
            SendStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(SendStatus::Sent),
            "failed" => Some(SendStatus::Failed),
            _ => None,
        }
    }
}

/// Which flow produced a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrigin {
    /// Age-condition cycle
    Cycle,
    /// Promoted pending schedule
    Pending,
}

impl RecordOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordOrigin::Cycle => "cycle",
            RecordOrigin::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cycle" => Some(RecordOrigin::Cycle),
            "pending" => Some(RecordOrigin::Pending),
            _ => None,
        }
    }
}

/// A persisted dispatch attempt for a (pet, template) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentRecord {
    pub id: i64,
    pub pet_id: i64,
    pub template_id: i64,
    pub owner_id: i64,
    pub sent_at: DateTime<Utc>,
    pub status: SendStatus,
    /// Captured transport error for failed attempts
    pub error: Option<String>,
    pub origin: RecordOrigin,
}

impl SentRecord {
    pub fn succeeded(&self) -> bool {
        self.status == SendStatus::Sent
    }
}

/// A dispatch attempt about to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSentRecord {
    pub pet_id: i64,
    pub template_id: i64,
    pub owner_id: i64,
    pub sent_at: DateTime<Utc>,
    pub status: SendStatus,
    pub error: Option<String>,
    pub origin: RecordOrigin,
    /// Exact-age templates allow one successful send per pet
    pub exact_age: bool,
}

impl NewSentRecord {
    /// Storage-level idempotency key, present only for successful exact-age sends.
    pub fn dedup_key(&self) -> Option<String> {
        (self.exact_age && self.status == SendStatus::Sent)
            .then(|| format!("{}:{}", self.pet_id, self.template_id))
    }
}

/// Result of persisting a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded(SentRecord),
    /// The (pet, template) pair already has a successful exact-age record.
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(status: SendStatus, exact_age: bool) -> NewSentRecord {
        NewSentRecord {
            pet_id: 4,
            template_id: 9,
            owner_id: 1,
            sent_at: Utc::now(),
            status,
            error: None,
            origin: RecordOrigin::Cycle,
            exact_age,
        }
    }

    #[test]
    fn test_dedup_key_only_for_successful_exact_age() {
        assert_eq!(
            new_record(SendStatus::Sent, true).dedup_key(),
            Some("4:9".to_string())
        );
        assert_eq!(new_record(SendStatus::Failed, true).dedup_key(), None);
        assert_eq!(new_record(SendStatus::Sent, false).dedup_key(), None);
    }

    #[test]
    fn test_status_strings() {
        for status in [SendStatus::Sent, SendStatus::Failed] {
            assert_eq!(SendStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SendStatus::parse("queued"), None);
        assert_eq!(RecordOrigin::parse("pending"), Some(RecordOrigin::Pending));
    }
}
