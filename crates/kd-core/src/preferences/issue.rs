//! Diagnostics recorded when a preference operation degrades

use std::fmt;

use chrono::{DateTime, Utc};

/// What went wrong with a preference operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    StorageUnavailable,
    Serialize,
    Deserialize,
    Read,
    Write,
    ListenerPanic,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueKind::StorageUnavailable => "storage unavailable",
            IssueKind::Serialize => "serialize",
            IssueKind::Deserialize => "deserialize",
            IssueKind::Read => "read",
            IssueKind::Write => "write",
            IssueKind::ListenerPanic => "listener panic",
        };
        f.write_str(name)
    }
}

/// A degraded preference operation, kept for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceIssue {
    pub key: String,
    pub kind: IssueKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl PreferenceIssue {
    pub fn new(key: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for PreferenceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.key, self.kind, self.message)
    }
}

/// What happened to the write part of a preference change
#[derive(Debug, Clone, PartialEq)]
pub enum WriteStatus {
    /// The change reached storage
    Stored,

    /// No persistent storage; nothing was written
    Skipped,

    /// Serialization or storage failed; listeners were not told
    Failed(PreferenceIssue),
}

/// Result of a preference change, returned so callers and tests can observe
/// degraded writes without parsing logs
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceOutcome {
    pub status: WriteStatus,

    /// Listeners that ran to completion
    pub notified: usize,

    /// Listeners that panicked
    pub panicked: usize,
}

impl PreferenceOutcome {
    pub(super) fn failed(issue: PreferenceIssue) -> Self {
        Self {
            status: WriteStatus::Failed(issue),
            notified: 0,
            panicked: 0,
        }
    }

    pub fn is_stored(&self) -> bool {
        self.status == WriteStatus::Stored
    }
}
