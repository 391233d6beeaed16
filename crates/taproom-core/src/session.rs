//! Session and turn records
//!
//! A session is the unit of conversational state: it carries the
//! message counter, the sticky persona, and any pending handoff. Turns
//! are immutable once recorded and form the session's append-only log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::{AgentName, Speaker};
use crate::error::PersistenceError;

/// Session lifecycle status.
///
/// `Kicked`, `Ended`, and `Rejected` are terminal: a session in one of
/// those states accepts no further turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Onboarding,
    Active,
    Warning,
    Kicked,
    Ended,
    Completed,
    Rejected,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Onboarding => "onboarding",
            SessionStatus::Active => "active",
            SessionStatus::Warning => "warning",
            SessionStatus::Kicked => "kicked",
            SessionStatus::Ended => "ended",
            SessionStatus::Completed => "completed",
            SessionStatus::Rejected => "rejected",
        }
    }

    /// Terminal statuses forbid further turns.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Kicked | SessionStatus::Ended | SessionStatus::Rejected
        )
    }

    /// Statuses whose archive slices feed cold storage.
    pub fn is_archivable(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Ended)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onboarding" => Ok(SessionStatus::Onboarding),
            "active" => Ok(SessionStatus::Active),
            "warning" => Ok(SessionStatus::Warning),
            "kicked" => Ok(SessionStatus::Kicked),
            "ended" => Ok(SessionStatus::Ended),
            "completed" => Ok(SessionStatus::Completed),
            "rejected" => Ok(SessionStatus::Rejected),
            other => Err(PersistenceError::CorruptRecord(format!(
                "unknown session status: {other}"
            ))),
        }
    }
}

/// A conversation session for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub status: SessionStatus,
    /// Monotonically non-decreasing count of recorded turns.
    pub message_count: u32,
    /// The persona that answered the most recent routed turn.
    pub current_agent: Option<AgentName>,
    /// Handoff requested by a persona's reply, honored on the next turn.
    pub pending_handoff: Option<AgentName>,
    /// Environmental snapshot captured at session start, if any.
    pub weather_snapshot: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a fresh active session.
    pub fn new(user_id: impl Into<String>, weather_snapshot: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            status: SessionStatus::Active,
            message_count: 0,
            current_agent: None,
            pending_handoff: None,
            weather_snapshot,
            started_at: Utc::now(),
            ended_at: None,
        }
    }
}

/// One routed turn: the user's text and the reply it produced.
///
/// Immutable once recorded; never mutated or deleted. An archival step
/// may later copy a bounded excerpt elsewhere, but the original record
/// is not altered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    /// Who the reply is attributed to.
    pub speaker: Speaker,
    pub user_text: String,
    pub reply_text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        speaker: Speaker,
        user_text: impl Into<String>,
        reply_text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            speaker,
            user_text: user_text.into(),
            reply_text: reply_text.into(),
            created_at: Utc::now(),
        }
    }
}
