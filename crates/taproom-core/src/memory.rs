//! Two-tier memory assembly
//!
//! Hot storage is the current session's full turn log. Cold storage is
//! a bounded excerpt (opening + closing slice) of each of the user's
//! recent finished sessions. The assembler concatenates cold then hot
//! and renders the result as role-prefixed lines under a character
//! budget, so a persona invocation never replays unbounded history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::Speaker;
use crate::error::Result;
use crate::persistence::Repository;

/// Where a record sits within an archived session slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchivePosition {
    /// One of the first records of the session.
    Opening,
    /// One of the last records of the session.
    Closing,
}

impl ArchivePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchivePosition::Opening => "opening",
            ArchivePosition::Closing => "closing",
        }
    }
}

/// Normalized unit consumed by the assembler, sourced from either the
/// hot turn log or the cold archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRecord {
    pub speaker: Speaker,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set for cold records; hot records are implicitly the current
    /// session.
    pub session_id: Option<String>,
}

impl ContextRecord {
    /// Render as a single context line.
    fn to_line(&self) -> String {
        format!("{}: {}", self.speaker.display_name(), self.content)
    }
}

/// Marker inserted when the character budget cuts the context short.
const TRUNCATION_MARKER: &str = "(earlier messages truncated...)";

const CONTEXT_HEADER: &str = "=== Previous Conversation Context ===";
const CONTEXT_FOOTER: &str = "=== End Context ===";

/// Rough proxy: one token is about four characters.
const CHARS_PER_TOKEN: usize = 4;

/// Combines cold and hot records into one bounded context string.
#[derive(Debug, Clone)]
pub struct MemoryAssembler {
    /// How many finished sessions contribute archive slices.
    pub max_cold_sessions: u32,
    /// Token budget for the rendered context.
    pub max_tokens: usize,
}

impl Default for MemoryAssembler {
    fn default() -> Self {
        Self {
            max_cold_sessions: 4,
            max_tokens: 5000,
        }
    }
}

impl MemoryAssembler {
    pub fn new(max_cold_sessions: u32, max_tokens: usize) -> Self {
        Self {
            max_cold_sessions,
            max_tokens,
        }
    }

    /// Gather cold then hot records for a user and session.
    pub fn gather(
        &self,
        repo: &Repository,
        user_id: &str,
        session_id: &str,
    ) -> Result<Vec<ContextRecord>> {
        let mut records = repo.archived_records(user_id, self.max_cold_sessions)?;
        records.extend(repo.session_records(session_id)?);
        Ok(records)
    }

    /// Assemble the bounded context string for a persona invocation.
    ///
    /// Returns an empty string when there is no history at all, so the
    /// caller can skip the injection entirely.
    pub fn assemble(&self, repo: &Repository, user_id: &str, session_id: &str) -> Result<String> {
        let records = self.gather(repo, user_id, session_id)?;
        Ok(self.format(&records))
    }

    /// Render records as `"{Role}: {content}"` lines under the running
    /// character budget. Lines are never truncated mid-line: once the
    /// next line would exceed the budget, a single marker is appended
    /// and rendering stops.
    pub fn format(&self, records: &[ContextRecord]) -> String {
        if records.is_empty() {
            return String::new();
        }

        let max_chars = self.max_tokens * CHARS_PER_TOKEN;
        let mut lines = vec![CONTEXT_HEADER.to_string()];
        let mut total_chars = 0usize;

        for record in records {
            let line = record.to_line();
            if total_chars + line.len() > max_chars {
                lines.push(TRUNCATION_MARKER.to_string());
                break;
            }
            total_chars += line.len();
            lines.push(line);
        }

        lines.push(CONTEXT_FOOTER.to_string());
        lines.join("\n")
    }
}
