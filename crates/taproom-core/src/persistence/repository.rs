//! Repository for session, turn, and archive storage
//!
//! A turn's append and its session's counter/status update happen in
//! one transaction: a turn without its session mutation (or the other
//! way around) would break the append-only accounting.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::schema::{Schema, SCHEMA_VERSION};
use crate::agent::{AgentName, Speaker};
use crate::error::{PersistenceError, Result, TaproomError};
use crate::memory::{ArchivePosition, ContextRecord};
use crate::session::{Session, SessionStatus, Turn};

/// How many records open an archive slice.
const ARCHIVE_OPENING: usize = 3;

/// How many records close an archive slice.
const ARCHIVE_CLOSING: usize = 10;

/// Repository for persisting taproom state
pub struct Repository {
    conn: rusqlite::Connection,
}

impl Repository {
    /// Create a new repository with the given database path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Create an in-memory repository (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Initialize the database schema
    fn initialize(&self) -> Result<()> {
        let current_version = self.get_schema_version().unwrap_or(0);

        if current_version == 0 {
            self.conn.execute_batch(Schema::create_tables())?;
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    self.conn.execute_batch(migration)?;
                }
            }
            self.set_schema_version(SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Option<u32> {
        self.conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY applied_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok()
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Create and persist a fresh session for a user.
    pub fn create_session(
        &self,
        user_id: &str,
        weather_snapshot: Option<String>,
    ) -> Result<Session> {
        let session = Session::new(user_id, weather_snapshot);
        self.conn.execute(
            r#"
            INSERT INTO sessions
            (id, user_id, status, message_count, current_agent, pending_handoff, weather, started_at, ended_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                session.id,
                session.user_id,
                session.status.as_str(),
                session.message_count,
                session.current_agent.map(|a| a.as_str()),
                session.pending_handoff.map(|a| a.as_str()),
                session.weather_snapshot,
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(session)
    }

    /// Get a session by ID
    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let result = self.conn.query_row(
            "SELECT id, user_id, status, message_count, current_agent, pending_handoff, weather, started_at, ended_at FROM sessions WHERE id = ?1",
            [id],
            Self::row_to_session,
        );

        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(PersistenceError::from(e).into()),
        }
    }

    /// Persist a session's mutable fields.
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE sessions
            SET status = ?2, message_count = ?3, current_agent = ?4,
                pending_handoff = ?5, ended_at = ?6
            WHERE id = ?1
            "#,
            params![
                session.id,
                session.status.as_str(),
                session.message_count,
                session.current_agent.map(|a| a.as_str()),
                session.pending_handoff.map(|a| a.as_str()),
                session.ended_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        if changed == 0 {
            return Err(TaproomError::SessionNotFound(session.id.clone()));
        }
        Ok(())
    }

    /// Append a turn and persist the session's mutations atomically.
    pub fn record_turn(&mut self, turn: &Turn, session: &Session) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(PersistenceError::from)?;

        tx.execute(
            r#"
            INSERT INTO turns
            (id, session_id, user_id, speaker, user_text, reply_text, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                turn.id,
                turn.session_id,
                turn.user_id,
                turn.speaker.as_str(),
                turn.user_text,
                turn.reply_text,
                turn.created_at.to_rfc3339(),
            ],
        )?;

        tx.execute(
            r#"
            UPDATE sessions
            SET status = ?2, message_count = ?3, current_agent = ?4,
                pending_handoff = ?5, ended_at = ?6
            WHERE id = ?1
            "#,
            params![
                session.id,
                session.status.as_str(),
                session.message_count,
                session.current_agent.map(|a| a.as_str()),
                session.pending_handoff.map(|a| a.as_str()),
                session.ended_at.map(|t| t.to_rfc3339()),
            ],
        )?;

        tx.commit().map_err(PersistenceError::from)?;
        Ok(())
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        let status_str: String = row.get(2)?;
        let current_agent: Option<String> = row.get(4)?;
        let pending_handoff: Option<String> = row.get(5)?;
        let started_at_str: String = row.get(7)?;
        let ended_at_str: Option<String> = row.get(8)?;

        Ok(Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            status: parse_column(2, &status_str)?,
            message_count: row.get(3)?,
            current_agent: current_agent.and_then(|s| s.parse::<AgentName>().ok()),
            pending_handoff: pending_handoff.and_then(|s| s.parse::<AgentName>().ok()),
            weather_snapshot: row.get(6)?,
            started_at: parse_timestamp(7, &started_at_str)?,
            ended_at: ended_at_str
                .map(|s| parse_timestamp(8, &s))
                .transpose()?,
        })
    }

    // ==================== Turn Operations ====================

    /// All turns of a session, oldest first.
    pub fn get_turns(&self, session_id: &str) -> Result<Vec<Turn>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, user_id, speaker, user_text, reply_text, created_at FROM turns WHERE session_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;

        let turns = stmt
            .query_map([session_id], Self::row_to_turn)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(PersistenceError::from)?;

        Ok(turns)
    }

    fn row_to_turn(row: &rusqlite::Row) -> rusqlite::Result<Turn> {
        let speaker_str: String = row.get(3)?;
        let created_at_str: String = row.get(6)?;

        Ok(Turn {
            id: row.get(0)?,
            session_id: row.get(1)?,
            user_id: row.get(2)?,
            speaker: parse_column(3, &speaker_str)?,
            user_text: row.get(4)?,
            reply_text: row.get(5)?,
            created_at: parse_timestamp(6, &created_at_str)?,
        })
    }

    // ==================== Memory Operations ====================

    /// Hot storage: the current session's turns flattened into context
    /// records, oldest first. Each turn contributes the user's message
    /// followed by the reply.
    pub fn session_records(&self, session_id: &str) -> Result<Vec<ContextRecord>> {
        let turns = self.get_turns(session_id)?;
        let mut records = Vec::with_capacity(turns.len() * 2);
        for turn in turns {
            records.push(ContextRecord {
                speaker: Speaker::User,
                content: turn.user_text,
                timestamp: turn.created_at,
                session_id: None,
            });
            records.push(ContextRecord {
                speaker: turn.speaker,
                content: turn.reply_text,
                timestamp: turn.created_at,
                session_id: None,
            });
        }
        Ok(records)
    }

    /// Cold storage: archive slices of the user's most recent finished
    /// sessions, emitted oldest-session-first so the assembled context
    /// reads chronologically, opening records before closing records.
    pub fn archived_records(&self, user_id: &str, max_sessions: u32) -> Result<Vec<ContextRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id FROM sessions
            WHERE user_id = ?1 AND status IN ('completed', 'ended')
            ORDER BY ended_at DESC LIMIT ?2
            "#,
        )?;
        let mut session_ids = stmt
            .query_map(params![user_id, max_sessions], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(PersistenceError::from)?;
        session_ids.reverse();

        let mut records = Vec::new();
        let mut slice_stmt = self.conn.prepare(
            r#"
            SELECT speaker, content, created_at, session_id FROM turn_archive
            WHERE session_id = ?1
            ORDER BY CASE position WHEN 'opening' THEN 0 ELSE 1 END, position_index ASC
            "#,
        )?;

        for session_id in session_ids {
            let slice = slice_stmt
                .query_map([&session_id], |row| {
                    let speaker_str: String = row.get(0)?;
                    let created_at_str: String = row.get(2)?;
                    Ok(ContextRecord {
                        speaker: parse_column(0, &speaker_str)?,
                        content: row.get(1)?,
                        timestamp: parse_timestamp(2, &created_at_str)?,
                        session_id: Some(row.get(3)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(PersistenceError::from)?;
            records.extend(slice);
        }

        Ok(records)
    }

    // ==================== Archival ====================

    /// Copy a finished session's bounded excerpt into the archive: the
    /// first 3 records (opening) and the last 10 of the remainder
    /// (closing). Already-archived sessions are left untouched.
    ///
    /// Returns the number of records archived.
    pub fn archive_session(&mut self, session_id: &str) -> Result<usize> {
        let existing: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM turn_archive WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(0);
        }

        let session = self
            .get_session(session_id)?
            .ok_or_else(|| TaproomError::SessionNotFound(session_id.to_string()))?;

        let records = self.session_records(session_id)?;
        if records.is_empty() {
            return Ok(0);
        }

        let opening_len = records.len().min(ARCHIVE_OPENING);
        let (opening, rest) = records.split_at(opening_len);
        let closing_start = rest.len().saturating_sub(ARCHIVE_CLOSING);
        let closing = &rest[closing_start..];

        let tx = self
            .conn
            .transaction()
            .map_err(PersistenceError::from)?;
        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO turn_archive
                (id, session_id, user_id, speaker, content, created_at, position, position_index)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;

            for (slice, position) in [
                (opening, ArchivePosition::Opening),
                (closing, ArchivePosition::Closing),
            ] {
                for (idx, record) in slice.iter().enumerate() {
                    insert.execute(params![
                        Uuid::new_v4().to_string(),
                        session_id,
                        session.user_id,
                        record.speaker.as_str(),
                        record.content,
                        record.timestamp.to_rfc3339(),
                        position.as_str(),
                        (idx + 1) as u32,
                    ])?;
                }
            }
        }
        tx.commit().map_err(PersistenceError::from)?;

        Ok(opening.len() + closing.len())
    }

    /// Move a session into a finished status, stamping `ended_at` and
    /// archiving its excerpt when the status feeds cold storage.
    pub fn close_session(&mut self, session_id: &str, status: SessionStatus) -> Result<()> {
        let mut session = self
            .get_session(session_id)?
            .ok_or_else(|| TaproomError::SessionNotFound(session_id.to_string()))?;

        session.status = status;
        session.ended_at = Some(Utc::now());
        self.save_session(&session)?;

        if status.is_archivable() {
            self.archive_session(session_id)?;
        }
        Ok(())
    }
}

/// Map a stored string back to a domain type, reporting failures as
/// column conversion errors.
fn parse_column<T: std::str::FromStr>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(session: &Session, speaker: Speaker, user_text: &str, reply: &str) -> Turn {
        Turn::new(&session.id, &session.user_id, speaker, user_text, reply)
    }

    #[test]
    fn test_repository_creation() {
        let repo = Repository::in_memory().unwrap();
        assert!(repo.get_session("missing").unwrap().is_none());
    }

    #[test]
    fn test_session_crud() {
        let repo = Repository::in_memory().unwrap();

        let session = repo
            .create_session("u-1", Some("grey drizzle over the harbor".to_string()))
            .unwrap();

        let loaded = repo.get_session(&session.id).unwrap().unwrap();
        assert_eq!(loaded.user_id, "u-1");
        assert_eq!(loaded.status, SessionStatus::Active);
        assert_eq!(
            loaded.weather_snapshot.as_deref(),
            Some("grey drizzle over the harbor")
        );

        let mut updated = loaded;
        updated.status = SessionStatus::Warning;
        updated.current_agent = Some(AgentName::Bernie);
        updated.pending_handoff = Some(AgentName::Jb);
        repo.save_session(&updated).unwrap();

        let reloaded = repo.get_session(&session.id).unwrap().unwrap();
        assert_eq!(reloaded.status, SessionStatus::Warning);
        assert_eq!(reloaded.current_agent, Some(AgentName::Bernie));
        assert_eq!(reloaded.pending_handoff, Some(AgentName::Jb));
    }

    #[test]
    fn test_save_unknown_session_fails() {
        let repo = Repository::in_memory().unwrap();
        let session = Session::new("u-1", None);
        assert!(matches!(
            repo.save_session(&session),
            Err(TaproomError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_record_turn_moves_both_rows() {
        let mut repo = Repository::in_memory().unwrap();
        let mut session = repo.create_session("u-1", None).unwrap();

        let t = turn(
            &session,
            Speaker::Agent(AgentName::Bart),
            "rough day",
            "Pull up a stool.",
        );
        session.message_count += 1;
        session.current_agent = Some(AgentName::Bart);
        repo.record_turn(&t, &session).unwrap();

        let turns = repo.get_turns(&session.id).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker, Speaker::Agent(AgentName::Bart));
        assert_eq!(turns[0].reply_text, "Pull up a stool.");

        let reloaded = repo.get_session(&session.id).unwrap().unwrap();
        assert_eq!(reloaded.message_count, 1);
        assert_eq!(reloaded.current_agent, Some(AgentName::Bart));
    }

    #[test]
    fn test_session_records_flatten_turns() {
        let mut repo = Repository::in_memory().unwrap();
        let mut session = repo.create_session("u-1", None).unwrap();

        for (text, reply) in [("one", "r1"), ("two", "r2")] {
            let t = turn(&session, Speaker::Agent(AgentName::Bart), text, reply);
            session.message_count += 1;
            repo.record_turn(&t, &session).unwrap();
        }

        let records = repo.session_records(&session.id).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records[0].speaker.is_user());
        assert_eq!(records[0].content, "one");
        assert_eq!(records[1].content, "r1");
        assert!(records[2].speaker.is_user());
        assert_eq!(records[3].content, "r2");
    }

    #[test]
    fn test_archive_bounds() {
        let mut repo = Repository::in_memory().unwrap();
        let mut session = repo.create_session("u-1", None).unwrap();

        // 10 turns -> 20 records; the archive keeps 3 + 10 = 13.
        for i in 0..10 {
            let t = turn(
                &session,
                Speaker::Agent(AgentName::Bart),
                &format!("user {i}"),
                &format!("reply {i}"),
            );
            session.message_count += 1;
            repo.record_turn(&t, &session).unwrap();
        }

        repo.close_session(&session.id, SessionStatus::Completed)
            .unwrap();

        let records = repo.archived_records("u-1", 4).unwrap();
        assert_eq!(records.len(), 13);
        // Opening: the very first exchanges.
        assert_eq!(records[0].content, "user 0");
        assert_eq!(records[1].content, "reply 0");
        assert_eq!(records[2].content, "user 1");
        // Closing: the tail of the session.
        assert_eq!(records.last().unwrap().content, "reply 9");
    }

    #[test]
    fn test_short_session_archives_without_duplicates() {
        let mut repo = Repository::in_memory().unwrap();
        let mut session = repo.create_session("u-1", None).unwrap();

        let t = turn(&session, Speaker::Agent(AgentName::Bart), "hi", "evening");
        session.message_count += 1;
        repo.record_turn(&t, &session).unwrap();

        repo.close_session(&session.id, SessionStatus::Ended).unwrap();

        let records = repo.archived_records("u-1", 4).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "hi");
        assert_eq!(records[1].content, "evening");
    }

    #[test]
    fn test_archive_is_idempotent() {
        let mut repo = Repository::in_memory().unwrap();
        let mut session = repo.create_session("u-1", None).unwrap();

        let t = turn(&session, Speaker::Agent(AgentName::Bart), "hi", "evening");
        session.message_count += 1;
        repo.record_turn(&t, &session).unwrap();

        assert_eq!(repo.archive_session(&session.id).unwrap(), 2);
        assert_eq!(repo.archive_session(&session.id).unwrap(), 0);
        assert_eq!(repo.archived_records("u-1", 4).unwrap().len(), 0);

        repo.close_session(&session.id, SessionStatus::Ended).unwrap();
        assert_eq!(repo.archived_records("u-1", 4).unwrap().len(), 2);
    }

    #[test]
    fn test_cold_window_keeps_most_recent_sessions() {
        let mut repo = Repository::in_memory().unwrap();

        // Five finished sessions; only the most recent four contribute.
        for i in 0..5 {
            let mut session = repo.create_session("u-1", None).unwrap();
            let t = turn(
                &session,
                Speaker::Agent(AgentName::Bart),
                &format!("s{i} hello"),
                &format!("s{i} reply"),
            );
            session.message_count += 1;
            repo.record_turn(&t, &session).unwrap();
            // Deterministic, strictly increasing end times.
            session.status = SessionStatus::Completed;
            session.ended_at = Some(
                DateTime::parse_from_rfc3339(&format!("2024-06-0{}T12:00:00Z", i + 1))
                    .unwrap()
                    .with_timezone(&Utc),
            );
            repo.save_session(&session).unwrap();
            repo.archive_session(&session.id).unwrap();
        }

        let records = repo.archived_records("u-1", 4).unwrap();
        assert_eq!(records.len(), 8);
        // The oldest session (s0) fell out of the window; the oldest
        // surviving session is emitted first.
        assert!(records[0].content.starts_with("s1"));
        assert!(records.last().unwrap().content.starts_with("s4"));
        assert!(!records.iter().any(|r| r.content.starts_with("s0")));
    }

    #[test]
    fn test_kicked_sessions_do_not_feed_cold_storage() {
        let mut repo = Repository::in_memory().unwrap();
        let mut session = repo.create_session("u-1", None).unwrap();
        let t = turn(&session, Speaker::Agent(AgentName::Bart), "hi", "out");
        session.message_count += 1;
        repo.record_turn(&t, &session).unwrap();

        repo.close_session(&session.id, SessionStatus::Kicked).unwrap();
        assert!(repo.archived_records("u-1", 4).unwrap().is_empty());
    }
}
