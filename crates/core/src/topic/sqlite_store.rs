//! SQLite-backed topic store implementation.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use rusqlite::{params, Connection};

use crate::config::DatabaseConfig;

use super::{
    NewTopic, Stage, StageStates, StageStatus, Topic, TopicError, TopicFilter, TopicStore,
};

/// Allowed PRAGMA synchronous values.
const SYNCHRONOUS_MODES: [&str; 4] = ["OFF", "NORMAL", "FULL", "EXTRA"];

/// SQLite-backed topic store.
///
/// The table name is configurable; it is validated as a plain identifier
/// before being formatted into any SQL.
pub struct SqliteTopicStore {
    conn: Mutex<Connection>,
    table: String,
}

fn status_col(stage: Stage) -> String {
    format!("{}_status", stage.as_str())
}

fn output_col(stage: Stage) -> String {
    format!("{}_output", stage.as_str())
}

/// Column list shared by every SELECT, in `row_to_topic` order.
fn select_columns() -> String {
    let mut cols = vec!["id".to_string(), "title".to_string(), "raw_metadata".to_string()];
    for stage in Stage::ALL {
        cols.push(status_col(stage));
        cols.push(output_col(stage));
    }
    cols.extend(
        ["last_error", "publish_at", "uploaded_at", "created_at", "updated_at"]
            .map(String::from),
    );
    cols.join(", ")
}

impl SqliteTopicStore {
    /// Open (or create) the store at the configured path with the configured
    /// pragmas. Fails fast on an unusable path or table name.
    pub fn open(config: &DatabaseConfig) -> Result<Self, TopicError> {
        let table = Self::validated_table(&config.table)?;

        let conn = Connection::open(&config.path)
            .map_err(|e| TopicError::Database(e.to_string()))?;

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| TopicError::Database(e.to_string()))?;
        if config.wal {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| TopicError::Database(e.to_string()))?;
        }
        let synchronous = config.synchronous.to_uppercase();
        if !SYNCHRONOUS_MODES.contains(&synchronous.as_str()) {
            return Err(TopicError::Database(format!(
                "invalid synchronous mode: {}",
                config.synchronous
            )));
        }
        conn.pragma_update(None, "synchronous", &synchronous)
            .map_err(|e| TopicError::Database(e.to_string()))?;

        Self::initialize_schema(&conn, &table)?;
        Ok(Self {
            conn: Mutex::new(conn),
            table,
        })
    }

    /// Create an in-memory store with the default table name (for tests).
    pub fn in_memory() -> Result<Self, TopicError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TopicError::Database(e.to_string()))?;
        let table = "topics".to_string();
        Self::initialize_schema(&conn, &table)?;
        Ok(Self {
            conn: Mutex::new(conn),
            table,
        })
    }

    fn validated_table(table: &str) -> Result<String, TopicError> {
        let ident = Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex");
        if ident.is_match(table) {
            Ok(table.to_string())
        } else {
            Err(TopicError::InvalidTableName(table.to_string()))
        }
    }

    fn initialize_schema(conn: &Connection, table: &str) -> Result<(), TopicError> {
        let mut stage_cols = String::new();
        for stage in Stage::ALL {
            stage_cols.push_str(&format!(
                "{} TEXT NOT NULL DEFAULT 'not_started',\n                {} TEXT,\n                ",
                status_col(stage),
                output_col(stage)
            ));
        }

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                raw_metadata TEXT NOT NULL,
                {stage_cols}last_error TEXT,
                publish_at TEXT,
                uploaded_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_created_at ON {table}(created_at);
            CREATE INDEX IF NOT EXISTS idx_{table}_uploaded_at ON {table}(uploaded_at);
            "#,
        ))
        .map_err(|e| TopicError::Database(e.to_string()))?;

        // Migration: upload columns were added after the initial schema.
        let _ = conn.execute(&format!("ALTER TABLE {table} ADD COLUMN publish_at TEXT"), []);
        let _ = conn.execute(
            &format!("ALTER TABLE {table} ADD COLUMN uploaded_at TEXT"),
            [],
        );

        Ok(())
    }

    fn row_to_topic(row: &rusqlite::Row) -> rusqlite::Result<Topic> {
        fn parse_status(idx: usize, raw: &str) -> rusqlite::Result<StageStatus> {
            raw.parse().map_err(|e: String| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    e.into(),
                )
            })
        }

        let id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let raw_metadata_json: String = row.get(2)?;

        let mut stages = StageStates::new();
        for stage in Stage::ALL {
            let status_idx = 3 + stage.index() * 2;
            let status_raw: String = row.get(status_idx)?;
            let output: Option<String> = row.get(status_idx + 1)?;
            let progress = stages.get_mut(stage);
            progress.status = parse_status(status_idx, &status_raw)?;
            progress.output_path = output.map(Into::into);
        }

        let last_error: Option<String> = row.get(13)?;
        let publish_at: Option<String> = row.get(14)?;
        let uploaded_at: Option<String> = row.get(15)?;
        let created_at_str: String = row.get(16)?;
        let updated_at_str: String = row.get(17)?;

        let parse_ts = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now())
        };

        let raw_metadata =
            serde_json::from_str(&raw_metadata_json).unwrap_or(serde_json::Value::Null);

        Ok(Topic {
            id,
            title,
            raw_metadata,
            stages,
            last_error,
            publish_at: publish_at.as_deref().map(parse_ts),
            uploaded_at: uploaded_at.as_deref().map(parse_ts),
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    fn get_locked(
        conn: &Connection,
        table: &str,
        id: &str,
    ) -> Result<Option<Topic>, TopicError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            select_columns(),
            table
        );
        match conn.query_row(&sql, params![id], Self::row_to_topic) {
            Ok(topic) => Ok(Some(topic)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TopicError::Database(e.to_string())),
        }
    }

    fn require_locked(conn: &Connection, table: &str, id: &str) -> Result<Topic, TopicError> {
        Self::get_locked(conn, table, id)?.ok_or_else(|| TopicError::NotFound(id.to_string()))
    }

    /// Validates the transition table before any stage write.
    fn check_transition(
        topic: &Topic,
        stage: Stage,
        to: StageStatus,
    ) -> Result<(), TopicError> {
        let from = topic.status(stage);
        if !from.can_transition_to(to) {
            return Err(TopicError::InvalidTransition {
                topic_id: topic.id.clone(),
                stage,
                from,
                to,
            });
        }
        Ok(())
    }
}

impl TopicStore for SqliteTopicStore {
    fn insert(&self, topic: NewTopic) -> Result<bool, TopicError> {
        let conn = self.conn.lock().unwrap();

        let now = Utc::now().to_rfc3339();
        let raw_metadata = serde_json::to_string(&topic.raw_metadata)
            .map_err(|e| TopicError::Database(e.to_string()))?;

        // Ids are never reused or mutated; an existing row wins.
        let sql = format!(
            "INSERT OR IGNORE INTO {} (id, title, raw_metadata, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
            self.table
        );
        let inserted = conn
            .execute(&sql, params![topic.id, topic.title, raw_metadata, now, now])
            .map_err(|e| TopicError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    fn get(&self, id: &str) -> Result<Option<Topic>, TopicError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, &self.table, id)
    }

    fn list(&self, filter: &TopicFilter) -> Result<Vec<Topic>, TopicError> {
        let conn = self.conn.lock().unwrap();

        let where_clause = match filter.stage_status {
            Some((stage, status)) => {
                format!("WHERE {} = '{}'", status_col(stage), status.as_str())
            }
            None => String::new(),
        };

        let sql = format!(
            "SELECT {} FROM {} {} ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
            select_columns(),
            self.table,
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TopicError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![filter.limit, filter.offset], Self::row_to_topic)
            .map_err(|e| TopicError::Database(e.to_string()))?;

        let mut topics = Vec::new();
        for row_result in rows {
            topics.push(row_result.map_err(|e| TopicError::Database(e.to_string()))?);
        }
        Ok(topics)
    }

    fn count(&self, filter: &TopicFilter) -> Result<i64, TopicError> {
        let conn = self.conn.lock().unwrap();

        let where_clause = match filter.stage_status {
            Some((stage, status)) => {
                format!("WHERE {} = '{}'", status_col(stage), status.as_str())
            }
            None => String::new(),
        };

        let sql = format!("SELECT COUNT(*) FROM {} {}", self.table, where_clause);
        conn.query_row(&sql, [], |row| row.get(0))
            .map_err(|e| TopicError::Database(e.to_string()))
    }

    fn begin_stage(&self, id: &str, stage: Stage) -> Result<Topic, TopicError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::require_locked(&conn, &self.table, id)?;

        Self::check_transition(&current, stage, StageStatus::InProgress)?;
        for prereq in stage.prerequisites() {
            if current.status(*prereq) != StageStatus::Done {
                return Err(TopicError::PrerequisiteNotMet {
                    topic_id: id.to_string(),
                    stage,
                    missing: *prereq,
                });
            }
        }

        // Compare-and-swap on the current status: if another process claimed
        // the row between our read and this write, we lose cleanly.
        let expected = current.status(stage);
        let sql = format!(
            "UPDATE {} SET {} = 'in_progress', {} = NULL, updated_at = ? \
             WHERE id = ? AND {} = ?",
            self.table,
            status_col(stage),
            output_col(stage),
            status_col(stage),
        );
        let changed = conn
            .execute(&sql, params![Utc::now().to_rfc3339(), id, expected.as_str()])
            .map_err(|e| TopicError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(TopicError::ClaimConflict {
                topic_id: id.to_string(),
                stage,
            });
        }

        Self::require_locked(&conn, &self.table, id)
    }

    fn complete_stage(
        &self,
        id: &str,
        stage: Stage,
        output_path: &Path,
    ) -> Result<Topic, TopicError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::require_locked(&conn, &self.table, id)?;
        Self::check_transition(&current, stage, StageStatus::Done)?;

        let sql = format!(
            "UPDATE {} SET {} = 'done', {} = ?, last_error = NULL, updated_at = ? WHERE id = ?",
            self.table,
            status_col(stage),
            output_col(stage),
        );
        conn.execute(
            &sql,
            params![
                output_path.to_string_lossy(),
                Utc::now().to_rfc3339(),
                id
            ],
        )
        .map_err(|e| TopicError::Database(e.to_string()))?;

        Self::require_locked(&conn, &self.table, id)
    }

    fn fail_stage(&self, id: &str, stage: Stage, error: &str) -> Result<Topic, TopicError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::require_locked(&conn, &self.table, id)?;
        Self::check_transition(&current, stage, StageStatus::Failed)?;

        // Error text is capped the way the original tooling capped it so a
        // runaway stack trace cannot bloat the row.
        let message: String = error.chars().take(2000).collect();

        let sql = format!(
            "UPDATE {} SET {} = 'failed', {} = NULL, last_error = ?, updated_at = ? WHERE id = ?",
            self.table,
            status_col(stage),
            output_col(stage),
        );
        conn.execute(&sql, params![message, Utc::now().to_rfc3339(), id])
            .map_err(|e| TopicError::Database(e.to_string()))?;

        Self::require_locked(&conn, &self.table, id)
    }

    fn reset_stage(&self, id: &str, stage: Stage) -> Result<Topic, TopicError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::require_locked(&conn, &self.table, id)?;

        let from = current.status(stage);
        if from != StageStatus::Failed {
            return Err(TopicError::InvalidTransition {
                topic_id: id.to_string(),
                stage,
                from,
                to: StageStatus::NotStarted,
            });
        }

        let sql = format!(
            "UPDATE {} SET {} = 'not_started', {} = NULL, last_error = NULL, updated_at = ? \
             WHERE id = ?",
            self.table,
            status_col(stage),
            output_col(stage),
        );
        conn.execute(&sql, params![Utc::now().to_rfc3339(), id])
            .map_err(|e| TopicError::Database(e.to_string()))?;

        Self::require_locked(&conn, &self.table, id)
    }

    fn list_ready_for_upload(&self, limit: i64) -> Result<Vec<Topic>, TopicError> {
        let conn = self.conn.lock().unwrap();

        let all_done = Stage::ALL
            .iter()
            .map(|s| format!("{} = 'done'", status_col(*s)))
            .collect::<Vec<_>>()
            .join(" AND ");

        let sql = format!(
            "SELECT {} FROM {} WHERE {} AND uploaded_at IS NULL \
             ORDER BY created_at ASC, id ASC LIMIT ?",
            select_columns(),
            self.table,
            all_done
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TopicError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![limit], Self::row_to_topic)
            .map_err(|e| TopicError::Database(e.to_string()))?;

        let mut topics = Vec::new();
        for row_result in rows {
            topics.push(row_result.map_err(|e| TopicError::Database(e.to_string()))?);
        }
        Ok(topics)
    }

    fn mark_uploaded(&self, id: &str, publish_at: DateTime<Utc>) -> Result<Topic, TopicError> {
        let conn = self.conn.lock().unwrap();
        let _ = Self::require_locked(&conn, &self.table, id)?;

        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "UPDATE {} SET publish_at = ?, uploaded_at = ?, updated_at = ? WHERE id = ?",
            self.table
        );
        conn.execute(&sql, params![publish_at.to_rfc3339(), now, now, id])
            .map_err(|e| TopicError::Database(e.to_string()))?;

        Self::require_locked(&conn, &self.table, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_store() -> SqliteTopicStore {
        SqliteTopicStore::in_memory().unwrap()
    }

    fn new_topic(id: &str) -> NewTopic {
        NewTopic::new(id, format!("title for {}", id))
            .with_metadata(serde_json::json!({ "comments": 512 }))
    }

    /// Drives a topic to `Done` for every stage up to and including `until`.
    fn advance_to(store: &SqliteTopicStore, id: &str, until: Stage) {
        for stage in Stage::ALL {
            if stage > until {
                break;
            }
            store.begin_stage(id, stage).unwrap();
            store
                .complete_stage(id, stage, &PathBuf::from(format!("/out/{}/{}", id, stage)))
                .unwrap();
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = create_test_store();
        assert!(store.insert(new_topic("t-1")).unwrap());

        let topic = store.get("t-1").unwrap().unwrap();
        assert_eq!(topic.id, "t-1");
        assert_eq!(topic.title, "title for t-1");
        assert_eq!(topic.raw_metadata["comments"], 512);
        for stage in Stage::ALL {
            assert_eq!(topic.status(stage), StageStatus::NotStarted);
            assert!(topic.output_path(stage).is_none());
        }
    }

    #[test]
    fn test_insert_duplicate_id_is_noop() {
        let store = create_test_store();
        assert!(store.insert(new_topic("t-1")).unwrap());
        assert!(!store
            .insert(NewTopic::new("t-1", "a different title"))
            .unwrap());

        // Original row untouched.
        let topic = store.get("t-1").unwrap().unwrap();
        assert_eq!(topic.title, "title for t-1");
    }

    #[test]
    fn test_get_nonexistent() {
        let store = create_test_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("q.db"),
            table: "items; DROP TABLE items".to_string(),
            ..DatabaseConfig::default()
        };
        let result = SqliteTopicStore::open(&config);
        assert!(matches!(result, Err(TopicError::InvalidTableName(_))));
    }

    #[test]
    fn test_begin_complete_cycle() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();

        let claimed = store.begin_stage("t-1", Stage::Fetch).unwrap();
        assert_eq!(claimed.status(Stage::Fetch), StageStatus::InProgress);

        let done = store
            .complete_stage("t-1", Stage::Fetch, Path::new("/out/t-1/data"))
            .unwrap();
        assert_eq!(done.status(Stage::Fetch), StageStatus::Done);
        assert_eq!(
            done.output_path(Stage::Fetch),
            Some(Path::new("/out/t-1/data"))
        );
    }

    #[test]
    fn test_begin_requires_prerequisites() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();

        let result = store.begin_stage("t-1", Stage::Audio);
        assert!(matches!(
            result,
            Err(TopicError::PrerequisiteNotMet {
                stage: Stage::Audio,
                missing: Stage::Fetch,
                ..
            })
        ));
    }

    #[test]
    fn test_begin_done_stage_rejected() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();
        advance_to(&store, "t-1", Stage::Fetch);

        let result = store.begin_stage("t-1", Stage::Fetch);
        assert!(matches!(
            result,
            Err(TopicError::InvalidTransition {
                from: StageStatus::Done,
                to: StageStatus::InProgress,
                ..
            })
        ));
    }

    #[test]
    fn test_begin_in_progress_stage_rejected() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();
        store.begin_stage("t-1", Stage::Fetch).unwrap();

        let result = store.begin_stage("t-1", Stage::Fetch);
        assert!(matches!(result, Err(TopicError::InvalidTransition { .. })));
    }

    #[test]
    fn test_complete_without_begin_rejected() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();

        let result = store.complete_stage("t-1", Stage::Fetch, Path::new("/out"));
        assert!(matches!(
            result,
            Err(TopicError::InvalidTransition {
                from: StageStatus::NotStarted,
                to: StageStatus::Done,
                ..
            })
        ));
    }

    #[test]
    fn test_fail_stage_records_error_and_clears_output() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();
        store.begin_stage("t-1", Stage::Fetch).unwrap();

        let failed = store
            .fail_stage("t-1", Stage::Fetch, "browser timeout")
            .unwrap();
        assert_eq!(failed.status(Stage::Fetch), StageStatus::Failed);
        assert!(failed.output_path(Stage::Fetch).is_none());
        assert_eq!(failed.last_error.as_deref(), Some("browser timeout"));
    }

    #[test]
    fn test_failed_stage_can_be_claimed_again() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();
        store.begin_stage("t-1", Stage::Fetch).unwrap();
        store.fail_stage("t-1", Stage::Fetch, "boom").unwrap();

        let claimed = store.begin_stage("t-1", Stage::Fetch).unwrap();
        assert_eq!(claimed.status(Stage::Fetch), StageStatus::InProgress);

        let done = store
            .complete_stage("t-1", Stage::Fetch, Path::new("/out/t-1/data"))
            .unwrap();
        assert_eq!(done.status(Stage::Fetch), StageStatus::Done);
        assert!(done.last_error.is_none());
    }

    #[test]
    fn test_output_path_present_iff_done() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();

        // not started -> no output
        let t = store.get("t-1").unwrap().unwrap();
        assert!(t.output_path(Stage::Fetch).is_none());

        // in progress -> no output
        store.begin_stage("t-1", Stage::Fetch).unwrap();
        let t = store.get("t-1").unwrap().unwrap();
        assert!(t.output_path(Stage::Fetch).is_none());

        // done -> output present
        store
            .complete_stage("t-1", Stage::Fetch, Path::new("/out/t-1/data"))
            .unwrap();
        let t = store.get("t-1").unwrap().unwrap();
        assert!(t.output_path(Stage::Fetch).is_some());

        // failed after a retry claim -> output cleared again
        store.begin_stage("t-1", Stage::Image).unwrap();
        store.fail_stage("t-1", Stage::Image, "no engine").unwrap();
        let t = store.get("t-1").unwrap().unwrap();
        assert!(t.output_path(Stage::Image).is_none());
    }

    #[test]
    fn test_reset_stage() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();
        store.begin_stage("t-1", Stage::Fetch).unwrap();
        store.fail_stage("t-1", Stage::Fetch, "boom").unwrap();

        let reset = store.reset_stage("t-1", Stage::Fetch).unwrap();
        assert_eq!(reset.status(Stage::Fetch), StageStatus::NotStarted);
        assert!(reset.last_error.is_none());

        // Only failed stages can be reset.
        let result = store.reset_stage("t-1", Stage::Fetch);
        assert!(matches!(result, Err(TopicError::InvalidTransition { .. })));
    }

    #[test]
    fn test_list_filters_by_stage_status() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();
        store.insert(new_topic("t-2")).unwrap();
        advance_to(&store, "t-2", Stage::Fetch);

        let filter = TopicFilter::new().with_stage_status(Stage::Fetch, StageStatus::NotStarted);
        let not_started = store.list(&filter).unwrap();
        assert_eq!(not_started.len(), 1);
        assert_eq!(not_started[0].id, "t-1");

        let filter = TopicFilter::new().with_stage_status(Stage::Fetch, StageStatus::Done);
        let done = store.list(&filter).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, "t-2");
    }

    #[test]
    fn test_list_orders_oldest_first() {
        let store = create_test_store();
        for i in 0..3 {
            store.insert(new_topic(&format!("t-{}", i))).unwrap();
        }

        let topics = store.list(&TopicFilter::new()).unwrap();
        assert_eq!(topics.len(), 3);
        for pair in topics.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[test]
    fn test_list_pagination() {
        let store = create_test_store();
        for i in 0..5 {
            store.insert(new_topic(&format!("t-{}", i))).unwrap();
        }

        let page = store
            .list(&TopicFilter::new().with_limit(2).with_offset(0))
            .unwrap();
        assert_eq!(page.len(), 2);

        let page = store
            .list(&TopicFilter::new().with_limit(2).with_offset(4))
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn test_count() {
        let store = create_test_store();
        for i in 0..3 {
            store.insert(new_topic(&format!("t-{}", i))).unwrap();
        }
        advance_to(&store, "t-0", Stage::Fetch);

        assert_eq!(store.count(&TopicFilter::new()).unwrap(), 3);
        let filter = TopicFilter::new().with_stage_status(Stage::Fetch, StageStatus::Done);
        assert_eq!(store.count(&filter).unwrap(), 1);
    }

    #[test]
    fn test_list_ready_for_upload() {
        let store = create_test_store();
        store.insert(new_topic("t-1")).unwrap();
        store.insert(new_topic("t-2")).unwrap();
        advance_to(&store, "t-1", Stage::Assemble);
        advance_to(&store, "t-2", Stage::Preview); // assemble still pending

        let ready = store.list_ready_for_upload(10).unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, "t-1");

        let publish_at = Utc::now() + chrono::Duration::minutes(5);
        let uploaded = store.mark_uploaded("t-1", publish_at).unwrap();
        assert!(uploaded.is_uploaded());
        assert!(uploaded.publish_at.is_some());

        assert!(store.list_ready_for_upload(10).unwrap().is_empty());
    }

    #[test]
    fn test_stage_ops_on_missing_topic() {
        let store = create_test_store();
        assert!(matches!(
            store.begin_stage("nope", Stage::Fetch),
            Err(TopicError::NotFound(_))
        ));
        assert!(matches!(
            store.mark_uploaded("nope", Utc::now()),
            Err(TopicError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_based_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("topics.db"),
            ..DatabaseConfig::default()
        };

        let store = SqliteTopicStore::open(&config).unwrap();
        store.insert(new_topic("t-1")).unwrap();
        assert!(config.path.exists());

        // Reopen and read back.
        drop(store);
        let store = SqliteTopicStore::open(&config).unwrap();
        assert!(store.get("t-1").unwrap().is_some());
    }
}
