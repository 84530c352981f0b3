use crate::app_dirs::AppDirs;
use crate::question::AnswerMode;
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;
use std::time::SystemTime;

/// Milliseconds between two instants, zero if the clock went backwards
pub fn time_diff_ms(start: SystemTime, end: SystemTime) -> u64 {
    end.duration_since(start)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The two independent persisted records
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKey {
    /// Best correct-answer count, higher wins
    IronMan,
    /// Best average seconds per question, lower wins
    SpeedDemon,
}

impl RecordKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::IronMan => "iron_man",
            RecordKey::SpeedDemon => "speed_demon",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RecordKey::IronMan => "Iron Man",
            RecordKey::SpeedDemon => "Speed Demon",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HighScoreRecord {
    pub value: f64,
    pub holder: String,
    pub set_at: String,
}

/// One row per answered question, including timeouts
#[derive(Clone, Debug)]
pub struct AnswerRecord {
    pub prompt: String,
    pub expected: String,
    /// What the user gave; empty on timeout
    pub given: String,
    pub was_correct: bool,
    pub response_ms: u64,
    pub mode: AnswerMode,
    pub timestamp: DateTime<Local>,
}

/// Aggregate over the answer log for one prompt
#[derive(Clone, Debug, PartialEq)]
pub struct PromptSummary {
    pub prompt: String,
    pub attempts: i64,
    /// Percentage of wrong answers for this prompt
    pub miss_rate: f64,
    /// Average response time over correct answers only
    pub avg_response_ms: Option<f64>,
}

/// Database owning the high-score records and the answer log
#[derive(Debug)]
pub struct ScoreDb {
    conn: Connection,
}

impl ScoreDb {
    /// Open (and initialize if needed) the database in the state directory
    pub fn open() -> Result<Self> {
        Self::open_at(&AppDirs::db_path())
    }

    /// Open a database at an explicit path, used by tests
    pub fn with_path<P: AsRef<Path>>(p: P) -> Result<Self> {
        Self::open_at(p.as_ref())
    }

    fn open_at(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(db_path)?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS high_scores (
                key TEXT PRIMARY KEY,
                value REAL NOT NULL,
                holder TEXT NOT NULL,
                set_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS answer_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt TEXT NOT NULL,
                expected TEXT NOT NULL,
                given TEXT NOT NULL,
                was_correct BOOLEAN NOT NULL,
                response_ms INTEGER NOT NULL,
                mode TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_answer_log_prompt ON answer_log(prompt)",
            [],
        )?;

        Ok(ScoreDb { conn })
    }

    pub fn record_answer(&self, rec: &AnswerRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO answer_log
            (prompt, expected, given, was_correct, response_ms, mode, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                rec.prompt,
                rec.expected,
                rec.given,
                rec.was_correct,
                rec.response_ms,
                rec.mode.to_string(),
                rec.timestamp.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    pub fn get_record(&self, key: RecordKey) -> Result<Option<HighScoreRecord>> {
        self.conn
            .query_row(
                "SELECT value, holder, set_at FROM high_scores WHERE key = ?1",
                [key.as_str()],
                |row| {
                    Ok(HighScoreRecord {
                        value: row.get(0)?,
                        holder: row.get(1)?,
                        set_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn set_record(&self, key: RecordKey, value: f64, holder: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO high_scores (key, value, holder, set_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                holder = excluded.holder,
                set_at = excluded.set_at
            "#,
            params![key.as_str(), value, holder, Local::now().to_rfc3339()],
        )?;

        Ok(())
    }

    /// Bulk reset of both records; the answer log is left alone
    pub fn reset_records(&self) -> Result<()> {
        self.conn.execute("DELETE FROM high_scores", [])?;
        Ok(())
    }

    /// Per-prompt aggregates over the whole answer log, in prompt order
    pub fn prompt_summary(&self) -> Result<Vec<PromptSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                prompt,
                COUNT(*) as attempts,
                (SUM(CASE WHEN was_correct = 0 THEN 1 ELSE 0 END) * 100.0 / COUNT(*)) as miss_rate,
                AVG(CASE WHEN was_correct = 1 THEN response_ms END) as avg_response
            FROM answer_log
            GROUP BY prompt
            ORDER BY prompt
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(PromptSummary {
                prompt: row.get(0)?,
                attempts: row.get(1)?,
                miss_rate: row.get(2)?,
                avg_response_ms: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
