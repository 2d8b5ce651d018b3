use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use self::models::{Account, MessageSummary};
use crate::dates::parse_sent_at;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("filesystem: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(String),
}

pub mod migrations;
pub mod models;
pub mod schema;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one idempotent bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    /// Records handed to the store.
    pub submitted: usize,
    /// Records written because their id was not yet stored for the owner.
    pub inserted: usize,
    /// Records skipped as already present (or repeated within the batch).
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerMessageCount {
    pub owner: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_accounts: i64,
    pub total_messages: i64,
    pub messages_by_owner: Vec<OwnerMessageCount>,
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        let mut db = Self {
            conn,
            path: path.to_path_buf(),
        };
        db.initialize()?;
        Ok(db)
    }

    pub fn initialize(&mut self) -> Result<(), DbError> {
        self.run_migrations()
    }

    fn run_migrations(&mut self) -> Result<(), DbError> {
        migrations::migrate(&self.conn)
            .map_err(|e| DbError::Config(format!("migration failed: {e}")))
    }

    pub fn default_db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir()
            .ok_or_else(|| DbError::Config("failed to determine home directory".to_string()))?;
        Ok(home.join(".mailsync").join("mailsync.db"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or update an account. A `None` access token keeps the stored one.
    pub fn upsert_account(&self, account: &Account) -> Result<(), DbError> {
        self.conn.execute(
            r#"
            INSERT INTO accounts (user_id, email_address, display_name, access_token)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                email_address = excluded.email_address,
                display_name = COALESCE(excluded.display_name, accounts.display_name),
                access_token = COALESCE(excluded.access_token, accounts.access_token)
            "#,
            params![
                account.user_id,
                account.email_address,
                account.display_name,
                account.access_token,
            ],
        )?;

        Ok(())
    }

    pub fn get_account(&self, user_id: &str) -> Result<Option<Account>, DbError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, email_address, display_name, access_token, last_sync, created_at
            FROM accounts
            WHERE user_id = ?
            LIMIT 1
            "#,
        )?;

        let mut rows = stmt.query([user_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Account::from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>, DbError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, email_address, display_name, access_token, last_sync, created_at
            FROM accounts
            ORDER BY email_address ASC
            "#,
        )?;

        let accounts = stmt
            .query_map([], Account::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    pub fn remove_account(&self, user_id: &str) -> Result<usize, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM accounts WHERE user_id = ?", [user_id])?;
        Ok(deleted)
    }

    /// Replace (or clear, with `None`) the stored access token for a user.
    pub fn set_access_token(&self, user_id: &str, token: Option<&str>) -> Result<usize, DbError> {
        let updated = self.conn.execute(
            "UPDATE accounts SET access_token = ?1 WHERE user_id = ?2",
            params![token, user_id],
        )?;
        Ok(updated)
    }

    pub fn touch_last_sync(&self, user_id: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE accounts SET last_sync = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE user_id = ?",
            [user_id],
        )?;
        Ok(())
    }

    pub fn message_ids_for_owner(&self, owner: &str) -> Result<HashSet<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT provider_message_id FROM messages WHERE owner = ?")?;
        let ids = stmt
            .query_map([owner], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    /// Store every record whose provider id is not yet known for `owner`.
    ///
    /// Existing ids are read once per call, under the write lock, and applied
    /// to the whole batch.
    /// Duplicates are skipped silently. The unique index on
    /// `(owner, provider_message_id)` plus `INSERT OR IGNORE` keeps two
    /// overlapping syncs for the same owner from ever storing a record twice.
    pub fn insert_summaries_if_absent(
        &self,
        owner: &str,
        records: &[MessageSummary],
    ) -> Result<InsertOutcome, DbError> {
        let mut outcome = InsertOutcome {
            submitted: records.len(),
            ..InsertOutcome::default()
        };
        if records.is_empty() {
            return Ok(outcome);
        }

        // Take the write lock before reading existing ids: a deferred read
        // cannot upgrade once another connection has committed.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let mut seen = self.message_ids_for_owner(owner)?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO messages (
                    owner, provider_message_id, thread_id, sender_name, sender_address,
                    subject, snippet, sent_at, sent_at_utc, is_read
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for record in records {
                if !seen.insert(record.provider_message_id.clone()) {
                    outcome.skipped += 1;
                    continue;
                }

                let written = stmt.execute(params![
                    owner,
                    record.provider_message_id,
                    record.thread_id,
                    record.sender_name,
                    record.sender_address,
                    record.subject,
                    record.snippet,
                    record.sent_at,
                    record.sent_at_utc,
                    record.is_read,
                ])?;
                if written == 0 {
                    outcome.skipped += 1;
                } else {
                    outcome.inserted += written;
                }
            }
        }
        tx.commit()?;

        debug!(
            owner,
            submitted = outcome.submitted,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            "stored message summaries"
        );
        Ok(outcome)
    }

    /// All summaries for `owner`, most recent `sent_at` first.
    ///
    /// Dates that do not parse sort as the oldest possible value; equal dates
    /// fall back to provider id order so the result is deterministic.
    pub fn list_summaries(&self, owner: &str) -> Result<Vec<MessageSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT owner, provider_message_id, thread_id, sender_name, sender_address,
                   subject, snippet, sent_at, sent_at_utc, is_read
            FROM messages
            WHERE owner = ?
            "#,
        )?;

        let mut summaries = stmt
            .query_map([owner], MessageSummary::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        summaries.sort_by_cached_key(|summary| {
            let timestamp = summary
                .sent_at_utc
                .as_deref()
                .and_then(parse_sent_at)
                .or_else(|| parse_sent_at(&summary.sent_at));
            (Reverse(timestamp), summary.provider_message_id.clone())
        });

        Ok(summaries)
    }

    pub fn count_summaries(&self, owner: &str) -> Result<i64, DbError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE owner = ?",
            [owner],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn get_stats(&self) -> Result<DatabaseStats, DbError> {
        let total_accounts: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        let total_messages: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(
            "SELECT owner, COUNT(*) AS count FROM messages GROUP BY owner ORDER BY count DESC",
        )?;
        let messages_by_owner = stmt
            .query_map([], |row| {
                Ok(OwnerMessageCount {
                    owner: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(DatabaseStats {
            total_accounts,
            total_messages,
            messages_by_owner,
        })
    }
}
