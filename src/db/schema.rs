use anyhow::Result;
use rusqlite::Connection;

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            user_id TEXT PRIMARY KEY,
            email_address TEXT NOT NULL,
            display_name TEXT,
            access_token TEXT,
            last_sync TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            owner TEXT NOT NULL,
            provider_message_id TEXT NOT NULL,
            thread_id TEXT NOT NULL,
            sender_name TEXT NOT NULL,
            sender_address TEXT NOT NULL,
            subject TEXT NOT NULL,
            snippet TEXT NOT NULL,
            sent_at TEXT NOT NULL,
            sent_at_utc TEXT,
            is_read BOOLEAN NOT NULL,
            inserted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_owner ON messages(owner);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_owner_provider_id
            ON messages(owner, provider_message_id);
        "#,
    )?;

    Ok(())
}

/// Key/value table holding the applied schema version.
pub fn create_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sync_state (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        );
        "#,
    )?;
    Ok(())
}
