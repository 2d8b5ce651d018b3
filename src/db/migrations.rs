use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::db::schema;

const SCHEMA_VERSION_KEY: &str = "schema_version";

struct Migration {
    version: u32,
    name: &'static str,
    apply: fn(&Connection) -> Result<()>,
}

/// Ordered schema steps; a database records the last version it applied.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "accounts and message summaries",
    apply: schema::create_schema,
}];

fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Bring `conn` up to the latest schema. Each pending step runs in its own
/// transaction together with the version bump.
pub fn migrate(conn: &Connection) -> Result<()> {
    schema::create_version_table(conn).context("prepare schema version tracking")?;

    let current = stored_version(conn)?;
    let latest = latest_version();
    if current > latest {
        bail!("database schema version {current} is newer than supported version {latest}");
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn
            .unchecked_transaction()
            .context("begin schema migration")?;
        (migration.apply)(&tx).with_context(|| {
            format!(
                "apply schema migration v{} ({})",
                migration.version, migration.name
            )
        })?;
        record_version(&tx, migration.version)?;
        tx.commit()
            .with_context(|| format!("commit schema migration v{}", migration.version))?;
        info!(version = migration.version, name = migration.name, "applied schema migration");
    }

    Ok(())
}

fn stored_version(conn: &Connection) -> Result<u32> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM sync_state WHERE key = ?1",
            params![SCHEMA_VERSION_KEY],
            |row| row.get(0),
        )
        .optional()
        .context("read stored schema version")?;

    raw.map_or(Ok(0), |version| {
        version
            .parse::<u32>()
            .with_context(|| format!("stored schema version is not a number: {version}"))
    })
}

fn record_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO sync_state (key, value) VALUES (?1, ?2)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
        "#,
        params![SCHEMA_VERSION_KEY, version.to_string()],
    )
    .with_context(|| format!("record schema version {version}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use rusqlite::Connection;

    use super::{latest_version, migrate, record_version, stored_version};

    fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count == 1)
    }

    #[test]
    fn fresh_database_reaches_latest_version() -> Result<()> {
        let conn = Connection::open_in_memory()?;

        migrate(&conn)?;

        assert_eq!(stored_version(&conn)?, latest_version());
        assert!(table_exists(&conn, "accounts")?);
        assert!(table_exists(&conn, "messages")?);
        Ok(())
    }

    #[test]
    fn rerunning_is_a_no_op() -> Result<()> {
        let conn = Connection::open_in_memory()?;

        migrate(&conn)?;
        conn.execute(
            "INSERT INTO accounts (user_id, email_address) VALUES ('user-1', 'a@example.com')",
            [],
        )?;
        migrate(&conn)?;

        let accounts: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        assert_eq!(accounts, 1);
        assert_eq!(stored_version(&conn)?, latest_version());
        Ok(())
    }

    #[test]
    fn newer_schema_is_rejected() -> Result<()> {
        let conn = Connection::open_in_memory()?;

        migrate(&conn)?;
        record_version(&conn, 99)?;
        let error = migrate(&conn).expect_err("newer schema must be rejected");
        assert!(error.to_string().contains("newer than supported"));
        Ok(())
    }
}
