use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (members, tokens, messages)");
        conn.execute_batch(
            "
            CREATE TABLE members (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE tokens (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                key         TEXT NOT NULL UNIQUE,
                member_id   INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_tokens_member ON tokens(member_id);

            CREATE TABLE messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id   INTEGER NOT NULL REFERENCES members(id) ON DELETE CASCADE,
                text        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_created ON messages(created_at, id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
