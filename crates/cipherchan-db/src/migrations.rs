use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- id seeds the channel keystream: never renumber
            CREATE TABLE channels (
                id                    INTEGER PRIMARY KEY AUTOINCREMENT,
                name                  TEXT NOT NULL UNIQUE,
                key                   TEXT NOT NULL UNIQUE,
                creator_id            TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                encrypted_custom_map  TEXT NOT NULL,
                created_at            TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE memberships (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                channel_id  INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                joined_at   TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, channel_id)
            );

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                channel_id      INTEGER NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
                created_by      TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                encrypted_data  TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_messages_channel
                ON messages(channel_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
