use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (tickets)");
        conn.execute_batch(
            "
            CREATE TABLE tickets (
                channel_id          TEXT PRIMARY KEY,
                creator_id          TEXT NOT NULL,
                other_user_id       TEXT,
                other_user_input    TEXT NOT NULL,
                trade_details       TEXT NOT NULL,
                can_join_vip        TEXT NOT NULL,
                claimed             INTEGER NOT NULL DEFAULT 0,
                claimer_id          TEXT,
                created_at          TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK ((claimed = 0) = (claimer_id IS NULL))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
