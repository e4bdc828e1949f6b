use rusqlite::Connection;

const SCHEMA: &str = include_str!("schema.sql");

pub fn run(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;

    // Seed every known collection with an empty array so a fresh store
    // behaves like one that was written and emptied.
    for key in super::COLLECTIONS {
        conn.execute(
            "INSERT OR IGNORE INTO collections (key, value) VALUES (?1, '[]')",
            rusqlite::params![key],
        )?;
    }

    Ok(())
}
