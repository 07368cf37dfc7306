//! Database schema definitions
//!
//! This module contains the SQL schema for the article database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per article; url is the natural key
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    sequence_id TEXT NOT NULL,
    published_at TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    body TEXT
);

CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
