//! SQL migration definitions for the benchmark index database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: benchmarks table and FTS5 ranking",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Benchmark records: searchable document text plus the full record as JSON
CREATE TABLE IF NOT EXISTS benchmarks (
    rowid         INTEGER PRIMARY KEY AUTOINCREMENT,
    id            TEXT NOT NULL UNIQUE,
    document      TEXT NOT NULL,
    metadata_json TEXT NOT NULL
);

-- Full-text index used as the nearest-neighbor ranking
CREATE VIRTUAL TABLE IF NOT EXISTS benchmarks_fts USING fts5(
    document,
    content=benchmarks,
    content_rowid=rowid
);

-- Triggers to keep FTS in sync with the benchmarks table
CREATE TRIGGER IF NOT EXISTS benchmarks_fts_insert AFTER INSERT ON benchmarks BEGIN
    INSERT INTO benchmarks_fts(rowid, document)
    VALUES (new.rowid, new.document);
END;

CREATE TRIGGER IF NOT EXISTS benchmarks_fts_delete AFTER DELETE ON benchmarks BEGIN
    INSERT INTO benchmarks_fts(benchmarks_fts, rowid, document)
    VALUES ('delete', old.rowid, old.document);
END;

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
