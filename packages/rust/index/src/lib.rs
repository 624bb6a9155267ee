//! Benchmark similarity index backed by libSQL (offline, persistent).
//!
//! The [`SimilarityIndex`] trait is the narrow collaborator contract the
//! pipeline core depends on: ranked text retrieval over stored metadata
//! records. [`BenchmarkIndex`] implements it with an FTS5 index as the
//! nearest-neighbor ranking; the backing store persists across process
//! restarts at the configured path.

mod migrations;

use std::path::Path;

use async_trait::async_trait;
use libsql::{Connection, Database, params};
use tracing::{info, warn};

use payscope_shared::{Benchmark, PayscopeError, Result};

/// One record returned by a similarity query, ranked best-first.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    /// Stable record identifier.
    pub id: String,
    /// The searchable document text.
    pub document: String,
    /// The full stored record as JSON metadata.
    pub metadata: serde_json::Value,
}

/// Narrow retrieval contract consumed by the knowledge-base matcher.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Return up to `top_k` records ranked by similarity to `text`.
    async fn query(&self, text: &str, top_k: u32) -> Result<Vec<IndexRecord>>;

    /// Add records to the index.
    async fn add(&self, records: &[IndexRecord]) -> Result<()>;

    /// Number of records currently stored.
    async fn count(&self) -> Result<u64>;
}

/// Persistent benchmark index wrapping a libSQL database.
pub struct BenchmarkIndex {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl BenchmarkIndex {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PayscopeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| PayscopeError::Index(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PayscopeError::Index(e.to_string()))?;

        let index = Self { db, conn };
        index.run_migrations().await?;
        Ok(index)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    PayscopeError::Index(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }
}

#[async_trait]
impl SimilarityIndex for BenchmarkIndex {
    async fn query(&self, text: &str, top_k: u32) -> Result<Vec<IndexRecord>> {
        let match_expr = fts_match_expr(text);
        if match_expr.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows = self
            .conn
            .query(
                "SELECT b.id, b.document, b.metadata_json
                 FROM benchmarks_fts fts
                 JOIN benchmarks b ON b.rowid = fts.rowid
                 WHERE benchmarks_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
                params![match_expr, top_k],
            )
            .await
            .map_err(|e| PayscopeError::Index(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let id: String = row
                .get(0)
                .map_err(|e| PayscopeError::Index(e.to_string()))?;
            let document: String = row
                .get(1)
                .map_err(|e| PayscopeError::Index(e.to_string()))?;
            let metadata_json: String = row
                .get(2)
                .map_err(|e| PayscopeError::Index(e.to_string()))?;

            match serde_json::from_str(&metadata_json) {
                Ok(metadata) => results.push(IndexRecord {
                    id,
                    document,
                    metadata,
                }),
                Err(e) => {
                    warn!(%id, error = %e, "skipping record with unreadable metadata");
                }
            }
        }
        Ok(results)
    }

    /// Insert records in a single transaction. All-or-nothing: a failure
    /// mid-batch rolls back, so a later populate sees an empty index and
    /// seeds the complete dataset instead of a remnant. Records are
    /// append-only; ids must be unique.
    async fn add(&self, records: &[IndexRecord]) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| PayscopeError::Index(e.to_string()))?;

        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata)
                .map_err(|e| PayscopeError::Index(e.to_string()))?;
            tx.execute(
                "INSERT INTO benchmarks (id, document, metadata_json) VALUES (?1, ?2, ?3)",
                params![
                    record.id.as_str(),
                    record.document.as_str(),
                    metadata_json.as_str()
                ],
            )
            .await
            .map_err(|e| PayscopeError::Index(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PayscopeError::Index(e.to_string()))?;
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM benchmarks", params![])
            .await
            .map_err(|e| PayscopeError::Index(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| PayscopeError::Index(e.to_string()))?;
                Ok(count.max(0) as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(PayscopeError::Index(e.to_string())),
        }
    }
}

/// Build an FTS5 MATCH expression from free text.
///
/// Tokens are OR-joined and quoted so that partial term overlap still
/// ranks (bare FTS5 terms are AND-ed, which would drop any record not
/// containing every word of the query).
fn fts_match_expr(text: &str) -> String {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|t| {
            t.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\""))
        .collect();
    tokens.join(" OR ")
}

// ---------------------------------------------------------------------------
// Seed dataset
// ---------------------------------------------------------------------------

/// Load the seed dataset: a JSON list of flat benchmark records.
pub fn load_seed(path: &Path) -> Result<Vec<Benchmark>> {
    let content = std::fs::read_to_string(path).map_err(|e| PayscopeError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        PayscopeError::validation(format!("invalid seed data at {}: {e}", path.display()))
    })
}

/// Convert benchmarks into index records (document text + JSON metadata).
pub fn seed_records(benchmarks: &[Benchmark]) -> Vec<IndexRecord> {
    benchmarks
        .iter()
        .enumerate()
        .map(|(i, b)| IndexRecord {
            id: format!("benchmark_{i}"),
            document: b.document(),
            metadata: serde_json::to_value(b).unwrap_or(serde_json::Value::Null),
        })
        .collect()
}

/// Populate the index from seed data if it is empty.
///
/// Idempotent: a no-op when records already exist. Returns the number of
/// records in the index afterwards.
pub async fn populate_if_empty(
    index: &dyn SimilarityIndex,
    benchmarks: &[Benchmark],
) -> Result<u64> {
    let existing = index.count().await?;
    if existing > 0 {
        return Ok(existing);
    }

    let records = seed_records(benchmarks);
    index.add(&records).await?;
    info!(count = records.len(), "populated benchmark index from seed data");
    Ok(records.len() as u64)
}
