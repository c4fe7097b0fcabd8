//! SQLite-backed vector store using the `sqlite-vec` extension.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio_rusqlite::{Connection, ffi, rusqlite};

use super::{IndexedChunk, SearchHit, VectorStore};
use crate::types::{ChunkMetadata, ScholarError};

/// Vector store persisting chunks and embeddings in a single SQLite file.
///
/// Documents live in a `chunks` table; embeddings live in a `vec0` virtual
/// table joined by rowid, so insertion order ties the two together.
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Connection,
}

impl SqliteVectorStore {
    /// Opens (or creates) the database and verifies sqlite-vec is loaded.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ScholarError> {
        register_sqlite_vec()?;
        let conn = Connection::open(path)
            .await
            .map_err(|err| ScholarError::Storage(err.to_string()))?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))?;
            Ok(())
        })
        .await
        .map_err(|err| ScholarError::Storage(err.to_string()))?;
        Ok(Self { conn })
    }

    /// In-memory store for tests and throwaway runs.
    pub async fn open_in_memory() -> Result<Self, ScholarError> {
        register_sqlite_vec()?;
        let conn = Connection::open_in_memory()
            .await
            .map_err(|err| ScholarError::Storage(err.to_string()))?;
        Ok(Self { conn })
    }
}

fn register_sqlite_vec() -> Result<(), ScholarError> {
    static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

    REGISTERED
        .get_or_init(|| unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != ffi::SQLITE_OK {
                Err(format!(
                    "failed to register sqlite-vec extension (code {rc})"
                ))
            } else {
                Ok(())
            }
        })
        .clone()
        .map_err(ScholarError::Storage)
}

const TABLE_EXISTS_SQL: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?";

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn rebuild(&self, documents: Vec<IndexedChunk>) -> Result<(), ScholarError> {
        let dims = documents.first().map(|doc| doc.embedding.len());

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;

                // Best-effort drop: a missing prior collection is fine.
                let _ = tx.execute("DROP TABLE IF EXISTS chunks", []);
                let _ = tx.execute("DROP TABLE IF EXISTS chunks_embeddings", []);

                tx.execute(
                    "CREATE TABLE chunks (
                        id TEXT PRIMARY KEY,
                        content TEXT NOT NULL,
                        metadata TEXT NOT NULL
                    )",
                    [],
                )?;

                if let Some(dims) = dims {
                    tx.execute(
                        &format!(
                            "CREATE VIRTUAL TABLE chunks_embeddings USING vec0(embedding float[{dims}])"
                        ),
                        [],
                    )?;
                }

                for doc in &documents {
                    let metadata = serde_json::to_string(&doc.metadata)
                        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(err.into()))?;
                    tx.execute(
                        "INSERT INTO chunks (id, content, metadata) VALUES (?, ?, ?)",
                        (&doc.id, &doc.text, &metadata),
                    )?;
                    let rowid = tx.last_insert_rowid();
                    let embedding = serde_json::to_string(&doc.embedding)
                        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(err.into()))?;
                    tx.execute(
                        "INSERT INTO chunks_embeddings (rowid, embedding) VALUES (?, ?)",
                        (rowid, &embedding),
                    )?;
                }

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| ScholarError::Storage(err.to_string()))
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>, ScholarError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding_json = serde_json::to_string(query_embedding)?;

        self.conn
            .call(move |conn| -> Result<Vec<SearchHit>, rusqlite::Error> {
                let indexed = conn.query_row(TABLE_EXISTS_SQL, ["chunks"], |_| Ok(())).is_ok()
                    && conn
                        .query_row(TABLE_EXISTS_SQL, ["chunks_embeddings"], |_| Ok(()))
                        .is_ok();
                if !indexed {
                    return Ok(Vec::new());
                }

                let mut stmt = conn.prepare(&format!(
                    "SELECT c.id, c.content, c.metadata, \
                     vec_distance_cosine(e.embedding, vec_f32(?)) AS distance \
                     FROM chunks c \
                     JOIN chunks_embeddings e ON e.rowid = c.rowid \
                     ORDER BY distance ASC \
                     LIMIT {k}"
                ))?;

                let rows = stmt.query_map([&embedding_json], |row| {
                    let id: String = row.get(0)?;
                    let text: String = row.get(1)?;
                    let metadata: String = row.get(2)?;
                    let distance: f32 = row.get(3)?;
                    Ok((id, text, metadata, distance))
                })?;

                let mut hits = Vec::new();
                for row in rows {
                    let (id, text, metadata, distance) = row?;
                    let metadata: ChunkMetadata = serde_json::from_str(&metadata)
                        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(err.into()))?;
                    hits.push(SearchHit {
                        id,
                        text,
                        metadata,
                        // Cosine distance to similarity.
                        similarity: 1.0 - distance,
                    });
                }
                Ok(hits)
            })
            .await
            .map_err(|err| ScholarError::Storage(err.to_string()))
    }

    async fn count(&self) -> Result<usize, ScholarError> {
        self.conn
            .call(|conn| -> Result<usize, rusqlite::Error> {
                if conn.query_row(TABLE_EXISTS_SQL, ["chunks"], |_| Ok(())).is_err() {
                    return Ok(0);
                }
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| ScholarError::Storage(err.to_string()))
    }
}
