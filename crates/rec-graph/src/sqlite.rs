//! SQLite-backed graph store (persistence behind the same trait).

use rec_types::{Book, BookLink, GraphStore, GraphStoreError, LinkKind, NodeId};
use std::collections::HashMap;
use std::path::Path;

const REVIEWED: &str = "reviewed";

/// SQLite-backed graph store. One `nodes` table holds users and books
/// (discriminated by label), one `edges` table holds `reviewed` edges and
/// weighted aggregation links, so node ids share a single space like the
/// in-memory backend.
pub struct SqliteBookGraph {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteBookGraph {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphStoreError> {
        let conn = rusqlite::Connection::open(path).map_err(store_err)?;
        Self::init(conn)
    }

    /// Open a private in-memory store (tests, scratch graphs).
    pub fn open_in_memory() -> Result<Self, GraphStoreError> {
        let conn = rusqlite::Connection::open_in_memory().map_err(store_err)?;
        Self::init(conn)
    }

    fn init(conn: rusqlite::Connection) -> Result<Self, GraphStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                label TEXT NOT NULL,
                external_id TEXT UNIQUE,
                properties TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                from_node INTEGER NOT NULL,
                to_node INTEGER NOT NULL,
                relation TEXT NOT NULL,
                weight REAL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (from_node) REFERENCES nodes(id) ON DELETE CASCADE,
                FOREIGN KEY (to_node) REFERENCES nodes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_external ON nodes(external_id);
            CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_node);
            CREATE INDEX IF NOT EXISTS idx_edges_relation ON edges(relation);
            "#,
        )
        .map_err(store_err)?;

        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, GraphStoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, GraphStoreError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| GraphStoreError::Other(format!("failed to acquire lock: {}", e)))?;
        f(&conn)
    }
}

fn store_err(e: rusqlite::Error) -> GraphStoreError {
    GraphStoreError::Other(e.to_string())
}

fn require_node(
    conn: &rusqlite::Connection,
    id: NodeId,
    label: &str,
) -> Result<(), GraphStoreError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM nodes WHERE id = ?1 AND label = ?2",
            rusqlite::params![id.0 as i64, label],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(store_err(other)),
        })?;
    match found {
        Some(_) => Ok(()),
        None => Err(GraphStoreError::NodeNotFound(id)),
    }
}

#[async_trait::async_trait]
impl GraphStore for SqliteBookGraph {
    async fn add_user(&self, external_id: &str) -> Result<NodeId, GraphStoreError> {
        let external_id = external_id.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO nodes (label, external_id, created_at) VALUES ('user', ?1, ?2)
                 ON CONFLICT(external_id) DO NOTHING",
                rusqlite::params![external_id, now],
            )
            .map_err(store_err)?;
            let id: i64 = conn
                .query_row(
                    "SELECT id FROM nodes WHERE external_id = ?1 AND label = 'user'",
                    [&external_id],
                    |row| row.get(0),
                )
                .map_err(store_err)?;
            Ok(NodeId(id as u64))
        })
    }

    async fn add_book(
        &self,
        properties: &HashMap<String, serde_json::Value>,
    ) -> Result<NodeId, GraphStoreError> {
        let properties_json =
            serde_json::to_string(properties).map_err(|e| GraphStoreError::Other(e.to_string()))?;
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO nodes (label, properties, created_at) VALUES ('book', ?1, ?2)",
                rusqlite::params![properties_json, now],
            )
            .map_err(store_err)?;
            Ok(NodeId(conn.last_insert_rowid() as u64))
        })
    }

    async fn add_review(&self, user: NodeId, book: NodeId) -> Result<(), GraphStoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            require_node(conn, user, "user")?;
            require_node(conn, book, "book")?;
            // Idempotent per (user, book) pair.
            conn.execute(
                "INSERT INTO edges (from_node, to_node, relation, created_at)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE NOT EXISTS (
                     SELECT 1 FROM edges WHERE from_node = ?1 AND to_node = ?2 AND relation = ?3
                 )",
                rusqlite::params![user.0 as i64, book.0 as i64, REVIEWED, now],
            )
            .map_err(store_err)?;
            Ok(())
        })
    }

    async fn add_links(&self, from: NodeId, links: &[BookLink]) -> Result<(), GraphStoreError> {
        if links.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            require_node(conn, from, "book")?;
            for link in links {
                require_node(conn, link.target, "book")?;
            }
            let tx = conn.unchecked_transaction().map_err(store_err)?;
            for link in links {
                tx.execute(
                    "INSERT INTO edges (from_node, to_node, relation, weight, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        from.0 as i64,
                        link.target.0 as i64,
                        link.kind.as_str(),
                        link.weight,
                        now,
                    ],
                )
                .map_err(store_err)?;
            }
            tx.commit().map_err(store_err)
        })
    }

    async fn find_user(&self, external_id: &str) -> Result<Option<NodeId>, GraphStoreError> {
        let external_id = external_id.to_string();
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT id FROM nodes WHERE external_id = ?1 AND label = 'user'",
                [&external_id],
                |row| row.get::<_, i64>(0),
            );
            match result {
                Ok(id) => Ok(Some(NodeId(id as u64))),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(store_err(e)),
            }
        })
    }

    async fn reviewed_books(&self, user: NodeId) -> Result<Vec<NodeId>, GraphStoreError> {
        self.with_conn(|conn| {
            require_node(conn, user, "user")?;
            let mut stmt = conn
                .prepare(
                    // Reviews are unique per (user, book), so no DISTINCT needed.
                    "SELECT to_node FROM edges
                     WHERE from_node = ?1 AND relation = ?2 ORDER BY id",
                )
                .map_err(store_err)?;
            let rows = stmt
                .query_map(rusqlite::params![user.0 as i64, REVIEWED], |row| {
                    row.get::<_, i64>(0)
                })
                .map_err(store_err)?;
            let mut books = Vec::new();
            for row in rows {
                books.push(NodeId(row.map_err(store_err)? as u64));
            }
            Ok(books)
        })
    }

    async fn outgoing_links(&self, book: NodeId) -> Result<Vec<BookLink>, GraphStoreError> {
        self.with_conn(|conn| {
            require_node(conn, book, "book")?;
            let mut stmt = conn
                .prepare(
                    "SELECT to_node, relation, weight FROM edges
                     WHERE from_node = ?1 AND relation != ?2 ORDER BY id",
                )
                .map_err(store_err)?;
            let rows = stmt
                .query_map(rusqlite::params![book.0 as i64, REVIEWED], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                    ))
                })
                .map_err(store_err)?;
            let mut links = Vec::new();
            for row in rows {
                let (target, relation, weight) = row.map_err(store_err)?;
                // Rows with a relation this version does not know are skipped
                // rather than failing the whole traversal.
                if let Some(kind) = LinkKind::parse(&relation) {
                    links.push(BookLink {
                        target: NodeId(target as u64),
                        kind,
                        weight,
                    });
                }
            }
            Ok(links)
        })
    }

    async fn get_book(&self, id: NodeId) -> Result<Option<Book>, GraphStoreError> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT properties FROM nodes WHERE id = ?1 AND label = 'book'",
                [id.0 as i64],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(properties_json) => {
                    let properties: HashMap<String, serde_json::Value> =
                        serde_json::from_str(&properties_json).unwrap_or_default();
                    Ok(Some(Book { id, properties }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(store_err(e)),
            }
        })
    }

    async fn get_books(&self, ids: &[NodeId]) -> Result<Vec<Book>, GraphStoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT id, properties FROM nodes WHERE label = 'book' AND id IN ({})",
            placeholders.join(",")
        );
        let raw_ids: Vec<i64> = ids.iter().map(|id| id.0 as i64).collect();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(store_err)?;
            let params: Vec<&dyn rusqlite::ToSql> =
                raw_ids.iter().map(|i| i as &dyn rusqlite::ToSql).collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(store_err)?;
            let mut books = Vec::new();
            for row in rows {
                let (id, properties_json) = row.map_err(store_err)?;
                let properties: HashMap<String, serde_json::Value> =
                    serde_json::from_str(&properties_json).unwrap_or_default();
                books.push(Book {
                    id: NodeId(id as u64),
                    properties,
                });
            }
            Ok(books)
        })
    }
}
