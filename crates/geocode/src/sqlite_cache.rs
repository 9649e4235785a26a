//! Durable lookup cache backed by SQLite.
//!
//! One row per `(provider, key)`. Inserts use `INSERT OR IGNORE`, so the
//! first stored answer for a key is kept forever.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use geonorm_recon::{CacheError, CacheKey, CachedValue, Coordinate, GeocodeCache};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS lookups (
    provider TEXT NOT NULL,
    key TEXT NOT NULL,
    kind INTEGER NOT NULL,   -- 0=not_found, 1=coordinate, 2=address
    lat REAL,
    lon REAL,
    address TEXT,
    PRIMARY KEY (provider, key)
);
"#;

const KIND_NOT_FOUND: i64 = 0;
const KIND_COORDINATE: i64 = 1;
const KIND_ADDRESS: i64 = 2;

/// Default file name, created next to the config file.
pub const DEFAULT_CACHE_FILE: &str = "geonorm-cache.sqlite3";

/// Entry counts per provider, for `geonorm cache stats`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub path: PathBuf,
    pub total: usize,
    pub not_found: usize,
    pub by_provider: Vec<(String, usize)>,
}

pub struct SqliteCache {
    conn: Mutex<Connection>,
    path: PathBuf,
}

fn storage(e: rusqlite::Error) -> CacheError {
    CacheError::Storage(e.to_string())
}

impl SqliteCache {
    /// Open (or create) the cache file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Open(format!("{}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path).map_err(|e| CacheError::Open(format!("{}: {e}", path.display())))?;
        conn.execute_batch(SCHEMA).map_err(|e| CacheError::Open(e.to_string()))?;
        debug!(path = %path.display(), "opened lookup cache");
        Ok(Self { conn: Mutex::new(conn), path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM lookups", [], |row| row.get(0))
            .map_err(storage)?;
        let not_found: i64 = conn
            .query_row("SELECT COUNT(*) FROM lookups WHERE kind = ?1", params![KIND_NOT_FOUND], |row| row.get(0))
            .map_err(storage)?;

        let mut stmt = conn
            .prepare("SELECT provider, COUNT(*) FROM lookups GROUP BY provider ORDER BY provider")
            .map_err(storage)?;
        let by_provider = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))
            .map_err(storage)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;

        Ok(CacheStats {
            path: self.path.clone(),
            total: total as usize,
            not_found: not_found as usize,
            by_provider,
        })
    }

    /// Delete every entry. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute("DELETE FROM lookups", []).map_err(storage)
    }
}

impl GeocodeCache for SqliteCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>, CacheError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let row = conn
            .query_row(
                "SELECT kind, lat, lon, address FROM lookups WHERE provider = ?1 AND key = ?2",
                params![key.provider.as_str(), key.key],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<f64>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(storage)?;

        let Some((kind, lat, lon, address)) = row else {
            return Ok(None);
        };
        let value = match (kind, lat, lon, address) {
            (KIND_NOT_FOUND, ..) => CachedValue::NotFound,
            (KIND_COORDINATE, Some(lat), Some(lon), _) => CachedValue::Coordinate(Coordinate::new(lat, lon)),
            (KIND_ADDRESS, _, _, Some(address)) => CachedValue::Address(address),
            (kind, ..) => {
                return Err(CacheError::Corrupt(format!(
                    "{}/{}: kind {kind} with missing fields",
                    key.provider, key.key
                )))
            }
        };
        Ok(Some(value))
    }

    fn put(&self, key: &CacheKey, value: &CachedValue) -> Result<(), CacheError> {
        let (kind, lat, lon, address) = match value {
            CachedValue::NotFound => (KIND_NOT_FOUND, None, None, None),
            CachedValue::Coordinate(c) => (KIND_COORDINATE, Some(c.lat), Some(c.lon), None),
            CachedValue::Address(a) => (KIND_ADDRESS, None, None, Some(a.as_str())),
        };
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT OR IGNORE INTO lookups (provider, key, kind, lat, lon, address) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![key.provider.as_str(), key.key, kind, lat, lon, address],
        )
        .map_err(storage)?;
        Ok(())
    }
}
