//! TTL-bounded cache of repository tag lists
//!
//! Lookups are served from an in-memory map guarded by a reader/writer lock.
//! In persistent mode the map is mirrored into a SQLite database by a single
//! background writer thread:
//!
//! - `set` only signals the writer through a one-slot channel and returns
//!   immediately; a signal that finds the slot full is coalesced into the
//!   pending save, which snapshots the map when it runs.
//! - Only one save is ever in flight, so the database has exactly one writer.
//! - Save failures are logged and never reach the caller.
//! - Dropping the cache lets the writer finish the pending save and joins it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::version::error::CacheError;

/// One repository's cached tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Repository owner/name (e.g. "hashicorp/terraform")
    pub repository: String,
    pub tags: Vec<String>,
    pub cached_at: DateTime<Utc>,
    pub ttl: TimeDelta,
}

impl CacheEntry {
    /// Valid iff (now - cached_at) <= ttl
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now - self.cached_at <= self.ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub persistent: bool,
}

type EntryMap = Arc<RwLock<HashMap<String, CacheEntry>>>;

pub struct RepositoryTagCache {
    entries: EntryMap,
    ttl: TimeDelta,
    storage: Option<Storage>,
}

struct Storage {
    conn: Arc<Mutex<Connection>>,
    save_signal: Option<SyncSender<()>>,
    writer: Option<JoinHandle<()>>,
}

impl RepositoryTagCache {
    /// In-memory cache that lives as long as the process
    pub fn ephemeral(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: to_time_delta(ttl),
            storage: None,
        }
    }

    /// Cache mirrored to a SQLite database at `db_path`.
    ///
    /// Storage that cannot be opened is logged and the cache runs in memory
    /// only. Use [`RepositoryTagCache::open`] to surface the failure instead.
    pub fn persistent(db_path: &Path, ttl: Duration) -> Self {
        Self::open(db_path, ttl).unwrap_or_else(|e| {
            warn!(
                "Failed to open repository cache at {:?}, caching in memory only: {}",
                db_path, e
            );
            Self::ephemeral(ttl)
        })
    }

    /// Like [`RepositoryTagCache::persistent`], but fails when the database
    /// cannot be created or opened.
    ///
    /// Entries whose stored TTL has elapsed are dropped while loading. A database
    /// that cannot be read is logged and the cache starts empty.
    pub fn open(db_path: &Path, ttl: Duration) -> Result<Self, CacheError> {
        info!("Opening repository cache at {:?}", db_path);

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        let loaded = prepare_and_load(&conn).unwrap_or_else(|e| {
            warn!("Failed to load repository cache, starting fresh: {}", e);
            HashMap::new()
        });

        let entries: EntryMap = Arc::new(RwLock::new(loaded));
        let conn = Arc::new(Mutex::new(conn));
        let (save_signal, writer) = spawn_writer(Arc::clone(&entries), Arc::clone(&conn))?;

        Ok(Self {
            entries,
            ttl: to_time_delta(ttl),
            storage: Some(Storage {
                conn,
                save_signal: Some(save_signal),
                writer: Some(writer),
            }),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Tags for `repository`, or `None` when absent or expired.
    ///
    /// Expired entries stay in the map until overwritten or cleared.
    pub fn get(&self, repository: &str) -> Option<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(repository)?;

        if !entry.is_valid_at(Utc::now()) {
            debug!("Cache entry expired for {}", repository);
            return None;
        }

        debug!("Cache hit for {} ({} tags)", repository, entry.tags.len());
        Some(entry.tags.clone())
    }

    /// Store `tags` for `repository`, overwriting and re-stamping any previous entry
    pub fn set(&self, repository: &str, tags: Vec<String>) {
        let tag_count = tags.len();
        {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            entries.insert(
                repository.to_string(),
                CacheEntry {
                    repository: repository.to_string(),
                    tags,
                    cached_at: Utc::now(),
                    ttl: self.ttl,
                },
            );
        }
        debug!("Cached {} tags for {}", tag_count, repository);

        if let Some(storage) = &self.storage {
            storage.request_save();
        }
    }

    /// Remove every entry, including the persisted copy
    pub fn clear(&self) -> Result<(), CacheError> {
        match &self.storage {
            Some(storage) => {
                // Same lock order as the writer: connection, then map
                let conn = storage.lock_conn()?;
                self.entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clear();
                conn.execute("DELETE FROM repository_tags", [])?;
            }
            None => self
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear(),
        }

        info!("Repository cache cleared");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let valid_entries = entries.values().filter(|e| e.is_valid_at(now)).count();

        CacheStats {
            total_entries: entries.len(),
            valid_entries,
            expired_entries: entries.len() - valid_entries,
            persistent: self.is_persistent(),
        }
    }
}

impl Drop for RepositoryTagCache {
    fn drop(&mut self) {
        if let Some(storage) = &mut self.storage {
            // Disconnecting the channel ends the writer after its pending save
            storage.save_signal.take();
            if let Some(writer) = storage.writer.take()
                && writer.join().is_err()
            {
                warn!("Repository cache writer panicked");
            }
        }
    }
}

impl Storage {
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn request_save(&self) {
        let Some(signal) = &self.save_signal else {
            return;
        };
        match signal.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                warn!("Repository cache writer is gone, entry not persisted");
            }
        }
    }
}

fn to_time_delta(ttl: Duration) -> TimeDelta {
    TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
}

fn prepare_and_load(conn: &Connection) -> Result<HashMap<String, CacheEntry>, CacheError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS repository_tags (
            repository TEXT PRIMARY KEY,
            tags TEXT NOT NULL,
            cached_at INTEGER NOT NULL,
            ttl_ms INTEGER NOT NULL
        )
        "#,
        [],
    )?;

    let mut stmt = conn.prepare("SELECT repository, tags, cached_at, ttl_ms FROM repository_tags")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let now = Utc::now();
    let total = rows.len();
    let mut entries = HashMap::new();

    for (repository, tags, cached_at_ms, ttl_ms) in rows {
        let Some(cached_at) = DateTime::from_timestamp_millis(cached_at_ms) else {
            continue;
        };
        let entry = CacheEntry {
            tags: serde_json::from_str(&tags)?,
            repository: repository.clone(),
            cached_at,
            ttl: TimeDelta::milliseconds(ttl_ms),
        };
        if entry.is_valid_at(now) {
            entries.insert(repository, entry);
        }
    }

    debug!(
        "Loaded repository cache: {} total, {} valid, {} expired",
        total,
        entries.len(),
        total - entries.len()
    );
    Ok(entries)
}

fn save_entries(conn: &mut Connection, entries: &[CacheEntry]) -> Result<(), CacheError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM repository_tags", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO repository_tags (repository, tags, cached_at, ttl_ms) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for entry in entries {
            stmt.execute((
                &entry.repository,
                serde_json::to_string(&entry.tags)?,
                entry.cached_at.timestamp_millis(),
                entry.ttl.num_milliseconds(),
            ))?;
        }
    }
    tx.commit()?;
    Ok(())
}

fn spawn_writer(
    entries: EntryMap,
    conn: Arc<Mutex<Connection>>,
) -> Result<(SyncSender<()>, JoinHandle<()>), CacheError> {
    let (signal, requests) = mpsc::sync_channel::<()>(1);

    let writer = std::thread::Builder::new()
        .name("tfbump-cache-writer".to_string())
        .spawn(move || {
            while requests.recv().is_ok() {
                let Ok(mut conn) = conn.lock() else {
                    warn!("Repository cache connection lock poisoned, stopping writer");
                    return;
                };
                let snapshot: Vec<CacheEntry> = entries
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .values()
                    .cloned()
                    .collect();

                match save_entries(&mut conn, &snapshot) {
                    Ok(()) => debug!("Persisted {} repository cache entries", snapshot.len()),
                    Err(e) => warn!("Failed to save repository cache: {}", e),
                }
            }
        })?;

    Ok((signal, writer))
}
