//! SQLite snapshot store for character state.
//!
//! Each character's [`CharacterSnapshot`] is serialised to JSON and kept in
//! one row:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS character_snapshots (
//!     character_id TEXT PRIMARY KEY,
//!     name         TEXT NOT NULL,
//!     data         BLOB NOT NULL,
//!     saved_at     TEXT NOT NULL,
//!     checksum     TEXT
//! );
//! ```
//!
//! - WAL mode so readers are not blocked by the snapshot sweep.
//! - JSON in a BLOB keeps the schema stable while the state types evolve.
//! - An optional CRC-32 flags corrupted rows on load.
//!
//! Calls are synchronous; async owners run them on a blocking thread.

use std::path::{Path, PathBuf};
use std::time::Instant;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::character::CharacterSnapshot;
use crate::config::PersistenceConfig;
use crate::error::{AnimusError, Result};
use crate::types::CharacterId;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS character_snapshots (
    character_id TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    data         BLOB NOT NULL,
    saved_at     TEXT NOT NULL,
    checksum     TEXT
);";

// ---------------------------------------------------------------------------
// CRC-32
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32(data))
}

/// CRC-32 (ISO 3309), reflected polynomial.
fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc = u32::MAX;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (POLY & mask);
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Handle to the snapshot database. Shareable across threads.
pub struct SnapshotStore {
    conn: Mutex<Connection>,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns [`AnimusError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "snapshot store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path,
        })
    }

    /// Open the store configured in `config.path`, if any.
    ///
    /// # Errors
    /// Returns [`AnimusError::Database`] on SQLite failures.
    pub fn from_config(config: &PersistenceConfig) -> Result<Option<Self>> {
        config
            .path
            .as_deref()
            .map(|p| Self::open(p, config))
            .transpose()
    }

    /// In-memory database for tests.
    ///
    /// # Errors
    /// Returns [`AnimusError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Upsert a snapshot.
    ///
    /// # Errors
    /// [`AnimusError::Serialization`] if encoding fails,
    /// [`AnimusError::Database`] on SQLite failures.
    pub fn save(&self, snapshot: &CharacterSnapshot) -> Result<()> {
        let start = Instant::now();
        let json =
            serde_json::to_vec(snapshot).map_err(|e| AnimusError::Serialization(e.to_string()))?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));
        let id = snapshot.profile.id.0.to_string();

        self.conn.lock().execute(
            "INSERT INTO character_snapshots (character_id, name, data, saved_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(character_id) DO UPDATE SET
                name = excluded.name,
                data = excluded.data,
                saved_at = excluded.saved_at,
                checksum = excluded.checksum",
            params![
                id,
                snapshot.profile.name,
                json,
                snapshot.saved_at.to_rfc3339(),
                checksum
            ],
        )?;

        debug!(
            character = %snapshot.profile.id,
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Load a snapshot; `None` if the character was never saved.
    ///
    /// A checksum mismatch is logged and the data still returned.
    ///
    /// # Errors
    /// [`AnimusError::Serialization`] if decoding fails,
    /// [`AnimusError::Database`] on SQLite failures.
    pub fn load(&self, character: CharacterId) -> Result<Option<CharacterSnapshot>> {
        let start = Instant::now();
        let row: Option<(Vec<u8>, Option<String>)> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare_cached(
                "SELECT data, checksum FROM character_snapshots WHERE character_id = ?1",
            )?;
            stmt.query_row(params![character.0.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?
        };
        let Some((data, stored)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(%character, %expected, %actual, "snapshot checksum mismatch");
                }
            }
        }

        let snapshot: CharacterSnapshot =
            serde_json::from_slice(&data).map_err(|e| AnimusError::Serialization(e.to_string()))?;
        debug!(%character, elapsed_us = start.elapsed().as_micros(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Delete a snapshot. Returns whether a row existed.
    ///
    /// # Errors
    /// [`AnimusError::Database`] on SQLite failures.
    pub fn delete(&self, character: CharacterId) -> Result<bool> {
        let deleted = self.conn.lock().execute(
            "DELETE FROM character_snapshots WHERE character_id = ?1",
            params![character.0.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// IDs of every saved character.
    ///
    /// # Errors
    /// [`AnimusError::Database`] on SQLite failures.
    pub fn list(&self) -> Result<Vec<CharacterId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT character_id FROM character_snapshots")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            let raw = row?;
            match uuid::Uuid::parse_str(&raw) {
                Ok(uuid) => ids.push(CharacterId(uuid)),
                Err(_) => warn!(id = %raw, "skipping snapshot with invalid id"),
            }
        }
        Ok(ids)
    }

    /// Number of saved characters.
    ///
    /// # Errors
    /// [`AnimusError::Database`] on SQLite failures.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM character_snapshots",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Copy the database to `dest` with SQLite's online backup.
    ///
    /// # Errors
    /// [`AnimusError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest: P) -> Result<()> {
        let start = Instant::now();
        let mut target = Connection::open(dest.as_ref())?;
        let conn = self.conn.lock();
        let backup = rusqlite::backup::Backup::new(&conn, &mut target)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "snapshot backup completed"
        );
        Ok(())
    }

    /// Database path, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::character::CharacterState;
    use crate::config::AnimusConfig;
    use crate::types::{CharacterProfile, NeedType};

    fn snapshot(name: &str) -> CharacterSnapshot {
        let now = Utc::now();
        let mut state = CharacterState::new(
            CharacterProfile::new(name, "test persona"),
            Arc::new(AnimusConfig::default()),
            now,
            Some(1),
        );
        state
            .update_need(NeedType::Communication, 33.0, "seed", now)
            .expect("valid");
        state.snapshot(now)
    }

    fn store() -> SnapshotStore {
        SnapshotStore::open_in_memory(&PersistenceConfig::default()).expect("open")
    }

    #[test]
    fn crc32_matches_reference_vector() {
        assert_eq!(crc32_hex(b"123456789"), "cbf43926");
    }

    #[test]
    fn save_then_load() {
        let store = store();
        let snap = snapshot("Ilya");
        store.save(&snap).expect("save");
        let loaded = store.load(snap.profile.id).expect("load").expect("present");
        assert_eq!(loaded.profile.name, "Ilya");
        let comm = loaded
            .needs
            .iter()
            .find(|n| n.need_type == NeedType::Communication)
            .expect("need");
        assert!((comm.current_value - 33.0).abs() < 1e-4);
    }

    #[test]
    fn missing_character_is_none() {
        assert!(store().load(CharacterId::new()).expect("load").is_none());
    }

    #[test]
    fn deleted_character_is_none_but_query_errors_surface() {
        let store = store();
        let snap = snapshot("Vera");
        store.save(&snap).expect("save");
        assert!(store.delete(snap.profile.id).expect("delete"));
        assert!(store.load(snap.profile.id).expect("load").is_none());

        store
            .conn
            .lock()
            .execute_batch("DROP TABLE character_snapshots")
            .expect("drop");
        let err = store.load(snap.profile.id).unwrap_err();
        assert!(matches!(err, AnimusError::Database(_)));
    }

    #[test]
    fn upsert_delete_and_list() {
        let store = store();
        let a = snapshot("A");
        let b = snapshot("B");
        store.save(&a).expect("save");
        store.save(&a).expect("save again");
        store.save(&b).expect("save");
        assert_eq!(store.count().expect("count"), 2);
        assert_eq!(store.list().expect("list").len(), 2);
        assert!(store.delete(a.profile.id).expect("delete"));
        assert!(!store.delete(a.profile.id).expect("delete again"));
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("animus.db");
        let snap = snapshot("Persisted");
        {
            let store = SnapshotStore::open(&path, &PersistenceConfig::default()).expect("open");
            store.save(&snap).expect("save");
        }
        let store = SnapshotStore::open(&path, &PersistenceConfig::default()).expect("reopen");
        assert!(store.load(snap.profile.id).expect("load").is_some());

        let backup = dir.path().join("animus.bak");
        store.backup(&backup).expect("backup");
        let copy = SnapshotStore::open(&backup, &PersistenceConfig::default()).expect("open copy");
        assert_eq!(copy.count().expect("count"), 1);
    }

    #[test]
    fn store_is_shareable() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<SnapshotStore>();
    }
}
