//! SQLite-backed index of the media files found on the device.
//!
//! The index plays the part of the platform media store: the scanner writes
//! every discovered image/video into it, and the folder lister reads folder
//! summaries and preview paths back out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info, warn};

use crate::models::MediaKind;

/// A single indexed media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFile {
    pub path: PathBuf,
    pub folder: PathBuf,
    pub kind: MediaKind,
    pub mtime: i64,
    pub size: i64,
    pub last_seen: i64,
}

impl IndexedFile {
    /// Create an entry for `path`, using its parent as the folder.
    pub fn new(path: PathBuf, kind: MediaKind, mtime: i64, size: i64, last_seen: i64) -> Self {
        let folder = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Self {
            path,
            folder,
            kind,
            mtime,
            size,
            last_seen,
        }
    }
}

/// Aggregated view of one folder in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSummary {
    pub path: PathBuf,
    pub file_count: u64,
    pub newest_mtime: i64,
}

/// SQLite storage for the media index.
pub struct MediaIndex {
    conn: Connection,
}

impl MediaIndex {
    /// Returns the default database path based on XDG directories.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "foldersync")
            .context("Failed to determine project directories")?;

        let cache_dir = proj_dirs.cache_dir();
        std::fs::create_dir_all(cache_dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", cache_dir))?;

        Ok(cache_dir.join("media_index.sqlite"))
    }

    /// Opens or creates the index at the specified path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create index directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open media index at {:?}", path))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )
        .context("Failed to configure SQLite pragmas")?;

        let index = Self { conn };
        index.create_tables()?;

        info!("Opened media index at {:?}", path);
        Ok(index)
    }

    /// Opens a throwaway in-memory index.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory index")?;
        let index = Self { conn };
        index.create_tables()?;
        Ok(index)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS media (
                path TEXT PRIMARY KEY NOT NULL,
                folder TEXT NOT NULL,
                kind INTEGER NOT NULL,
                mtime INTEGER NOT NULL,
                size INTEGER NOT NULL,
                last_seen INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_media_folder_mtime ON media(folder, mtime);
            CREATE INDEX IF NOT EXISTS idx_media_last_seen ON media(last_seen);
            ",
            )
            .context("Failed to create media index tables")?;

        debug!("Media index tables created/verified");
        Ok(())
    }

    /// Batch inserts or updates files in a single transaction.
    pub fn upsert_batch(&mut self, files: &[IndexedFile]) -> Result<usize> {
        if files.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let count = Self::upsert_batch_in_tx(&tx, files)?;
        tx.commit()?;

        debug!("Batch upserted {} media files", count);
        Ok(count)
    }

    fn upsert_batch_in_tx(tx: &Transaction, files: &[IndexedFile]) -> Result<usize> {
        let mut stmt = tx.prepare_cached(
            "
            INSERT INTO media (path, folder, kind, mtime, size, last_seen)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(path) DO UPDATE SET
                folder = excluded.folder,
                kind = excluded.kind,
                mtime = excluded.mtime,
                size = excluded.size,
                last_seen = excluded.last_seen
            ",
        )?;

        let mut count = 0;
        for file in files {
            stmt.execute(params![
                file.path.to_string_lossy(),
                file.folder.to_string_lossy(),
                kind_to_int(file.kind),
                file.mtime,
                file.size,
                file.last_seen,
            ])?;
            count += 1;
        }

        Ok(count)
    }

    /// Returns every folder that holds at least one indexed file, by name.
    pub fn folder_summaries(&self) -> Result<Vec<FolderSummary>> {
        let mut stmt = self.conn.prepare_cached(
            "
            SELECT folder, COUNT(*), MAX(mtime)
            FROM media
            GROUP BY folder
            ORDER BY folder COLLATE NOCASE
            ",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(FolderSummary {
                    path: PathBuf::from(row.get::<_, String>(0)?),
                    file_count: row.get::<_, i64>(1)?.max(0) as u64,
                    newest_mtime: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query folder summaries")?;

        Ok(summaries)
    }

    /// Returns up to `limit` file paths of a folder, newest first.
    pub fn newest_paths(&self, folder: &Path, limit: usize) -> Result<Vec<PathBuf>> {
        let mut stmt = self.conn.prepare_cached(
            "
            SELECT path FROM media
            WHERE folder = ?1
            ORDER BY mtime DESC, path ASC
            LIMIT ?2
            ",
        )?;

        let paths = stmt
            .query_map(
                params![folder.to_string_lossy(), limit as i64],
                |row| Ok(PathBuf::from(row.get::<_, String>(0)?)),
            )?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to query files of {:?}", folder))?;

        Ok(paths)
    }

    /// Gets a map from path to (mtime, size) for change detection while scanning.
    pub fn get_cache_map(&self) -> Result<HashMap<PathBuf, (i64, i64)>> {
        let mut stmt = self.conn.prepare("SELECT path, mtime, size FROM media")?;

        let map = stmt
            .query_map([], |row| {
                Ok((
                    PathBuf::from(row.get::<_, String>(0)?),
                    (row.get(1)?, row.get(2)?),
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()
            .context("Failed to get cache entries")?;

        Ok(map)
    }

    /// Updates the last_seen timestamp for files that were found unchanged.
    pub fn touch_last_seen(&mut self, paths: &[PathBuf], timestamp: i64) -> Result<usize> {
        if paths.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached("UPDATE media SET last_seen = ?1 WHERE path = ?2")?;
            for path in paths {
                count += stmt.execute(params![timestamp, path.to_string_lossy().as_ref()])?;
            }
        }
        tx.commit()?;

        Ok(count)
    }

    /// Deletes files that haven't been seen since the given timestamp.
    pub fn delete_stale(&self, older_than: i64) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM media WHERE last_seen < ?1",
            params![older_than],
        )?;

        if deleted > 0 {
            info!("Deleted {} stale media entries", deleted);
        }

        Ok(deleted)
    }

    /// Returns the total count of indexed files.
    pub fn count_media(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Returns the current Unix timestamp.
    pub fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// Backs up a database that fails to open and starts a fresh one.
    pub fn handle_corruption(path: &Path) -> Result<Self> {
        warn!("Handling potential index corruption at {:?}", path);

        let backup_path = path.with_extension("sqlite.corrupted");
        if path.exists() {
            std::fs::rename(path, &backup_path).with_context(|| {
                format!("Failed to backup corrupted index to {:?}", backup_path)
            })?;
            warn!("Backed up corrupted index to {:?}", backup_path);
        }

        Self::open(path)
    }
}

fn kind_to_int(kind: MediaKind) -> i32 {
    match kind {
        MediaKind::Image => 0,
        MediaKind::Video => 1,
        MediaKind::Audio => 2,
        MediaKind::Text => 3,
        MediaKind::Document => 4,
        MediaKind::Archive => 5,
        MediaKind::Other => 6,
    }
}
