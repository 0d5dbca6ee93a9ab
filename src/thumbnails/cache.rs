//! Thumbnail caching with both disk and memory layers.
//!
//! - Disk cache: JPEG files in XDG_CACHE_HOME/foldersync/thumbs/
//! - Memory cache: LRU of decoded pixels bounded by a byte budget
//!
//! Filenames are based on xxhash of (path + mtime + size) so an edited file
//! never hits a stale thumbnail.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use image::RgbImage;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};
use xxhash_rust::xxh3::xxh3_64;

use super::generator::{ThumbnailGenerator, DEFAULT_THUMB_SIZE};

/// Minimum memory cache size in megabytes.
const MIN_MEMORY_MB: usize = 8;

/// Maximum memory cache size in megabytes.
const MAX_MEMORY_MB: usize = 512;

/// Bytes per pixel of the cached RGB buffers.
const BYTES_PER_PIXEL: usize = 3;

/// Bump when thumbnail generation semantics change.
const THUMB_CACHE_VERSION: u8 = 1;

/// Upper bound on the number of entries regardless of their size.
const DEFAULT_LRU_CAPACITY: usize = 2048;

/// A decoded thumbnail ready to be drawn into a cell.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub image: Arc<RgbImage>,
    /// Estimated memory usage in bytes.
    pub memory_bytes: usize,
}

impl Thumbnail {
    pub fn new(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let memory_bytes = (width as usize) * (height as usize) * BYTES_PER_PIXEL;
        Self {
            image: Arc::new(image),
            memory_bytes,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Cache key for thumbnail lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: u64,
}

impl CacheKey {
    /// Create a key from file identity.
    pub fn new(path: &Path, mtime: i64, size: i64) -> Self {
        let path_str = path.to_string_lossy();
        let mut data = Vec::with_capacity(path_str.len() + 17);
        data.push(THUMB_CACHE_VERSION);
        data.extend_from_slice(path_str.as_bytes());
        data.extend_from_slice(&mtime.to_le_bytes());
        data.extend_from_slice(&size.to_le_bytes());
        Self {
            hash: xxh3_64(&data),
        }
    }

    /// Create a key for a file on disk, reading its mtime and size.
    ///
    /// Unreadable files hash with zero mtime/size so lookups still work.
    pub fn for_file(path: &Path) -> Self {
        let (mtime, size) = std::fs::metadata(path)
            .map(|m| {
                let mtime = m
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                (mtime, m.len() as i64)
            })
            .unwrap_or((0, 0));
        Self::new(path, mtime, size)
    }

    /// Get the filename for disk cache storage.
    pub fn disk_filename(&self) -> String {
        format!("{:016x}.jpg", self.hash)
    }
}

struct MemoryCache {
    entries: LruCache<u64, Thumbnail>,
    used_bytes: usize,
}

/// Thumbnail cache with disk and memory layers. Clones share both layers.
#[derive(Clone)]
pub struct ThumbnailCache {
    cache_dir: PathBuf,
    max_memory_bytes: usize,
    memory: Arc<Mutex<MemoryCache>>,
    thumb_size: Arc<RwLock<u32>>,
}

impl ThumbnailCache {
    /// Create a cache in `cache_dir` with the given memory budget.
    pub fn new(cache_dir: PathBuf, max_memory_mb: usize) -> Self {
        let max_memory_mb = max_memory_mb.clamp(MIN_MEMORY_MB, MAX_MEMORY_MB);

        if let Err(e) = std::fs::create_dir_all(&cache_dir) {
            warn!(?cache_dir, error = ?e, "Failed to create cache directory");
        }

        debug!(?cache_dir, max_memory_mb, "Initialized thumbnail cache");

        let capacity = NonZeroUsize::new(DEFAULT_LRU_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache_dir,
            max_memory_bytes: max_memory_mb * 1024 * 1024,
            memory: Arc::new(Mutex::new(MemoryCache {
                entries: LruCache::new(capacity),
                used_bytes: 0,
            })),
            thumb_size: Arc::new(RwLock::new(DEFAULT_THUMB_SIZE)),
        }
    }

    /// Create a cache in the default XDG cache directory.
    pub fn new_default(max_memory_mb: usize) -> Result<Self> {
        Ok(Self::new(Self::default_cache_dir()?, max_memory_mb))
    }

    pub fn default_cache_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "foldersync")
            .context("Failed to determine project directories")?;
        Ok(proj_dirs.cache_dir().join("thumbs"))
    }

    pub fn set_thumb_size(&self, size: u32) {
        *self.thumb_size.write() = size.max(1);
    }

    /// Look a thumbnail up in memory, then on disk. Never generates.
    pub fn get_cached(&self, key: &CacheKey) -> Option<Thumbnail> {
        if let Some(hit) = self.get_from_memory(key) {
            trace!(hash = key.hash, "Memory cache hit");
            return Some(hit);
        }

        let disk_path = self.disk_path(key);
        if !disk_path.exists() {
            return None;
        }
        match self.load_from_disk(key, &disk_path) {
            Ok(hit) => {
                trace!(hash = key.hash, "Disk cache hit");
                Some(hit)
            }
            Err(e) => {
                warn!(?disk_path, error = ?e, "Dropping unreadable cached thumbnail");
                let _ = std::fs::remove_file(&disk_path);
                None
            }
        }
    }

    /// Get a thumbnail from the cache, generating it if necessary.
    pub fn get_or_generate(&self, path: &Path, key: &CacheKey) -> Result<Thumbnail> {
        if let Some(hit) = self.get_cached(key) {
            return Ok(hit);
        }

        debug!(?path, "Cache miss, generating thumbnail");
        let disk_path = self.disk_path(key);
        let size = *self.thumb_size.read();
        let image = ThumbnailGenerator::generate(path, &disk_path, size)?;
        let thumbnail = Thumbnail::new(image);
        self.add_to_memory(key.hash, thumbnail.clone());
        Ok(thumbnail)
    }

    pub fn get_from_memory(&self, key: &CacheKey) -> Option<Thumbnail> {
        self.memory.lock().entries.get(&key.hash).cloned()
    }

    pub fn disk_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.disk_filename())
    }

    fn load_from_disk(&self, key: &CacheKey, disk_path: &Path) -> Result<Thumbnail> {
        let image = image::open(disk_path)
            .with_context(|| format!("Failed to load cached thumbnail: {:?}", disk_path))?
            .to_rgb8();
        let thumbnail = Thumbnail::new(image);
        self.add_to_memory(key.hash, thumbnail.clone());
        Ok(thumbnail)
    }

    /// Insert into the memory layer, evicting least recently used entries to fit.
    fn add_to_memory(&self, hash: u64, thumbnail: Thumbnail) {
        let needed = thumbnail.memory_bytes;
        let mut memory = self.memory.lock();

        if let Some(old) = memory.entries.pop(&hash) {
            memory.used_bytes = memory.used_bytes.saturating_sub(old.memory_bytes);
        }

        while memory.used_bytes + needed > self.max_memory_bytes {
            match memory.entries.pop_lru() {
                Some((_, evicted)) => {
                    memory.used_bytes = memory.used_bytes.saturating_sub(evicted.memory_bytes);
                    trace!(
                        evicted_bytes = evicted.memory_bytes,
                        current_bytes = memory.used_bytes,
                        "Evicted thumbnail from memory cache"
                    );
                }
                None => break,
            }
        }

        if let Some((_, displaced)) = memory.entries.push(hash, thumbnail) {
            // Capacity bound pushed out another entry.
            memory.used_bytes = memory.used_bytes.saturating_sub(displaced.memory_bytes);
        }
        memory.used_bytes += needed;
    }
}
