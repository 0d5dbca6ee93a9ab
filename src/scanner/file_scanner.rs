//! File scanner that keeps the media index in step with the filesystem.
//!
//! - Recursive directory scanning using walkdir
//! - Media type detection by file extension
//! - Change detection against the index (skip rewriting unchanged files)
//! - Batched SQLite writes, stale-entry pruning

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use tokio::task;
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::models::{IndexedFile, MediaIndex, MediaKind};

/// Configuration for the file scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to scan directories recursively.
    pub recursive: bool,
    /// Maximum directory depth (0 = unlimited).
    pub max_depth: usize,
    /// Number of files to batch before writing to the index.
    pub batch_size: usize,
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
    /// Whether dot-files and dot-directories are scanned.
    pub include_hidden: bool,
    /// Whether videos are listed alongside images.
    pub include_videos: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 0,
            batch_size: 100,
            follow_symlinks: false,
            include_hidden: false,
            include_videos: true,
        }
    }
}

/// Result of a completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Total number of media files found.
    pub total_files: usize,
    /// Files that were new or changed since the last scan.
    pub new_items: usize,
    /// Files whose mtime and size matched the index.
    pub unchanged_items: usize,
    /// Index rows removed because the file is gone.
    pub pruned_items: usize,
}

/// Scanner for media roots.
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Scans all roots into `index` on the blocking pool and hands the index back.
    pub async fn scan_roots(
        &self,
        roots: Vec<PathBuf>,
        mut index: MediaIndex,
    ) -> Result<(MediaIndex, ScanResult)> {
        let config = self.config.clone();

        task::spawn_blocking(move || {
            let result = Self::scan_roots_sync(&roots, &config, &mut index)?;
            Ok((index, result))
        })
        .await
        .context("Scan task panicked")?
    }

    /// Synchronous scan of every root followed by pruning of vanished files.
    pub fn scan_roots_sync(
        roots: &[PathBuf],
        config: &ScanConfig,
        index: &mut MediaIndex,
    ) -> Result<ScanResult> {
        let scan_time = MediaIndex::now();
        let cache_map = index.get_cache_map()?;
        debug!("Loaded {} indexed entries", cache_map.len());

        let mut result = ScanResult::default();
        let mut batch = Vec::with_capacity(config.batch_size);
        let mut unchanged = Vec::new();

        for root in roots {
            if !root.is_dir() {
                warn!("Skipping missing media root {:?}", root);
                continue;
            }
            info!("Starting scan of {:?}", root);

            for entry in Self::discover_files(root, config) {
                result.total_files += 1;
                if Self::is_unchanged(&entry, &cache_map) {
                    trace!("Unchanged {:?}", entry.path);
                    result.unchanged_items += 1;
                    unchanged.push(entry.path);
                    continue;
                }

                result.new_items += 1;
                batch.push(IndexedFile::new(
                    entry.path,
                    entry.kind,
                    entry.mtime,
                    entry.size,
                    scan_time,
                ));
                if batch.len() >= config.batch_size.max(1) {
                    index.upsert_batch(&batch)?;
                    batch.clear();
                }
            }
        }

        if !batch.is_empty() {
            index.upsert_batch(&batch)?;
        }
        index.touch_last_seen(&unchanged, scan_time)?;
        result.pruned_items = index.delete_stale(scan_time)?;

        info!(
            "Scan complete: {} total, {} new, {} unchanged, {} pruned",
            result.total_files, result.new_items, result.unchanged_items, result.pruned_items
        );
        debug!("Index now holds {} media files", index.count_media()?);

        Ok(result)
    }

    fn is_unchanged(entry: &DiscoveredEntry, cache_map: &HashMap<PathBuf, (i64, i64)>) -> bool {
        cache_map
            .get(&entry.path)
            .is_some_and(|&(mtime, size)| mtime == entry.mtime && size == entry.size)
    }

    /// Discovers all media files below `dir`, sorted by path.
    fn discover_files(dir: &Path, config: &ScanConfig) -> Vec<DiscoveredEntry> {
        let mut walker = WalkDir::new(dir).follow_links(config.follow_symlinks);

        if !config.recursive {
            walker = walker.max_depth(1);
        } else if config.max_depth > 0 {
            walker = walker.max_depth(config.max_depth);
        }

        let include_hidden = config.include_hidden;
        let mut entries = Vec::new();

        for entry in walker
            .into_iter()
            .filter_entry(|e| include_hidden || e.depth() == 0 || !is_hidden(e))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            // Paths round-trip through the index as text.
            if path.to_str().is_none() {
                warn!("Skipping file with a non UTF-8 name: {:?}", path);
                continue;
            }

            let kind = MediaKind::from_path(path);
            if !kind.is_image() && !(config.include_videos && kind.is_video()) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!("Failed to read metadata for {:?}: {}", path, e);
                    continue;
                }
            };

            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            entries.push(DiscoveredEntry {
                path: path.to_path_buf(),
                kind,
                mtime,
                size: metadata.len() as i64,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Information about a discovered media file.
#[derive(Debug, Clone)]
struct DiscoveredEntry {
    path: PathBuf,
    kind: MediaKind,
    mtime: i64,
    size: i64,
}
