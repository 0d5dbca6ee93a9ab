//! Enumerates media folders for the sync screen.
//!
//! A load refreshes the media index from the filesystem and then reads one
//! [`MediaFolder`] per indexed directory: the newest [`OVERFLOW_CAP`] paths as
//! the preview plus the folder's full file count.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info, warn};

use super::file_scanner::{FileScanner, ScanConfig};
use crate::config::FolderSyncConfig;
use crate::error::LoadError;
use crate::models::{MediaFolder, MediaIndex, OVERFLOW_CAP};

/// Anything that can produce the folder collection. Called off the presentation thread.
pub trait FolderSource: Send + Sync {
    fn load(&self) -> Result<Vec<MediaFolder>, LoadError>;
}

/// Folder source backed by the filesystem scanner and the SQLite media index.
#[derive(Debug, Clone)]
pub struct FolderLister {
    roots: Vec<PathBuf>,
    scan: ScanConfig,
    index_path: Option<PathBuf>,
}

impl FolderLister {
    pub fn new(config: &FolderSyncConfig) -> Self {
        Self {
            roots: config.roots.clone(),
            scan: config.scan.clone(),
            index_path: config.index_path.clone(),
        }
    }

    fn open_index(&self) -> Result<MediaIndex, LoadError> {
        let path = match &self.index_path {
            Some(path) => path.clone(),
            None => MediaIndex::default_db_path().map_err(LoadError::Index)?,
        };

        match MediaIndex::open(&path) {
            Ok(index) => Ok(index),
            Err(e) => {
                warn!("Failed to open media index {:?}: {:#}", path, e);
                MediaIndex::handle_corruption(&path).map_err(LoadError::Index)
            }
        }
    }

    /// Builds the folder collection from what is currently indexed.
    pub fn folders_from_index(index: &MediaIndex) -> anyhow::Result<Vec<MediaFolder>> {
        let summaries = index.folder_summaries()?;
        let mut folders = Vec::with_capacity(summaries.len());

        for summary in summaries {
            let paths = index
                .newest_paths(&summary.path, OVERFLOW_CAP)
                .with_context(|| format!("Failed to read preview of {:?}", summary.path))?;
            if paths.is_empty() {
                continue;
            }
            debug!(
                files = summary.file_count,
                newest = summary.newest_mtime,
                "{}",
                summary.path.display()
            );
            folders.push(MediaFolder::from_path(&summary.path, paths, summary.file_count));
        }

        Ok(folders)
    }
}

impl FolderSource for FolderLister {
    fn load(&self) -> Result<Vec<MediaFolder>, LoadError> {
        if self.roots.is_empty() {
            return Err(LoadError::NoRoots);
        }

        let index = self.open_index()?;
        let scanner = FileScanner::with_config(self.scan.clone());

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start scan runtime")
            .map_err(LoadError::Scan)?;
        let (index, _) = runtime
            .block_on(scanner.scan_roots(self.roots.clone(), index))
            .map_err(LoadError::Scan)?;

        let folders = Self::folders_from_index(&index).map_err(LoadError::Index)?;
        info!("Found {} media folders", folders.len());
        Ok(folders)
    }
}
