use std::path::PathBuf;

use crate::scanner::file_scanner::ScanConfig;

/// Default number of grid columns.
pub const DEFAULT_GRID_WIDTH: usize = 4;

/// Settings for the thumbnail pipeline.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Disk cache directory (`None` = XDG cache dir).
    pub cache_dir: Option<PathBuf>,
    /// Memory cache budget in megabytes.
    pub max_memory_mb: usize,
    /// Number of generator threads.
    pub workers: usize,
    /// Longest edge of a generated thumbnail in pixels.
    pub thumb_size: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            max_memory_mb: 64,
            workers: 2,
            thumb_size: crate::thumbnails::generator::DEFAULT_THUMB_SIZE,
        }
    }
}

/// Everything the folder sync screen needs to know up front.
#[derive(Debug, Clone)]
pub struct FolderSyncConfig {
    /// Directories scanned for media folders.
    pub roots: Vec<PathBuf>,
    pub scan: ScanConfig,
    /// Media index database (`None` = XDG cache dir).
    pub index_path: Option<PathBuf>,
    pub thumbnails: ThumbnailConfig,
    /// Number of grid columns; headers span the full width.
    pub grid_width: usize,
}

impl FolderSyncConfig {
    /// Pictures and videos directories of the current user, falling back to home.
    pub fn default_roots() -> Vec<PathBuf> {
        let Some(dirs) = directories::UserDirs::new() else {
            return Vec::new();
        };

        let mut roots: Vec<PathBuf> = [dirs.picture_dir(), dirs.video_dir()]
            .into_iter()
            .flatten()
            .map(|p| p.to_path_buf())
            .collect();
        roots.dedup();

        if roots.is_empty() {
            roots.push(dirs.home_dir().to_path_buf());
        }
        roots
    }

    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }
}

impl Default for FolderSyncConfig {
    fn default() -> Self {
        Self {
            roots: Self::default_roots(),
            scan: ScanConfig::default(),
            index_path: None,
            thumbnails: ThumbnailConfig::default(),
            grid_width: DEFAULT_GRID_WIDTH,
        }
    }
}
