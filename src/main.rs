mod app;
mod config;
mod dispatch;
mod error;
mod layout;
mod models;
mod scanner;
mod thumbnails;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use app::{AppOptions, FolderSyncApp};
use config::{FolderSyncConfig, DEFAULT_GRID_WIDTH};

/// Lists media folders eligible for instant upload as a sectioned thumbnail grid
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Media root to scan (repeatable; default: pictures and videos dirs)
    #[arg(short, long = "root")]
    roots: Vec<PathBuf>,

    /// Number of grid columns
    #[arg(short, long, default_value_t = DEFAULT_GRID_WIDTH)]
    grid_width: usize,

    /// Path of the media index database
    #[arg(long)]
    index: Option<PathBuf>,

    /// Thumbnail disk cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Leave videos out of the folder list
    #[arg(long)]
    no_videos: bool,

    /// Grid rows to show
    #[arg(long, default_value_t = 12)]
    rows: usize,

    /// Milliseconds to wait for thumbnails before printing the grid
    #[arg(long, default_value_t = 2000)]
    wait_ms: u64,

    /// Press the sync toggle of section S
    #[arg(long, value_name = "S")]
    toggle: Option<usize>,

    /// Press the settings button of section S
    #[arg(long, value_name = "S")]
    settings: Option<usize>,

    /// Navigate to the file display afterwards
    #[arg(long)]
    show_files: bool,

    /// With --show-files: only files present on this device
    #[arg(long, requires = "show_files")]
    on_device_only: bool,

    /// Load the folder list a second time before pressing headers
    #[arg(long)]
    reload: bool,

    /// Restart into the file display, keeping its device filter
    #[arg(long, conflicts_with = "show_files")]
    restart: bool,
}

impl Args {
    fn config(&self) -> FolderSyncConfig {
        let mut config = FolderSyncConfig::default();
        if !self.roots.is_empty() {
            config = config.with_roots(self.roots.clone());
        }
        config.grid_width = self.grid_width.max(1);
        config.index_path = self.index.clone();
        config.thumbnails.cache_dir = self.cache_dir.clone();
        config.scan.include_videos = !self.no_videos;
        config
    }

    fn options(&self) -> AppOptions {
        AppOptions {
            rows: self.rows,
            thumbnail_wait: Duration::from_millis(self.wait_ms),
            toggle: self.toggle,
            settings: self.settings,
            show_files: self.show_files,
            on_device_only: self.on_device_only,
            reload: self.reload,
            restart: self.restart,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("foldersync=info".parse()?),
        )
        .init();

    FolderSyncApp::new(args.config(), args.options()).run()
}
