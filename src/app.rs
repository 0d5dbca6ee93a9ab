use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use tracing::debug;

use crate::config::FolderSyncConfig;
use crate::dispatch::MainQueue;
use crate::scanner::{FolderLister, FolderSource};
use crate::thumbnails::ThumbnailQueue;
use crate::ui::{FolderSyncScreen, HeaderAction, TextGridRenderer};

const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// What to do with the screen once it is loaded.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Grid rows shown at once.
    pub rows: usize,
    /// How long to wait for thumbnails before rendering.
    pub thumbnail_wait: Duration,
    /// Section whose sync toggle is pressed.
    pub toggle: Option<usize>,
    /// Section whose settings button is pressed.
    pub settings: Option<usize>,
    pub show_files: bool,
    pub on_device_only: bool,
    /// Load the list again after the first load settled.
    pub reload: bool,
    pub restart: bool,
}

pub struct FolderSyncApp {
    config: FolderSyncConfig,
    options: AppOptions,
}

type Screen = FolderSyncScreen<ThumbnailQueue>;

impl FolderSyncApp {
    pub fn new(config: FolderSyncConfig, options: AppOptions) -> Self {
        Self { config, options }
    }

    pub fn run(&self) -> Result<()> {
        if self.config.roots.is_empty() {
            bail!("no media roots found; pass --root");
        }

        let queue = MainQueue::new();
        let resolver = ThumbnailQueue::from_config(&self.config.thumbnails)?;
        let source: Arc<dyn FolderSource> = Arc::new(FolderLister::new(&self.config));
        let mut screen = Screen::new(source, queue.handle(), resolver, self.config.grid_width);
        let renderer = TextGridRenderer::default();

        screen.set_viewport(0..self.options.rows.max(1));
        screen.load();
        print!("{}", screen.render(&renderer));

        Self::wait_for_folders(&queue, &mut screen);
        self.wait_for_thumbnails(&mut screen);
        print!("{}", screen.render(&renderer));

        if self.options.reload && screen.reload() {
            Self::wait_for_folders(&queue, &mut screen);
            self.wait_for_thumbnails(&mut screen);
            print!("{}", screen.render(&renderer));
        }

        self.press_headers(&mut screen);
        for notification in screen.take_notifications() {
            println!("> {}", notification.message);
        }

        if self.options.show_files {
            println!("-> {}", screen.show_files(self.options.on_device_only));
        } else if self.options.restart {
            println!("-> {}", screen.restart());
        }

        Ok(())
    }

    fn wait_for_folders(queue: &MainQueue<Screen>, screen: &mut Screen) {
        while !queue.run_until(screen, Duration::from_secs(1), |s| !s.is_loading()) {
            debug!("Still waiting for media folders");
        }
    }

    fn wait_for_thumbnails(&self, screen: &mut Screen) {
        let deadline = Instant::now() + self.options.thumbnail_wait;
        let mut applied = screen.poll_thumbnails();
        while screen.thumbnails_busy() && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
            applied += screen.poll_thumbnails();
        }
        debug!(applied, busy = screen.thumbnails_busy(), "Thumbnail wait finished");
    }

    fn press_headers(&self, screen: &mut Screen) {
        let presses = [
            (self.options.toggle, HeaderAction::ToggleSyncStatus),
            (self.options.settings, HeaderAction::OpenSettings),
        ];
        for (section, action) in presses {
            let Some(section) = section else { continue };
            if !screen.scroll_to_section(section) || !screen.tap_header(section, action) {
                eprintln!("No folder section {}", section);
            }
        }
    }
}
