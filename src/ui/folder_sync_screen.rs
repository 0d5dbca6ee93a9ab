//! The folder sync screen: loads media folders off the presentation thread and
//! shows them in a sectioned grid.
//!
//! The screen is the presentation context of a [`MainQueue`]; the folder load
//! runs on a worker and its result comes back as a job posted to that queue.
//!
//! [`MainQueue`]: crate::dispatch::MainQueue

use std::ops::Range;
use std::sync::Arc;

use flume::Receiver;
use tracing::{debug, info, warn};

use crate::dispatch::{spawn_worker, MainHandle};
use crate::error::{LoadError, TaskError};
use crate::layout::ViewType;
use crate::models::MediaFolder;
use crate::scanner::FolderSource;
use crate::thumbnails::ThumbnailResolver;

use super::adapter::SectionedAdapter;
use super::folder_sync_adapter::FolderSyncAdapter;
use super::grid_view::SectionedGridView;
use super::listener::{HeaderAction, Notification, NotifyingListener};
use super::navigation::{FileDisplayOptions, Navigation};
use super::text_render::TextGridRenderer;

/// Which of the three mutually exclusive views is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListState {
    pub progress_visible: bool,
    pub list_visible: bool,
    pub empty_visible: bool,
}

pub struct FolderSyncScreen<R> {
    source: Arc<dyn FolderSource>,
    main: MainHandle<Self>,
    adapter: FolderSyncAdapter<R>,
    grid: SectionedGridView,
    viewport: Range<usize>,
    list_state: ListState,
    loading: bool,
    notifications: Receiver<Notification>,
}

impl<R: ThumbnailResolver + 'static> FolderSyncScreen<R> {
    pub fn new(
        source: Arc<dyn FolderSource>,
        main: MainHandle<Self>,
        resolver: R,
        grid_width: usize,
    ) -> Self {
        let (tx, notifications) = flume::unbounded();
        let adapter = FolderSyncAdapter::new(Box::new(NotifyingListener::new(tx)), resolver);

        Self {
            source,
            main,
            adapter,
            grid: SectionedGridView::new(grid_width),
            viewport: 0..0,
            list_state: ListState::default(),
            loading: false,
            notifications,
        }
    }

    /// Starts loading folders unless they are already shown or being loaded.
    ///
    /// Returns whether a load was started.
    pub fn load(&mut self) -> bool {
        if self.adapter.total_item_count() > 0 {
            debug!("Folders already loaded, skipping");
            return false;
        }
        self.start_load()
    }

    /// Loads folders again even if some are already shown.
    pub fn reload(&mut self) -> bool {
        self.start_load()
    }

    fn start_load(&mut self) -> bool {
        if self.loading {
            debug!("Folder load already in progress");
            return false;
        }

        self.set_list_shown(false);
        self.loading = true;

        let source = Arc::clone(&self.source);
        let spawned = spawn_worker(
            "folder-lister",
            self.main.clone(),
            move || source.load(),
            |screen: &mut Self, outcome| screen.on_folders_loaded(outcome),
        );

        match spawned {
            Ok(_) => true,
            Err(e) => {
                self.on_folders_loaded(Err(TaskError::Spawn(e)));
                false
            }
        }
    }

    /// Applies a finished load. Failures leave the screen with an empty list.
    pub fn on_folders_loaded(&mut self, outcome: Result<Result<Vec<MediaFolder>, LoadError>, TaskError>) {
        self.loading = false;

        let folders = match outcome.map_err(LoadError::from).and_then(|r| r) {
            Ok(folders) => folders,
            Err(e) => {
                warn!("Failed to load media folders: {}", e);
                Vec::new()
            }
        };
        let count = folders.len();
        self.adapter.set_folders(folders);
        info!(version = self.adapter.data_version(), "Showing {} media folders", count);

        self.grid.refresh(&mut self.adapter);
        self.grid.bind_rows(&mut self.adapter, self.viewport.clone());
        self.set_list_shown(true);
    }

    fn set_list_shown(&mut self, shown: bool) {
        self.list_state = ListState {
            progress_visible: !shown,
            list_visible: shown,
            empty_visible: shown && self.adapter.total_item_count() == 0,
        };
    }

    /// Rows of the grid that are on screen.
    pub fn set_viewport(&mut self, rows: Range<usize>) {
        self.viewport = rows.clone();
        self.grid.bind_rows(&mut self.adapter, rows);
    }

    /// Moves the viewport so that it starts at the header of `section`.
    pub fn scroll_to_section(&mut self, section: usize) -> bool {
        if section >= self.adapter.section_count() {
            return false;
        }
        let header = self.grid.layout().header_position(section);
        let Some(row) = self
            .grid
            .rows()
            .iter()
            .position(|r| r.view_type == ViewType::Header && r.positions.start == header)
        else {
            return false;
        };

        let height = self.viewport.len().max(1);
        self.set_viewport(row..row + height);
        true
    }

    /// Presses a header button of `section`; the section must be on screen.
    pub fn tap_header(&mut self, section: usize, action: HeaderAction) -> bool {
        match self.grid.header_for(section) {
            Some(header) => self.adapter.on_header_action(header, action),
            None => {
                debug!(section, "Header is not on screen");
                false
            }
        }
    }

    /// Applies finished thumbnails to the visible cells.
    pub fn poll_thumbnails(&mut self) -> usize {
        self.adapter.deliver_thumbnails(self.grid.item_cells_mut())
    }

    pub fn thumbnails_busy(&self) -> bool {
        self.adapter.resolver().is_busy()
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    pub fn show_files(&self, on_device_only: bool) -> Navigation {
        Navigation::FileDisplay(FileDisplayOptions {
            on_device_only: Some(on_device_only),
            clear_top: true,
        })
    }

    pub fn restart(&self) -> Navigation {
        Navigation::FileDisplay(FileDisplayOptions {
            on_device_only: None,
            clear_top: true,
        })
    }

    pub fn render(&self, renderer: &TextGridRenderer) -> String {
        if self.list_state.progress_visible {
            "Loading media folders...\n".to_string()
        } else if self.list_state.empty_visible {
            "No media folders found\n".to_string()
        } else if self.list_state.list_visible {
            renderer.render(&self.grid)
        } else {
            String::new()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
