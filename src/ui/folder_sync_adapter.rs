//! Adapter that shows every media folder as a grid section.
//!
//! Headers carry the folder name with the sync toggle and settings buttons;
//! items show a thumbnail (images) or a file-type icon. The last visible cell of
//! a folder with more than [`OVERFLOW_CAP`] files gets a "+N" overlay.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::layout::ViewType;
use crate::models::{Icon, MediaFolder, MediaKind, OVERFLOW_CAP};
use crate::thumbnails::generator::ThumbnailGenerator;
use crate::thumbnails::{CellId, ThumbnailReady, ThumbnailResolver};

use super::adapter::SectionedAdapter;
use super::cells::{Cell, CellImage, HeaderCell, ItemCell};
use super::listener::{ClickListener, HeaderAction};

/// Overlay text for the cell at `relative`, or `None` when the overlay is hidden.
pub fn overflow_label(number_of_files: u64, relative: usize) -> Option<String> {
    let cap = OVERFLOW_CAP as u64;
    (number_of_files > cap && relative >= OVERFLOW_CAP - 1)
        .then(|| (number_of_files - cap).to_string())
}

pub struct FolderSyncAdapter<R> {
    folders: Arc<[MediaFolder]>,
    listener: Box<dyn ClickListener>,
    resolver: R,
    /// Files whose thumbnail could not be generated; not requested again.
    failed: HashSet<PathBuf>,
    next_cell_id: u64,
    data_version: u64,
}

impl<R: ThumbnailResolver> FolderSyncAdapter<R> {
    pub fn new(listener: Box<dyn ClickListener>, resolver: R) -> Self {
        Self {
            folders: Arc::from(Vec::new()),
            listener,
            resolver,
            failed: HashSet::new(),
            next_cell_id: 0,
            data_version: 0,
        }
    }

    /// Replace the whole collection and request a full redraw.
    pub fn set_folders(&mut self, folders: Vec<MediaFolder>) {
        self.folders = Arc::from(folders);
        self.failed.clear();
        self.data_version += 1;
        debug!(
            sections = self.folders.len(),
            version = self.data_version,
            "Folder collection replaced"
        );
    }

    /// Bumped on every collection swap; hosts redraw when it changes.
    pub fn data_version(&self) -> u64 {
        self.data_version
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Forward a header button press to the listener.
    ///
    /// Returns false if the header is unbound or its section no longer exists.
    pub fn on_header_action(&mut self, header: &HeaderCell, action: HeaderAction) -> bool {
        let Some(section) = header.section() else {
            return false;
        };
        let Some(folder) = self.folders.get(section) else {
            return false;
        };

        match action {
            HeaderAction::ToggleSyncStatus => self.listener.on_sync_status_toggle(section, folder),
            HeaderAction::OpenSettings => self.listener.on_sync_folder_settings(section, folder),
        }
        true
    }

    /// Swap finished thumbnails into cells still showing the same file.
    ///
    /// A failed generation leaves the cell on the image placeholder.
    pub fn deliver_thumbnails<'a, I>(&mut self, cells: I) -> usize
    where
        I: IntoIterator<Item = &'a mut ItemCell>,
    {
        let mut ready: HashMap<CellId, ThumbnailReady> = self
            .resolver
            .poll_ready()
            .into_iter()
            .map(|r| (r.cell, r))
            .collect();
        if ready.is_empty() {
            return 0;
        }
        for result in ready.values().filter(|r| r.thumbnail.is_none()) {
            self.failed.insert(result.path.clone());
        }

        let mut applied = 0;
        for cell in cells {
            let Some(result) = ready.remove(&cell.id()) else {
                continue;
            };
            if cell.is_bound_to(&result.path) {
                cell.image = match result.thumbnail {
                    Some(thumbnail) => CellImage::Thumbnail(thumbnail),
                    None => CellImage::Icon(Icon::ImagePlaceholder),
                };
                applied += 1;
            } else {
                trace!(cell = ?cell.id(), path = ?result.path, "Cell rebound, dropping thumbnail");
            }
        }
        applied
    }

    fn bind_image(&mut self, cell: &mut ItemCell, path: &Path) {
        // Cancel before the cell's image changes, otherwise an in-flight
        // generation for the old file could still land on this cell.
        let allowed_to_create = self.resolver.cancel_potential_work(cell.id(), path);

        let is_dir = path.is_dir();
        cell.image = CellImage::Icon(if is_dir { Icon::Folder } else { Icon::File });
        cell.bind_path(path);

        if is_dir {
            return;
        }

        let kind = MediaKind::from_path(path);
        if !kind.is_image() {
            cell.image = CellImage::Icon(Icon::for_kind(kind));
            return;
        }

        if let Some(thumbnail) = self.resolver.cached(path) {
            cell.image = CellImage::Thumbnail(thumbnail);
            return;
        }

        if !ThumbnailGenerator::can_generate(path) || self.failed.contains(path) {
            cell.image = CellImage::Icon(Icon::ImagePlaceholder);
            return;
        }

        cell.image = CellImage::Loading(Icon::ImagePlaceholder);
        if allowed_to_create {
            if self.resolver.request(cell.id(), path) {
                trace!(?path, "Executing task to generate a new thumbnail");
            } else {
                cell.image = CellImage::Icon(Icon::ImagePlaceholder);
            }
        }
    }
}

impl<R: ThumbnailResolver> SectionedAdapter for FolderSyncAdapter<R> {
    fn section_count(&self) -> usize {
        self.folders.len()
    }

    fn item_count(&self, section: usize) -> usize {
        match self.folders.get(section) {
            Some(folder) => folder.file_paths().len(),
            None => panic!(
                "section {} out of range for {} folders",
                section,
                self.folders.len()
            ),
        }
    }

    fn bind_header(&mut self, cell: &mut HeaderCell, section: usize) {
        let folder = &self.folders[section];
        cell.title = folder.folder_name().to_string();
        cell.sync_toggle_visible = true;
        cell.settings_visible = true;
        cell.set_section(section);
    }

    fn bind_cell(&mut self, cell: &mut ItemCell, section: usize, relative: usize, _absolute: usize) {
        let folders = Arc::clone(&self.folders);
        let folder = &folders[section];
        let path = &folder.file_paths()[relative];

        self.bind_image(cell, path);

        match overflow_label(folder.number_of_files(), relative) {
            Some(text) => {
                cell.counter = Some(text);
                cell.darkened = true;
            }
            None => {
                cell.counter = None;
                cell.darkened = false;
            }
        }
    }

    fn create_cell(&mut self, view_type: ViewType) -> Cell {
        match view_type {
            ViewType::Header => Cell::Header(HeaderCell::default()),
            ViewType::Item => {
                let id = CellId(self.next_cell_id);
                self.next_cell_id += 1;
                Cell::Item(ItemCell::new(id))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::thumbnails::queue::CellTickets;
    use crate::thumbnails::Thumbnail;
    use image::RgbImage;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    /// In-memory resolver: requests complete only when the test says so.
    #[derive(Default)]
    pub(crate) struct FakeResolver {
        tickets: CellTickets,
        pub cached: HashMap<PathBuf, Thumbnail>,
        pub requests: Vec<(CellId, PathBuf)>,
        started: Vec<(CellId, u64, PathBuf)>,
        pub cancel_checks: Vec<(CellId, PathBuf)>,
        /// Requests for these paths complete without a thumbnail.
        pub failing: HashSet<PathBuf>,
    }

    impl FakeResolver {
        pub fn thumbnail() -> Thumbnail {
            Thumbnail::new(RgbImage::new(4, 4))
        }
    }

    impl ThumbnailResolver for FakeResolver {
        fn cancel_potential_work(&mut self, cell: CellId, path: &Path) -> bool {
            self.cancel_checks.push((cell, path.to_path_buf()));
            self.tickets.cancel_potential_work(cell, path)
        }

        fn cached(&self, path: &Path) -> Option<Thumbnail> {
            self.cached.get(path).cloned()
        }

        fn request(&mut self, cell: CellId, path: &Path) -> bool {
            let (ticket, _) = self.tickets.begin(cell, path);
            self.requests.push((cell, path.to_path_buf()));
            self.started.push((cell, ticket, path.to_path_buf()));
            true
        }

        /// Every request ever started completes now, stale ones included.
        fn poll_ready(&mut self) -> Vec<ThumbnailReady> {
            let started = std::mem::take(&mut self.started);
            started
                .into_iter()
                .filter(|(cell, ticket, _)| self.tickets.accept(*cell, *ticket))
                .map(|(cell, _, path)| ThumbnailReady {
                    cell,
                    thumbnail: (!self.failing.contains(&path)).then(Self::thumbnail),
                    path,
                })
                .collect()
        }

        fn is_busy(&self) -> bool {
            !self.tickets.is_empty()
        }
    }

    type Calls = Rc<RefCell<Vec<(HeaderAction, usize, PathBuf)>>>;

    struct RecordingListener(Calls);

    impl ClickListener for RecordingListener {
        fn on_sync_status_toggle(&mut self, section: usize, folder: &MediaFolder) {
            self.0.borrow_mut().push((
                HeaderAction::ToggleSyncStatus,
                section,
                folder.absolute_path().to_path_buf(),
            ));
        }

        fn on_sync_folder_settings(&mut self, section: usize, folder: &MediaFolder) {
            self.0.borrow_mut().push((
                HeaderAction::OpenSettings,
                section,
                folder.absolute_path().to_path_buf(),
            ));
        }
    }

    fn folder(name: &str, files: usize, number_of_files: u64) -> MediaFolder {
        let dir = PathBuf::from(format!("/media/{name}"));
        let paths = (0..files).map(|i| dir.join(format!("{i}.jpg"))).collect();
        MediaFolder::new(name, dir, paths, number_of_files)
    }

    fn adapter() -> (FolderSyncAdapter<FakeResolver>, Calls) {
        let calls: Calls = Rc::default();
        let adapter = FolderSyncAdapter::new(
            Box::new(RecordingListener(Rc::clone(&calls))),
            FakeResolver::default(),
        );
        (adapter, calls)
    }

    fn item(adapter: &mut FolderSyncAdapter<FakeResolver>) -> ItemCell {
        match adapter.create_cell(ViewType::Item) {
            Cell::Item(cell) => cell,
            Cell::Header(_) => panic!("expected an item cell"),
        }
    }

    #[test]
    fn test_counts_follow_collection() {
        let (mut adapter, _) = adapter();
        assert_eq!(adapter.section_count(), 0);
        assert_eq!(adapter.total_item_count(), 0);

        adapter.set_folders(vec![folder("a", 3, 3), folder("b", 8, 20)]);
        assert_eq!(adapter.section_count(), 2);
        assert_eq!(adapter.item_count(0), 3);
        assert_eq!(adapter.item_count(1), 8);
        assert_eq!(adapter.total_item_count(), 13);
        assert_eq!(adapter.layout().total_count(), 13);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_item_count_out_of_range_panics() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("a", 1, 1)]);
        adapter.item_count(1);
    }

    #[test]
    fn test_set_folders_swaps_whole_collection() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("a", 1, 1), folder("b", 2, 2)]);
        let before = Arc::clone(&adapter.folders);
        let version = adapter.data_version();

        adapter.set_folders(vec![folder("c", 5, 5)]);

        assert_eq!(before.len(), 2);
        assert_eq!(before[1].folder_name(), "b");
        assert_eq!(adapter.folders.len(), 1);
        assert_eq!(adapter.data_version(), version + 1);
    }

    #[test]
    fn test_bind_header() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("Camera", 1, 1)]);
        let mut header = HeaderCell::default();
        adapter.bind_header(&mut header, 0);

        assert_eq!(header.title, "Camera");
        assert!(header.sync_toggle_visible);
        assert!(header.settings_visible);
        assert_eq!(header.section(), Some(0));
    }

    #[test]
    fn test_header_action_invokes_listener_once() {
        let (mut adapter, calls) = adapter();
        adapter.set_folders(vec![folder("a", 1, 1), folder("b", 1, 1)]);
        let mut header = HeaderCell::default();
        adapter.bind_header(&mut header, 1);

        assert!(adapter.on_header_action(&header, HeaderAction::ToggleSyncStatus));
        assert_eq!(
            calls.borrow().as_slice(),
            &[(HeaderAction::ToggleSyncStatus, 1, PathBuf::from("/media/b"))]
        );

        assert!(adapter.on_header_action(&header, HeaderAction::OpenSettings));
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(calls.borrow()[1].0, HeaderAction::OpenSettings);
        assert_eq!(adapter.section_count(), 2);
    }

    #[test]
    fn test_header_action_on_unbound_or_stale_header() {
        let (mut adapter, calls) = adapter();
        adapter.set_folders(vec![folder("a", 1, 1), folder("b", 1, 1)]);
        assert!(!adapter.on_header_action(&HeaderCell::default(), HeaderAction::OpenSettings));

        let mut header = HeaderCell::default();
        adapter.bind_header(&mut header, 1);
        adapter.set_folders(vec![folder("a", 1, 1)]);
        assert!(!adapter.on_header_action(&header, HeaderAction::OpenSettings));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_overflow_label() {
        assert_eq!(overflow_label(10, 7), Some("2".to_string()));
        assert_eq!(overflow_label(10, 6), None);
        assert_eq!(overflow_label(8, 7), None);
        assert_eq!(overflow_label(9, 8), Some("1".to_string()));
    }

    #[test]
    fn test_overflow_overlay_on_last_visible_cell() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("a", 8, 10)]);

        for relative in 0..8 {
            let mut cell = item(&mut adapter);
            adapter.bind_cell(&mut cell, 0, relative, relative + 1);
            if relative == 7 {
                assert_eq!(cell.counter.as_deref(), Some("2"));
                assert!(cell.darkened);
            } else {
                assert!(cell.counter.is_none());
                assert!(!cell.darkened);
            }
        }
    }

    #[test]
    fn test_rebinding_clears_overlay() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("a", 8, 10), folder("b", 8, 8)]);
        let mut cell = item(&mut adapter);

        adapter.bind_cell(&mut cell, 0, 7, 8);
        assert!(cell.counter.is_some());
        adapter.bind_cell(&mut cell, 1, 7, 17);
        assert!(cell.counter.is_none());
        assert!(!cell.darkened);
    }

    #[test]
    fn test_bind_cell_classifies_files() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let paths = vec![
            sub.clone(),
            dir.path().join("clip.mp4"),
            dir.path().join("song.mp3"),
            dir.path().join("photo.jpg"),
            dir.path().join("cached.png"),
        ];
        let (mut adapter, _) = adapter();
        adapter
            .resolver
            .cached
            .insert(paths[4].clone(), FakeResolver::thumbnail());
        adapter.set_folders(vec![MediaFolder::from_path(dir.path(), paths.clone(), 5)]);

        let mut images = Vec::new();
        for relative in 0..5 {
            let mut cell = item(&mut adapter);
            adapter.bind_cell(&mut cell, 0, relative, relative + 1);
            assert!(cell.is_bound_to(&paths[relative]));
            images.push(cell.image);
        }

        assert!(matches!(images[0], CellImage::Icon(Icon::Folder)));
        assert!(matches!(images[1], CellImage::Icon(Icon::VideoPlaceholder)));
        assert!(matches!(images[2], CellImage::Icon(Icon::Audio)));
        assert!(matches!(images[3], CellImage::Loading(Icon::ImagePlaceholder)));
        assert!(matches!(images[4], CellImage::Thumbnail(_)));
        assert_eq!(adapter.resolver.requests.len(), 1);
        assert_eq!(adapter.resolver.requests[0].1, paths[3]);
    }

    #[test]
    fn test_rebinding_same_file_does_not_restart_generation() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("a", 2, 2)]);
        let mut cell = item(&mut adapter);

        adapter.bind_cell(&mut cell, 0, 0, 1);
        adapter.bind_cell(&mut cell, 0, 0, 1);

        assert_eq!(adapter.resolver.requests.len(), 1);
        assert!(matches!(cell.image, CellImage::Loading(_)));
    }

    #[test]
    fn test_reused_cell_never_shows_stale_thumbnail() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("a", 2, 2)]);
        let mut cell = item(&mut adapter);
        let folders = Arc::clone(&adapter.folders);
        let a = folders[0].file_paths()[0].clone();
        let b = folders[0].file_paths()[1].clone();

        adapter.bind_cell(&mut cell, 0, 0, 1);
        adapter.bind_cell(&mut cell, 0, 1, 2);

        // The cancel check for B ran before B's request was issued.
        assert_eq!(adapter.resolver.cancel_checks.last().unwrap().1, b);
        assert_eq!(
            adapter.resolver.requests,
            vec![(cell.id(), a), (cell.id(), b.clone())]
        );

        let applied = adapter.deliver_thumbnails(std::iter::once(&mut cell));
        assert_eq!(applied, 1);
        assert!(matches!(cell.image, CellImage::Thumbnail(_)));
        assert!(cell.is_bound_to(&b));
    }

    #[test]
    fn test_failed_thumbnail_degrades_to_placeholder() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("a", 1, 1)]);
        let path = adapter.folders[0].file_paths()[0].clone();
        adapter.resolver.failing.insert(path.clone());
        let mut cell = item(&mut adapter);

        adapter.bind_cell(&mut cell, 0, 0, 1);
        assert!(matches!(cell.image, CellImage::Loading(_)));

        let applied = adapter.deliver_thumbnails(std::iter::once(&mut cell));
        assert_eq!(applied, 1);
        assert!(matches!(cell.image, CellImage::Icon(Icon::ImagePlaceholder)));

        // Scrolling back to the file does not queue the failing job again.
        adapter.bind_cell(&mut cell, 0, 0, 1);
        assert!(matches!(cell.image, CellImage::Icon(Icon::ImagePlaceholder)));
        assert_eq!(adapter.resolver.requests.len(), 1);
        assert!(!adapter.resolver.is_busy());
    }

    #[test]
    fn test_undecodable_image_format_is_not_requested() {
        let (mut adapter, _) = adapter();
        let dir = PathBuf::from("/media/phone");
        let paths = vec![dir.join("x.heic")];
        adapter.set_folders(vec![MediaFolder::new("phone", dir, paths, 1)]);
        let mut cell = item(&mut adapter);

        adapter.bind_cell(&mut cell, 0, 0, 1);

        assert!(matches!(cell.image, CellImage::Icon(Icon::ImagePlaceholder)));
        assert!(adapter.resolver.requests.is_empty());
    }

    #[test]
    fn test_broken_file_over_worker_queue_settles_on_placeholder() {
        use crate::thumbnails::cache::ThumbnailCache;
        use crate::thumbnails::ThumbnailQueue;
        use std::time::{Duration, Instant};

        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();

        let cache = ThumbnailCache::new(dir.path().join("thumbs"), 16);
        let queue = ThumbnailQueue::with_cache(1, cache).unwrap();
        let mut adapter = FolderSyncAdapter::new(
            Box::new(RecordingListener(Rc::default())),
            queue,
        );
        adapter.set_folders(vec![MediaFolder::from_path(dir.path(), vec![broken.clone()], 1)]);
        let mut cell = match adapter.create_cell(ViewType::Item) {
            Cell::Item(cell) => cell,
            Cell::Header(_) => panic!("expected an item cell"),
        };

        for _ in 0..2 {
            adapter.bind_cell(&mut cell, 0, 0, 1);
            let deadline = Instant::now() + Duration::from_secs(10);
            while adapter.resolver().is_busy() && Instant::now() < deadline {
                adapter.deliver_thumbnails(std::iter::once(&mut cell));
                std::thread::sleep(Duration::from_millis(5));
            }
            adapter.deliver_thumbnails(std::iter::once(&mut cell));

            assert!(!adapter.resolver().is_busy());
            assert!(matches!(cell.image, CellImage::Icon(Icon::ImagePlaceholder)));
        }
    }

    #[test]
    fn test_deliver_skips_cells_bound_elsewhere() {
        let (mut adapter, _) = adapter();
        adapter.set_folders(vec![folder("a", 1, 1)]);
        let mut cell = item(&mut adapter);
        adapter.bind_cell(&mut cell, 0, 0, 1);

        // Simulate a host that rebinds the cell without going through the adapter.
        cell.bind_path(Path::new("/elsewhere.jpg"));
        let applied = adapter.deliver_thumbnails(std::iter::once(&mut cell));
        assert_eq!(applied, 0);
        assert!(!matches!(cell.image, CellImage::Thumbnail(_)));
    }
}
