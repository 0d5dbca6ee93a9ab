// View state of the two cell kinds in the folder grid.
// Cells are plain data; the adapter writes them and a renderer reads them.

use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::layout::ViewType;
use crate::models::Icon;
use crate::thumbnails::{CellId, Thumbnail};

/// What the image slot of an item cell currently shows.
#[derive(Debug, Clone)]
pub enum CellImage {
    Icon(Icon),
    /// Placeholder shown while a thumbnail is being generated.
    Loading(Icon),
    Thumbnail(Thumbnail),
}

/// Section header: folder title plus the sync toggle and settings buttons.
#[derive(Debug, Clone, Default)]
pub struct HeaderCell {
    pub title: String,
    pub sync_toggle_visible: bool,
    pub settings_visible: bool,
    section: Option<usize>,
}

impl HeaderCell {
    /// Section this header was last bound to.
    pub fn section(&self) -> Option<usize> {
        self.section
    }

    pub(crate) fn set_section(&mut self, section: usize) {
        self.section = Some(section);
    }
}

/// One file of a folder section.
#[derive(Debug, Clone)]
pub struct ItemCell {
    id: CellId,
    pub image: CellImage,
    /// Text of the "+N" overlay; `None` hides the overlay.
    pub counter: Option<String>,
    /// Whether the thumbnail is dimmed under the overlay.
    pub darkened: bool,
    tag: Option<u64>,
    bound_path: Option<PathBuf>,
}

impl ItemCell {
    pub fn new(id: CellId) -> Self {
        Self {
            id,
            image: CellImage::Icon(Icon::File),
            counter: None,
            darkened: false,
            tag: None,
            bound_path: None,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn is_bound_to(&self, path: &Path) -> bool {
        self.tag == Some(path_tag(path)) && self.bound_path.as_deref() == Some(path)
    }

    pub(crate) fn bind_path(&mut self, path: &Path) {
        self.tag = Some(path_tag(path));
        self.bound_path = Some(path.to_path_buf());
    }
}

/// A freshly created cell shell.
#[derive(Debug, Clone)]
pub enum Cell {
    Header(HeaderCell),
    Item(ItemCell),
}

impl Cell {
    pub fn view_type(&self) -> ViewType {
        match self {
            Self::Header(_) => ViewType::Header,
            Self::Item(_) => ViewType::Item,
        }
    }
}

pub fn path_tag(path: &Path) -> u64 {
    xxh3_64(path.to_string_lossy().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_cell_is_unbound() {
        let cell = ItemCell::new(CellId(3));
        assert_eq!(cell.id(), CellId(3));
        assert!(cell.tag.is_none());
        assert!(!cell.is_bound_to(Path::new("")));
        assert!(cell.counter.is_none());
        assert!(!cell.darkened);
    }

    #[test]
    fn test_bind_path_sets_tag() {
        let mut cell = ItemCell::new(CellId(0));
        cell.bind_path(Path::new("/a/b.jpg"));
        assert!(cell.is_bound_to(Path::new("/a/b.jpg")));
        assert!(!cell.is_bound_to(Path::new("/a/c.jpg")));
        assert_eq!(cell.tag, Some(path_tag(Path::new("/a/b.jpg"))));
    }

    #[test]
    fn test_cell_view_type() {
        assert_eq!(Cell::Header(HeaderCell::default()).view_type(), ViewType::Header);
        assert_eq!(Cell::Item(ItemCell::new(CellId(0))).view_type(), ViewType::Item);
    }
}
