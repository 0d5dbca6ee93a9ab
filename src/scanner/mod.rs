pub mod file_scanner;
pub mod folder_lister;

pub use folder_lister::{FolderLister, FolderSource};
