use std::path::{Path, PathBuf};

/// Number of cells a folder section shows before the "+N" overlay takes over.
pub const OVERFLOW_CAP: usize = 8;

/// A directory holding syncable media, as listed on the folder sync screen.
///
/// `file_paths` is the preview shown in the grid (newest first, at most
/// [`OVERFLOW_CAP`] entries when built by the lister). `number_of_files` is
/// the real total and may be larger than the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFolder {
    folder_name: String,
    absolute_path: PathBuf,
    file_paths: Vec<PathBuf>,
    number_of_files: u64,
}

impl MediaFolder {
    pub fn new(
        folder_name: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        file_paths: Vec<PathBuf>,
        number_of_files: u64,
    ) -> Self {
        Self {
            folder_name: folder_name.into(),
            absolute_path: absolute_path.into(),
            file_paths,
            number_of_files,
        }
    }

    /// Build a folder from a path, deriving the display name from its last component.
    pub fn from_path(absolute_path: &Path, file_paths: Vec<PathBuf>, number_of_files: u64) -> Self {
        let folder_name = absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| absolute_path.to_string_lossy().into_owned());
        Self::new(folder_name, absolute_path, file_paths, number_of_files)
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    pub fn file_paths(&self) -> &[PathBuf] {
        &self.file_paths
    }

    pub fn number_of_files(&self) -> u64 {
        self.number_of_files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_uses_last_component() {
        let folder = MediaFolder::from_path(Path::new("/home/u/Pictures/Camera"), Vec::new(), 0);
        assert_eq!(folder.folder_name(), "Camera");
        assert_eq!(folder.absolute_path(), Path::new("/home/u/Pictures/Camera"));
    }

    #[test]
    fn test_from_path_root() {
        let folder = MediaFolder::from_path(Path::new("/"), Vec::new(), 0);
        assert_eq!(folder.folder_name(), "/");
    }
}
