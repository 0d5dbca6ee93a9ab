use std::path::Path;

/// Coarse classification of a file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Text,
    Document,
    Archive,
    Other,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tiff" | "tif" | "heic" => {
                Self::Image
            }
            "webm" | "mp4" | "mkv" | "avi" | "mov" | "3gp" | "m4v" => Self::Video,
            "mp3" | "ogg" | "flac" | "wav" | "m4a" | "aac" | "opus" => Self::Audio,
            "txt" | "md" | "csv" | "log" | "json" | "xml" | "html" => Self::Text,
            "pdf" | "doc" | "docx" | "odt" | "xls" | "xlsx" | "ods" | "ppt" | "pptx" | "odp" => {
                Self::Document
            }
            "zip" | "tar" | "gz" | "7z" | "rar" | "xz" | "bz2" => Self::Archive,
            _ => Self::Other,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Other)
    }

    pub fn is_image(self) -> bool {
        self == Self::Image
    }

    pub fn is_video(self) -> bool {
        self == Self::Video
    }
}

/// Icons a grid cell can show instead of (or before) a thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Icon {
    Folder,
    File,
    ImagePlaceholder,
    VideoPlaceholder,
    Audio,
    Text,
    Document,
    Archive,
}

impl Icon {
    /// File-type icon for a non-thumbnailed file.
    pub fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Self::ImagePlaceholder,
            MediaKind::Video => Self::VideoPlaceholder,
            MediaKind::Audio => Self::Audio,
            MediaKind::Text => Self::Text,
            MediaKind::Document => Self::Document,
            MediaKind::Archive => Self::Archive,
            MediaKind::Other => Self::File,
        }
    }

    /// Short glyph used by the text renderer.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Folder => "[dir]",
            Self::File => "[file]",
            Self::ImagePlaceholder => "[img…]",
            Self::VideoPlaceholder => "[video]",
            Self::Audio => "[audio]",
            Self::Text => "[text]",
            Self::Document => "[doc]",
            Self::Archive => "[zip]",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension_is_case_insensitive() {
        assert_eq!(MediaKind::from_extension("JPG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("Mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("unknown"), MediaKind::Other);
    }

    #[test]
    fn test_from_path_without_extension() {
        assert_eq!(MediaKind::from_path(Path::new("/a/README")), MediaKind::Other);
        assert_eq!(MediaKind::from_path(Path::new("/a/b.pdf")), MediaKind::Document);
    }

    #[test]
    fn test_media_kinds() {
        assert!(MediaKind::Image.is_image());
        assert!(MediaKind::Video.is_video());
        assert!(!MediaKind::Audio.is_image());
        assert!(!MediaKind::Audio.is_video());
    }

    #[test]
    fn test_icon_for_kind() {
        assert_eq!(Icon::for_kind(MediaKind::Other), Icon::File);
        assert_eq!(Icon::for_kind(MediaKind::Video), Icon::VideoPlaceholder);
    }
}
