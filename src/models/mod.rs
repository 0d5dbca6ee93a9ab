pub mod media_folder;
pub mod media_index;
pub mod media_kind;

pub use media_folder::*;
pub use media_index::*;
pub use media_kind::*;
