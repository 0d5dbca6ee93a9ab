pub mod adapter;
pub mod cells;
pub mod folder_sync_adapter;
pub mod folder_sync_screen;
pub mod grid_view;
pub mod listener;
pub mod navigation;
pub mod text_render;

pub use folder_sync_screen::FolderSyncScreen;
pub use listener::HeaderAction;
pub use text_render::TextGridRenderer;
