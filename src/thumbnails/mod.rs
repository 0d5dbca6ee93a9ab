//! Thumbnail pipeline for the folder grid.
//!
//! This module provides:
//! - `ThumbnailGenerator` - Generates thumbnails from source images
//! - `ThumbnailCache` - Disk and memory caching with LRU eviction
//! - `ThumbnailQueue` - Worker queue with per-cell cancellation

pub mod cache;
pub mod generator;
pub mod queue;

pub use cache::Thumbnail;
pub use queue::{CellId, ThumbnailQueue, ThumbnailReady, ThumbnailResolver};
