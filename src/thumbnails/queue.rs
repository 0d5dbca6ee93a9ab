//! Thumbnail worker queue with per-cell cancellation.
//!
//! - Bounded worker pool for thumbnail generation
//! - Every request is tied to the grid cell that asked for it through a ticket
//! - Results are polled on the presentation thread; a result whose ticket is no
//!   longer current for its cell is discarded, so a recycled cell never shows
//!   the thumbnail of the file it displayed before
//! - Uses flume for communication between workers and the presentation thread

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use flume::{Receiver, Sender};
use tracing::{debug, error, trace, warn};

use super::cache::{CacheKey, Thumbnail, ThumbnailCache};
use crate::config::ThumbnailConfig;

/// Maximum number of worker threads.
const MAX_WORKERS: usize = 4;

/// Maximum number of pending requests in the queue.
const MAX_QUEUE_SIZE: usize = 256;

/// Identity of a recycled item cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub u64);

/// A finished request that is still wanted by its cell.
#[derive(Debug, Clone)]
pub struct ThumbnailReady {
    pub cell: CellId,
    pub path: PathBuf,
    /// `None` if the file could not be turned into a thumbnail.
    pub thumbnail: Option<Thumbnail>,
}

/// What the grid adapter needs from a thumbnail provider.
pub trait ThumbnailResolver {
    /// Cancel in-flight work on `cell` unless it is already generating `path`.
    ///
    /// Returns true if the caller may start new work for `path` on this cell,
    /// false if generation for the same file is already running there.
    /// Must be called before the cell's image changes.
    fn cancel_potential_work(&mut self, cell: CellId, path: &Path) -> bool;

    /// Memory or disk cache lookup; never generates.
    fn cached(&self, path: &Path) -> Option<Thumbnail>;

    /// Start asynchronous generation of `path` for `cell`.
    fn request(&mut self, cell: CellId, path: &Path) -> bool;

    /// Collect completed requests, failures included, whose cell still wants them.
    fn poll_ready(&mut self) -> Vec<ThumbnailReady>;

    /// Whether any generation is still outstanding.
    fn is_busy(&self) -> bool;
}

#[derive(Debug)]
struct InFlight {
    path: PathBuf,
    ticket: u64,
    cancelled: Arc<AtomicBool>,
}

/// Tracks the single current piece of thumbnail work per cell.
#[derive(Debug, Default)]
pub struct CellTickets {
    next_ticket: u64,
    in_flight: HashMap<CellId, InFlight>,
}

impl CellTickets {
    pub fn cancel_potential_work(&mut self, cell: CellId, path: &Path) -> bool {
        match self.in_flight.get(&cell) {
            Some(current) if current.path == path => false,
            Some(_) => {
                self.cancel(cell);
                true
            }
            None => true,
        }
    }

    /// Register new work for `cell`, cancelling whatever it had before.
    pub fn begin(&mut self, cell: CellId, path: &Path) -> (u64, Arc<AtomicBool>) {
        self.cancel(cell);
        self.next_ticket += 1;
        let cancelled = Arc::new(AtomicBool::new(false));
        self.in_flight.insert(
            cell,
            InFlight {
                path: path.to_path_buf(),
                ticket: self.next_ticket,
                cancelled: Arc::clone(&cancelled),
            },
        );
        (self.next_ticket, cancelled)
    }

    /// Consume the ticket if it is still current for `cell`.
    pub fn accept(&mut self, cell: CellId, ticket: u64) -> bool {
        match self.in_flight.get(&cell) {
            Some(current) if current.ticket == ticket => {
                self.in_flight.remove(&cell);
                true
            }
            _ => false,
        }
    }

    /// Forget the ticket without marking it cancelled (the request never left).
    pub fn abandon(&mut self, cell: CellId, ticket: u64) {
        if self.in_flight.get(&cell).is_some_and(|c| c.ticket == ticket) {
            self.in_flight.remove(&cell);
        }
    }

    pub fn cancel(&mut self, cell: CellId) {
        if let Some(old) = self.in_flight.remove(&cell) {
            old.cancelled.store(true, Ordering::Relaxed);
            trace!(?cell, path = ?old.path, "Cancelled thumbnail work");
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, old) in self.in_flight.drain() {
            old.cancelled.store(true, Ordering::Relaxed);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// A request to generate a thumbnail.
#[derive(Debug)]
struct ThumbnailRequest {
    cell: CellId,
    ticket: u64,
    path: PathBuf,
    key: CacheKey,
    cancelled: Arc<AtomicBool>,
}

/// Outcome of one request, sent back to the presentation thread.
#[derive(Debug)]
struct ThumbnailResult {
    cell: CellId,
    ticket: u64,
    path: PathBuf,
    thumbnail: Option<Thumbnail>,
}

/// Worker queue for thumbnail generation.
pub struct ThumbnailQueue {
    request_tx: Option<Sender<ThumbnailRequest>>,
    result_rx: Receiver<ThumbnailResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    tickets: CellTickets,
    cache: ThumbnailCache,
}

impl ThumbnailQueue {
    /// Build a queue and its cache from configuration.
    pub fn from_config(config: &ThumbnailConfig) -> Result<Self> {
        let cache = match &config.cache_dir {
            Some(dir) => ThumbnailCache::new(dir.clone(), config.max_memory_mb),
            None => ThumbnailCache::new_default(config.max_memory_mb)
                .context("Failed to set up thumbnail cache")?,
        };
        cache.set_thumb_size(config.thumb_size);
        Self::with_cache(config.workers, cache)
    }

    /// Create a queue with `workers` generator threads over `cache`.
    pub fn with_cache(workers: usize, cache: ThumbnailCache) -> Result<Self> {
        let num_workers = workers.clamp(1, MAX_WORKERS);

        let (request_tx, request_rx) = flume::bounded(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));

        let mut worker_handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let cache = cache.clone();

            let handle = thread::Builder::new()
                .name(format!("thumb-worker-{}", worker_id))
                .spawn(move || worker_loop(worker_id, rx, tx, shutdown, cache))
                .context("Failed to spawn thumbnail worker")?;
            worker_handles.push(handle);
        }

        debug!(num_workers, "Started thumbnail worker queue");

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            workers: worker_handles,
            shutdown,
            tickets: CellTickets::default(),
            cache,
        })
    }

    pub fn shutdown(&mut self) {
        debug!("Shutting down thumbnail queue");
        self.shutdown.store(true, Ordering::SeqCst);
        self.tickets.cancel_all();
        self.request_tx = None;

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }

        debug!("Thumbnail queue shutdown complete");
    }
}

impl ThumbnailResolver for ThumbnailQueue {
    fn cancel_potential_work(&mut self, cell: CellId, path: &Path) -> bool {
        self.tickets.cancel_potential_work(cell, path)
    }

    fn cached(&self, path: &Path) -> Option<Thumbnail> {
        self.cache.get_cached(&CacheKey::for_file(path))
    }

    fn request(&mut self, cell: CellId, path: &Path) -> bool {
        let Some(request_tx) = &self.request_tx else {
            return false;
        };

        let (ticket, cancelled) = self.tickets.begin(cell, path);
        let req = ThumbnailRequest {
            cell,
            ticket,
            path: path.to_path_buf(),
            key: CacheKey::for_file(path),
            cancelled,
        };

        match request_tx.try_send(req) {
            Ok(()) => {
                trace!(?cell, ?path, ticket, "Queued thumbnail request");
                true
            }
            Err(flume::TrySendError::Full(req)) => {
                warn!("Thumbnail queue full, dropping request");
                self.tickets.abandon(req.cell, req.ticket);
                false
            }
            Err(flume::TrySendError::Disconnected(req)) => {
                error!("Thumbnail queue disconnected");
                self.tickets.abandon(req.cell, req.ticket);
                false
            }
        }
    }

    fn poll_ready(&mut self) -> Vec<ThumbnailReady> {
        let mut ready = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            if !self.tickets.accept(result.cell, result.ticket) {
                trace!(cell = ?result.cell, path = ?result.path, "Discarding stale thumbnail");
                continue;
            }
            ready.push(ThumbnailReady {
                cell: result.cell,
                path: result.path,
                thumbnail: result.thumbnail,
            });
        }
        ready
    }

    fn is_busy(&self) -> bool {
        !self.tickets.is_empty()
    }
}

impl Drop for ThumbnailQueue {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Relaxed) {
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<ThumbnailRequest>,
    tx: Sender<ThumbnailResult>,
    shutdown: Arc<AtomicBool>,
    cache: ThumbnailCache,
) {
    debug!(worker_id, "Thumbnail worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(req) => {
                if req.cancelled.load(Ordering::Relaxed) {
                    trace!(worker_id, path = ?req.path, "Skipping cancelled request");
                    continue;
                }

                let thumbnail = match cache.get_or_generate(&req.path, &req.key) {
                    Ok(thumbnail) => Some(thumbnail),
                    Err(e) => {
                        warn!(path = ?req.path, error = ?e, "Failed to generate thumbnail");
                        None
                    }
                };

                // The thumbnail stays cached for whoever asks next.
                if req.cancelled.load(Ordering::Relaxed) {
                    continue;
                }

                let result = ThumbnailResult {
                    cell: req.cell,
                    ticket: req.ticket,
                    path: req.path,
                    thumbnail,
                };
                if let Err(e) = tx.send(result) {
                    warn!(worker_id, error = ?e, "Failed to send thumbnail result");
                }
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Thumbnail worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::time::Instant;
    use tempfile::tempdir;

    fn write_png(path: &Path) {
        RgbImage::from_pixel(64, 48, image::Rgb([0, 0, 255]))
            .save(path)
            .unwrap();
    }

    fn wait_idle(queue: &mut ThumbnailQueue) -> Vec<ThumbnailReady> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut ready = Vec::new();
        while queue.is_busy() && Instant::now() < deadline {
            ready.extend(queue.poll_ready());
            thread::sleep(Duration::from_millis(5));
        }
        ready.extend(queue.poll_ready());
        ready
    }

    #[test]
    fn test_same_path_is_not_restarted() {
        let mut tickets = CellTickets::default();
        let a = Path::new("/a.jpg");
        assert!(tickets.cancel_potential_work(CellId(1), a));
        tickets.begin(CellId(1), a);
        assert!(!tickets.cancel_potential_work(CellId(1), a));
        assert_eq!(tickets.in_flight.len(), 1);
    }

    #[test]
    fn test_new_path_cancels_previous_work() {
        let mut tickets = CellTickets::default();
        let (ticket_a, cancelled_a) = tickets.begin(CellId(1), Path::new("/a.jpg"));

        assert!(tickets.cancel_potential_work(CellId(1), Path::new("/b.jpg")));
        assert!(cancelled_a.load(Ordering::Relaxed));

        let (ticket_b, cancelled_b) = tickets.begin(CellId(1), Path::new("/b.jpg"));
        // A late result for A must not land on the cell now showing B.
        assert!(!tickets.accept(CellId(1), ticket_a));
        assert!(!cancelled_b.load(Ordering::Relaxed));
        assert!(tickets.accept(CellId(1), ticket_b));
        assert!(tickets.is_empty());
    }

    #[test]
    fn test_tickets_are_per_cell() {
        let mut tickets = CellTickets::default();
        let (t1, _) = tickets.begin(CellId(1), Path::new("/a.jpg"));
        let (t2, _) = tickets.begin(CellId(2), Path::new("/a.jpg"));
        assert!(!tickets.accept(CellId(2), t1));
        assert!(tickets.accept(CellId(1), t1));
        assert!(tickets.accept(CellId(2), t2));
    }

    #[test]
    fn test_abandon_only_matching_ticket() {
        let mut tickets = CellTickets::default();
        let (t1, _) = tickets.begin(CellId(1), Path::new("/a.jpg"));
        tickets.abandon(CellId(1), t1 + 1);
        assert_eq!(tickets.in_flight.len(), 1);
        tickets.abandon(CellId(1), t1);
        assert!(tickets.is_empty());
    }

    #[test]
    fn test_queue_generates_and_caches() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src);

        let cache = ThumbnailCache::new(dir.path().join("thumbs"), 16);
        let mut queue = ThumbnailQueue::with_cache(1, cache).unwrap();

        assert!(queue.cached(&src).is_none());
        assert!(queue.request(CellId(7), &src));
        let ready = wait_idle(&mut queue);

        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].cell, CellId(7));
        assert_eq!(ready[0].path, src);
        assert!(queue.cached(&src).is_some());
    }

    #[test]
    fn test_reused_cell_only_receives_latest_file() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_png(&a);
        write_png(&b);

        let cache = ThumbnailCache::new(dir.path().join("thumbs"), 16);
        let mut queue = ThumbnailQueue::with_cache(2, cache).unwrap();

        assert!(queue.request(CellId(1), &a));
        assert!(queue.cancel_potential_work(CellId(1), &b));
        assert!(queue.request(CellId(1), &b));

        let ready = wait_idle(&mut queue);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].path, b);
    }

    #[test]
    fn test_failed_generation_clears_ticket() {
        let dir = tempdir().unwrap();
        let bogus = dir.path().join("broken.png");
        std::fs::write(&bogus, b"not an image").unwrap();

        let cache = ThumbnailCache::new(dir.path().join("thumbs"), 16);
        let mut queue = ThumbnailQueue::with_cache(1, cache).unwrap();
        assert!(queue.request(CellId(3), &bogus));

        let ready = wait_idle(&mut queue);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].cell, CellId(3));
        assert!(ready[0].thumbnail.is_none());
        assert!(!queue.is_busy());
    }
}
