//! Presentation-thread job queue and worker handoff.
//!
//! The presentation context `C` is owned by a single thread. Other threads never
//! touch it directly; they post jobs through a [`MainHandle`] and the owning
//! thread runs them with `&mut C` when it drains the [`MainQueue`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{trace, warn};

use crate::error::TaskError;

/// A unit of work executed on the presentation thread.
pub type Job<C> = Box<dyn FnOnce(&mut C) + Send>;

/// Queue of jobs for the presentation context `C`.
pub struct MainQueue<C> {
    tx: Sender<Job<C>>,
    rx: Receiver<Job<C>>,
}

impl<C> MainQueue<C> {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    /// A cloneable handle other threads use to post jobs.
    pub fn handle(&self) -> MainHandle<C> {
        MainHandle {
            tx: self.tx.clone(),
        }
    }

    /// Runs every job queued so far. Returns how many ran.
    pub fn drain(&self, ctx: &mut C) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job(ctx);
            ran += 1;
        }
        ran
    }

    /// Runs jobs as they arrive until `done(ctx)` holds or `timeout` elapses.
    ///
    /// Returns whether the condition was reached.
    pub fn run_until<F>(&self, ctx: &mut C, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut(&C) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.drain(ctx);
            if done(ctx) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(job) => job(ctx),
                Err(RecvTimeoutError::Timeout) => return done(ctx),
                // The queue owns a sender, so this only happens during teardown.
                Err(RecvTimeoutError::Disconnected) => return done(ctx),
            }
        }
    }
}

impl<C> Default for MainQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending side of a [`MainQueue`].
pub struct MainHandle<C> {
    tx: Sender<Job<C>>,
}

impl<C> Clone for MainHandle<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C> MainHandle<C> {
    /// Queues `job` for the presentation thread. Returns false if the queue is gone.
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.tx.send(Box::new(job)).is_ok()
    }
}

/// Runs `work` on a named thread and posts `deliver` with its outcome exactly once.
///
/// A panic in `work` is caught and delivered as [`TaskError::Panicked`].
pub fn spawn_worker<C, T, W, D>(
    name: &str,
    handle: MainHandle<C>,
    work: W,
    deliver: D,
) -> std::io::Result<JoinHandle<()>>
where
    C: 'static,
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
    D: FnOnce(&mut C, Result<T, TaskError>) + Send + 'static,
{
    let task_name = name.to_string();
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(work))
            .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
        trace!(task = %task_name, "Worker finished, posting result");
        if !handle.post(move |ctx| deliver(ctx, outcome)) {
            warn!(task = %task_name, "{}", TaskError::Disconnected);
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
