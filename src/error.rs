use thiserror::Error;

/// Failure of a job run off the presentation thread.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("worker panicked: {0}")]
    Panicked(String),
    #[error("presentation queue closed before delivery")]
    Disconnected,
    #[error("failed to start worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Failure to enumerate media folders.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no media roots configured")]
    NoRoots,
    #[error("media index unavailable: {0:#}")]
    Index(anyhow::Error),
    #[error("media scan failed: {0:#}")]
    Scan(anyhow::Error),
    #[error(transparent)]
    Worker(#[from] TaskError),
}
