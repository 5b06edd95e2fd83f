use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("storage volume {} not available", .0.display())]
    StorageUnavailable(PathBuf),
    #[error("cannot create log directory {}: {}", .path.display(), .source)]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot create track file {}: {}", .path.display(), .source)]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("name {0:?} does not fit the 8.3 short-name limit")]
    NameTooLong(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
