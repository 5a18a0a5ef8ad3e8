//! Error types for the storage sink.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while preparing the destination or writing a file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The destination directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Creating, writing, flushing or renaming the file failed.
    #[error("IO error writing to {path}: {source}")]
    Write {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The source stream failed before all bytes were copied.
    #[error("stream interrupted while writing {path}: {source}")]
    Stream {
        /// The file that was being written.
        path: PathBuf,
        /// The read error reported by the stream.
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Creates a directory creation error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a stream interruption error.
    pub fn stream(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Stream {
            path: path.into(),
            source,
        }
    }
}
