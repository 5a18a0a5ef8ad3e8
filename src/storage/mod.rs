//! Destination directory management and serialized file writes.
//!
//! The [`StorageSink`] owns one destination directory. Writers share it
//! through an `Arc`; every [`StorageSink::persist`] call takes the sink's
//! exclusive section for exactly the create + copy + rename of one file, so
//! concurrent workers never interleave filesystem writes.
//!
//! Files are copied into a hidden `.<name>.part` sibling and renamed into
//! place only after the last byte is flushed. A failed copy removes the
//! partial file, so every stored file is either complete or absent.

mod error;
mod filename;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub use error::StorageError;
pub use filename::{FILE_EXTENSION, FilenamePolicy};
pub(crate) use filename::sanitize_filename;

/// A file written by the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Final location of the file.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
}

/// Writes named byte streams into one destination directory.
#[derive(Debug)]
pub struct StorageSink {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl StorageSink {
    /// Creates a sink for `root`. Nothing is touched on disk until
    /// [`ensure_directory`](Self::ensure_directory) or [`persist`](Self::persist).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates the destination directory, including parents, if it is missing.
    ///
    /// Calling this on an existing directory is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::CreateDir`] if the directory cannot be created
    /// (for example when a regular file already occupies the path).
    #[instrument(skip(self), fields(path = %self.root.display()))]
    pub async fn ensure_directory(&self) -> Result<(), StorageError> {
        if tokio::fs::metadata(&self.root)
            .await
            .is_ok_and(|meta| meta.is_dir())
        {
            debug!("destination directory already exists");
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::create_dir(&self.root, e))?;
        info!("created destination directory");
        Ok(())
    }

    /// Copies `stream` into `<root>/<filename>`, overwriting any existing file.
    ///
    /// The filename is sanitized first so it cannot leave the destination
    /// directory.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Stream`] if the stream yields an error
    /// - [`StorageError::Write`] if the file cannot be created, written or renamed
    ///
    /// In both cases no file is left at the target name by this call.
    #[instrument(skip(self, stream), fields(dir = %self.root.display()))]
    pub async fn persist<S>(&self, filename: &str, stream: S) -> Result<StoredFile, StorageError>
    where
        S: Stream<Item = std::io::Result<Bytes>> + Unpin + Send,
    {
        let name = sanitize_filename(filename);
        let final_path = self.root.join(&name);
        let part_path = self.root.join(format!(".{name}.part"));

        let _guard = self.write_lock.lock().await;

        let bytes = match copy_stream(&part_path, stream).await {
            Ok(bytes) => bytes,
            Err(e) => {
                discard_partial(&part_path).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&part_path, &final_path).await {
            discard_partial(&part_path).await;
            return Err(StorageError::write(&final_path, e));
        }

        debug!(path = %final_path.display(), bytes, "file stored");
        Ok(StoredFile {
            path: final_path,
            bytes,
        })
    }
}

/// Streams chunks into a fresh file at `path`, returning bytes written.
async fn copy_stream<S>(path: &Path, mut stream: S) -> Result<u64, StorageError>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    let file = File::create(path)
        .await
        .map_err(|e| StorageError::write(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StorageError::stream(path, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| StorageError::write(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| StorageError::write(path, e))?;

    Ok(bytes_written)
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "failed to remove partial file");
    }
}
