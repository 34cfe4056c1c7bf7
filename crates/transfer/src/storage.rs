//! Persistent destinations for received objects.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::AsyncWriteExt;

/// A boxed future returned by [`Storage`] and [`Sink`] methods.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// Append-only byte destination bound to one object name.
pub trait Sink: Send {
    /// Appends `bytes` at the end of the object.
    fn append<'a>(&'a mut self, bytes: &'a [u8]) -> StorageFuture<'a, ()>;

    /// Flushes everything written so far to the medium.
    fn close(&mut self) -> StorageFuture<'_, ()>;
}

/// Creates and deletes sinks under a storage root.
pub trait Storage: Send + Sync {
    type Sink: Sink;

    /// Creates (or truncates) the object `name` and opens it for appending.
    fn create_sink<'a>(&'a self, name: &'a str) -> StorageFuture<'a, Self::Sink>;

    /// Removes the object `name`. Removing a missing object is not an error.
    fn delete<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()>;
}

/// Filesystem storage rooted at a directory (the SD card mount on the node).
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the object `name`.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for FsStorage {
    type Sink = FileSink;

    fn create_sink<'a>(&'a self, name: &'a str) -> StorageFuture<'a, FileSink> {
        Box::pin(async move {
            let path = self.path_of(name);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let file = tokio::fs::File::create(&path).await?;
            tracing::debug!(path = %path.display(), "sink created");
            Ok(FileSink { file, path })
        })
    }

    fn delete<'a>(&'a self, name: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let path = self.path_of(name);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "sink deleted");
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            }
        })
    }
}

/// A file being written under [`FsStorage`].
#[derive(Debug)]
pub struct FileSink {
    file: tokio::fs::File,
    path: PathBuf,
}

impl FileSink {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn append<'a>(&'a mut self, bytes: &'a [u8]) -> StorageFuture<'a, ()> {
        Box::pin(async move { self.file.write_all(bytes).await })
    }

    fn close(&mut self) -> StorageFuture<'_, ()> {
        Box::pin(async move {
            self.file.flush().await?;
            self.file.sync_all().await
        })
    }
}
