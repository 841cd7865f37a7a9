mod local;

pub use local::LocalFileStorage;

use async_trait::async_trait;
use std::io;
use std::pin::Pin;
use tokio::io::AsyncRead;

pub type FileReader = Pin<Box<dyn AsyncRead + Send>>;

/// File backend holding uploaded images and their derived variants.
///
/// Paths are storage-relative and always use `/` as separator.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn exists(&self, path: &str) -> io::Result<bool>;

    async fn open(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Streaming read, for serving files without buffering them.
    async fn open_stream(&self, path: &str) -> io::Result<FileReader>;

    /// Writes `content` at `path`. A failed call leaves no partial file behind.
    async fn save(&self, path: &str, content: &[u8]) -> io::Result<()>;

    async fn delete(&self, path: &str) -> io::Result<()>;
}
