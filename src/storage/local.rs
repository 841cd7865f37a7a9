use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs as tokio_fs;
use uuid::Uuid;

use super::{FileReader, FileStorage};

#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFileStorage { root: root.into() }
    }

    /// Maps a storage-relative path onto the filesystem, refusing anything
    /// that could escape the root.
    pub fn full_path(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid storage path: {path}"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn exists(&self, path: &str) -> io::Result<bool> {
        tokio_fs::try_exists(self.full_path(path)?).await
    }

    async fn open(&self, path: &str) -> io::Result<Vec<u8>> {
        tokio_fs::read(self.full_path(path)?).await
    }

    async fn open_stream(&self, path: &str) -> io::Result<FileReader> {
        let file = tokio_fs::File::open(self.full_path(path)?).await?;
        Ok(Box::pin(file))
    }

    async fn save(&self, path: &str, content: &[u8]) -> io::Result<()> {
        let target = self.full_path(path)?;
        if let Some(parent) = target.parent() {
            tokio_fs::create_dir_all(parent).await?;
        }

        let tmp = target.with_file_name(format!(".{}.tmp", Uuid::new_v4().simple()));
        if let Err(err) = tokio_fs::write(&tmp, content).await {
            let _ = tokio_fs::remove_file(&tmp).await;
            return Err(err);
        }
        if let Err(err) = tokio_fs::rename(&tmp, &target).await {
            let _ = tokio_fs::remove_file(&tmp).await;
            return Err(err);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> io::Result<()> {
        match tokio_fs::remove_file(self.full_path(path)?).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_path_rejects_escapes() {
        let storage = LocalFileStorage::new("/srv/media");
        assert!(storage.full_path("../etc/passwd").is_err());
        assert!(storage.full_path("/etc/passwd").is_err());
        assert!(storage.full_path("").is_err());
        assert_eq!(
            storage.full_path("product_images/a/a-1.jpg").unwrap(),
            PathBuf::from("/srv/media/product_images/a/a-1.jpg")
        );
    }

    #[tokio::test]
    async fn save_open_delete_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        storage.save("nested/dir/file.bin", b"payload").await.unwrap();
        assert!(storage.exists("nested/dir/file.bin").await.unwrap());
        assert_eq!(storage.open("nested/dir/file.bin").await.unwrap(), b"payload");

        storage.delete("nested/dir/file.bin").await.unwrap();
        assert!(!storage.exists("nested/dir/file.bin").await.unwrap());
        // deleting twice is fine
        storage.delete("nested/dir/file.bin").await.unwrap();
    }
}
