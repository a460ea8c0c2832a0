use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::{reference_file_name, BlobKind, BlobStore, REFERENCE_PREFIX};
use crate::error::StorageError;
use crate::sanitize::redact_path;

/// Move a file from `src` to `dst`. Uses `rename` first, falling back to
/// copy + delete for cross-device moves.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// [`BlobStore`] writing into a single upload directory.
pub struct FileBlobStore {
    upload_directory: PathBuf,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(upload_directory: P) -> Self {
        Self {
            upload_directory: upload_directory.as_ref().to_path_buf(),
        }
    }

    pub fn upload_directory(&self) -> &Path {
        &self.upload_directory
    }

    fn ensure_directory(&self) -> Result<(), StorageError> {
        if !self.upload_directory.exists() {
            std::fs::create_dir_all(&self.upload_directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: self.upload_directory.clone(),
                    source: e,
                }
            })?;
        }
        Ok(())
    }

    /// Creates the file with `create_new`, trying `_2`, `_3`, ... suffixes when
    /// the name is taken.
    fn write_new(&self, filename: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        let (base, ext) = split_extension(filename);

        for counter in 1..=1000 {
            let candidate = numbered(base, ext, counter);
            let path = self.upload_directory.join(&candidate);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: path.clone(),
                            source: e,
                        })?;
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(StorageError::WriteFile { path, source: e }),
            }
        }

        Err(StorageError::FileExists(self.upload_directory.join(filename)))
    }

    fn free_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        let (base, ext) = split_extension(filename);
        for counter in 1..=1000 {
            let path = self.upload_directory.join(numbered(base, ext, counter));
            if std::fs::symlink_metadata(&path).is_err() {
                return Ok(path);
            }
        }
        Err(StorageError::FileExists(self.upload_directory.join(filename)))
    }
}

fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(dot) => (&filename[..dot], Some(&filename[dot..])),
        None => (filename, None),
    }
}

fn numbered(base: &str, ext: Option<&str>, counter: u32) -> String {
    match (counter, ext) {
        (1, Some(ext)) => format!("{}{}", base, ext),
        (1, None) => base.to_string(),
        (n, Some(ext)) => format!("{}_{}{}", base, n, ext),
        (n, None) => format!("{}_{}", base, n),
    }
}

fn to_reference(path: &Path) -> String {
    format!("{}{}", REFERENCE_PREFIX, redact_path(path))
}

impl BlobStore for FileBlobStore {
    fn store(
        &self,
        kind: &BlobKind,
        extension: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        self.ensure_directory()?;
        let filename = kind.file_name(extension, Utc::now());
        let path = self.write_new(&filename, content)?;

        log::debug!("Stored {} bytes as {}", content.len(), redact_path(&path));
        Ok(to_reference(&path))
    }

    fn promote(&self, reference: &str, final_name: &str) -> Result<String, StorageError> {
        let source = self.resolve(reference)?;
        if reference_file_name(&format!("{}{}", REFERENCE_PREFIX, final_name)).is_err() {
            return Err(StorageError::InvalidReference(final_name.to_string()));
        }

        let destination = self.free_path(final_name)?;
        move_file(&source, &destination)?;
        Ok(to_reference(&destination))
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let name = reference_file_name(reference)?;
        Ok(self.upload_directory.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tag_temp() -> BlobKind {
        BlobKind::TagTemp {
            item_id: "item-9".to_string(),
        }
    }

    #[test]
    fn test_store_returns_upload_reference() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path().join("uploads"));

        let reference = store.store(&tag_temp(), "jpg", b"jpeg bytes").unwrap();

        assert!(reference.starts_with("/uploads/tag_temp_item-9_"));
        assert!(reference.ends_with(".jpg"));
        let path = store.resolve(&reference).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"jpeg bytes");
    }

    #[test]
    fn test_write_new_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let first = store.write_new("photo.jpg", b"first").unwrap();
        let second = store.write_new("photo.jpg", b"second").unwrap();

        assert!(first.ends_with("photo.jpg"));
        assert!(second.ends_with("photo_2.jpg"));
        assert_eq!(std::fs::read(first).unwrap(), b"first");
    }

    #[test]
    fn test_promote_moves_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let temp_ref = store.store(&tag_temp(), "png", b"tag").unwrap();
        let temp_path = store.resolve(&temp_ref).unwrap();

        let final_ref = store.promote(&temp_ref, "tag_item-9_1.png").unwrap();

        assert_eq!(final_ref, "/uploads/tag_item-9_1.png");
        assert!(!temp_path.exists());
        assert_eq!(
            std::fs::read(store.resolve(&final_ref).unwrap()).unwrap(),
            b"tag"
        );
    }

    #[test]
    fn test_promote_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let result = store.promote("/uploads/tag_temp_gone.jpg", "tag_gone.jpg");
        assert!(matches!(result, Err(StorageError::MoveFile { .. })));
    }

    #[test]
    fn test_promote_rejects_path_in_final_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());
        let temp_ref = store.store(&tag_temp(), "png", b"tag").unwrap();

        let result = store.promote(&temp_ref, "../escape.png");
        assert!(matches!(result, Err(StorageError::InvalidReference(_))));
    }

    #[test]
    fn test_resolve_rejects_foreign_reference() {
        let store = FileBlobStore::new("/tmp/uploads");
        assert!(matches!(
            store.resolve("https://example.com/a.jpg"),
            Err(StorageError::InvalidReference(_))
        ));
    }
}
