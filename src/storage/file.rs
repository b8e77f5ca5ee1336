use fs2::FileExt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::errors::StorageError;

const LOCK_FILE: &str = ".pmquest.lock";

/// Directory-backed store: one `<key>.json` file per key.
///
/// Writes go through a temp file and a rename while holding an advisory lock
/// on the directory's lock file, so readers never observe a torn value.
/// Concurrent writers from other processes still race; the last rename wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// Wrap a directory already created by `open`.
    pub(crate) fn existing(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", name))
    }

    fn locked<T>(
        &self,
        key: &str,
        op: impl FnOnce() -> std::io::Result<T>,
    ) -> Result<T, StorageError> {
        let io_err = |source: std::io::Error| {
            if source.kind() == ErrorKind::StorageFull {
                StorageError::QuotaExceeded {
                    key: key.to_string(),
                }
            } else {
                StorageError::Io {
                    key: key.to_string(),
                    source,
                }
            }
        };

        let lock = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.root.join(LOCK_FILE))
            .map_err(io_err)?;
        FileExt::lock_exclusive(&lock).map_err(io_err)?;
        // The lock is released when `lock` is dropped.
        op().map_err(io_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        self.locked(key, || {
            fs::write(&tmp, value)?;
            fs::rename(&tmp, &path)
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        self.locked(key, || match fs::remove_file(&path) {
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        })
    }
}
