//! Durable key-value storage
//!
//! The beacon persists through a namespaced blob store with the same shape as
//! ESP-IDF's NVS: open a namespace, get/set a blob under a key, commit, or
//! erase the whole namespace. Firmware implements [`KeyValueStore`] over NVS;
//! this module ships two host implementations:
//!
//! - [`MemoryKvStore`]: a map in RAM, for tests and simulation.
//! - [`FileKvStore`] (`std`): one file per key. Every write goes to a temporary
//!   file that is synced and then renamed over the old blob, so a crash leaves
//!   either the old or the new blob on disk, never a torn one.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::errors::StorageError;

/// Namespaced blob store
pub trait KeyValueStore {
    /// Read the blob under `namespace/key`; `Ok(None)` when it does not exist
    fn get_blob(&self, namespace: &'static str, key: &'static str)
        -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the blob under `namespace/key` and commit
    fn set_blob(&mut self, namespace: &'static str, key: &'static str, value: &[u8])
        -> Result<(), StorageError>;

    /// Remove every key in `namespace` and commit
    fn erase_namespace(&mut self, namespace: &'static str) -> Result<(), StorageError>;
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for &mut K {
    fn get_blob(&self, namespace: &'static str, key: &'static str)
        -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get_blob(namespace, key)
    }

    fn set_blob(&mut self, namespace: &'static str, key: &'static str, value: &[u8])
        -> Result<(), StorageError> {
        (**self).set_blob(namespace, key, value)
    }

    fn erase_namespace(&mut self, namespace: &'static str) -> Result<(), StorageError> {
        (**self).erase_namespace(namespace)
    }
}

/// In-memory blob store
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    blobs: BTreeMap<(&'static str, &'static str), Vec<u8>>,
}

impl MemoryKvStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs across all namespaces
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// True when no blob is stored
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get_blob(&self, namespace: &'static str, key: &'static str)
        -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.get(&(namespace, key)).cloned())
    }

    fn set_blob(&mut self, namespace: &'static str, key: &'static str, value: &[u8])
        -> Result<(), StorageError> {
        self.blobs.insert((namespace, key), value.to_vec());
        Ok(())
    }

    fn erase_namespace(&mut self, namespace: &'static str) -> Result<(), StorageError> {
        self.blobs.retain(|(ns, _), _| *ns != namespace);
        Ok(())
    }
}

#[cfg(feature = "std")]
pub use file::FileKvStore;

#[cfg(feature = "std")]
mod file {
    use std::fs;
    use std::io::{self, Write};
    use std::path::{Path, PathBuf};

    use super::KeyValueStore;
    use crate::errors::StorageError;

    const TEMP_SUFFIX: &str = ".tmp";

    /// Directory-backed blob store with atomic replace
    ///
    /// Layout: `<root>/<namespace>/<key>`.
    #[derive(Debug, Clone)]
    pub struct FileKvStore {
        root: PathBuf,
    }

    impl FileKvStore {
        /// Use (and create if needed) `root` as the storage directory
        pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
            let root = root.as_ref().to_path_buf();
            fs::create_dir_all(&root).map_err(|e| {
                log_error!("cannot create storage root {}: {}", root.display(), e);
                StorageError::Unavailable { namespace: "<root>" }
            })?;
            Ok(Self { root })
        }

        /// Storage directory
        pub fn root(&self) -> &Path {
            &self.root
        }

        fn blob_path(&self, namespace: &str, key: &str) -> PathBuf {
            self.root.join(namespace).join(key)
        }

        fn write_atomic(path: &Path, value: &[u8]) -> io::Result<()> {
            let mut tmp_name = path.as_os_str().to_os_string();
            tmp_name.push(TEMP_SUFFIX);
            let tmp = PathBuf::from(tmp_name);

            {
                let mut file = fs::File::create(&tmp)?;
                file.write_all(value)?;
                file.sync_all()?;
            }
            fs::rename(&tmp, path)?;

            // Persist the rename itself where the platform allows it
            if let Some(dir) = path.parent() {
                if let Ok(dir) = fs::File::open(dir) {
                    let _ = dir.sync_all();
                }
            }
            Ok(())
        }
    }

    impl KeyValueStore for FileKvStore {
        fn get_blob(&self, namespace: &'static str, key: &'static str)
            -> Result<Option<Vec<u8>>, StorageError> {
            match fs::read(self.blob_path(namespace, key)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => {
                    log_error!("read {}/{} failed: {}", namespace, key, e);
                    Err(StorageError::ReadFailed { namespace, key })
                }
            }
        }

        fn set_blob(&mut self, namespace: &'static str, key: &'static str, value: &[u8])
            -> Result<(), StorageError> {
            let dir = self.root.join(namespace);
            fs::create_dir_all(&dir).map_err(|e| {
                log_error!("cannot open namespace {}: {}", namespace, e);
                StorageError::Unavailable { namespace }
            })?;

            Self::write_atomic(&self.blob_path(namespace, key), value).map_err(|e| {
                log_error!("write {}/{} failed: {}", namespace, key, e);
                StorageError::WriteFailed { namespace, key }
            })
        }

        fn erase_namespace(&mut self, namespace: &'static str) -> Result<(), StorageError> {
            match fs::remove_dir_all(self.root.join(namespace)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => {
                    log_error!("erase of {} failed: {}", namespace, e);
                    Err(StorageError::EraseFailed { namespace })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_namespaces_are_independent() {
        let mut kv = MemoryKvStore::new();
        kv.set_blob("a", "k", &[1, 2]).unwrap();
        kv.set_blob("b", "k", &[3]).unwrap();

        kv.erase_namespace("a").unwrap();

        assert_eq!(kv.get_blob("a", "k").unwrap(), None);
        assert_eq!(kv.get_blob("b", "k").unwrap(), Some(vec![3]));
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn set_replaces_whole_blob() {
        let mut kv = MemoryKvStore::new();
        kv.set_blob("a", "k", &[1, 2, 3]).unwrap();
        kv.set_blob("a", "k", &[9]).unwrap();
        assert_eq!(kv.get_blob("a", "k").unwrap(), Some(vec![9]));
    }
}
