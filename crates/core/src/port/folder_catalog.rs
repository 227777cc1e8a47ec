// Folder Catalog Port
// The local directory tree that folders are queued from

use crate::domain::FolderName;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("Library root unavailable: {0}")]
    RootUnavailable(String),

    #[error("'{0}' resolves outside the library root")]
    OutsideRoot(String),

    #[error("IO error: {0}")]
    IoError(String),
}

#[async_trait]
pub trait FolderCatalog: Send + Sync {
    /// Library root every folder name is relative to
    fn root(&self) -> &Path;

    /// Absolute path of `folder` if it exists as a directory, `None` otherwise.
    /// A folder whose real location is not below the root is `OutsideRoot`.
    async fn resolve(&self, folder: &FolderName) -> Result<Option<PathBuf>, CatalogError>;

    /// Directory names directly below the root, sorted
    async fn list(&self) -> Result<Vec<String>, CatalogError>;

    /// Verify the root can be written to
    async fn check_writable(&self) -> Result<(), CatalogError>;

    /// Delete every empty directory below the root, deepest first, leaving
    /// the root itself and anything named in `keep` in place. Returns the
    /// removed folders relative to the root.
    async fn remove_empty_dirs(&self, keep: &[FolderName]) -> Result<Vec<String>, CatalogError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    /// In-memory catalog with a fixed set of existing folders
    #[derive(Clone)]
    pub struct InMemoryCatalog {
        root: PathBuf,
        folders: Arc<Mutex<BTreeSet<String>>>,
        empty: Arc<Mutex<BTreeSet<String>>>,
    }

    impl InMemoryCatalog {
        pub fn new<I, S>(folders: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                root: PathBuf::from("/library"),
                folders: Arc::new(Mutex::new(folders.into_iter().map(Into::into).collect())),
                empty: Arc::new(Mutex::new(BTreeSet::new())),
            }
        }

        /// Mark existing folders as empty so `remove_empty_dirs` deletes them
        pub fn with_empty<I, S>(self, folders: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.empty
                .lock()
                .unwrap()
                .extend(folders.into_iter().map(Into::into));
            self
        }

        pub fn remove(&self, folder: &str) {
            self.folders.lock().unwrap().remove(folder);
        }
    }

    #[async_trait]
    impl FolderCatalog for InMemoryCatalog {
        fn root(&self) -> &Path {
            &self.root
        }

        async fn resolve(&self, folder: &FolderName) -> Result<Option<PathBuf>, CatalogError> {
            let exists = self.folders.lock().unwrap().contains(folder.as_str());
            Ok(exists.then(|| self.root.join(folder.as_path())))
        }

        async fn list(&self) -> Result<Vec<String>, CatalogError> {
            Ok(self.folders.lock().unwrap().iter().cloned().collect())
        }

        async fn check_writable(&self) -> Result<(), CatalogError> {
            Ok(())
        }

        async fn remove_empty_dirs(
            &self,
            keep: &[FolderName],
        ) -> Result<Vec<String>, CatalogError> {
            let mut folders = self.folders.lock().unwrap();
            let mut empty = self.empty.lock().unwrap();
            let removed: Vec<String> = empty
                .iter()
                .filter(|name| !keep.iter().any(|k| k.as_str() == name.as_str()))
                .cloned()
                .collect();
            for name in &removed {
                empty.remove(name);
                folders.remove(name);
            }
            Ok(removed)
        }
    }
}
