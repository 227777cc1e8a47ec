// Local folder catalog - folders below a library root on disk
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use folderbot_core::domain::FolderName;
use folderbot_core::port::folder_catalog::{CatalogError, FolderCatalog};

/// Scratch file written by the writability check
const WRITE_CHECK_FILE: &str = ".folderbot-write-test";

pub struct LocalFolderCatalog {
    root: PathBuf,
}

impl LocalFolderCatalog {
    /// Create a catalog rooted at `root` (`~` is expanded)
    pub fn new(root: impl AsRef<str>) -> Self {
        let expanded = shellexpand::tilde(root.as_ref()).into_owned();
        Self {
            root: PathBuf::from(expanded),
        }
    }
}

#[async_trait]
impl FolderCatalog for LocalFolderCatalog {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn resolve(&self, folder: &FolderName) -> Result<Option<PathBuf>, CatalogError> {
        let path = self.root.join(folder.as_path());
        let real = match tokio::fs::canonicalize(&path).await {
            Ok(real) => real,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CatalogError::IoError(format!("{}: {}", path.display(), e))),
        };

        // Symlinks may point anywhere; only the real location counts
        let root = tokio::fs::canonicalize(&self.root).await.map_err(|e| {
            CatalogError::RootUnavailable(format!("{}: {}", self.root.display(), e))
        })?;
        if !real.starts_with(&root) {
            warn!(folder = %folder, target = %real.display(), "Folder points outside the library root");
            return Err(CatalogError::OutsideRoot(folder.to_string()));
        }

        match tokio::fs::metadata(&real).await {
            Ok(meta) if meta.is_dir() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CatalogError::IoError(format!("{}: {}", path.display(), e))),
        }
    }

    async fn list(&self) -> Result<Vec<String>, CatalogError> {
        let mut dir = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            CatalogError::RootUnavailable(format!("{}: {}", self.root.display(), e))
        })?;

        let mut folders = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| CatalogError::IoError(e.to_string()))?
        {
            let is_dir = item
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let name = item.file_name().to_string_lossy().to_string();
            if is_dir && !name.starts_with('.') {
                folders.push(name);
            }
        }
        folders.sort();

        debug!(root = %self.root.display(), count = folders.len(), "Listed library folders");
        Ok(folders)
    }

    async fn check_writable(&self) -> Result<(), CatalogError> {
        let meta = tokio::fs::metadata(&self.root).await.map_err(|e| {
            CatalogError::RootUnavailable(format!("{}: {}", self.root.display(), e))
        })?;
        if !meta.is_dir() {
            return Err(CatalogError::RootUnavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        let scratch = self.root.join(WRITE_CHECK_FILE);
        tokio::fs::write(&scratch, b"test")
            .await
            .map_err(|e| CatalogError::IoError(format!("cannot write to {}: {}", self.root.display(), e)))?;
        tokio::fs::remove_file(&scratch)
            .await
            .map_err(|e| CatalogError::IoError(e.to_string()))?;
        Ok(())
    }

    async fn remove_empty_dirs(&self, keep: &[FolderName]) -> Result<Vec<String>, CatalogError> {
        let root = self.root.clone();
        let keep: HashSet<PathBuf> = keep.iter().map(|f| root.join(f.as_path())).collect();

        let mut removed = tokio::task::spawn_blocking(move || {
            let mut removed = Vec::new();
            remove_empty_below(&root, &root, &keep, &mut removed).map(|_| removed)
        })
        .await
        .map_err(|e| CatalogError::IoError(e.to_string()))?
        .map_err(|e| CatalogError::RootUnavailable(format!("{}: {}", self.root.display(), e)))?;
        removed.sort();

        info!(root = %self.root.display(), removed = removed.len(), "Removed empty folders");
        Ok(removed)
    }
}

/// Depth-first removal of empty directories below `dir`.
///
/// Returns whether `dir` itself is empty afterwards. Symlinks are never
/// followed and count as content. Failures below the top level are logged
/// and leave that branch in place.
fn remove_empty_below(
    root: &Path,
    dir: &Path,
    keep: &HashSet<PathBuf>,
    removed: &mut Vec<String>,
) -> std::io::Result<bool> {
    let mut empty = true;
    for item in std::fs::read_dir(dir)? {
        let item = item?;
        let path = item.path();

        if item.file_type()?.is_dir() {
            let child_empty = match remove_empty_below(root, &path, keep, removed) {
                Ok(child_empty) => child_empty,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable folder");
                    false
                }
            };
            if child_empty && !keep.contains(&path) {
                match std::fs::remove_dir(&path) {
                    Ok(()) => {
                        let relative = path.strip_prefix(root).unwrap_or(path.as_path());
                        removed.push(relative.to_string_lossy().into_owned());
                        continue;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove empty folder")
                    }
                }
            }
        }
        empty = false;
    }
    Ok(empty)
}
