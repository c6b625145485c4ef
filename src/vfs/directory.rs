use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use super::file::{CreateFile, VfsFilePointer};
use super::path::resolve_symlinks;
use super::{FileSystem, HashedIdentity};
use crate::storage::FileAccess;

/// A [`FileSystem`] rooted at a directory on disk.
///
/// Lookups join the child name onto the root and open it through `F`'s
/// factory, so a `Directory<PlatformFile>` hands out
/// [`PlatformFile`](crate::vfs::PlatformFile)s. A directory keeps no hash
/// index, so hashed lookups always miss.
pub struct Directory<F> {
    path: PathBuf,
    _file: PhantomData<fn() -> F>,
}

impl<F: CreateFile> Directory<F> {
    /// Wrap an existing path without touching the filesystem.
    ///
    /// No symlink resolution, no existence check; use
    /// [`create`](Directory::create) for the validating form.
    pub fn new(path: impl Into<PathBuf>) -> Arc<Directory<F>> {
        Arc::new(Directory {
            path: path.into(),
            _file: PhantomData,
        })
    }

    /// Resolve `path` (following symlink chains) and make sure it is a
    /// directory, creating the tree if it is missing.
    ///
    /// Returns `None` when the target exists but is not a directory, or the
    /// tree cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Option<Arc<Directory<F>>> {
        let resolved = resolve_symlinks(path.as_ref());
        if !resolved.is_dir()
            && let Err(err) = fs::create_dir_all(&resolved)
        {
            debug!("cannot create directory {}: {err}", resolved.display());
            return None;
        }
        Some(Self::new(resolved))
    }

    /// Join a child name onto the directory root. Pure path arithmetic, no
    /// existence check.
    pub fn child_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Open a child file through `F`'s factory, keeping the concrete type.
    pub fn file(&self, name: &str, access: FileAccess) -> Option<Arc<F>> {
        F::create(&self.child_path(name), access)
    }

    /// Open a child file through a different [`CreateFile`] implementation.
    pub fn typed_file<T: CreateFile>(&self, name: &str, access: FileAccess) -> Option<Arc<T>> {
        T::create(&self.child_path(name), access)
    }

    /// Get or create a child directory (possibly several levels deep),
    /// serving the same file type.
    pub fn child_directory(&self, name: &str) -> Option<Arc<Directory<F>>> {
        Directory::create(self.path.join(name))
    }

    /// Number of immediate children that are directories.
    pub fn directory_count(&self) -> usize {
        self.count_children(|file_type| file_type.is_dir())
    }

    /// Number of immediate children that are regular files.
    pub fn file_count(&self) -> usize {
        self.count_children(|file_type| file_type.is_file())
    }

    fn count_children(&self, keep: impl Fn(&fs::FileType) -> bool) -> usize {
        match fs::read_dir(&self.path) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| entry.file_type().ok())
                .filter(|file_type| keep(file_type))
                .count(),
            Err(err) => {
                debug!("cannot list {}: {err}", self.path.display());
                0
            }
        }
    }
}

impl<F: CreateFile + 'static> FileSystem for Directory<F> {
    fn path(&self) -> &Path {
        &self.path
    }

    fn file_by_name(&self, name: &str, access: FileAccess) -> Option<VfsFilePointer> {
        self.file(name, access).map(|file| file as VfsFilePointer)
    }

    fn file_by_hash(
        &self,
        _identity: HashedIdentity,
        _access: FileAccess,
    ) -> Option<VfsFilePointer> {
        // A directory of loose files carries no hash index.
        None
    }
}

impl<F> std::fmt::Debug for Directory<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory").field("path", &self.path).finish()
    }
}
