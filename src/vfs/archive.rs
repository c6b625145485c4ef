use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::directory::Directory;
use super::file::CreateFile;
use super::path::resolve_symlinks;
use super::FileSystem;
use crate::storage::{self, FileAccess};

/// Shared handle to a type-erased [`Archive`].
pub type ArchivePointer = Arc<dyn Archive>;

/// A containerised [`FileSystem`]: one data file (or a small set of them)
/// with an internal index.
///
/// Concrete formats live outside this crate; they implement this trait and
/// register a loader with an [`ArchiveSystem`]. An archive that only keeps
/// hashed identities is free to miss every string lookup.
///
/// [`FileSystem::path`] reports the archive's own source file, so a
/// mounting layer can say where content came from.
pub trait Archive: FileSystem {
    /// Number of contained entries.
    ///
    /// An empty archive reports 0, giving callers the chance to drop it
    /// instead of mounting it.
    fn child_count(&self) -> u32;
}

/// Probe callback: inspect an open storage file and produce an archive if
/// the format matches.
///
/// Loaders are expected to read a magic number or header through a view and
/// return `None` quickly when the file is not theirs.
pub type ArchiveLoader = Box<dyn Fn(storage::File) -> Option<ArchivePointer> + Send + Sync>;

/// Finds and loads archives by probing candidate files through registered
/// format loaders.
///
/// Directories are searched newest-registration-first, so a directory added
/// later (a mod folder, say) can shadow an earlier one; loaders run in
/// registration order and the first one to accept a file wins.
///
/// Mutation takes `&mut self`: register everything during startup, then
/// share the system freely for loading.
///
/// # Example
///
/// ```ignore
/// let mut archives: ArchiveSystem<PlatformFile> = ArchiveSystem::new();
/// archives.register_directory(data_dir);
/// archives.register_loader(|file| PakArchive::open(file));
/// let pak = archives.load("base.pak")?;
/// ```
pub struct ArchiveSystem<F> {
    directories: Vec<Arc<Directory<F>>>,
    loaders: Vec<ArchiveLoader>,
}

impl<F: CreateFile + 'static> ArchiveSystem<F> {
    /// An empty system: no directories, no loaders.
    pub fn new() -> ArchiveSystem<F> {
        ArchiveSystem {
            directories: Vec::new(),
            loaders: Vec::new(),
        }
    }

    /// Add a directory to the search list.
    ///
    /// Idempotent by path: re-registering a directory already in the list
    /// is a no-op.
    pub fn register_directory(&mut self, directory: Arc<Directory<F>>) {
        let path = directory.path();
        if self.directories.iter().any(|dir| dir.path() == path) {
            return;
        }
        self.directories.push(directory);
    }

    /// Remove a directory from the search list by handle.
    pub fn unregister_directory(&mut self, directory: &Arc<Directory<F>>) {
        self.unregister_path(directory.path());
    }

    /// Remove a directory from the search list by path.
    pub fn unregister_path(&mut self, path: &Path) {
        self.directories.retain(|dir| dir.path() != path);
    }

    /// Append a format loader. The loader set only grows.
    pub fn register_loader(
        &mut self,
        loader: impl Fn(storage::File) -> Option<ArchivePointer> + Send + Sync + 'static,
    ) {
        self.loaders.push(Box::new(loader));
    }

    /// Registered directories, oldest registration first.
    pub fn directories(&self) -> &[Arc<Directory<F>>] {
        &self.directories
    }

    /// Find and load the archive called `name`.
    ///
    /// Walks the registered directories newest-first; in each, resolves
    /// `dir/name` through any symlink chain, opens it read-only, and offers
    /// it to every loader in registration order. The first archive produced
    /// is returned. `None` when no directory yields a loadable archive.
    pub fn load(&self, name: &str) -> Option<ArchivePointer> {
        for directory in self.directories.iter().rev() {
            let candidate = resolve_symlinks(&directory.child_path(name));

            let Some(file) = storage::File::create(&candidate, FileAccess::READ) else {
                continue;
            };

            for loader in &self.loaders {
                if let Some(archive) = loader(file.clone()) {
                    return Some(archive);
                }
            }
            debug!("no loader accepted {}", candidate.display());
        }
        None
    }
}

impl<F: CreateFile + 'static> Default for ArchiveSystem<F> {
    fn default() -> Self {
        Self::new()
    }
}
