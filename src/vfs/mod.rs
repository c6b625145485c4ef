//! The mount/resolver stack: filesystems, directories, archives, and the
//! storage server.
//!
//! Everything here deals in two kinds of file identity:
//!
//! - a **string identity**: a single path component, resolved against a
//!   directory tree or an archive's string index;
//! - a **hashed identity**: a caller-defined 64-bit hash of a file's name,
//!   for containers that ship without their string table.
//!
//! The mapping between the two is a caller-supplied [`HashFunction`]; the
//! crate defines no default hash.

mod archive;
mod directory;
mod file;
pub mod path;
mod platform_file;
mod server;

pub use archive::{Archive, ArchiveLoader, ArchivePointer, ArchiveSystem};
pub use directory::Directory;
pub use file::{CreateFile, VfsFile, VfsFilePointer};
pub use platform_file::PlatformFile;
pub use server::StorageServer;

use std::path::Path;
use std::sync::Arc;

use crate::storage::FileAccess;

/// Files at or below this size are reasonable to map whole in a single view.
///
/// Policy constant for callers deciding between one full-file view and
/// windowed access; the crate itself does not consult it. 256 MiB.
pub const AUTO_FULL_MAP_SIZE: u64 = 256 * 1024 * 1024;

/// A 64-bit pre-hashed file identity.
pub type HashedIdentity = u64;

/// Caller-supplied mapping from file names to [`HashedIdentity`] values.
pub type HashFunction = Arc<dyn Fn(&str) -> HashedIdentity + Send + Sync>;

/// Shared handle to a type-erased [`FileSystem`].
pub type FileSystemPointer = Arc<dyn FileSystem>;

/// A system by which files are sorted, stored, and made accessible.
///
/// Implementations range from loose files on disk ([`Directory`]) through
/// containerised archives ([`Archive`]) to composed stacks of both
/// ([`StorageServer`]). Lookups come in by name or by pre-hashed identity;
/// a backend that does not index one of the two simply misses on it.
pub trait FileSystem: Send + Sync {
    /// The filesystem's location on disk (root directory, archive file, or
    /// the userland root for a composed stack).
    fn path(&self) -> &Path;

    /// Look up a file by name.
    ///
    /// `name` is a single path component, not a nested path. Returns `None`
    /// when the backend has no such file or cannot open it with the
    /// requested access.
    fn file_by_name(&self, name: &str, access: FileAccess) -> Option<VfsFilePointer>;

    /// Look up a file by pre-hashed identity.
    ///
    /// Returns `None` when the backend keeps no hash index, as well as on a
    /// plain miss.
    fn file_by_hash(
        &self,
        identity: HashedIdentity,
        access: FileAccess,
    ) -> Option<VfsFilePointer>;
}
