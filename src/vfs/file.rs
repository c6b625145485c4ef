use std::path::Path;
use std::sync::Arc;

use crate::storage::{FileAccess, Seek};

/// Shared handle to a type-erased [`VfsFile`].
pub type VfsFilePointer = Arc<dyn VfsFile>;

/// Stream-like file contract handed out by [`FileSystem`] lookups.
///
/// One shared read/write cursor, C-stream style. Cursor-relative transfers
/// serialise against each other; the offset-explicit `*_at` forms never
/// touch the cursor and may overlap each other freely.
///
/// Transfers report the byte count moved. A return of 0 means end-of-range
/// or an internal failure; callers that need to tell the two apart can
/// probe [`size`](VfsFile::size).
///
/// [`FileSystem`]: crate::vfs::FileSystem
pub trait VfsFile: Send + Sync {
    /// Move the cursor and return its new position, clamped to
    /// `[0, size]`.
    fn seek(&self, offset: i64, whence: Seek) -> u64;

    /// Current cursor position.
    fn tell(&self) -> u64;

    /// Current size of the file in bytes.
    fn size(&self) -> u64;

    /// Read at the cursor, advancing it by the returned count.
    fn read(&self, buf: &mut [u8]) -> u64;

    /// Read `requested` bytes at the cursor into `buf`, growing `buf` to
    /// the transfer size first if it is smaller. Advances the cursor.
    fn read_vec(&self, buf: &mut Vec<u8>, requested: u64) -> u64;

    /// Read at an explicit offset; the cursor does not move.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> u64;

    /// Read `requested` bytes at an explicit offset into `buf`, growing
    /// `buf` to the transfer size first if it is smaller. The cursor does
    /// not move.
    fn read_vec_at(&self, offset: u64, buf: &mut Vec<u8>, requested: u64) -> u64;

    /// Write at the cursor, advancing it by the returned count. Durable on
    /// return.
    fn write(&self, buf: &[u8]) -> u64;

    /// Write at an explicit offset; the cursor does not move. Durable on
    /// return.
    fn write_at(&self, offset: u64, buf: &[u8]) -> u64;
}

/// A [`VfsFile`] implementation that can be opened from a disk path.
///
/// [`Directory`] and [`StorageServer`] are generic over this, so the file
/// objects a directory tree hands out can be swapped wholesale (the usual
/// choice is [`PlatformFile`](crate::vfs::PlatformFile)).
///
/// [`Directory`]: crate::vfs::Directory
/// [`StorageServer`]: crate::vfs::StorageServer
pub trait CreateFile: VfsFile {
    /// Open `path` with the given access mode. `None` on any failure.
    fn create(path: &Path, access: FileAccess) -> Option<Arc<Self>>
    where
        Self: Sized;
}
