//! Memory-mapped storage engine.
//!
//! [`File`] owns an open platform file handle and is the only way to obtain
//! a [`View`]: a live mapping over a byte range of that file. Views keep
//! their parent file alive, so a file's handle is closed only once the last
//! view and the last file handle are gone.
//!
//! Mapping offsets are aligned down to the platform allocation granularity
//! (see [`platform::granularity`]) under the hood; the window a view exposes
//! always starts at the byte the caller asked for.

mod file;
pub mod platform;
mod view;

pub use file::File;
pub use view::View;

use bitflags::bitflags;

bitflags! {
    /// Access mode requested when opening a [`File`].
    ///
    /// Any combination of the three base bits is accepted. `EXECUTE` is a
    /// reservation: it does not change how the file is opened or mapped.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAccess: u8 {
        /// Data may be read through views of the file.
        const READ = 1 << 0;
        /// Data may be written through views of the file; the file is
        /// created if missing and grows to cover requested views.
        const WRITE = 1 << 1;
        /// Reserved for executable mappings.
        const EXECUTE = 1 << 2;
        /// Read and write access.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        /// Read and execute access.
        const READ_EXECUTE = Self::READ.bits() | Self::EXECUTE.bits();
        /// Read, write, and execute access.
        const READ_WRITE_EXECUTE =
            Self::READ.bits() | Self::WRITE.bits() | Self::EXECUTE.bits();
    }
}

impl Default for FileAccess {
    fn default() -> Self {
        Self::READ
    }
}

impl FileAccess {
    /// Whether this mode allows mutating the file.
    pub fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }
}

/// Point of origin for [`View::seek`] and [`crate::vfs::VfsFile::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Seek {
    /// Beginning of the file or view.
    #[default]
    Set,
    /// Current cursor position.
    Current,
    /// End of the file or view.
    End,
}

impl Seek {
    /// Alias for [`Seek::Set`].
    pub const START: Seek = Seek::Set;
    /// Alias for [`Seek::Set`].
    pub const BEGINNING: Seek = Seek::Set;
}

/// Clamp a signed seek target into `[0, bound]`.
///
/// Shared by views (bound = view length) and platform files (bound = file
/// size). The arithmetic runs in 128-bit space so `i64::MIN`-ish offsets
/// cannot wrap.
pub(crate) fn seek_target(cursor: u64, bound: u64, offset: i64, whence: Seek) -> u64 {
    let target: i128 = match whence {
        Seek::Set => offset as i128,
        Seek::Current => cursor as i128 + offset as i128,
        Seek::End => bound as i128 + offset as i128,
    };
    target.clamp(0, bound as i128) as u64
}
