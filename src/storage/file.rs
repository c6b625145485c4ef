use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use memmap2::MmapOptions;

use super::view::View;
use super::FileAccess;

/// An open file on disk, the source of [`View`] mappings.
///
/// `Clone` is cheap (Arc internals) and every clone refers to the same open
/// handle. Views hold a clone of their parent `File`, so the handle is
/// closed only after the last view and the last clone are dropped.
///
/// Construction goes through [`File::create`]; the access mode fixes what
/// views of the file may do for its whole lifetime.
///
/// # Example
///
/// ```ignore
/// let file = File::create("save/slot0.bin", FileAccess::READ_WRITE)?;
/// let view = file.get_view(0, 4096)?;
/// view.write(&header_bytes);
/// view.flush();
/// ```
#[derive(Clone)]
pub struct File {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    access: FileAccess,
    handle: fs::File,
}

impl File {
    /// Open (or, for writable modes, open-or-create) a regular file.
    ///
    /// Without [`FileAccess::WRITE`] the path must name an existing regular
    /// file. With it, the parent directory is created as needed and the file
    /// itself is created if missing; the handle is always opened for both
    /// reading and writing so writable views can be read back.
    ///
    /// Returns `None` on any failure, with the cause logged.
    pub fn create(path: impl AsRef<Path>, access: FileAccess) -> Option<File> {
        let path = path.as_ref();

        if access.is_writable() {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.is_dir()
                && let Err(err) = fs::create_dir_all(parent)
            {
                debug!("cannot create parent directory of {}: {err}", path.display());
                return None;
            }
        } else {
            match fs::metadata(path) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => {
                    debug!("{} is not a regular file", path.display());
                    return None;
                }
                Err(err) => {
                    debug!("cannot stat {}: {err}", path.display());
                    return None;
                }
            }
        }

        let mut options = fs::OpenOptions::new();
        options.read(true);
        if access.is_writable() {
            options.write(true).create(true);
        }

        match options.open(path) {
            Ok(handle) => Some(File {
                inner: Arc::new(Inner {
                    path: path.to_path_buf(),
                    access,
                    handle,
                }),
            }),
            Err(err) => {
                debug!("cannot open {}: {err}", path.display());
                None
            }
        }
    }

    /// The path the file was opened with.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// The access mode the file was opened with.
    pub fn access(&self) -> FileAccess {
        self.inner.access
    }

    /// Current size of the file in bytes, straight from the open handle.
    pub fn size(&self) -> u64 {
        match self.inner.handle.metadata() {
            Ok(meta) => meta.len(),
            Err(err) => {
                debug!("cannot stat handle for {}: {err}", self.inner.path.display());
                0
            }
        }
    }

    /// Map a byte range of the file as a [`View`].
    ///
    /// A `length` of zero maps from `offset` to the end of the file.
    /// Writable files are grown first when `offset + length` reaches past
    /// the current end; on read-only files any request that is not fully
    /// inside the file fails.
    ///
    /// Returns `None` if there is nothing to map (zero remaining bytes) or
    /// the grow/map system call fails.
    pub fn get_view(&self, offset: u64, length: u64) -> Option<View> {
        let size = self.size();
        let writable = self.inner.access.is_writable();

        let length = if length == 0 {
            if offset >= size {
                debug!(
                    "empty view of {} at offset {offset} (size {size})",
                    self.inner.path.display()
                );
                return None;
            }
            size - offset
        } else {
            length
        };

        let Some(end) = offset.checked_add(length) else {
            debug!("view range overflows at offset {offset} + {length}");
            return None;
        };
        if end > size {
            if writable {
                if let Err(err) = self.inner.handle.set_len(end) {
                    debug!("cannot grow {} to {end}: {err}", self.inner.path.display());
                    return None;
                }
            } else {
                debug!(
                    "view [{offset}, {end}) reaches past read-only {} (size {size})",
                    self.inner.path.display()
                );
                return None;
            }
        }

        let Ok(map_length) = usize::try_from(length) else {
            debug!("view length {length} exceeds the address space");
            return None;
        };

        let mut options = MmapOptions::new();
        options.offset(offset).len(map_length);
        let mapped = if writable {
            options.map_raw(&self.inner.handle)
        } else {
            options.map_raw_read_only(&self.inner.handle)
        };

        match mapped {
            Ok(map) => Some(View::new(self.clone(), map, offset, length)),
            Err(err) => {
                debug!(
                    "cannot map {} [{offset}, {end}): {err}",
                    self.inner.path.display()
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.inner.path)
            .field("access", &self.inner.access)
            .finish()
    }
}
