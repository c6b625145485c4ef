use std::ptr;

use log::{debug, warn};
use memmap2::MmapRaw;
use parking_lot::RwLock;

use super::{File, Seek, seek_target};

/// A live mapping over a byte range of a [`File`], with its own cursor.
///
/// The window runs from the byte the view was requested at for exactly the
/// requested length; the granularity-aligned map base underneath is not
/// observable. The cursor is shared between reads and writes, as with a C
/// stream.
///
/// Cursor-relative operations ([`read`](View::read), [`write`](View::write),
/// [`seek`](View::seek)) serialise through the exclusive side of an internal
/// lock. Offset-explicit operations ([`read_at`](View::read_at),
/// [`write_at`](View::write_at)) take no lock and may run concurrently; the
/// caller must keep them off ranges a concurrent cursor operation may touch.
///
/// Dropping a writable view flushes it; dropping any view unmaps it and
/// releases its hold on the parent file.
pub struct View {
    file: File,
    map: MmapRaw,
    file_offset: u64,
    length: u64,
    cursor: RwLock<u64>,
}

impl View {
    pub(crate) fn new(file: File, map: MmapRaw, file_offset: u64, length: u64) -> View {
        View {
            file,
            map,
            file_offset,
            length,
            cursor: RwLock::new(0),
        }
    }

    /// Size of the view window in bytes.
    pub fn size(&self) -> u64 {
        self.length
    }

    /// Current cursor position within the view.
    pub fn tell(&self) -> u64 {
        *self.cursor.read()
    }

    /// Offset of the view window within its file.
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Absolute file offset of the cursor (window offset plus cursor).
    pub fn absolute_offset(&self) -> u64 {
        self.file_offset + self.tell()
    }

    /// Raw pointer to the first byte of the window.
    ///
    /// For advanced use (header probes, zero-copy decoding). The pointer is
    /// valid for [`size`](View::size) bytes while the view is alive; writing
    /// through it on a read-only view is undefined behaviour.
    pub fn data_pointer(&self) -> *mut u8 {
        self.map.as_mut_ptr()
    }

    /// Number of bytes a transfer starting at `position` may move.
    ///
    /// `min(requested, size - position)`, or 0 once `position` is at or past
    /// the end of the window. Every read and write clamps through this, so
    /// transfers never leave the mapped range.
    pub fn allowance(&self, position: u64, requested: u64) -> u64 {
        if position >= self.length {
            return 0;
        }
        requested.min(self.length - position)
    }

    /// Move the cursor and return its new position.
    ///
    /// The target is clamped into `[0, size]`. Takes the exclusive lock.
    pub fn seek(&self, offset: i64, whence: Seek) -> u64 {
        let mut cursor = self.cursor.write();
        *cursor = seek_target(*cursor, self.length, offset, whence);
        *cursor
    }

    /// Read at the cursor, advancing it by the transferred count.
    ///
    /// Takes the exclusive lock. Returns the number of bytes copied into
    /// `buf`, 0 at the end of the window.
    pub fn read(&self, buf: &mut [u8]) -> u64 {
        let mut cursor = self.cursor.write();
        let allowed = self.allowance(*cursor, buf.len() as u64);
        if allowed > 0 {
            self.copy_out(*cursor, &mut buf[..allowed as usize]);
        }
        *cursor += allowed;
        allowed
    }

    /// Read `requested` bytes at the cursor into `buf`, growing `buf` to the
    /// transfer size first if it is smaller.
    ///
    /// Takes the exclusive lock and advances the cursor.
    pub fn read_vec(&self, buf: &mut Vec<u8>, requested: u64) -> u64 {
        let mut cursor = self.cursor.write();
        let allowed = self.allowance(*cursor, requested);
        let count = allowed as usize;
        if buf.len() < count {
            buf.resize(count, 0);
        }
        if count > 0 {
            self.copy_out(*cursor, &mut buf[..count]);
        }
        *cursor += allowed;
        allowed
    }

    /// Read at an explicit offset. Lock-free; the cursor does not move.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> u64 {
        let allowed = self.allowance(offset, buf.len() as u64);
        if allowed > 0 {
            self.copy_out(offset, &mut buf[..allowed as usize]);
        }
        allowed
    }

    /// Read `requested` bytes at an explicit offset into `buf`, growing
    /// `buf` to the transfer size first if it is smaller.
    ///
    /// Lock-free; the cursor does not move.
    pub fn read_vec_at(&self, offset: u64, buf: &mut Vec<u8>, requested: u64) -> u64 {
        let allowed = self.allowance(offset, requested);
        let count = allowed as usize;
        if buf.len() < count {
            buf.resize(count, 0);
        }
        if count > 0 {
            self.copy_out(offset, &mut buf[..count]);
        }
        allowed
    }

    /// Write at the cursor, advancing it by the transferred count.
    ///
    /// Takes the exclusive lock. Transfers 0 bytes through views of
    /// read-only files.
    pub fn write(&self, buf: &[u8]) -> u64 {
        if !self.writable() {
            return 0;
        }
        let mut cursor = self.cursor.write();
        let allowed = self.allowance(*cursor, buf.len() as u64);
        if allowed > 0 {
            self.copy_in(*cursor, &buf[..allowed as usize]);
        }
        *cursor += allowed;
        allowed
    }

    /// Write at an explicit offset. Lock-free; the cursor does not move.
    ///
    /// Transfers 0 bytes through views of read-only files.
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> u64 {
        if !self.writable() {
            return 0;
        }
        let allowed = self.allowance(offset, buf.len() as u64);
        if allowed > 0 {
            self.copy_in(offset, &buf[..allowed as usize]);
        }
        allowed
    }

    /// Flush the mapped range to the underlying file.
    ///
    /// Synchronous `msync` on POSIX, `FlushViewOfFile` plus
    /// `FlushFileBuffers` on Windows, both against the granularity-aligned
    /// map base. Meaningful only for writable views.
    pub fn flush(&self) -> bool {
        match self.map.flush() {
            Ok(()) => true,
            Err(err) => {
                debug!("flush of {} failed: {err}", self.file.path().display());
                false
            }
        }
    }

    fn writable(&self) -> bool {
        if self.file.access().is_writable() {
            return true;
        }
        debug!(
            "write through read-only view of {}",
            self.file.path().display()
        );
        false
    }

    fn copy_out(&self, position: u64, buf: &mut [u8]) {
        // SAFETY: callers clamp through `allowance`, so
        // [position, position + buf.len()) lies inside the mapped window,
        // which stays mapped for the life of `self`. `buf` is a distinct
        // allocation, so the ranges cannot overlap.
        unsafe {
            ptr::copy_nonoverlapping(
                self.map.as_mut_ptr().add(position as usize) as *const u8,
                buf.as_mut_ptr(),
                buf.len(),
            );
        }
    }

    fn copy_in(&self, position: u64, buf: &[u8]) {
        // SAFETY: as in `copy_out`, plus `writable()` has checked that the
        // mapping was created read-write.
        unsafe {
            ptr::copy_nonoverlapping(
                buf.as_ptr(),
                self.map.as_mut_ptr().add(position as usize),
                buf.len(),
            );
        }
    }
}

impl Drop for View {
    fn drop(&mut self) {
        if self.file.access().is_writable()
            && let Err(err) = self.map.flush()
        {
            warn!(
                "flush during view teardown of {} failed: {err}",
                self.file.path().display()
            );
        }
        // MmapRaw unmaps from the aligned base when it drops; the parent
        // file handle is released after that.
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("file", &self.file.path())
            .field("file_offset", &self.file_offset)
            .field("length", &self.length)
            .finish()
    }
}

// SAFETY: the mapping is plain memory owned by the view; cursor state is
// behind a lock and the unsynchronised offset-explicit paths carry their
// no-overlap contract in the API docs.
unsafe impl Send for View {}
unsafe impl Sync for View {}
