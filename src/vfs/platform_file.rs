use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::file::{CreateFile, VfsFile};
use crate::storage::{self, FileAccess, Seek, seek_target};

/// A [`VfsFile`] backed directly by a [`storage::File`].
///
/// No view is held between calls: every transfer maps a throwaway
/// [`storage::View`](crate::storage::View) over exactly the range it needs,
/// copies, and drops it. Writes flush that view before dropping it, so they
/// are durable on return. Formats that hop around a file constantly are
/// better served by an archive implementation holding longer-lived views.
pub struct PlatformFile {
    stored: storage::File,
    cursor: RwLock<u64>,
}

impl PlatformFile {
    /// The underlying storage file, for callers that need to take views of
    /// their own (archive loaders, mostly).
    pub fn stored_file(&self) -> &storage::File {
        &self.stored
    }

    /// Wrap an already-open storage file at cursor zero.
    pub fn from_storage(stored: storage::File) -> Arc<PlatformFile> {
        Arc::new(PlatformFile {
            stored,
            cursor: RwLock::new(0),
        })
    }
}

impl CreateFile for PlatformFile {
    fn create(path: &Path, access: FileAccess) -> Option<Arc<PlatformFile>> {
        storage::File::create(path, access).map(Self::from_storage)
    }
}

impl VfsFile for PlatformFile {
    fn seek(&self, offset: i64, whence: Seek) -> u64 {
        let mut cursor = self.cursor.write();
        *cursor = seek_target(*cursor, self.stored.size(), offset, whence);
        *cursor
    }

    fn tell(&self) -> u64 {
        *self.cursor.read()
    }

    fn size(&self) -> u64 {
        self.stored.size()
    }

    fn read(&self, buf: &mut [u8]) -> u64 {
        let mut cursor = self.cursor.write();
        let Some(view) = self.stored.get_view(*cursor, buf.len() as u64) else {
            return 0;
        };
        let count = view.read(buf);
        *cursor += count;
        count
    }

    fn read_vec(&self, buf: &mut Vec<u8>, requested: u64) -> u64 {
        let mut cursor = self.cursor.write();
        let Some(view) = self.stored.get_view(*cursor, requested) else {
            return 0;
        };
        let count = view.read_vec(buf, requested);
        *cursor += count;
        count
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> u64 {
        let _cursor = self.cursor.read();
        let Some(view) = self.stored.get_view(offset, buf.len() as u64) else {
            return 0;
        };
        view.read(buf)
    }

    fn read_vec_at(&self, offset: u64, buf: &mut Vec<u8>, requested: u64) -> u64 {
        let _cursor = self.cursor.read();
        let Some(view) = self.stored.get_view(offset, requested) else {
            return 0;
        };
        view.read_vec(buf, requested)
    }

    fn write(&self, buf: &[u8]) -> u64 {
        let mut cursor = self.cursor.write();
        let Some(view) = self.stored.get_view(*cursor, buf.len() as u64) else {
            return 0;
        };
        let count = view.write(buf);
        *cursor += count;
        view.flush();
        count
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> u64 {
        let _cursor = self.cursor.read();
        let Some(view) = self.stored.get_view(offset, buf.len() as u64) else {
            return 0;
        };
        let count = view.write(buf);
        view.flush();
        count
    }
}

impl std::fmt::Debug for PlatformFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformFile")
            .field("path", &self.stored.path())
            .finish()
    }
}
