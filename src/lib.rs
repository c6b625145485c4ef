//! Layered virtual file system for games, modding tools, and content
//! pipelines.
//!
//! The crate has two halves:
//!
//! - [`storage`]: the memory-mapped storage engine. A [`storage::File`]
//!   owns an open platform file and vends [`storage::View`]s: live mappings
//!   over byte ranges of the file, each with its own read/write cursor.
//!   Writable views grow the file on demand and flush to disk on request or
//!   at teardown.
//! - [`vfs`]: the mount/resolver stack on top. A [`vfs::FileSystem`] hands
//!   out stream-like [`vfs::VfsFile`]s by string name or pre-hashed 64-bit
//!   identity. Implementations: [`vfs::Directory`] (loose files on disk),
//!   caller-defined [`vfs::Archive`]s loaded through the
//!   [`vfs::ArchiveSystem`] probe registry, and [`vfs::StorageServer`],
//!   which layers one writable "userland" directory over an ordered stack
//!   of read-only "dataland" mounts.
//!
//! # Lookup precedence
//!
//! A [`vfs::StorageServer`] resolves a name against userland first, then
//! walks the dataland stack from the most recently mounted filesystem down.
//! Mounting a patch archive on top of base data therefore shadows the base
//! without touching it, and a user's own files shadow everything. If a
//! [`vfs::HashFunction`] is configured, a name that misses every mount is
//! retried once as `hash(name)` against the hash-indexed mounts.
//!
//! # Concurrency
//!
//! All operations are synchronous and blocking. Views and platform files
//! serialise cursor movement through a shared-exclusive lock; offset-explicit
//! reads and writes may overlap freely. Mount tables and loader registries
//! take `&mut self` to mutate; configure them before sharing.
//!
//! # Failure contract
//!
//! Factories and lookups return `Option`: any failure (missing path, denied
//! open, failed mapping, no matching mount or loader) yields `None`, with
//! the cause logged through the [`log`] facade at `debug!` level. Transfer
//! operations return the byte count moved; `0` means end-of-range or an
//! internal failure.

pub mod storage;
pub mod vfs;

pub use storage::{File, FileAccess, Seek, View};
pub use vfs::{
    AUTO_FULL_MAP_SIZE, Archive, ArchiveLoader, ArchivePointer, ArchiveSystem, CreateFile,
    Directory, FileSystem, FileSystemPointer, HashFunction, HashedIdentity, PlatformFile,
    StorageServer, VfsFile, VfsFilePointer,
};
