use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::directory::Directory;
use super::file::{CreateFile, VfsFilePointer};
use super::path::resolve_symlinks;
use super::{FileSystem, FileSystemPointer, HashFunction, HashedIdentity};
use crate::storage::FileAccess;

/// A [`FileSystem`] composing one writable "userland" directory with an
/// ordered stack of read-only "dataland" mounts.
///
/// Dataland behaves as a stack: the most recently mounted filesystem is
/// searched first, so patch archives mounted over base data shadow it
/// without modifying it. Userland sits above the whole stack (a player's
/// own files shadow everything shipped) and is the only layer that can be
/// opened for writing.
///
/// Name lookups that miss every layer are retried once by hash when a
/// [`HashFunction`] is configured. Hash lookups never consult userland and
/// never fall back to strings.
///
/// Mounting takes `&mut self`; set the stack up before sharing the server.
///
/// # Example
///
/// ```ignore
/// let mut server: StorageServer<PlatformFile> =
///     StorageServer::create(profile_dir, Some(name_hash))?;
/// server.mount(base_archive);
/// server.mount(patch_archive); // searched before base_archive
/// let file = server.file_by_name("settings.cfg", FileAccess::READ)?;
/// ```
pub struct StorageServer<F> {
    dataland: Vec<FileSystemPointer>,
    userland: Arc<Directory<F>>,
    hash_function: Option<HashFunction>,
}

impl<F: CreateFile + 'static> StorageServer<F> {
    /// Build a server over an existing userland directory.
    ///
    /// `userland_path` is resolved through any symlink chain and must
    /// already be a directory; the server does not create it. The dataland
    /// stack starts empty.
    pub fn create(
        userland_path: impl AsRef<Path>,
        hash_function: Option<HashFunction>,
    ) -> Option<StorageServer<F>> {
        let resolved = resolve_symlinks(userland_path.as_ref());
        if !resolved.is_dir() {
            debug!("userland {} is not a directory", resolved.display());
            return None;
        }
        Some(StorageServer {
            dataland: Vec::new(),
            userland: Directory::new(resolved),
            hash_function,
        })
    }

    /// The writable userland directory.
    pub fn userland(&self) -> &Arc<Directory<F>> {
        &self.userland
    }

    /// Number of dataland mounts.
    pub fn mount_count(&self) -> usize {
        self.dataland.len()
    }

    /// Mount a filesystem on top of the dataland stack (searched first).
    pub fn mount(&mut self, filesystem: FileSystemPointer) {
        self.dataland.push(filesystem);
    }

    /// Mount a filesystem at `position` in the dataland stack; 0 is the
    /// bottom (searched last).
    ///
    /// A position past the top degrades to a plain [`mount`](Self::mount);
    /// the return value reports whether the requested slot was used.
    pub fn mount_at(&mut self, filesystem: FileSystemPointer, position: usize) -> bool {
        if position > self.dataland.len() {
            self.dataland.push(filesystem);
            return false;
        }
        self.dataland.insert(position, filesystem);
        true
    }

    /// Look up a name in the dataland stack only, top of the stack first.
    ///
    /// When every mount misses and a hash function is configured, the name
    /// is hashed and the stack is walked once more by hash.
    pub fn dataland_file_by_name(&self, name: &str) -> Option<VfsFilePointer> {
        for mount in self.dataland.iter().rev() {
            if let Some(file) = mount.file_by_name(name, FileAccess::READ) {
                return Some(file);
            }
        }
        if let Some(hash) = &self.hash_function {
            return self.dataland_file_by_hash(hash(name));
        }
        None
    }

    /// Look up a hashed identity in the dataland stack only, top of the
    /// stack first. No string fallback.
    pub fn dataland_file_by_hash(&self, identity: HashedIdentity) -> Option<VfsFilePointer> {
        for mount in self.dataland.iter().rev() {
            if let Some(file) = mount.file_by_hash(identity, FileAccess::READ) {
                return Some(file);
            }
        }
        None
    }

    /// Open a file in the userland directory with the requested access.
    pub fn userland_file(&self, name: &str, access: FileAccess) -> Option<Arc<F>> {
        self.userland.file(name, access)
    }
}

impl<F: CreateFile + 'static> FileSystem for StorageServer<F> {
    /// The userland root.
    fn path(&self) -> &Path {
        self.userland.path()
    }

    /// Userland first, then the dataland stack (with its hash fallback).
    fn file_by_name(&self, name: &str, access: FileAccess) -> Option<VfsFilePointer> {
        if let Some(file) = self.userland_file(name, access) {
            return Some(file as VfsFilePointer);
        }
        self.dataland_file_by_name(name)
    }

    /// Dataland only; userland cannot be addressed by hash.
    fn file_by_hash(
        &self,
        identity: HashedIdentity,
        _access: FileAccess,
    ) -> Option<VfsFilePointer> {
        self.dataland_file_by_hash(identity)
    }
}

impl<F> std::fmt::Debug for StorageServer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageServer")
            .field("userland", &self.userland)
            .field("mounts", &self.dataland.len())
            .field("hashed", &self.hash_function.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{CreateFile, PlatformFile, VfsFile};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stratafs_srv_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn fnv1a(name: &str) -> u64 {
        let mut hash = 0xcbf29ce484222325u64;
        for byte in name.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }

    fn read_all(file: &VfsFilePointer) -> Vec<u8> {
        let mut buf = Vec::new();
        file.read_vec(&mut buf, file.size());
        buf
    }

    /// Dataland mount with a hash index instead of names, as a shipped
    /// archive without its string table would behave.
    struct HashedMount {
        root: PathBuf,
        entries: HashMap<HashedIdentity, String>,
    }

    impl HashedMount {
        fn new(root: PathBuf, names: &[&str]) -> Arc<HashedMount> {
            let entries = names
                .iter()
                .map(|name| (fnv1a(name), (*name).to_owned()))
                .collect();
            Arc::new(HashedMount { root, entries })
        }
    }

    impl FileSystem for HashedMount {
        fn path(&self) -> &Path {
            &self.root
        }

        fn file_by_name(&self, _name: &str, _access: FileAccess) -> Option<VfsFilePointer> {
            None
        }

        fn file_by_hash(
            &self,
            identity: HashedIdentity,
            access: FileAccess,
        ) -> Option<VfsFilePointer> {
            let name = self.entries.get(&identity)?;
            PlatformFile::create(&self.root.join(name), access)
                .map(|file| file as VfsFilePointer)
        }
    }

    fn server_with_userland(dir: &Path) -> StorageServer<PlatformFile> {
        let userland = dir.join("userland");
        std::fs::create_dir_all(&userland).unwrap();
        StorageServer::create(&userland, None).unwrap()
    }

    #[test]
    fn create_requires_an_existing_directory() {
        let dir = temp_dir("missing_userland");
        assert!(
            StorageServer::<PlatformFile>::create(dir.join("absent"), None).is_none()
        );

        let file_path = dir.join("plain.txt");
        std::fs::write(&file_path, b"x").unwrap();
        assert!(StorageServer::<PlatformFile>::create(&file_path, None).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn create_follows_userland_symlinks() {
        use std::os::unix::fs::symlink;

        let dir = temp_dir("symlink_userland");
        let real = dir.join("real");
        std::fs::create_dir_all(&real).unwrap();
        symlink(&real, dir.join("alias")).unwrap();

        let server =
            StorageServer::<PlatformFile>::create(dir.join("alias"), None).unwrap();
        assert_eq!(server.path(), real.as_path());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn userland_round_trip() {
        let dir = temp_dir("userland_rw");
        let server = server_with_userland(&dir);

        {
            let file = server
                .userland_file("save.dat", FileAccess::READ_WRITE)
                .unwrap();
            assert_eq!(file.write(b"progress"), 8);
        }

        let file = server.userland_file("save.dat", FileAccess::READ).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(file.read(&mut buf), 8);
        assert_eq!(&buf, b"progress");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn later_mounts_shadow_earlier_ones() {
        let dir = temp_dir("precedence");
        let mut server = server_with_userland(&dir);

        for (index, name) in ["d0", "d1", "d2"].iter().enumerate() {
            let mount_dir = dir.join(name);
            std::fs::create_dir_all(&mount_dir).unwrap();
            std::fs::write(mount_dir.join("X"), format!("from {index}")).unwrap();
            server.mount(Directory::<PlatformFile>::create(&mount_dir).unwrap());
        }

        let file = server.dataland_file_by_name("X").unwrap();
        assert_eq!(read_all(&file), b"from 2");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn userland_shadows_dataland() {
        let dir = temp_dir("shadow");
        let mut server = server_with_userland(&dir);

        let data = dir.join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("X"), b"B").unwrap();
        std::fs::write(dir.join("userland/X"), b"A").unwrap();
        server.mount(Directory::<PlatformFile>::create(&data).unwrap());

        let file = server.file_by_name("X", FileAccess::READ).unwrap();
        assert_eq!(read_all(&file), b"A");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn mount_at_positions_and_clamping() {
        let dir = temp_dir("positions");
        let mut server = server_with_userland(&dir);

        let make_mount = |name: &str, content: &str| {
            let mount_dir = dir.join(name);
            std::fs::create_dir_all(&mount_dir).unwrap();
            std::fs::write(mount_dir.join("X"), content).unwrap();
            Directory::<PlatformFile>::create(&mount_dir).unwrap()
        };

        server.mount(make_mount("base", "base"));
        // Slide underneath the stack: searched last.
        assert!(server.mount_at(make_mount("fallback", "fallback"), 0));
        // Position past the top clamps to a push.
        assert!(!server.mount_at(make_mount("patch", "patch"), 99));
        assert_eq!(server.mount_count(), 3);

        let file = server.dataland_file_by_name("X").unwrap();
        assert_eq!(read_all(&file), b"patch");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn name_misses_fall_back_to_hash_once_configured() {
        let dir = temp_dir("hash_fallback");
        let content_dir = dir.join("hashed_content");
        std::fs::create_dir_all(&content_dir).unwrap();
        std::fs::write(content_dir.join("level.bin"), b"geometry").unwrap();

        let userland = dir.join("userland");
        std::fs::create_dir_all(&userland).unwrap();

        let hash: HashFunction = Arc::new(fnv1a);
        let mut server =
            StorageServer::<PlatformFile>::create(&userland, Some(hash)).unwrap();
        server.mount(HashedMount::new(content_dir, &["level.bin"]));

        // The mount has no string index, so only the hash retry can hit.
        let by_name = server.file_by_name("level.bin", FileAccess::READ).unwrap();
        assert_eq!(read_all(&by_name), b"geometry");

        let by_hash = server.file_by_hash(fnv1a("level.bin"), FileAccess::READ).unwrap();
        assert_eq!(read_all(&by_hash), b"geometry");

        // Equivalence of the fallback and the explicit hash lookup.
        assert_eq!(
            server.dataland_file_by_name("level.bin").map(|f| read_all(&f)),
            server
                .dataland_file_by_hash(fnv1a("level.bin"))
                .map(|f| read_all(&f))
        );

        assert!(server.file_by_name("absent.bin", FileAccess::READ).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn without_a_hash_function_name_misses_stay_misses() {
        let dir = temp_dir("no_hash");
        let content_dir = dir.join("hashed_content");
        std::fs::create_dir_all(&content_dir).unwrap();
        std::fs::write(content_dir.join("level.bin"), b"geometry").unwrap();

        let mut server = server_with_userland(&dir);
        server.mount(HashedMount::new(content_dir, &["level.bin"]));

        assert!(server.file_by_name("level.bin", FileAccess::READ).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn hash_lookups_never_reach_userland() {
        let dir = temp_dir("hash_userland");
        let hash: HashFunction = Arc::new(fnv1a);

        let userland = dir.join("userland");
        std::fs::create_dir_all(&userland).unwrap();
        std::fs::write(userland.join("only_here.bin"), b"u").unwrap();

        let server =
            StorageServer::<PlatformFile>::create(&userland, Some(hash)).unwrap();
        assert!(
            server
                .file_by_hash(fnv1a("only_here.bin"), FileAccess::READ)
                .is_none()
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn directory_mounts_ignore_hash_lookups() {
        let dir = temp_dir("dir_hash");
        let mut server = server_with_userland(&dir);

        let data = dir.join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("X"), b"x").unwrap();
        server.mount(Directory::<PlatformFile>::create(&data).unwrap());

        assert!(server.dataland_file_by_hash(fnv1a("X")).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
