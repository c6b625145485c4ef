//! Symlink resolution shared by the directory-walking components.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

/// Longest symlink chain that will be followed before giving up.
///
/// Matches the order of magnitude kernels use for ELOOP. A cycle (or an
/// absurdly deep chain) leaves the last link target unresolved; the caller's
/// subsequent is-a-directory / open check then fails naturally.
const MAX_LINK_DEPTH: u32 = 40;

/// Follow symbolic links until a non-link is reached.
///
/// Relative link targets are resolved against the link's parent directory.
/// Paths that do not exist (or whose chain exceeds [`MAX_LINK_DEPTH`]) are
/// returned as-is; existence is the caller's concern.
pub fn resolve_symlinks(path: &Path) -> PathBuf {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_LINK_DEPTH {
        let is_link = fs::symlink_metadata(&current)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if !is_link {
            return current;
        }
        match fs::read_link(&current) {
            Ok(target) if target.is_absolute() => current = target,
            Ok(target) => {
                current = match current.parent() {
                    Some(parent) => parent.join(target),
                    None => target,
                };
            }
            Err(err) => {
                debug!("cannot read link {}: {err}", current.display());
                return current;
            }
        }
    }
    debug!(
        "symlink chain from {} exceeds {MAX_LINK_DEPTH} links",
        path.display()
    );
    current
}
