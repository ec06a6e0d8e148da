// Scope checks for watched paths: inside the root, inside `.git`.

use std::ffi::OsStr;
use std::path::{Component, Path};

/// Name of the repository metadata directory.
const GIT_DIR_NAME: &str = ".git";

/// Returns true if `path` is the root itself or lies below it.
///
/// Both paths are compared component-wise as given; callers canonicalize.
pub fn is_inside_root(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

/// Returns true if `path` is a `.git` directory under `root` or anything
/// inside one. Nested repositories (submodules) count too.
///
/// Paths outside `root` are never git-internal.
pub fn is_git_internal(path: &Path, root: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == OsStr::new(GIT_DIR_NAME)))
}
