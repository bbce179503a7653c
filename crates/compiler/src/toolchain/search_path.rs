//! Computation of the paths that the toolchain resolves imports against.

use std::{
    io,
    path::{Path, PathBuf},
};

use crate::dependency::{subdirectories, CACHE_DIR};

/// Computes the import search paths for compiling against `base_path`.
///
/// These are the base path itself, followed by every materialized
/// dependency-version directory `<base_path>/.cache/<name>/<version>`, in name
/// order.
///
/// # Errors
///
/// - [`io::Error`] if the dependency cache exists but cannot be listed.
pub fn search_paths(base_path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = vec![base_path.to_path_buf()];

    let cache_dir = base_path.join(CACHE_DIR);
    if cache_dir.is_dir() {
        for dependency_dir in subdirectories(&cache_dir)? {
            paths.extend(subdirectories(&dependency_dir)?);
        }
    }

    Ok(paths)
}
