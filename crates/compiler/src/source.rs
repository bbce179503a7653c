//! Enumeration of the Cairo sources in a project.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use cape_artifact::contract::SOURCE_EXTENSION;

/// Collects every Cairo source beneath `dir`, sorted by path.
///
/// Hidden directories are skipped, which excludes both the dependency cache and
/// the build cache.
///
/// # Errors
///
/// - [`io::Error`] if a directory cannot be read.
pub fn collect_sources(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    collect_into(dir, &mut sources)?;
    sources.sort();
    Ok(sources)
}

fn collect_into(dir: &Path, sources: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));

        if path.is_dir() {
            if !hidden {
                collect_into(&path, sources)?;
            }
        } else if path.to_string_lossy().ends_with(SOURCE_EXTENSION) {
            sources.push(path);
        }
    }

    Ok(())
}
