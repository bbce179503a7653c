//! Shared fixtures for the tests in this crate.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use cape_errors::compile::{Error, Result};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::{
    config::ProjectConfig,
    toolchain::{account::Syntax, library::CairoLibrary},
};

/// A scratch project with a `contracts` folder and a package store.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("contracts"))?;
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn contracts(&self) -> PathBuf {
        self.root().join("contracts")
    }

    pub fn packages(&self) -> PathBuf {
        self.root().join(".packages")
    }

    /// Creates the configuration for this project with the provided Cairo
    /// dependency declarations and resolved project dependencies.
    pub fn config(&self, cairo: &[&str], project: &[&str]) -> ProjectConfig {
        ProjectConfig::new(self.root())
            .with_cairo_dependencies(cairo)
            .with_project_dependencies(project)
    }

    /// Writes a contract source at `relative` within the contracts folder.
    pub fn write_source(&self, relative: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.contracts().join(relative);
        fs::create_dir_all(path.parent().expect("sources have parents"))?;
        fs::write(&path, content)?;
        Ok(path)
    }
}

/// Writes a package manifest with the provided `sources` for `name` at
/// `version` into the package store at `packages`.
pub fn write_manifest(
    packages: &Path,
    name: &str,
    version: &str,
    sources: &Value,
) -> anyhow::Result<()> {
    let dir = packages.join(name).join(version);
    fs::create_dir_all(&dir)?;
    fs::write(
        dir.join(format!("{name}.json")),
        json!({"manifest": "ethpm/3", "name": name, "sources": sources}).to_string(),
    )?;
    Ok(())
}

/// Installs an executable shell script called `name` into `bin`.
#[cfg(unix)]
pub fn install_tool(bin: &Path, name: &str, script: &str) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(bin)?;
    let path = bin.join(name);
    fs::write(&path, format!("#!/bin/sh\n{script}\n"))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// A [`CairoLibrary`] that fakes compilation, producing a class whose ABI has a
/// function and a legacy-format event.
///
/// Sources containing `fail` are rejected with their contents as the message.
#[derive(Debug, Default)]
pub struct FakeLibrary {
    /// Every invocation, as the compiled source and its account flag.
    pub calls: Mutex<Vec<(PathBuf, bool)>>,

    /// The search paths of the most recent invocation.
    pub search_paths: Mutex<Vec<PathBuf>>,
}

impl CairoLibrary for FakeLibrary {
    fn compile(&self, source: &Path, search_paths: &[PathBuf], is_account: bool) -> Result<String> {
        let content = fs::read_to_string(source)?;
        if content.contains("fail") {
            return Err(Error::FailedToCompile {
                file:    source.display().to_string(),
                message: content,
            });
        }

        self.calls
            .lock()
            .expect("lock is not poisoned")
            .push((source.to_path_buf(), is_account));
        *self.search_paths.lock().expect("lock is not poisoned") = search_paths.to_vec();

        Ok(json!({
            "abi": [
                {"type": "function", "name": "get", "inputs": [], "outputs": [{"name": "v", "type": "felt"}]},
                {"type": "event", "name": "Changed", "keys": [], "data": [{"name": "v", "type": "felt"}]},
            ],
            "program": {"source": content},
        })
        .to_string())
    }

    fn version(&self) -> String {
        "0.10.3".to_string()
    }

    fn syntax(&self) -> Syntax {
        Syntax::Legacy
    }
}
