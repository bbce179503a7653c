//! The in-process toolchain generation, where the Cairo compiler is called
//! directly as a library.

use std::{
    collections::BTreeMap,
    fmt::{Debug, Display},
    path::{Path, PathBuf},
};

use cairo_lang_compiler::{
    db::RootDatabase,
    project::{setup_project, update_crate_roots_from_project_config},
    CompilerConfig,
};
use cairo_lang_project::{ProjectConfig, ProjectConfigContent};
use cairo_lang_starknet::{compile::compile_contract_in_prepared_db, starknet_plugin_suite};
use cape_errors::compile::{Error, Result};
use tracing::debug;

use crate::{dependency::CACHE_DIR, toolchain::account::Syntax};

/// The version of the `cairo-lang` crates that [`CairoLangLibrary`] compiles
/// with.
pub const CAIRO_LANG_VERSION: &str = "2.8.2";

/// A Cairo compiler that can be called in-process.
///
/// Implementations produce the JSON serialization of a compiled contract
/// class, whose `abi` field holds the contract's ABI.
pub trait CairoLibrary
where
    Self: Debug + Send + Sync,
{
    /// Compiles the contract at `source`, resolving imports against
    /// `search_paths` and generating account-contract code if `is_account` is
    /// set.
    ///
    /// # Errors
    ///
    /// - [`Error::FailedToCompile`] if the contract could not be compiled.
    fn compile(&self, source: &Path, search_paths: &[PathBuf], is_account: bool)
        -> Result<String>;

    /// Gets the version of the compiler.
    fn version(&self) -> String;

    /// Gets the source syntax that the compiler accepts.
    fn syntax(&self) -> Syntax {
        Syntax::Modern
    }
}

/// The default [`CairoLibrary`], backed by the `cairo-lang` crates.
///
/// Modern Cairo resolves imports through crates rather than directories, so
/// every materialized dependency among the search paths is registered as a
/// crate named after the dependency (see [`dependency_crate_roots`]). The
/// source itself is compiled as a single-file crate. There is no
/// account-contract mode, so that flag is unused.
#[derive(Clone, Debug)]
pub struct CairoLangLibrary {
    replace_ids: bool,
}

impl CairoLangLibrary {
    /// Creates a new library compiler, which replaces identifiers with their
    /// human-readable names if `replace_ids` is set.
    #[must_use]
    pub fn new(replace_ids: bool) -> Self {
        Self { replace_ids }
    }
}

impl Default for CairoLangLibrary {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CairoLibrary for CairoLangLibrary {
    fn compile(
        &self,
        source: &Path,
        search_paths: &[PathBuf],
        _is_account: bool,
    ) -> Result<String> {
        let file = source.display().to_string();

        let mut db = RootDatabase::builder()
            .detect_corelib()
            .with_plugin_suite(starknet_plugin_suite())
            .build()
            .map_err(|e| failed_to_compile(&file, e))?;

        let crate_roots = dependency_crate_roots(search_paths);
        debug!(?crate_roots, "Registering dependency crates");
        let base_path = source.parent().unwrap_or_else(|| Path::new("."));
        let dependencies = dependency_project(base_path, &crate_roots)
            .map_err(|e| failed_to_compile(&file, e))?;
        update_crate_roots_from_project_config(&mut db, &dependencies);

        let main_crate_ids =
            setup_project(&mut db, source).map_err(|e| failed_to_compile(&file, e))?;
        let config = CompilerConfig {
            replace_ids: self.replace_ids,
            ..CompilerConfig::default()
        };
        let class = compile_contract_in_prepared_db(&db, None, main_crate_ids, config)
            .map_err(|e| failed_to_compile(&file, e))?;

        serde_json::to_string(&class).map_err(|e| Error::InvalidOutput {
            file,
            message: e.to_string(),
        })
    }

    fn version(&self) -> String {
        CAIRO_LANG_VERSION.to_string()
    }
}

fn failed_to_compile(file: &str, error: impl Display) -> Error {
    Error::FailedToCompile {
        file:    file.to_string(),
        message: format!("{error:#}"),
    }
}

/// Gets the crate roots for the materialized dependencies among
/// `search_paths`, keyed by dependency name.
///
/// Only directories of the form `.cache/<name>/<version>` are dependencies. If
/// more than one version of a dependency is present, the first in search order
/// is used.
#[must_use]
pub fn dependency_crate_roots(search_paths: &[PathBuf]) -> BTreeMap<String, PathBuf> {
    let mut roots = BTreeMap::new();
    for path in search_paths {
        let Some(dependency_dir) = path.parent() else {
            continue;
        };
        let in_cache = dependency_dir
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|n| n == CACHE_DIR);
        if let (true, Some(name)) = (in_cache, dependency_dir.file_name()) {
            roots
                .entry(name.to_string_lossy().into_owned())
                .or_insert_with(|| path.clone());
        }
    }

    roots
}

/// Builds a Cairo project configuration that declares each of `crate_roots`.
fn dependency_project(
    base_path: &Path,
    crate_roots: &BTreeMap<String, PathBuf>,
) -> std::result::Result<ProjectConfig, toml::de::Error> {
    let roots: toml::Table = crate_roots
        .iter()
        .map(|(name, root)| (name.clone(), toml::Value::String(root.display().to_string())))
        .collect();
    let mut content = toml::Table::new();
    content.insert("crate_roots".to_string(), toml::Value::Table(roots));

    Ok(ProjectConfig {
        base_path: base_path.to_path_buf(),
        corelib:   None,
        content:   toml::Value::Table(content).try_into::<ProjectConfigContent>()?,
    })
}
