//! This library compiles [Cairo](https://www.cairo-lang.org) contracts for
//! [Starknet](https://www.starknet.io) into portable contract artifacts, so that
//! a smart-contract build tool can treat them like any other contract.
//!
//! # Process Overview
//!
//! While more information can be found in the module-level documentation of
//! each part of this codebase, a brief overview of the compilation process can
//! be stated as follows:
//!
//! 1. The Cairo dependencies declared by the project are materialized from the
//!    package store into a cache beside the sources (see [`dependency`]). This
//!    always happens, even when there is nothing to compile, so that the cache
//!    is warm for later incremental builds.
//! 2. Each source file is handed, in the order given, to the configured
//!    generation of the Cairo toolchain, along with the paths to resolve
//!    imports against and whether it is an account contract (see
//!    [`toolchain`]).
//! 3. The raw compiler output is normalized into a [`ContractArtifact`] (see
//!    [`normalize`]).
//!
//! Compilation is single-threaded and synchronous. The first failure aborts the
//! whole request, and partial results are never returned.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

pub mod config;
pub mod dependency;
pub mod normalize;
pub mod source;
pub mod toolchain;

#[cfg(test)]
mod test_utils;

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use cape_artifact::{
    contract::{contract_name, SOURCE_EXTENSION},
    ContractArtifact,
};
use cape_errors::{compile, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::{
    config::ProjectConfig,
    toolchain::{account::is_account_contract, search_path::search_paths, Invocation, Toolchain},
};

/// The settings passed to the toolchain for a single version of it.
pub type CompilerSettings = Map<String, Value>;

/// Compiles Cairo sources into [`ContractArtifact`]s for a single project.
///
/// The compiler holds no state between calls other than what it leaves in the
/// filesystem caches, and so compiling the same sources twice is safe and
/// produces equivalent artifacts.
#[derive(Clone, Debug)]
pub struct Compiler {
    /// The configuration of the project being compiled.
    config: ProjectConfig,

    /// The toolchain generation that sources are compiled with.
    toolchain: Toolchain,
}

impl Compiler {
    /// The name under which the compiler is registered with the build tool.
    pub const NAME: &'static str = "cairo";

    /// Constructs a new compiler for the project described by `config`, using
    /// the provided `toolchain`.
    fn new(config: ProjectConfig, toolchain: Toolchain) -> Self {
        Self { config, toolchain }
    }

    /// Gets the name of the compiler.
    #[must_use]
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Gets the extensions of the source files that the compiler handles.
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        &[SOURCE_EXTENSION]
    }

    /// Gets the configuration of the project being compiled.
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Gets the toolchain that sources are compiled with.
    #[must_use]
    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    /// Gets the versions of the toolchain that would be used to compile
    /// `files`.
    ///
    /// Only a single toolchain is ever in use, so this is the same for all
    /// inputs.
    ///
    /// # Errors
    ///
    /// - [`compile::Error`] if the toolchain version cannot be determined.
    pub fn versions(&self, _files: &[PathBuf]) -> Result<BTreeSet<String>> {
        Ok(BTreeSet::from([self.toolchain.version()?]))
    }

    /// Gets the settings for each toolchain version used to compile `files`.
    ///
    /// # Errors
    ///
    /// - [`compile::Error`] if the toolchain version cannot be determined.
    pub fn compiler_settings(
        &self,
        files: &[PathBuf],
    ) -> Result<BTreeMap<String, CompilerSettings>> {
        Ok(self
            .versions(files)?
            .into_iter()
            .map(|v| (v, CompilerSettings::new()))
            .collect())
    }

    /// Materializes the project's Cairo dependencies beneath `base_path`, or
    /// beneath the contracts folder if no base path is provided.
    ///
    /// # Errors
    ///
    /// - See [`dependency::materialize`].
    pub fn load_dependencies(&self, base_path: Option<&Path>) -> Result<()> {
        let base_path = self.base_path(base_path);
        dependency::materialize(&self.config, &base_path)
    }

    /// Compiles `files` into one artifact each, in the order given.
    ///
    /// Source identifiers are computed relative to `base_path`, which defaults
    /// to the project's contracts folder. Dependencies are always materialized
    /// first, even if `files` is empty.
    ///
    /// # Errors
    ///
    /// - [`cape_errors::config::Error`] if the dependency configuration is
    ///   inconsistent.
    /// - [`compile::Error`] if any file fails to compile, in which case no
    ///   artifacts are returned.
    /// - [`cape_errors::Error::Io`] on any other filesystem failure.
    #[instrument(skip_all, fields(files = files.len()))]
    pub fn compile(
        &self,
        files: &[PathBuf],
        base_path: Option<&Path>,
    ) -> Result<Vec<ContractArtifact>> {
        let base_path = self.base_path(base_path);
        dependency::materialize(&self.config, &base_path)?;

        if files.is_empty() {
            return Ok(Vec::new());
        }

        let search_paths = search_paths(&base_path)?;
        debug!(?search_paths, "Computed toolchain search paths");

        files
            .iter()
            .map(|file| self.compile_file(file, &base_path, &search_paths))
            .collect()
    }

    /// Compiles a single `file` through the toolchain and normalizes the
    /// result.
    fn compile_file(
        &self,
        file: &Path,
        base_path: &Path,
        search_paths: &[PathBuf],
    ) -> Result<ContractArtifact> {
        let source = fs::read_to_string(file).map_err(|e| match e.kind() {
            ErrorKind::InvalidData => {
                compile::Error::UnsupportedSource(file.display().to_string()).into()
            }
            _ => cape_errors::Error::Io(e),
        })?;

        let is_account = is_account_contract(&source, self.toolchain.syntax());
        let contract_name = contract_name(&normalize::resolve_source_id(file, base_path)?);
        let build_cache = self.config.build_cache_dir();

        let invocation = Invocation {
            source: file,
            contract_name: &contract_name,
            search_paths,
            is_account,
            build_cache: &build_cache,
        };
        let raw = self.toolchain.invoke(&invocation)?;
        let artifact = normalize::normalize(&raw, file, base_path)?;

        info!(
            contract = %artifact.contract_name,
            account = is_account,
            "Compiled contract"
        );
        Ok(artifact)
    }

    /// Resolves the effective base path for a compilation request.
    fn base_path(&self, base_path: Option<&Path>) -> PathBuf {
        base_path.map_or_else(|| self.config.contracts_folder.clone(), Path::to_path_buf)
    }
}

/// Allows for building a [`Compiler`] instance while retaining the defaults for
/// fields that do not need to be customized.
pub struct CompilerBuilder {
    /// The configuration of the project being compiled.
    config: ProjectConfig,

    /// The toolchain to compile with, if not the one the configuration
    /// describes.
    toolchain: Option<Toolchain>,
}

impl CompilerBuilder {
    /// Creates a new compiler builder for the project described by `config`.
    ///
    /// The toolchain will be the one described by the configuration unless
    /// specified otherwise by calling [`Self::with_toolchain`].
    ///
    /// # API Style
    ///
    /// Please note that the API for the builder consumes `self` and is hence
    /// designed to have calls chained in the "fluent" API style.
    #[must_use]
    pub fn new(config: ProjectConfig) -> Self {
        let toolchain = None;
        Self { config, toolchain }
    }

    /// Specifies the toolchain for the compiler.
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    /// Builds a compiler from the specified configuration.
    #[must_use]
    pub fn build(self) -> Compiler {
        let toolchain = self
            .toolchain
            .unwrap_or_else(|| Toolchain::from_config(&self.config.toolchain));
        Compiler::new(self.config, toolchain)
    }
}
