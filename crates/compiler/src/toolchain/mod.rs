//! The toolchain invoker, responsible for turning a single Cairo source file
//! into the raw output of the Cairo compiler.
//!
//! # Toolchain Generations
//!
//! The interface of the Cairo compiler has changed over time, and each
//! [`Toolchain`] variant drives one generation of it:
//!
//! - [`Toolchain::Library`] calls the compiler in-process through a
//!   [`CairoLibrary`], passing it the search paths and account flag directly.
//! - [`Toolchain::Cli`] runs `starknet-compile`, persisting its output to
//!   `.build-cache/sierra/<contract>.txt`.
//! - [`Toolchain::TwoStage`] runs `starknet-compile` to produce
//!   `.build-cache/starknet/<contract>.json`, and then `starknet-sierra-compile`
//!   to lower it to `.build-cache/starknet/casm/<contract>.casm`.
//!
//! Supporting a new generation means adding a variant here, and teaching
//! [`crate::normalize`] about its output if that has changed too.

pub mod account;
pub mod library;
pub mod process;
pub mod search_path;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use cape_errors::compile::{Error, Result};
use tracing::debug;

use crate::{
    config::{Generation, ToolchainConfig},
    toolchain::{
        account::Syntax,
        library::{CairoLangLibrary, CairoLibrary},
        process::{ProcessRunner, STARKNET_COMPILE},
    },
};

/// The directory within the build cache that single-stage output is written to.
pub const SIERRA_DIR: &str = "sierra";

/// The directory within the build cache that two-stage output is written to.
pub const STARKNET_DIR: &str = "starknet";

/// The directory within [`STARKNET_DIR`] that CASM is written to.
pub const CASM_DIR: &str = "casm";

/// A generation of the Cairo toolchain, along with what is needed to drive it.
#[derive(Clone, Debug)]
pub enum Toolchain {
    Library(Arc<dyn CairoLibrary>),
    Cli(ProcessRunner),
    TwoStage(ProcessRunner),
}

/// A request to compile a single source file.
#[derive(Clone, Copy, Debug)]
pub struct Invocation<'a> {
    /// The source file to compile.
    pub source: &'a Path,

    /// The name of the contract being compiled, used to name output files.
    pub contract_name: &'a str,

    /// The paths that imports are resolved against.
    pub search_paths: &'a [PathBuf],

    /// Whether the source is an account contract.
    pub is_account: bool,

    /// The directory that intermediate output is persisted to.
    pub build_cache: &'a Path,
}

/// The raw output of the toolchain for one source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawOutput {
    /// A compiled contract class, serialized as JSON.
    Class(String),

    /// A Sierra contract class, and the CASM class lowered from it, both
    /// serialized as JSON.
    Lowered { sierra: String, casm: String },
}

impl Toolchain {
    /// Creates the toolchain described by `config`.
    #[must_use]
    pub fn from_config(config: &ToolchainConfig) -> Self {
        match config.generation {
            Generation::Library => {
                Self::Library(Arc::new(CairoLangLibrary::new(config.replace_ids)))
            }
            Generation::Cli => Self::Cli(ProcessRunner::new(config)),
            Generation::TwoStage => Self::TwoStage(ProcessRunner::new(config)),
        }
    }

    /// Gets the generation of the toolchain.
    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            Self::Library(_) => Generation::Library,
            Self::Cli(_) => Generation::Cli,
            Self::TwoStage(_) => Generation::TwoStage,
        }
    }

    /// Gets the source syntax accepted by the toolchain.
    #[must_use]
    pub fn syntax(&self) -> Syntax {
        match self {
            Self::Library(library) => library.syntax(),
            Self::Cli(_) | Self::TwoStage(_) => Syntax::Modern,
        }
    }

    /// Gets the version of the toolchain.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the toolchain binary cannot be run.
    pub fn version(&self) -> Result<String> {
        match self {
            Self::Library(library) => Ok(library.version()),
            Self::Cli(runner) | Self::TwoStage(runner) => runner.version(STARKNET_COMPILE),
        }
    }

    /// Compiles the source described by `invocation`, returning the raw
    /// compiler output.
    ///
    /// Output files from previous invocations for the same contract are
    /// removed before the toolchain is run.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the toolchain cannot be found, fails, or does not
    ///   produce its expected output.
    pub fn invoke(&self, invocation: &Invocation) -> Result<RawOutput> {
        match self {
            Self::Library(library) => {
                let class = library.compile(
                    invocation.source,
                    invocation.search_paths,
                    invocation.is_account,
                )?;
                Ok(RawOutput::Class(class))
            }
            Self::Cli(runner) => {
                let output = invocation
                    .build_cache
                    .join(SIERRA_DIR)
                    .join(format!("{}.txt", invocation.contract_name));
                prepare_output(&output)?;

                runner.starknet_compile(invocation.source, &output)?;
                Ok(RawOutput::Class(read_output(invocation, &output)?))
            }
            Self::TwoStage(runner) => {
                let starknet_dir = invocation.build_cache.join(STARKNET_DIR);
                let sierra_output = starknet_dir.join(format!("{}.json", invocation.contract_name));
                let casm_output = starknet_dir
                    .join(CASM_DIR)
                    .join(format!("{}.casm", invocation.contract_name));
                prepare_output(&sierra_output)?;
                prepare_output(&casm_output)?;

                runner.starknet_compile(invocation.source, &sierra_output)?;
                runner.starknet_sierra_compile(&sierra_output, &casm_output)?;

                let sierra = read_output(invocation, &sierra_output)?;
                let casm = read_output(invocation, &casm_output)?;
                Ok(RawOutput::Lowered { sierra, casm })
            }
        }
    }
}

/// Ensures that the parent directory of `path` exists, and that there is
/// nothing at `path` itself.
fn prepare_output(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if path.is_file() {
        debug!(path = %path.display(), "Removing stale toolchain output");
        fs::remove_file(path)?;
    }

    Ok(())
}

/// Reads an output file that the toolchain should have written for
/// `invocation`.
fn read_output(invocation: &Invocation, path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::InvalidOutput {
        file:    invocation.source.display().to_string(),
        message: format!("could not read `{}`: {e}", path.display()),
    })
}
