//! The project configuration consumed by the compilation pipeline.
//!
//! The configuration is always passed explicitly to the parts of the pipeline
//! that need it, and is never read from ambient state. It can be built in code,
//! or loaded from a `cape.toml` file at the root of a project:
//!
//! ```toml
//! contracts_folder = "contracts"
//! packages_folder = ".packages"
//! project_dependencies = ["OpenZeppelin"]
//!
//! [cairo]
//! dependencies = ["OpenZeppelin@0.2.0"]
//!
//! [toolchain]
//! generation = "two-stage"
//! allowed_libfuncs_list_name = "audited"
//! ```
//!
//! Relative paths are resolved against the directory containing the file.

use std::path::{Path, PathBuf};

use cape_errors::config::{Error, Result};
use serde::Deserialize;

/// The name of the configuration file within a project directory.
pub const CONFIG_FILE: &str = "cape.toml";

/// The directory, relative to the project root, that intermediate toolchain
/// output is persisted to.
pub const BUILD_CACHE_DIR: &str = ".build-cache";

/// The configuration of a single project.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// The root directory of the project.
    #[serde(skip)]
    pub project_root: PathBuf,

    /// The folder containing the contract sources, and the default base path
    /// for compilation.
    pub contracts_folder: PathBuf,

    /// The package store that dependency manifests are read from.
    pub packages_folder: PathBuf,

    /// The names of the dependencies that the host project has resolved.
    pub project_dependencies: Vec<String>,

    /// The Cairo-specific configuration.
    pub cairo: CairoConfig,

    /// The configuration of the external toolchain.
    pub toolchain: ToolchainConfig,
}

impl ProjectConfig {
    /// Creates the default configuration for the project rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::default().rooted_at(&root.into())
    }

    /// Loads the configuration for the project in `project_dir`.
    ///
    /// If the project has no configuration file, the defaults are returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the configuration file exists but cannot be read.
    /// - [`Error::Parse`] if the configuration file is invalid.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.is_file() {
            return Ok(Self::new(project_dir));
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| Error::Io {
            path: config_path.display().to_string(),
            source,
        })?;
        Ok(Self::from_toml_str(&content)?.rooted_at(project_dir))
    }

    /// Parses a configuration from the provided TOML `content`.
    ///
    /// Paths in the result are left exactly as written; see
    /// [`Self::rooted_at`].
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] if `content` is not a valid configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Sets the project root to `root`, resolving every relative path in the
    /// configuration against it.
    #[must_use]
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.contracts_folder = root.join(&self.contracts_folder);
        self.packages_folder = root.join(&self.packages_folder);
        self.toolchain.search_path = self
            .toolchain
            .search_path
            .iter()
            .map(|p| root.join(p))
            .collect();
        self.toolchain.manifest_path = self.toolchain.manifest_path.map(|p| root.join(p));
        self.project_root = root.to_path_buf();
        self
    }

    /// Sets the Cairo dependency declarations, returning the configuration.
    #[must_use]
    pub fn with_cairo_dependencies(mut self, declarations: &[&str]) -> Self {
        self.cairo.dependencies = declarations.iter().map(ToString::to_string).collect();
        self
    }

    /// Sets the names of the dependencies the project has resolved, returning
    /// the configuration.
    #[must_use]
    pub fn with_project_dependencies(mut self, names: &[&str]) -> Self {
        self.project_dependencies = names.iter().map(ToString::to_string).collect();
        self
    }

    /// Gets the directory that intermediate toolchain output is written to.
    #[must_use]
    pub fn build_cache_dir(&self) -> PathBuf {
        self.project_root.join(BUILD_CACHE_DIR)
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_root:         PathBuf::new(),
            contracts_folder:     PathBuf::from("contracts"),
            packages_folder:      PathBuf::from(".packages"),
            project_dependencies: Vec::new(),
            cairo:                CairoConfig::default(),
            toolchain:            ToolchainConfig::default(),
        }
    }
}

/// The configuration specific to Cairo.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct CairoConfig {
    /// Dependency declarations of the form `name` or `name@version`, in the
    /// order that they are materialized.
    pub dependencies: Vec<String>,
}

/// The generations of the Cairo toolchain that can be driven.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Generation {
    /// The compiler is called in-process as a library.
    Library,

    /// A single `starknet-compile` binary is executed.
    Cli,

    /// `starknet-compile` is executed, and its output lowered to CASM with
    /// `starknet-sierra-compile`.
    #[default]
    TwoStage,
}

/// The configuration of the external toolchain.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// The toolchain generation to drive.
    pub generation: Generation,

    /// Directories searched for the toolchain binaries before `PATH`.
    pub search_path: Vec<PathBuf>,

    /// A cargo manifest from which the toolchain binaries can be built and run
    /// if they cannot be found.
    pub manifest_path: Option<PathBuf>,

    /// Whether to ask the compiler to replace identifiers with their
    /// human-readable names.
    pub replace_ids: bool,

    /// The name of the allowed libfuncs list to validate against.
    pub allowed_libfuncs_list_name: Option<String>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            generation:                 Generation::default(),
            search_path:                Vec::new(),
            manifest_path:              None,
            replace_ids:                true,
            allowed_libfuncs_list_name: None,
        }
    }
}
