//! Error types to do with the project configuration, and in particular the way
//! it declares its Cairo dependencies.

use thiserror::Error;

/// The result type for use when loading and validating configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// This error type is for use when the project configuration is inconsistent.
///
/// These are always fatal and are never retried.
#[derive(Debug, Error)]
pub enum Error {
    /// The package store has more than one version of a dependency that was
    /// declared without an explicit version.
    #[error("Ambiguous dependency version for '{_0}'. Use 'name@version' syntax to clarify.")]
    AmbiguousVersion(String),

    /// A dependency declaration string could not be understood.
    #[error("Invalid dependency declaration '{_0}'")]
    InvalidDependencySpec(String),

    /// The package store has a directory for the dependency but no versions
    /// within it.
    #[error("No versions found for dependency '{_0}'.")]
    NoVersions(String),

    /// The dependency is declared for Cairo but the project does not know about
    /// it.
    #[error("Dependency '{_0}' not configured.")]
    NotConfigured(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration at `{path}`: {source}")]
    Io {
        path:   String,
        source: std::io::Error,
    },

    /// The configuration file was not valid.
    #[error("Failed to parse configuration: {_0}")]
    Parse(String),
}
