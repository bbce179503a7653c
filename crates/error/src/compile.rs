//! Error types and utilities to do with driving the Cairo toolchain and
//! reading back what it produces.

use thiserror::Error;

/// The result type for use in the compiler.
pub type Result<T> = std::result::Result<T, Error>;

/// This error type is for use during the process of compiling a Cairo source
/// file into a contract artifact.
///
/// Messages from external tools are wrapped verbatim so that they can be used
/// for diagnosis.
#[derive(Debug, Error)]
pub enum Error {
    /// A dependency's manifest could not be found in the package store and no
    /// cached copy excuses its absence.
    #[error("Dependency '{name}={version}' missing.")]
    DependencyMissing { name: String, version: String },

    /// The toolchain rejected a source file.
    #[error("Failed to compile '{file}': {message}")]
    FailedToCompile { file: String, message: String },

    /// The toolchain produced output that we were unable to understand.
    #[error("Invalid compiler output for '{file}': {message}")]
    InvalidOutput { file: String, message: String },

    /// A dependency manifest exists but could not be parsed.
    #[error("Invalid package manifest at `{path}`: {message}")]
    InvalidManifest { path: String, message: String },

    /// An error when doing IO during compilation.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// An external tool wrote to its standard error stream. This is treated as
    /// fatal regardless of its exit status.
    #[error("`{tool}` reported an error: {stderr}")]
    ToolFailed { tool: String, stderr: String },

    /// The named executable was not present on any of the directories that the
    /// toolchain is looked up in.
    #[error("Could not locate `{_0}` on the toolchain search path")]
    ToolNotFound(String),

    /// A source file that was not valid UTF-8 text.
    #[error("Source file '{_0}' is not valid UTF-8")]
    UnsupportedSource(String),
}
