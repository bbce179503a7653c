//! Error handling types and utilities.
//!
//! # Error Conventions
//!
//! As we are providing a library that others may want to interact with from
//! _code_ as well as from the CLI driver, we keep our errors strongly typed at
//! all times. While libraries like
//! [anyhow](https://docs.rs/anyhow/latest/anyhow/) are well-suited for
//! application code, they make it more difficult than is necessary to handle
//! specific errors in library code. To that end, we make sure that our errors
//! are kept strongly typed within the library as much as is possible.
//!
//! The taxonomy is deliberately small:
//!
//! - [`config::Error`] for a project configuration that references its
//!   dependencies inconsistently.
//! - [`compile::Error`] for anything that goes wrong while locating, running,
//!   or reading the output of the Cairo toolchain.
//!
//! Filesystem errors are not specially handled and surface as
//! [`Error::Io`].

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

pub mod compile;
pub mod config;

use thiserror::Error;

/// The result type to be used at the boundaries of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The root of the error hierarchy for the pipeline.
///
/// All errors should be able to be implicitly converted to this error type as
/// this is the type that is used at the boundaries of the library. Any function
/// intended to be part of the _truly_ public interface of the pipeline should
/// return this error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),

    #[error(transparent)]
    Compile(#[from] compile::Error),

    /// A filesystem error that is not otherwise interpreted.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error stems from the project configuration.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if this error stems from compilation.
    #[must_use]
    pub fn is_compile(&self) -> bool {
        matches!(self, Self::Compile(_))
    }
}
