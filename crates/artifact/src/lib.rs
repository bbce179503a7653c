//! The data formats that flow through the Cape compilation pipeline.
//!
//! - [`ContractArtifact`] is the portable, toolchain-independent record of a
//!   compiled contract that is handed to the host build tool.
//! - [`abi`] contains the polymorphic ABI entries embedded in an artifact.
//! - [`PackageManifest`] is the externally-produced package description from
//!   which cached dependency sources are rehydrated.
//! - [`ContractRegistry`] indexes artifacts by their dot-separated contract
//!   names.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

pub mod abi;
pub mod contract;
pub mod manifest;
pub mod registry;

pub use abi::{AbiEntry, AbiKind, AbiParameter};
pub use contract::{Bytecode, ContractArtifact};
pub use manifest::{PackageManifest, PackageSource};
pub use registry::ContractRegistry;
