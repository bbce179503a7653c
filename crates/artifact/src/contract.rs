//! The portable contract artifact that the compilation pipeline produces, one
//! per compiled source file.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::abi::AbiEntry;

/// The extension carried by Cairo source files.
pub const SOURCE_EXTENSION: &str = ".cairo";

/// A compiled contract, independent of the toolchain generation that produced
/// it.
///
/// The field names serialize in the camel-case form expected by consumers of
/// the artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    /// The dot-separated name of the contract, derived from [`Self::source_id`]
    /// by [`contract_name`].
    pub contract_name: String,

    /// The path of the source file relative to the base path it was compiled
    /// against, always using `/` as the separator.
    pub source_id: String,

    /// The ABI of the contract.
    pub abi: Vec<AbiEntry>,

    /// The bytecode used to declare or deploy the contract.
    pub deployment_bytecode: Bytecode,

    /// The executable bytecode of the contract, for toolchain generations that
    /// produce one.
    #[serde(default)]
    pub runtime_bytecode: Bytecode,
}

impl ContractArtifact {
    /// Creates a new artifact for the source with the provided `source_id`,
    /// deriving the contract name from it.
    #[must_use]
    pub fn new(source_id: &str, abi: Vec<AbiEntry>, deployment_bytecode: Bytecode) -> Self {
        Self {
            contract_name: contract_name(source_id),
            source_id: source_id.to_string(),
            abi,
            deployment_bytecode,
            runtime_bytecode: Bytecode::default(),
        }
    }

    /// Sets the runtime bytecode of the artifact, returning the artifact.
    #[must_use]
    pub fn with_runtime_bytecode(mut self, runtime_bytecode: Bytecode) -> Self {
        self.runtime_bytecode = runtime_bytecode;
        self
    }

    /// Gets the ABI entries that describe events.
    pub fn events(&self) -> impl Iterator<Item = &AbiEntry> {
        self.abi.iter().filter(|e| e.is_event())
    }

    /// Reads an artifact from the provided `reader`.
    ///
    /// # Errors
    ///
    /// - [`serde_json::Error`] if the contents are not a valid artifact.
    pub fn read(reader: impl Read) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }

    /// Reads an artifact from the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`serde_json::Error`] if the file cannot be opened or does not contain
    ///   a valid artifact.
    pub fn read_from_file(path: &Path) -> serde_json::Result<Self> {
        let reader = File::open(path).map_err(serde_json::Error::io)?;
        Self::read(reader)
    }

    /// Writes the artifact to the provided `writer`.
    ///
    /// # Errors
    ///
    /// - [`serde_json::Error`] if it is not possible to write `self`.
    pub fn write(&self, writer: impl Write) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }

    /// Produces the serialized form of the artifact.
    ///
    /// # Errors
    ///
    /// - [`serde_json::Error`] if it is not possible to serialize `self`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl FromStr for ContractArtifact {
    type Err = serde_json::Error;

    fn from_str(encoded: &str) -> serde_json::Result<Self> {
        serde_json::from_str(encoded)
    }
}

/// A single bytecode blob, hex-encoded.
///
/// An absent bytecode serializes as an empty object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bytecode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
}

impl Bytecode {
    /// Creates a bytecode wrapping the provided hex string.
    #[must_use]
    pub fn new(bytecode: impl Into<String>) -> Self {
        let bytecode = Some(bytecode.into());
        Self { bytecode }
    }

    /// Creates the hex-encoded bytecode for the provided raw `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(format!("0x{}", hex::encode(bytes)))
    }

    /// Checks if there is no bytecode, or if it encodes no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytecode
            .as_deref()
            .map_or(true, |b| b.trim_start_matches("0x").is_empty())
    }
}

/// Derives the contract name for the provided `source_id`.
///
/// The trailing source extension is removed and each path separator becomes a
/// `.`, so that `namespace/library.cairo` becomes `namespace.library`.
#[must_use]
pub fn contract_name(source_id: &str) -> String {
    let stem = source_id.strip_suffix(SOURCE_EXTENSION).unwrap_or(source_id);
    stem.split(['/', '\\']).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(".")
}
