//! Package manifests, as written into the package store by the host build tool
//! when it fetches a dependency.
//!
//! Only the portions of the manifest needed to rehydrate sources are modelled;
//! every other field is ignored on read.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

/// The manifest of a single version of a dependency.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// A mapping from source identifier to the source itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeMap<String, PackageSource>>,
}

impl PackageManifest {
    /// Parses a manifest from its JSON representation.
    ///
    /// # Errors
    ///
    /// - [`serde_json::Error`] if `encoded` is not a valid manifest.
    pub fn from_json(encoded: &str) -> serde_json::Result<Self> {
        serde_json::from_str(encoded)
    }

    /// Reads the manifest at `path`.
    ///
    /// # Errors
    ///
    /// - [`serde_json::Error`] if the file cannot be read or is not a valid
    ///   manifest.
    pub fn read_from_file(path: &Path) -> serde_json::Result<Self> {
        let encoded = std::fs::read_to_string(path).map_err(serde_json::Error::io)?;
        Self::from_json(&encoded)
    }

    /// Iterates over the sources in the manifest, in source identifier order.
    pub fn sources(&self) -> impl Iterator<Item = (&str, &PackageSource)> {
        self.sources
            .iter()
            .flat_map(|s| s.iter())
            .map(|(id, source)| (id.as_str(), source))
    }
}

/// A single source within a package manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PackageSource {
    /// Gets the content of the source if it is present and non-empty.
    #[must_use]
    pub fn non_empty_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }
}
