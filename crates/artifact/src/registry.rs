//! An index of compiled contracts keyed by their dot-separated names, allowing
//! contracts to be looked up either by full name or by namespace.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::contract::ContractArtifact;

/// The contracts known to a project, keyed by contract name.
///
/// Serializes as a JSON object from contract name to artifact.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContractRegistry {
    contracts: BTreeMap<String, ContractArtifact>,
}

impl ContractRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `artifact` to the registry, returning the artifact it replaced if
    /// one with the same name was already present.
    pub fn register(&mut self, artifact: ContractArtifact) -> Option<ContractArtifact> {
        self.contracts.insert(artifact.contract_name.clone(), artifact)
    }

    /// Gets the contract with the full dot-separated `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ContractArtifact> {
        self.contracts.get(name)
    }

    /// Gets the names directly below `namespace`, so that with contracts
    /// `a.b.c` and `a.d` registered, the namespace `a` contains `b` and `d`.
    ///
    /// The empty namespace lists the top-level names.
    #[must_use]
    pub fn namespace(&self, namespace: &str) -> Vec<&str> {
        let members: BTreeSet<&str> = self
            .contracts
            .keys()
            .filter_map(|name| {
                if namespace.is_empty() {
                    Some(name.as_str())
                } else {
                    name.strip_prefix(namespace)?.strip_prefix('.')
                }
            })
            .filter_map(|rest| rest.split('.').next())
            .collect();
        members.into_iter().collect()
    }

    /// Gets the number of contracts in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Checks if the registry holds no contracts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Iterates over the contracts in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ContractArtifact> {
        self.contracts.values()
    }
}

impl Extend<ContractArtifact> for ContractRegistry {
    fn extend<T: IntoIterator<Item = ContractArtifact>>(&mut self, iter: T) {
        for artifact in iter {
            self.register(artifact);
        }
    }
}

impl FromIterator<ContractArtifact> for ContractRegistry {
    fn from_iter<T: IntoIterator<Item = ContractArtifact>>(iter: T) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}
