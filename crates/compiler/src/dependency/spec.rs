//! Parsing of the dependency declarations found in the project configuration.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use cape_errors::config::Error;

/// A dependency declaration of the form `name` or `name@version`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DependencySpec {
    /// The name of the dependency in the package store.
    pub name: String,

    /// The version pinned by the declaration, if any. This is kept exactly as
    /// written and is normalized only when resolved.
    pub version: Option<String>,
}

impl DependencySpec {
    /// Creates a new dependency specification.
    #[must_use]
    pub fn new(name: &str, version: Option<&str>) -> Self {
        Self {
            name:    name.to_string(),
            version: version.map(ToString::to_string),
        }
    }
}

impl FromStr for DependencySpec {
    type Err = Error;

    fn from_str(declaration: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidDependencySpec(declaration.to_string());
        let declaration = declaration.trim();

        let (name, version) = match declaration.split_once('@') {
            Some((name, version)) => {
                if version.is_empty() || version.contains('@') {
                    return Err(invalid());
                }
                (name, Some(version))
            }
            None => (declaration, None),
        };

        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(name, version))
    }
}

impl Display for DependencySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
