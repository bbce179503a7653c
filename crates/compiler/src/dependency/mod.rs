//! Materialization of the project's Cairo dependencies into a project-local
//! cache, from which the toolchain can resolve imports.
//!
//! Each dependency declared in [`crate::config::CairoConfig::dependencies`] is
//! resolved against the package store to a single version, whose manifest is
//! then used to rehydrate the dependency's sources under
//! `<base_path>/.cache/<name>/<version>/`.
//!
//! # Cache Semantics
//!
//! Cached files are written once and never overwritten, so the first content
//! written for a given path wins. If the cache directory for a dependency
//! already exists but its manifest is missing from the package store, the
//! cache is assumed to have been populated by other means and is used as-is
//! without validation. Nothing in the cache is ever deleted by the pipeline.
//!
//! There is no locking around the cache, so concurrent builds of the same
//! project must be serialized by the caller.

pub mod spec;

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use cape_artifact::PackageManifest;
use cape_errors::{compile, config, Result};
use itertools::Itertools;
use tracing::{debug, info, trace, warn};

pub use crate::dependency::spec::DependencySpec;
use crate::config::ProjectConfig;

/// The directory within the base path that dependency sources are cached in.
pub const CACHE_DIR: &str = ".cache";

/// The extension of the Cairo source files written to the cache.
const CAIRO_EXTENSION: &str = ".cairo";

/// Materializes every Cairo dependency declared in `config` under
/// `<base_path>/.cache`, in declaration order.
///
/// # Errors
///
/// - [`config::Error`] if a declaration is malformed, if its version cannot be
///   selected unambiguously, or if the dependency is not one that the project
///   has configured.
/// - [`compile::Error::DependencyMissing`] if the dependency's manifest is
///   absent and no cache exists for it.
/// - [`cape_errors::Error::Io`] if the cache cannot be written.
pub fn materialize(config: &ProjectConfig, base_path: &Path) -> Result<()> {
    let materializer = DependencyMaterializer::new(config, base_path);
    for declaration in &config.cairo.dependencies {
        let spec: DependencySpec = declaration.parse()?;
        materializer.materialize(&spec)?;
    }

    Ok(())
}

/// Rehydrates individual dependencies for a single base path.
#[derive(Debug)]
pub struct DependencyMaterializer<'a> {
    config:    &'a ProjectConfig,
    cache_dir: PathBuf,
}

impl<'a> DependencyMaterializer<'a> {
    /// Creates a materializer writing to the cache beneath `base_path`.
    #[must_use]
    pub fn new(config: &'a ProjectConfig, base_path: &Path) -> Self {
        let cache_dir = base_path.join(CACHE_DIR);
        Self { config, cache_dir }
    }

    /// Materializes the dependency described by `spec`.
    ///
    /// # Errors
    ///
    /// - See [`materialize`].
    pub fn materialize(&self, spec: &DependencySpec) -> Result<()> {
        let version = self.resolve_version(spec)?;
        let name = spec.name.as_str();

        let manifest_path = self
            .config
            .packages_folder
            .join(name)
            .join(&version)
            .join(format!("{name}.json"));
        let destination = self.cache_dir.join(name).join(&version);

        if !manifest_path.is_file() {
            if destination.is_dir() {
                debug!(dependency = name, %version, "Using pre-existing dependency cache");
                return Ok(());
            }

            return Err(compile::Error::DependencyMissing {
                name: name.to_string(),
                version,
            }
            .into());
        }

        let manifest = PackageManifest::read_from_file(&manifest_path).map_err(|e| {
            compile::Error::InvalidManifest {
                path:    manifest_path.display().to_string(),
                message: e.to_string(),
            }
        })?;

        if !self.config.project_dependencies.iter().any(|d| d == name) {
            return Err(config::Error::NotConfigured(spec.to_string()).into());
        }

        let mut written = 0usize;
        for (source_id, source) in manifest.sources() {
            let Some(relative) = cache_path_for_source(source_id) else {
                warn!(dependency = name, source_id, "Skipping source outside the cache");
                continue;
            };
            let destination_path = destination.join(relative);
            if destination_path.is_file() {
                continue;
            }

            if let Some(content) = source.non_empty_content() {
                if let Some(parent) = destination_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&destination_path, content)?;
                trace!(path = %destination_path.display(), "Cached dependency source");
                written += 1;
            }
        }

        info!(dependency = name, %version, written, "Materialized dependency");
        Ok(())
    }

    /// Works out the version directory that `spec` refers to.
    ///
    /// Where no version is given and the package store has a directory for the
    /// dependency, that directory must contain exactly one version. The
    /// resulting version is normalized by [`normalize_version`].
    fn resolve_version(&self, spec: &DependencySpec) -> Result<String> {
        let package_dir = self.config.packages_folder.join(&spec.name);
        let version = match &spec.version {
            Some(version) => version.clone(),
            None if package_dir.is_dir() => {
                let options = subdirectories(&package_dir)?;
                match options.as_slice() {
                    [] => return Err(config::Error::NoVersions(spec.name.clone()).into()),
                    [only] => only
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    _ => return Err(config::Error::AmbiguousVersion(spec.name.clone()).into()),
                }
            }
            None => String::new(),
        };

        Ok(normalize_version(&version))
    }
}

/// Normalizes a version string, prefixing numeric versions with `v`.
#[must_use]
pub fn normalize_version(version: &str) -> String {
    match version.chars().next() {
        Some(c) if c.is_numeric() => format!("v{version}"),
        _ => version.to_string(),
    }
}

/// Computes the path, relative to a dependency's cache directory, that the
/// source with the provided `source_id` is written to.
///
/// Every `.cairo` token is stripped from the identifier and the remaining dots
/// become path separators, before the extension is re-appended. This means
/// that `token.erc20.library.cairo` is cached as `token/erc20/library.cairo`.
///
/// Returns [`None`] if the resulting path would not stay within the cache
/// directory, such as for absolute identifiers or ones that step out of it.
#[must_use]
pub fn cache_path_for_source(source_id: &str) -> Option<PathBuf> {
    let stem = source_id.replace(CAIRO_EXTENSION, "").replace('.', "/");
    let path = PathBuf::from(format!("{stem}{CAIRO_EXTENSION}"));

    let contained =
        !stem.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    contained.then_some(path)
}

/// Lists the subdirectories of `dir` in name order.
pub(crate) fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    Ok(entries.into_iter().filter(|p| p.is_dir()).sorted().collect())
}

#[cfg(test)]
mod test {
    use std::{fs, path::PathBuf};

    use cape_errors::{compile, config, Error};
    use serde_json::json;

    use crate::{
        config::ProjectConfig,
        dependency::{cache_path_for_source, materialize, normalize_version},
        test_utils::{write_manifest, Project},
    };

    #[test]
    fn normalizes_numeric_versions() {
        assert_eq!(normalize_version("1.2.3"), "v1.2.3");
        assert_eq!(normalize_version("v1.2.3"), "v1.2.3");
        assert_eq!(normalize_version("main"), "main");
        assert_eq!(normalize_version(""), "");
    }

    #[test]
    fn derives_cache_paths_from_source_ids() {
        assert_eq!(
            cache_path_for_source("openzeppelin.token.erc20.library.cairo"),
            Some(PathBuf::from("openzeppelin/token/erc20/library.cairo"))
        );
        assert_eq!(
            cache_path_for_source("upgrades/library.cairo"),
            Some(PathBuf::from("upgrades/library.cairo"))
        );
    }

    #[test]
    fn cache_paths_stay_within_the_cache() {
        for source_id in [
            "/tmp/outside/escaped.cairo",
            "../../x.cairo",
            ".cairo",
            "",
        ] {
            assert_eq!(cache_path_for_source(source_id), None, "{source_id} escapes the cache");
        }
    }

    #[test]
    fn never_writes_outside_the_cache() -> anyhow::Result<()> {
        let project = Project::new()?;
        let outside = project.root().join("outside/escaped.cairo");
        write_manifest(&project.packages(), "dep", "v1", &json!({
            outside.display().to_string(): {"content": "escaped"},
            "../../../outside/stepped.cairo": {"content": "escaped"},
            "lib.cairo": {"content": "func f() {}"},
        }))?;
        let config = project.config(&["dep@v1"], &["dep"]);

        materialize(&config, &project.contracts())?;

        assert!(!outside.exists());
        assert!(!project.root().join("outside").exists());
        assert!(project.contracts().join(".cache/dep/v1/lib.cairo").is_file());

        Ok(())
    }

    #[test]
    fn selects_the_only_version() -> anyhow::Result<()> {
        let project = Project::new()?;
        write_manifest(&project.packages(), "OpenZeppelin", "v0.2.0", &json!({
            "upgrades.library.cairo": {"content": "%lang starknet"},
        }))?;
        let config = project.config(&["OpenZeppelin"], &["OpenZeppelin"]);

        materialize(&config, &project.contracts())?;

        let cached = project.contracts().join(".cache/OpenZeppelin/v0.2.0/upgrades/library.cairo");
        assert_eq!(fs::read_to_string(cached)?, "%lang starknet");

        Ok(())
    }

    #[test]
    fn rejects_ambiguous_versions() -> anyhow::Result<()> {
        let project = Project::new()?;
        write_manifest(&project.packages(), "OpenZeppelin", "0.1.0", &json!({}))?;
        write_manifest(&project.packages(), "OpenZeppelin", "0.2.0", &json!({}))?;
        let config = project.config(&["OpenZeppelin"], &["OpenZeppelin"]);

        let result = materialize(&config, &project.contracts());
        assert!(matches!(
            result,
            Err(Error::Config(config::Error::AmbiguousVersion(name))) if name == "OpenZeppelin"
        ));

        Ok(())
    }

    #[test]
    fn rejects_empty_package_directories() -> anyhow::Result<()> {
        let project = Project::new()?;
        fs::create_dir_all(project.packages().join("OpenZeppelin"))?;
        let config = project.config(&["OpenZeppelin"], &["OpenZeppelin"]);

        let result = materialize(&config, &project.contracts());
        assert!(matches!(result, Err(Error::Config(config::Error::NoVersions(_)))));

        Ok(())
    }

    #[test]
    fn prefixes_explicit_numeric_versions() -> anyhow::Result<()> {
        let project = Project::new()?;
        write_manifest(&project.packages(), "dep", "v1.2.3", &json!({
            "lib.cairo": {"content": "func f() {}"},
        }))?;
        let config = project.config(&["dep@1.2.3"], &["dep"]);

        materialize(&config, &project.contracts())?;
        assert!(project.contracts().join(".cache/dep/v1.2.3/lib.cairo").is_file());

        Ok(())
    }

    #[test]
    fn never_overwrites_cached_sources() -> anyhow::Result<()> {
        let project = Project::new()?;
        let config = project.config(&["dep@1.0"], &["dep"]);
        write_manifest(&project.packages(), "dep", "v1.0", &json!({
            "lib.cairo": {"content": "first"},
        }))?;
        materialize(&config, &project.contracts())?;

        write_manifest(&project.packages(), "dep", "v1.0", &json!({
            "lib.cairo": {"content": "second"},
            "other.cairo": {"content": "other"},
        }))?;
        materialize(&config, &project.contracts())?;

        let cache = project.contracts().join(".cache/dep/v1.0");
        assert_eq!(fs::read_to_string(cache.join("lib.cairo"))?, "first");
        assert_eq!(fs::read_to_string(cache.join("other.cairo"))?, "other");

        Ok(())
    }

    #[test]
    fn skips_sources_without_content() -> anyhow::Result<()> {
        let project = Project::new()?;
        write_manifest(&project.packages(), "dep", "v1", &json!({
            "empty.cairo": {"content": ""},
            "remote.cairo": {},
        }))?;
        let config = project.config(&["dep@v1"], &["dep"]);

        materialize(&config, &project.contracts())?;
        let cache = project.contracts().join(".cache/dep/v1");
        assert!(!cache.join("empty.cairo").exists());
        assert!(!cache.join("remote.cairo").exists());

        Ok(())
    }

    #[test]
    fn missing_manifest_is_a_compile_error() -> anyhow::Result<()> {
        let project = Project::new()?;
        let config = project.config(&["dep@1.0"], &["dep"]);

        let result = materialize(&config, &project.contracts());
        assert!(matches!(
            result,
            Err(Error::Compile(compile::Error::DependencyMissing { ref name, ref version }))
                if name == "dep" && version == "v1.0"
        ));
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("Dependency 'dep=v1.0' missing.".to_string())
        );

        Ok(())
    }

    #[test]
    fn pre_existing_cache_excuses_missing_manifest() -> anyhow::Result<()> {
        let project = Project::new()?;
        let cache = project.contracts().join(".cache/dep/v1.0");
        fs::create_dir_all(&cache)?;

        // The dependency is not even configured, as the cache is never
        // validated in this case.
        let config = project.config(&["dep@1.0"], &[]);
        materialize(&config, &project.contracts())?;

        Ok(())
    }

    #[test]
    fn unconfigured_dependencies_are_rejected() -> anyhow::Result<()> {
        let project = Project::new()?;
        write_manifest(&project.packages(), "dep", "v1.0", &json!({
            "lib.cairo": {"content": "x"},
        }))?;
        let config = project.config(&["dep@1.0"], &["other"]);

        let result = materialize(&config, &project.contracts());
        assert!(matches!(
            result,
            Err(Error::Config(config::Error::NotConfigured(spec))) if spec == "dep@1.0"
        ));
        assert!(!project.contracts().join(".cache/dep").exists());

        Ok(())
    }

    #[test]
    fn malformed_declarations_are_rejected() {
        let config = ProjectConfig::new("/nonexistent").with_cairo_dependencies(&["dep@"]);
        let result = materialize(&config, &config.contracts_folder);
        assert!(matches!(
            result,
            Err(Error::Config(config::Error::InvalidDependencySpec(_)))
        ));
    }
}
