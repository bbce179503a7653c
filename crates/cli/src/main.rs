//! This is the CLI driver for compiling Cairo contracts into portable contract
//! artifacts. For more detail, please see the documentation for the
//! [`cape_compiler`] crate.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

use std::path::PathBuf;

use anyhow::Context;
use cape_artifact::ContractRegistry;
use cape_compiler::{
    config::{Generation, ProjectConfig},
    source::collect_sources,
    CompilerBuilder,
};
use clap::{Parser, ValueEnum};
use tracing::debug;

/// Compiles the Cairo contracts of a project, printing the resulting artifacts
/// as JSON.
#[derive(Parser, Debug)]
#[command(name = "cape", version, about)]
struct Args {
    /// The root of the project, containing `cape.toml` if there is one.
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// The directory that source identifiers are relative to, defaulting to
    /// the contracts folder.
    #[arg(long)]
    base_path: Option<PathBuf>,

    /// Overrides the toolchain generation set in the configuration.
    #[arg(long, value_enum)]
    generation: Option<GenerationArg>,

    /// The sources to compile. Every source in the contracts folder is compiled
    /// if none are given.
    files: Vec<PathBuf>,
}

/// The toolchain generations selectable on the command line.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum GenerationArg {
    Library,
    Cli,
    TwoStage,
}

impl From<GenerationArg> for Generation {
    fn from(value: GenerationArg) -> Self {
        match value {
            GenerationArg::Library => Self::Library,
            GenerationArg::Cli => Self::Cli,
            GenerationArg::TwoStage => Self::TwoStage,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ProjectConfig::load(&args.project)
        .with_context(|| format!("loading configuration from {}", args.project.display()))?;
    if let Some(generation) = args.generation {
        config.toolchain.generation = generation.into();
    }

    let files = if args.files.is_empty() {
        collect_sources(&config.contracts_folder).with_context(|| {
            format!("collecting sources in {}", config.contracts_folder.display())
        })?
    } else {
        args.files
    };
    debug!(count = files.len(), "Compiling sources");

    let compiler = CompilerBuilder::new(config).build();
    let artifacts = compiler.compile(&files, args.base_path.as_deref())?;

    let registry: ContractRegistry = artifacts.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&registry)?);

    Ok(())
}
