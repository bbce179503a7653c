//! Execution of the out-of-process toolchain binaries.
//!
//! The binaries are looked up first in the configured search path and then on
//! `PATH`. If a binary cannot be found but a cargo manifest for the toolchain
//! has been configured, it is built from source and run through `cargo run`
//! instead.
//!
//! Any output on standard error is treated as a failure, whatever the exit
//! status of the process. No timeout is imposed, so a hung tool hangs the
//! pipeline.

use std::{
    env,
    ffi::{OsStr, OsString},
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Command,
};

use cape_errors::compile::{Error, Result};
use itertools::Itertools;
use tracing::debug;

use crate::config::ToolchainConfig;

/// The binary that compiles Cairo sources to Sierra.
pub const STARKNET_COMPILE: &str = "starknet-compile";

/// The binary that lowers Sierra to CASM.
pub const STARKNET_SIERRA_COMPILE: &str = "starknet-sierra-compile";

/// The binary used to build and run the toolchain from source.
pub const CARGO: &str = "cargo";

/// Runs toolchain binaries on behalf of the process-based toolchain
/// generations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessRunner {
    /// Directories probed for binaries before `PATH`.
    search_path: Vec<PathBuf>,

    /// The manifest used to build the binaries if they cannot be found.
    manifest_path: Option<PathBuf>,

    /// Whether `--replace-ids` is passed to the compiler.
    replace_ids: bool,

    /// The allowed libfuncs list passed to both binaries, if any.
    allowed_libfuncs_list_name: Option<String>,
}

impl ProcessRunner {
    /// Creates a runner from the provided toolchain `config`.
    #[must_use]
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            search_path:                config.search_path.clone(),
            manifest_path:              config.manifest_path.clone(),
            replace_ids:                config.replace_ids,
            allowed_libfuncs_list_name: config.allowed_libfuncs_list_name.clone(),
        }
    }

    /// Compiles the Cairo file at `input` to Sierra, writing the result to
    /// `output`.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the compiler cannot be run or reports an error.
    pub fn starknet_compile(&self, input: &Path, output: &Path) -> Result<()> {
        let mut args: Vec<OsString> = vec![input.into(), output.into()];
        if self.replace_ids {
            args.push("--replace-ids".into());
        }
        self.push_libfuncs_list(&mut args);

        self.run(STARKNET_COMPILE, &args).map(|_| ())
    }

    /// Lowers the Sierra contract class at `input` to CASM, writing the result
    /// to `output`.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the compiler cannot be run or reports an error.
    pub fn starknet_sierra_compile(&self, input: &Path, output: &Path) -> Result<()> {
        let mut args: Vec<OsString> = vec![input.into(), output.into()];
        self.push_libfuncs_list(&mut args);

        self.run(STARKNET_SIERRA_COMPILE, &args).map(|_| ())
    }

    /// Gets the version reported by `tool --version`.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the tool cannot be run or reports an error.
    pub fn version(&self, tool: &str) -> Result<String> {
        let stdout = self.run(tool, &[OsString::from("--version")])?;
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    /// Locates the executable for `tool`, returning [`None`] if it is on
    /// neither the configured search path nor `PATH`.
    #[must_use]
    pub fn locate(&self, tool: &str) -> Option<PathBuf> {
        let file_name = format!("{tool}{}", env::consts::EXE_SUFFIX);
        let system_path = env::var_os("PATH")
            .map(|p| env::split_paths(&p).collect::<Vec<_>>())
            .unwrap_or_default();

        self.search_path
            .iter()
            .chain(system_path.iter())
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }

    /// Runs `tool` with the provided `args`, returning its standard output.
    fn run(&self, tool: &str, args: &[OsString]) -> Result<String> {
        let mut command = self.command(tool)?;
        command.args(args);
        debug!(
            program = ?command.get_program(),
            args = %command.get_args().map(OsStr::to_string_lossy).join(" "),
            "Invoking toolchain"
        );

        let output = command.output().map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::ToolNotFound(tool.to_string()),
            _ => Error::IOError(e),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            return Err(Error::ToolFailed {
                tool:   tool.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool:   tool.to_string(),
                stderr: format!("exited with {}", output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Builds the command that runs `tool`, falling back to building it from
    /// the configured manifest.
    ///
    /// `cargo` itself is looked up in the same way as the toolchain binaries.
    fn command(&self, tool: &str) -> Result<Command> {
        if let Some(executable) = self.locate(tool) {
            return Ok(Command::new(executable));
        }

        match &self.manifest_path {
            Some(manifest_path) => {
                let cargo = self.locate(CARGO).unwrap_or_else(|| PathBuf::from(CARGO));
                let mut command = Command::new(cargo);
                command
                    .args(["run", "--quiet", "--bin", tool, "--manifest-path"])
                    .arg(manifest_path)
                    .arg("--");
                Ok(command)
            }
            None => Err(Error::ToolNotFound(tool.to_string())),
        }
    }

    fn push_libfuncs_list(&self, args: &mut Vec<OsString>) {
        if let Some(name) = &self.allowed_libfuncs_list_name {
            args.push("--allowed-libfuncs-list-name".into());
            args.push(name.into());
        }
    }
}

#[cfg(all(test, unix))]
mod test {
    use std::fs;

    use cape_errors::compile::Error;

    use crate::{
        config::ToolchainConfig,
        test_utils::install_tool,
        toolchain::process::{ProcessRunner, CARGO, STARKNET_COMPILE, STARKNET_SIERRA_COMPILE},
    };

    fn runner(bin: &std::path::Path) -> ProcessRunner {
        ProcessRunner::new(&ToolchainConfig {
            search_path: vec![bin.to_path_buf()],
            allowed_libfuncs_list_name: Some("audited".to_string()),
            ..ToolchainConfig::default()
        })
    }

    #[test]
    fn passes_flags_and_paths() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let bin = dir.path().join("bin");
        // Echo the arguments into the output file.
        install_tool(&bin, STARKNET_COMPILE, r#"echo "$@" > "$2""#)?;

        let input = dir.path().join("in.cairo");
        let output = dir.path().join("out.json");
        runner(&bin).starknet_compile(&input, &output)?;

        assert_eq!(
            fs::read_to_string(&output)?.trim(),
            format!(
                "{} {} --replace-ids --allowed-libfuncs-list-name audited",
                input.display(),
                output.display()
            )
        );

        Ok(())
    }

    #[test]
    fn builds_missing_tools_from_source() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let bin = dir.path().join("bin");
        let argv = dir.path().join("argv.txt");
        install_tool(&bin, CARGO, &format!("printf '%s\\n' \"$@\" > '{}'", argv.display()))?;

        let manifest_path = dir.path().join("cairo/Cargo.toml");
        let runner = ProcessRunner::new(&ToolchainConfig {
            search_path: vec![bin],
            manifest_path: Some(manifest_path.clone()),
            ..ToolchainConfig::default()
        });

        let input = dir.path().join("in.cairo");
        let output = dir.path().join("out.json");
        runner.starknet_compile(&input, &output)?;

        let manifest_path = manifest_path.display().to_string();
        let input = input.display().to_string();
        let output = output.display().to_string();
        let expected = vec![
            "run",
            "--quiet",
            "--bin",
            STARKNET_COMPILE,
            "--manifest-path",
            &manifest_path,
            "--",
            &input,
            &output,
            "--replace-ids",
        ];
        assert_eq!(fs::read_to_string(&argv)?.lines().collect::<Vec<_>>(), expected);

        Ok(())
    }

    #[test]
    fn stderr_is_fatal_even_on_success() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let bin = dir.path().join("bin");
        install_tool(&bin, STARKNET_SIERRA_COMPILE, "echo 'libfunc not allowed' >&2\nexit 0")?;

        let result = runner(&bin).starknet_sierra_compile(dir.path(), dir.path());
        assert!(matches!(
            result,
            Err(Error::ToolFailed { tool, stderr })
                if tool == STARKNET_SIERRA_COMPILE && stderr == "libfunc not allowed"
        ));

        Ok(())
    }

    #[test]
    fn silent_failures_are_fatal() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let bin = dir.path().join("bin");
        install_tool(&bin, STARKNET_COMPILE, "exit 3")?;

        let result = runner(&bin).starknet_compile(dir.path(), dir.path());
        assert!(matches!(result, Err(Error::ToolFailed { .. })));

        Ok(())
    }

    #[test]
    fn reports_missing_tools() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let runner = runner(dir.path());
        let tool = "cape-test-tool-that-does-not-exist";

        assert!(runner.locate(tool).is_none());
        assert!(matches!(runner.version(tool), Err(Error::ToolNotFound(t)) if t == tool));

        Ok(())
    }

    #[test]
    fn reads_versions() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let bin = dir.path().join("bin");
        install_tool(&bin, STARKNET_COMPILE, "echo 'starknet-compile 2.8.2'\necho extra")?;

        assert_eq!(runner(&bin).version(STARKNET_COMPILE)?, "starknet-compile 2.8.2");

        Ok(())
    }
}
