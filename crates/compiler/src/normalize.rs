//! Normalization of raw compiler output into a [`ContractArtifact`].
//!
//! Whatever the generation of the toolchain, its output is a JSON contract
//! class carrying an `abi` field, possibly accompanied by a CASM class. The
//! normalizer:
//!
//! 1. Parses the class and extracts its ABI.
//! 2. Migrates every event entry from the legacy `data` field to `inputs`. This
//!    is applied on every compile, and the migrated ABI is written back into
//!    the class before it is encoded.
//! 3. Encodes the class as the deployment bytecode and, where present, the CASM
//!    bytecode as the runtime bytecode.
//! 4. Derives the source identifier and contract name from the source path.

use std::{
    io,
    path::{self, Component, Path},
};

use cape_artifact::{AbiEntry, Bytecode, ContractArtifact};
use cape_errors::compile::{Error, Result};
use serde_json::Value;
use tracing::trace;

use crate::toolchain::RawOutput;

/// The number of hex digits that each CASM felt is padded to.
const FELT_HEX_DIGITS: usize = 64;

/// Normalizes the `raw` output of compiling `source_path` into an artifact
/// whose source identifier is relative to `base_path`.
///
/// # Errors
///
/// - [`Error::InvalidOutput`] if the output cannot be parsed.
pub fn normalize(raw: &RawOutput, source_path: &Path, base_path: &Path) -> Result<ContractArtifact> {
    let file = source_path.display().to_string();
    let invalid = |message: String| Error::InvalidOutput {
        file: file.clone(),
        message,
    };

    let (class, casm) = match raw {
        RawOutput::Class(class) => (class, None),
        RawOutput::Lowered { sierra, casm } => (sierra, Some(casm)),
    };

    let mut class: Value = serde_json::from_str(class).map_err(|e| invalid(e.to_string()))?;
    let abi = migrate_abi(&mut class).map_err(invalid)?;

    let encoded = serde_json::to_vec(&class).map_err(|e| invalid(e.to_string()))?;
    let deployment_bytecode = Bytecode::from_bytes(&encoded);

    let runtime_bytecode = match casm {
        Some(casm) => casm_bytecode(casm).map_err(invalid)?,
        None => Bytecode::default(),
    };

    let source_id = resolve_source_id(source_path, base_path)?;
    Ok(ContractArtifact::new(&source_id, abi, deployment_bytecode)
        .with_runtime_bytecode(runtime_bytecode))
}

/// Extracts the ABI from `class`, migrating its events and writing the result
/// back.
///
/// The ABI may be embedded either as a JSON array or as a string containing
/// one. A class without an ABI has an empty one.
fn migrate_abi(class: &mut Value) -> std::result::Result<Vec<AbiEntry>, String> {
    let Some(object) = class.as_object_mut() else {
        return Err("the compiled class is not a JSON object".to_string());
    };

    let abi_value = match object.get("abi") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(embedded)) => {
            serde_json::from_str(embedded).map_err(|e| format!("embedded ABI: {e}"))?
        }
        Some(other) => other.clone(),
    };

    let mut abi: Vec<AbiEntry> =
        serde_json::from_value(abi_value).map_err(|e| format!("malformed ABI: {e}"))?;
    for entry in &mut abi {
        if entry.migrate_event_fields() {
            trace!(event = entry.name().unwrap_or_default(), "Migrated event ABI");
        }
    }

    let migrated = serde_json::to_value(&abi).map_err(|e| e.to_string())?;
    object.insert("abi".to_string(), migrated);

    Ok(abi)
}

/// Encodes the `bytecode` felts of a CASM class as a single hex string, with
/// each felt padded to [`FELT_HEX_DIGITS`].
fn casm_bytecode(casm: &str) -> std::result::Result<Bytecode, String> {
    let casm: Value = serde_json::from_str(casm).map_err(|e| format!("CASM: {e}"))?;
    let felts = casm
        .get("bytecode")
        .and_then(Value::as_array)
        .ok_or_else(|| "CASM class has no bytecode".to_string())?;

    let mut encoded = String::from("0x");
    for felt in felts {
        let digits = match felt {
            Value::String(s) => s
                .strip_prefix("0x")
                .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
                .map(str::to_ascii_lowercase)
                .ok_or_else(|| format!("invalid felt `{s}` in CASM bytecode"))?,
            Value::Number(n) => n
                .as_u64()
                .map(|n| format!("{n:x}"))
                .ok_or_else(|| format!("invalid felt `{n}` in CASM bytecode"))?,
            other => return Err(format!("invalid felt `{other}` in CASM bytecode")),
        };
        if digits.len() > FELT_HEX_DIGITS {
            return Err(format!("felt `0x{digits}` in CASM bytecode is too large"));
        }
        encoded.push_str(&format!("{digits:0>FELT_HEX_DIGITS$}"));
    }

    Ok(Bytecode::new(encoded))
}

/// Computes the identifier of the source at `source_path` relative to
/// `base_path`, first resolving both against the working directory so that a
/// relative path can be compared with an absolute one.
///
/// # Errors
///
/// - [`io::Error`] if either path is empty or the working directory cannot be
///   determined.
pub fn resolve_source_id(source_path: &Path, base_path: &Path) -> io::Result<String> {
    Ok(source_id(&path::absolute(source_path)?, &path::absolute(base_path)?))
}

/// Computes the identifier of the source at `source_path` relative to
/// `base_path`, using `/` as the separator.
///
/// Both paths must be either absolute or relative to the same directory; see
/// [`resolve_source_id`].
///
/// A source outside the base path is given an identifier that steps out of it
/// using `..`.
#[must_use]
pub fn source_id(source_path: &Path, base_path: &Path) -> String {
    let source: Vec<Component> = source_path.components().collect();
    let base: Vec<Component> = base_path
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect();

    let common = source
        .iter()
        .zip(base.iter())
        .take_while(|(s, b)| s == b)
        .count();

    let parents = std::iter::repeat("..".to_string()).take(base.len() - common);
    let rest = source[common..]
        .iter()
        .filter(|c| **c != Component::CurDir)
        .map(|c| c.as_os_str().to_string_lossy().into_owned());

    parents.chain(rest).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use cape_errors::compile::Error;
    use serde_json::json;

    use crate::{
        normalize::{normalize, resolve_source_id, source_id},
        toolchain::RawOutput,
    };

    #[test]
    fn derives_relative_source_ids() {
        assert_eq!(source_id(Path::new("a/b/c.cairo"), Path::new("a/")), "b/c.cairo");
        assert_eq!(
            source_id(
                Path::new("/project/contracts/namespace0/library.cairo"),
                Path::new("/project/contracts")
            ),
            "namespace0/library.cairo"
        );
        assert_eq!(
            source_id(Path::new("/project/other/x.cairo"), Path::new("/project/contracts")),
            "../other/x.cairo"
        );
    }

    #[test]
    fn resolves_relative_against_absolute_paths() -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        assert_eq!(
            resolve_source_id(Path::new("contracts/a.cairo"), &cwd.join("contracts"))?,
            "a.cairo"
        );
        assert_eq!(
            resolve_source_id(&cwd.join("contracts/a.cairo"), Path::new("contracts"))?,
            "a.cairo"
        );
        assert_eq!(
            resolve_source_id(Path::new("contracts/ns/a.cairo"), Path::new("contracts"))?,
            "ns/a.cairo"
        );

        Ok(())
    }

    #[test]
    fn normalizes_legacy_classes() -> anyhow::Result<()> {
        let class = json!({
            "abi": [
                {"type": "function", "name": "upgrade", "inputs": [], "outputs": []},
                {
                    "type": "event",
                    "name": "Upgraded",
                    "keys": [],
                    "data": [{"name": "implementation", "type": "felt"}]
                }
            ],
            "program": {"prime": "0x800000000000011000000000000000000000000000000000000000000000001"},
        });
        let raw = RawOutput::Class(class.to_string());

        let artifact = normalize(
            &raw,
            Path::new("/contracts/oz_proxy_lib.cairo"),
            Path::new("/contracts"),
        )?;
        assert_eq!(artifact.contract_name, "oz_proxy_lib");
        assert_eq!(artifact.source_id, "oz_proxy_lib.cairo");
        assert_eq!(artifact.abi.len(), 2);

        let event = artifact.events().next().expect("the event is kept");
        let inputs = event.inputs().expect("event inputs were migrated");
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "implementation");
        assert_eq!(inputs[0].typ, "felt");
        assert!(!inputs[0].indexed.unwrap_or(false));
        assert!(!event.fields.contains_key("data"));

        // The deployment bytecode encodes the migrated class.
        let bytecode = artifact.deployment_bytecode.bytecode.expect("bytecode is set");
        let decoded = hex_decode(&bytecode);
        assert!(decoded.contains("\"inputs\":[{\"name\":\"implementation\""));
        assert!(!decoded.contains("\"data\""));
        assert!(artifact.runtime_bytecode.is_empty());

        Ok(())
    }

    #[test]
    fn normalizes_lowered_classes() -> anyhow::Result<()> {
        let raw = RawOutput::Lowered {
            sierra: json!({
                "sierra_program": ["0x1"],
                "abi": "[{\"type\": \"function\", \"name\": \"get\"}]",
            })
            .to_string(),
            casm:   json!({"bytecode": ["0xA0680017fff8000", "0x7", 12]}).to_string(),
        };

        let artifact = normalize(&raw, Path::new("c/d.cairo"), Path::new("c"))?;
        assert_eq!(artifact.contract_name, "d");
        assert_eq!(artifact.abi[0].name(), Some("get"));

        let runtime = artifact.runtime_bytecode.bytecode.expect("runtime bytecode is set");
        assert_eq!(runtime.len(), 2 + 3 * 64);
        assert_eq!(
            runtime,
            format!("0x{:0>64}{:0>64}{:0>64}", "a0680017fff8000", "7", "c")
        );

        Ok(())
    }

    #[test]
    fn rejects_unparseable_output() {
        let raw = RawOutput::Class("Error: not JSON".to_string());
        let result = normalize(&raw, Path::new("x.cairo"), Path::new(""));
        assert!(matches!(result, Err(Error::InvalidOutput { file, .. }) if file == "x.cairo"));

        let raw = RawOutput::Lowered {
            sierra: "{}".to_string(),
            casm:   "{\"bytecode\": [\"0xzz\"]}".to_string(),
        };
        assert!(normalize(&raw, Path::new("x.cairo"), Path::new("")).is_err());
    }

    fn hex_decode(bytecode: &str) -> String {
        let bytes = hex::decode(bytecode.trim_start_matches("0x")).expect("valid hex");
        String::from_utf8(bytes).expect("valid UTF-8")
    }
}
