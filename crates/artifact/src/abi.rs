//! ABI entries as they appear in a contract artifact.
//!
//! The ABI emitted by the Cairo toolchain has changed shape over time, and
//! differs between entry kinds. Rather than trying to model every historical
//! variant, an [`AbiEntry`] keeps its discriminating `type` as a typed
//! [`AbiKind`] and every other field as raw JSON. This means that entries we
//! do not understand pass through normalization untouched.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The field name that older toolchains used for the parameters of an event.
pub const LEGACY_EVENT_FIELD: &str = "data";

/// The field name that ABI consumers expect to find the parameters of an event
/// under.
pub const EVENT_INPUTS_FIELD: &str = "inputs";

/// The kind of an ABI entry, as given by its `type` field.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AbiKind {
    Constructor,
    Enum,
    Event,
    Function,
    Impl,
    Interface,
    L1Handler,
    Struct,

    /// Any kind that is not known to us, kept verbatim.
    Other(String),
}

impl AbiKind {
    /// Gets the name of the kind as it is written in the ABI.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Constructor => "constructor",
            Self::Enum => "enum",
            Self::Event => "event",
            Self::Function => "function",
            Self::Impl => "impl",
            Self::Interface => "interface",
            Self::L1Handler => "l1_handler",
            Self::Struct => "struct",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for AbiKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "constructor" => Self::Constructor,
            "enum" => Self::Enum,
            "event" => Self::Event,
            "function" => Self::Function,
            "impl" => Self::Impl,
            "interface" => Self::Interface,
            "l1_handler" => Self::L1Handler,
            "struct" => Self::Struct,
            _ => Self::Other(value),
        }
    }
}

impl From<AbiKind> for String {
    fn from(value: AbiKind) -> Self {
        match value {
            AbiKind::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for AbiKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in a contract's ABI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbiEntry {
    /// The kind of the entry.
    #[serde(rename = "type")]
    pub kind: AbiKind,

    /// All remaining fields of the entry, exactly as the toolchain emitted
    /// them.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AbiEntry {
    /// Creates a new entry of the provided `kind` with no other fields.
    #[must_use]
    pub fn new(kind: AbiKind) -> Self {
        let fields = Map::new();
        Self { kind, fields }
    }

    /// Sets the field `key` to `value`, returning the entry.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Gets the name of the entry if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    /// Checks whether the entry is an event.
    #[must_use]
    pub fn is_event(&self) -> bool {
        self.kind == AbiKind::Event
    }

    /// Gets the parameters of the entry, if it has an `inputs` field made up
    /// of well-formed parameters.
    #[must_use]
    pub fn inputs(&self) -> Option<Vec<AbiParameter>> {
        let inputs = self.fields.get(EVENT_INPUTS_FIELD)?;
        serde_json::from_value(inputs.clone()).ok()
    }

    /// Moves an event's legacy [`LEGACY_EVENT_FIELD`] to
    /// [`EVENT_INPUTS_FIELD`], returning `true` if the entry was changed.
    ///
    /// Entries that are not events, or events that do not carry the legacy
    /// field, are left untouched.
    pub fn migrate_event_fields(&mut self) -> bool {
        if !self.is_event() {
            return false;
        }

        match self.fields.remove(LEGACY_EVENT_FIELD) {
            Some(data) => {
                self.fields.insert(EVENT_INPUTS_FIELD.to_string(), data);
                true
            }
            None => false,
        }
    }
}

/// A named, typed parameter of a function or event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParameter {
    pub name: String,

    #[serde(rename = "type")]
    pub typ: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}
