//! Static detection of account contracts.
//!
//! The compiler generates different code for a contract that can originate
//! transactions, and needs to be told when it is compiling one. We classify a
//! source as an account contract purely textually: it must declare all of the
//! [`ACCOUNT_ENTRY_POINTS`] at the start of a line, ignoring indentation.

/// The entry points that an account contract must declare.
pub const ACCOUNT_ENTRY_POINTS: [&str; 3] = ["__execute__", "__validate__", "__validate_declare__"];

/// The flavour of Cairo source syntax that a toolchain generation accepts.
///
/// This determines the keyword that introduces a function declaration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Syntax {
    /// Cairo 0, where functions are declared using `func`.
    Legacy,

    /// Cairo 1 and later, where functions are declared using `fn`.
    #[default]
    Modern,
}

impl Syntax {
    /// Gets the keyword that introduces a function declaration.
    #[must_use]
    pub fn function_keyword(self) -> &'static str {
        match self {
            Self::Legacy => "func",
            Self::Modern => "fn",
        }
    }
}

/// Checks if `source` declares every one of the [`ACCOUNT_ENTRY_POINTS`] in the
/// provided `syntax`.
#[must_use]
pub fn is_account_contract(source: &str, syntax: Syntax) -> bool {
    ACCOUNT_ENTRY_POINTS
        .iter()
        .all(|entry_point| source.lines().any(|line| declares(line, syntax, entry_point)))
}

/// Checks if `line` is the start of the declaration of the function `name`.
///
/// The name must be followed by the opening of its implicit arguments (`{`),
/// its parameters (`(`), or its generic parameters (`<`).
fn declares(line: &str, syntax: Syntax, name: &str) -> bool {
    let Some(rest) = line.trim_start().strip_prefix(syntax.function_keyword()) else {
        return false;
    };
    if !rest.starts_with(char::is_whitespace) {
        return false;
    }
    let Some(rest) = rest.trim_start().strip_prefix(name) else {
        return false;
    };

    matches!(rest.trim_start().chars().next(), Some('{' | '(' | '<'))
}
