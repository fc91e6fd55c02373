//! Temporary database names and identifier checks.
//!
//! Names have the shape `<prefix>_<digits>`. With the default
//! [`NameStrategy::UnixSeconds`] two managers built in the same second with
//! the same prefix get the same name, and the second one's `create()` drops
//! the first one's database.
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::{HelperError, Result};

/// PostgreSQL truncates identifiers longer than this (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LEN: usize = 63;

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").unwrap());

/// `name` or `schema.name`, unquoted.
static QUALIFIED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*)?$").unwrap()
});

/// How the numeric suffix of a generated database name is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameStrategy {
    /// Unix timestamp in seconds.
    #[default]
    UnixSeconds,
    /// Unix timestamp in microseconds, for test runners that build many
    /// managers per second.
    UnixMicros,
}

impl NameStrategy {
    fn suffix(&self, now: DateTime<Utc>) -> i64 {
        match self {
            NameStrategy::UnixSeconds => now.timestamp(),
            NameStrategy::UnixMicros => now.timestamp_micros(),
        }
    }
}

/// Build `<prefix>_<suffix>` for the given instant.
///
/// The prefix is lower-cased so the name survives PostgreSQL's folding of
/// unquoted identifiers.
pub fn database_name_at(prefix: &str, strategy: NameStrategy, now: DateTime<Utc>) -> Result<String> {
    if !IDENT_RE.is_match(prefix) {
        return Err(HelperError::InvalidIdentifier {
            kind: "database prefix",
            name: prefix.to_string(),
        });
    }
    let name = format!("{}_{}", prefix.to_lowercase(), strategy.suffix(now));
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(HelperError::InvalidIdentifier {
            kind: "database",
            name,
        });
    }
    Ok(name)
}

/// Build a database name from the current time.
pub fn database_name(prefix: &str, strategy: NameStrategy) -> Result<String> {
    database_name_at(prefix, strategy, Utc::now())
}

/// Check a bare identifier such as a database name.
pub fn check_identifier(kind: &'static str, name: &str) -> Result<()> {
    if IDENT_RE.is_match(name) && name.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(HelperError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

/// Check a table or sequence name before it is spliced into SQL.
///
/// Accepts plain or schema-qualified unquoted identifiers; they are passed
/// through unquoted so PostgreSQL folds them the same way the schema did.
pub fn check_relation(kind: &'static str, name: &str) -> Result<()> {
    if QUALIFIED_RE.is_match(name) && name.split('.').all(|p| p.len() <= MAX_IDENTIFIER_LEN) {
        Ok(())
    } else {
        Err(HelperError::InvalidIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

/// Double-quote an identifier for use in DDL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
