use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// What was being attempted on a connection when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOp {
    Connect,
    Ping,
    Close,
}

impl fmt::Display for ConnectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectOp::Connect => "connect to",
            ConnectOp::Ping => "ping",
            ConnectOp::Close => "close connection to",
        })
    }
}

/// Database-level statements issued over the admin connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlIntent {
    Drop,
    Create,
    Grant,
}

impl fmt::Display for DdlIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DdlIntent::Drop => "drop",
            DdlIntent::Create => "create",
            DdlIntent::Grant => "grant privileges on",
        })
    }
}

/// Render a driver error with what the server said.
///
/// `postgres::Error` prints only its kind ("db error"); the server message and
/// SQLSTATE live in the attached `DbError`, and client-side failures keep
/// their detail in `source()`.
pub fn describe(err: &postgres::Error) -> String {
    if let Some(db) = err.as_db_error() {
        return format!("{} (SQLSTATE {})", db, db.code().code());
    }
    let outer = err.to_string();
    match std::error::Error::source(err) {
        Some(inner) => {
            let inner = inner.to_string();
            if outer.contains(&inner) {
                outer
            } else {
                format!("{}: {}", outer, inner)
            }
        }
        None => outer,
    }
}

#[derive(Error, Debug)]
pub enum HelperError {
    /// Construction failed before the named database could be created.
    #[error("could not set up {db_name}: {source}")]
    Setup {
        db_name: String,
        source: Box<HelperError>,
    },

    #[error("failed to {op} database {database}: {}", describe(.source))]
    Connect {
        database: String,
        op: ConnectOp,
        source: postgres::Error,
    },

    #[error("failed to {intent} database {database}: {}", describe(.source))]
    Ddl {
        database: String,
        intent: DdlIntent,
        source: postgres::Error,
    },

    #[error("failed to read schema {}: {source}", .path.display())]
    SchemaRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to apply schema {} ({bytes} bytes) to {database}: {}", .path.display(), describe(.source))]
    SchemaApply {
        path: PathBuf,
        bytes: usize,
        database: String,
        source: postgres::Error,
    },

    #[error("failed to begin reset transaction on {database}: {}", describe(.source))]
    Begin {
        database: String,
        source: postgres::Error,
    },

    /// A truncate or sequence restart failed; the transaction was rolled back.
    #[error("reset of {database} failed at `{step}` (rolled back): {}", describe(.source))]
    Reset {
        database: String,
        step: String,
        source: postgres::Error,
    },

    /// The rollback after a failed step failed too, so the transaction state
    /// on the server is unknown.
    #[error(
        "rollback of {database} failed after `{step}` failed with {}: {}",
        describe(.cause),
        describe(.source)
    )]
    Rollback {
        database: String,
        step: String,
        cause: postgres::Error,
        source: postgres::Error,
    },

    /// Every step ran but the commit was not confirmed.
    #[error("failed to commit reset of {database}: {}", describe(.source))]
    Commit {
        database: String,
        source: postgres::Error,
    },

    #[error("database {database} has no open target connection; call create() first")]
    NotProvisioned { database: String },

    #[error("invalid {kind} name: {name:?}")]
    InvalidIdentifier { kind: &'static str, name: String },

    #[error("PostgreSQL error: {}", describe(.0))]
    Postgres(#[from] postgres::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HelperError {
    /// True for the errors that leave the server-side transaction state
    /// unknown (a failed rollback or an unconfirmed commit).
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, HelperError::Rollback { .. } | HelperError::Commit { .. })
    }
}

pub type Result<T> = std::result::Result<T, HelperError>;
