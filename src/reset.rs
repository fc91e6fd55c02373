//! Transactional truncate / sequence restart between test cases.
//!
//! A reset is planned up front as a flat list of statements (all truncates in
//! caller order, then all sequence restarts in caller order) and executed in a
//! single transaction with one rollback point. No dependency ordering is
//! attempted.
use std::fmt;

use postgres::Client;
use tracing::debug;

use crate::error::{HelperError, Result};
use crate::naming::check_relation;

/// How `TRUNCATE` treats tables referenced by foreign keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TruncateMode {
    /// Also truncate every table that references the named one.
    #[default]
    Cascade,
    /// Fail if another table references the named one; the whole reset is
    /// then rolled back.
    Restrict,
}

impl TruncateMode {
    fn as_sql(&self) -> &'static str {
        match self {
            TruncateMode::Cascade => "CASCADE",
            TruncateMode::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetStep {
    Truncate { table: String, mode: TruncateMode },
    RestartSequence { sequence: String },
}

impl ResetStep {
    pub fn sql(&self) -> String {
        match self {
            ResetStep::Truncate { table, mode } => {
                format!("TRUNCATE TABLE {} {}", table, mode.as_sql())
            }
            ResetStep::RestartSequence { sequence } => {
                format!("ALTER SEQUENCE {} RESTART", sequence)
            }
        }
    }
}

impl fmt::Display for ResetStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())
    }
}

/// The ordered statements of one reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetPlan {
    steps: Vec<ResetStep>,
}

impl ResetPlan {
    /// Validate every name and lay out the steps. Nothing is sent to the
    /// server if any name is rejected.
    pub fn new<T, S>(tables: &[T], sequences: &[S], mode: TruncateMode) -> Result<Self>
    where
        T: AsRef<str>,
        S: AsRef<str>,
    {
        let mut steps = Vec::with_capacity(tables.len() + sequences.len());
        for table in tables {
            let table = table.as_ref();
            check_relation("table", table)?;
            steps.push(ResetStep::Truncate {
                table: table.to_string(),
                mode,
            });
        }
        for sequence in sequences {
            let sequence = sequence.as_ref();
            check_relation("sequence", sequence)?;
            steps.push(ResetStep::RestartSequence {
                sequence: sequence.to_string(),
            });
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ResetStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the plan on `client` inside one transaction.
    ///
    /// A failing step stops the loop; the transaction is rolled back and
    /// [`HelperError::Reset`] returned. If the rollback fails as well the
    /// result is [`HelperError::Rollback`]. A failed commit is
    /// [`HelperError::Commit`].
    pub fn execute(&self, client: &mut Client, database: &str) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let mut tx = client.transaction().map_err(|source| HelperError::Begin {
            database: database.to_string(),
            source,
        })?;

        let mut failed = None;
        for step in &self.steps {
            debug!(database, step = %step, "reset step");
            if let Err(source) = tx.batch_execute(&step.sql()) {
                failed = Some((step, source));
                break;
            }
        }

        match failed {
            Some((step, cause)) => match tx.rollback() {
                Ok(()) => Err(HelperError::Reset {
                    database: database.to_string(),
                    step: step.sql(),
                    source: cause,
                }),
                Err(source) => Err(HelperError::Rollback {
                    database: database.to_string(),
                    step: step.sql(),
                    cause,
                    source,
                }),
            },
            None => tx.commit().map_err(|source| HelperError::Commit {
                database: database.to_string(),
                source,
            }),
        }
    }
}
