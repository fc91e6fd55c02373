//! The temporary database lifecycle: construct, create, reset, clean up.
use std::path::{Path, PathBuf};

use postgres::types::ToSql;
use postgres::{Client, Row};
use tracing::{info, instrument, warn};

use crate::config::{ConnectionSettings, Options};
use crate::conn::{AdminConnection, TargetConnection};
use crate::error::{HelperError, Result};
use crate::naming::{self, check_identifier};
use crate::reset::{ResetPlan, TruncateMode};

/// A temporary database owned by one test context.
///
/// Not meant to be shared between threads; give every parallel worker its
/// own instance (and its own prefix, if they may start in the same second).
pub struct TestDatabase {
    admin: AdminConnection,
    target: Option<TargetConnection>,

    db_name: String,
    schema_path: PathBuf,
    settings: ConnectionSettings,
    keep: bool,
    truncate_mode: TruncateMode,
}

impl TestDatabase {
    /// Generate the database name and open the admin connection.
    ///
    /// Nothing is created yet; call [`create`](Self::create) for that.
    pub fn new(options: Options) -> Result<Self> {
        let db_name = naming::database_name(&options.prefix, options.name_strategy)?;
        let admin =
            AdminConnection::connect(&options.settings).map_err(|e| HelperError::Setup {
                db_name: db_name.clone(),
                source: Box::new(e),
            })?;

        Ok(Self {
            admin,
            target: None,
            db_name,
            schema_path: options.schema_path,
            settings: options.settings,
            keep: options.keep,
            truncate_mode: options.truncate_mode,
        })
    }

    /// Shorthand for [`new`](Self::new) with default host, port and modes.
    pub fn with_credentials(
        schema_path: impl Into<PathBuf>,
        prefix: &str,
        user: &str,
        password: &str,
        keep: bool,
    ) -> Result<Self> {
        Self::new(
            Options::new(schema_path, prefix, ConnectionSettings::new(user, password)).keep(keep),
        )
    }

    /// Take over a database that already exists (for example one kept by an
    /// earlier run). No schema is applied and `keep` is off.
    pub fn attach(settings: ConnectionSettings, db_name: &str) -> Result<Self> {
        check_identifier("database", db_name)?;
        let admin = AdminConnection::connect(&settings)?;
        let target = TargetConnection::connect(&settings, db_name)?;

        Ok(Self {
            admin,
            target: Some(target),
            db_name: db_name.to_string(),
            schema_path: PathBuf::new(),
            settings,
            keep: false,
            truncate_mode: TruncateMode::default(),
        })
    }

    pub fn with_truncate_mode(mut self, mode: TruncateMode) -> Self {
        self.truncate_mode = mode;
        self
    }

    /// Create the database from the schema file. The database name is
    /// suffixed with a unix timestamp, so it is unique to the second.
    ///
    /// Any leftover database with the same name is dropped first, which makes
    /// calling this twice on the same instance safe. On failure nothing is
    /// undone; call [`cleanup`](Self::cleanup) to remove partial state.
    #[instrument(skip(self), fields(db = %self.db_name), err)]
    pub fn create(&mut self) -> Result<()> {
        // The server refuses to drop a database with open sessions.
        if let Some(target) = self.target.take() {
            target.close()?;
        }

        self.admin.drop_database(&self.db_name)?;

        info!("creating db: {}", self.db_name);
        self.admin.create_database(&self.db_name)?;
        self.admin.grant_all(&self.db_name, &self.settings.user)?;

        let target = TargetConnection::connect(&self.settings, &self.db_name)?;
        let target = self.target.insert(target);

        let schema =
            std::fs::read_to_string(&self.schema_path).map_err(|source| HelperError::SchemaRead {
                path: self.schema_path.clone(),
                source,
            })?;
        target
            .batch_execute(&schema)
            .map_err(|source| HelperError::SchemaApply {
                path: self.schema_path.clone(),
                bytes: schema.len(),
                database: self.db_name.clone(),
                source,
            })?;
        Ok(())
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn keep(&self) -> bool {
        self.keep
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    /// Whether a target connection is currently open.
    pub fn is_provisioned(&self) -> bool {
        self.target.is_some()
    }

    /// Client configuration pointing at the temporary database, for callers
    /// that want a connection of their own.
    pub fn target_config(&self) -> postgres::Config {
        self.settings.config_for(&self.db_name)
    }

    /// The target connection.
    pub fn client(&mut self) -> Result<&mut Client> {
        match self.target.as_mut() {
            Some(target) => Ok(&mut **target),
            None => Err(HelperError::NotProvisioned {
                database: self.db_name.clone(),
            }),
        }
    }

    /// Truncate `tables` in one transaction.
    pub fn clean_tables<T: AsRef<str>>(&mut self, tables: &[T]) -> Result<()> {
        self.reset(tables, &[] as &[&str])
    }

    /// Truncate `tables`, then restart `sequences` at their declared start
    /// values, all in one transaction. Either everything is reset or nothing is.
    pub fn reset<T, S>(&mut self, tables: &[T], sequences: &[S]) -> Result<()>
    where
        T: AsRef<str>,
        S: AsRef<str>,
    {
        let plan = ResetPlan::new(tables, sequences, self.truncate_mode)?;
        if plan.is_empty() {
            return Ok(());
        }
        let database = self.db_name.clone();
        plan.execute(self.client()?, &database)
    }

    /// Forward a query to the temporary database.
    pub fn query(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        Ok(self.client()?.query(sql, params)?)
    }

    /// Forward a statement to the temporary database, returning the number
    /// of rows affected.
    pub fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        Ok(self.client()?.execute(sql, params)?)
    }

    /// Close the target connection. A no-op when none is open.
    pub fn close_connection(&mut self) -> Result<()> {
        match self.target.take() {
            Some(target) => target.close(),
            None => Ok(()),
        }
    }

    /// Remove the temporary database unless `keep` was requested.
    ///
    /// When kept, the target connection stays open and the database intact;
    /// use [`close_connection`](Self::close_connection) and
    /// [`destroy`](Self::destroy) to remove it by hand.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.keep {
            info!("keeping db: {}", self.db_name);
            return Ok(());
        }
        self.destroy()
    }

    /// Close the target connection and drop the database, regardless of
    /// `keep`. The admin connection stays open, so [`create`](Self::create)
    /// may be called again.
    #[instrument(skip(self), fields(db = %self.db_name), err)]
    pub fn destroy(&mut self) -> Result<()> {
        if let Err(e) = self.close_connection() {
            warn!(error = %e, "closing target connection failed, dropping anyway");
        }
        self.admin.drop_database(&self.db_name)?;
        info!("removed db: {}", self.db_name);
        Ok(())
    }

    /// Whether the temporary database currently exists on the server.
    pub fn exists(&mut self) -> Result<bool> {
        self.admin.database_exists(&self.db_name)
    }
}
