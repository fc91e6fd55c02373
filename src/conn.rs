//! The two connection roles.
//!
//! [`AdminConnection`] talks to the bootstrap database and only issues
//! database-level DDL. [`TargetConnection`] is scoped to the temporary
//! database and carries schema, data and resets. They are separate types so
//! one can never stand in for the other.
use std::time::Duration;

use postgres::{Client, NoTls};
use tracing::instrument;

use crate::config::ConnectionSettings;
use crate::error::{ConnectOp, DdlIntent, HelperError, Result};
use crate::naming::quote_ident;

const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// The liveness check waits as long as a connect may take. A zero timeout
/// means "no limit" to the driver's connect but would fail every ping, so it
/// falls back to the default.
fn ping_timeout(settings: &ConnectionSettings) -> Duration {
    if settings.connect_timeout.is_zero() {
        DEFAULT_PING_TIMEOUT
    } else {
        settings.connect_timeout
    }
}

/// Open a client to `dbname` and make sure it answers a query.
fn open_verified(settings: &ConnectionSettings, dbname: &str) -> Result<Client> {
    let mut client = settings
        .config_for(dbname)
        .connect(NoTls)
        .map_err(|source| HelperError::Connect {
            database: dbname.to_string(),
            op: ConnectOp::Connect,
            source,
        })?;
    client
        .is_valid(ping_timeout(settings))
        .map_err(|source| HelperError::Connect {
            database: dbname.to_string(),
            op: ConnectOp::Ping,
            source,
        })?;
    Ok(client)
}

/// Privileged connection to the bootstrap database.
pub struct AdminConnection {
    client: Client,
}

impl AdminConnection {
    #[instrument(skip_all, fields(database = %settings.admin_database), err)]
    pub fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let client = open_verified(settings, &settings.admin_database)?;
        Ok(Self { client })
    }

    pub fn drop_database(&mut self, name: &str) -> Result<()> {
        self.ddl(
            name,
            DdlIntent::Drop,
            &format!("DROP DATABASE IF EXISTS {}", quote_ident(name)),
        )
    }

    pub fn create_database(&mut self, name: &str) -> Result<()> {
        self.ddl(
            name,
            DdlIntent::Create,
            &format!("CREATE DATABASE {}", quote_ident(name)),
        )
    }

    pub fn grant_all(&mut self, name: &str, user: &str) -> Result<()> {
        self.ddl(
            name,
            DdlIntent::Grant,
            &format!(
                "GRANT ALL PRIVILEGES ON DATABASE {} TO {}",
                quote_ident(name),
                quote_ident(user)
            ),
        )
    }

    pub fn database_exists(&mut self, name: &str) -> Result<bool> {
        let row = self.client.query_one(
            "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)",
            &[&name],
        )?;
        Ok(row.get(0))
    }

    // DATABASE statements cannot run inside a transaction block, so they go
    // through the simple query protocol one at a time.
    fn ddl(&mut self, name: &str, intent: DdlIntent, sql: &str) -> Result<()> {
        self.client
            .batch_execute(sql)
            .map_err(|source| HelperError::Ddl {
                database: name.to_string(),
                intent,
                source,
            })
    }
}

/// Connection scoped to the temporary database.
pub struct TargetConnection {
    client: Client,
    database: String,
}

impl TargetConnection {
    #[instrument(skip(settings), err)]
    pub fn connect(settings: &ConnectionSettings, database: &str) -> Result<Self> {
        let client = open_verified(settings, database)?;
        Ok(Self {
            client,
            database: database.to_string(),
        })
    }

    pub fn close(self) -> Result<()> {
        let database = self.database;
        self.client.close().map_err(|source| HelperError::Connect {
            database,
            op: ConnectOp::Close,
            source,
        })
    }
}

impl std::ops::Deref for TargetConnection {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl std::ops::DerefMut for TargetConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.client
    }
}
