//! Connection settings and constructor options.
use std::path::PathBuf;
use std::time::Duration;

use postgres::config::SslMode;
use serde::Deserialize;

use crate::naming::NameStrategy;
use crate::reset::TruncateMode;

/// The always-present database the admin connection authenticates against.
pub const ADMIN_DATABASE: &str = "postgres";

pub const ENV_USER: &str = "PGTESTHELPER_USER";
pub const ENV_PASSWORD: &str = "PGTESTHELPER_PASS";
pub const ENV_HOST: &str = "PGTESTHELPER_HOST";
pub const ENV_PORT: &str = "PGTESTHELPER_PORT";

/// Where and as whom to connect. Shared by the admin and target connections;
/// only the database name differs between them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub admin_database: String,
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    pub application_name: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            admin_database: ADMIN_DATABASE.to_string(),
            connect_timeout: Duration::from_secs(5),
            application_name: "pgtesthelper".to_string(),
        }
    }
}

impl ConnectionSettings {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Read settings from `PGTESTHELPER_*` variables. Returns `None` when no
    /// user is configured, which integration tests treat as "skip".
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let user = lookup(ENV_USER).filter(|u| !u.is_empty())?;
        let mut settings = Self::new(user, lookup(ENV_PASSWORD).unwrap_or_default());
        if let Some(host) = lookup(ENV_HOST).filter(|h| !h.is_empty()) {
            settings.host = host;
        }
        if let Some(port) = lookup(ENV_PORT).and_then(|p| p.parse().ok()) {
            settings.port = port;
        }
        Some(settings)
    }

    /// Client configuration for `dbname`, with TLS disabled.
    pub fn config_for(&self, dbname: &str) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(dbname)
            .ssl_mode(SslMode::Disable)
            .application_name(&self.application_name);
        // Zero means no limit.
        if !self.connect_timeout.is_zero() {
            config.connect_timeout(self.connect_timeout);
        }
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }
}

/// Everything [`TestDatabase::new`](crate::TestDatabase::new) needs.
#[derive(Debug, Clone)]
pub struct Options {
    pub schema_path: PathBuf,
    pub prefix: String,
    pub settings: ConnectionSettings,
    /// Keep the database (and the target connection) on `cleanup()`.
    pub keep: bool,
    pub truncate_mode: TruncateMode,
    pub name_strategy: NameStrategy,
}

impl Options {
    pub fn new(
        schema_path: impl Into<PathBuf>,
        prefix: impl Into<String>,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            schema_path: schema_path.into(),
            prefix: prefix.into(),
            settings,
            keep: false,
            truncate_mode: TruncateMode::default(),
            name_strategy: NameStrategy::default(),
        }
    }

    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    pub fn truncate_mode(mut self, mode: TruncateMode) -> Self {
        self.truncate_mode = mode;
        self
    }

    pub fn name_strategy(mut self, strategy: NameStrategy) -> Self {
        self.name_strategy = strategy;
        self
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
