//! Temporary PostgreSQL databases for integration tests.
//!
//! A [`TestDatabase`] opens an admin connection to the `postgres` database,
//! creates `<prefix>_<unix-seconds>` from a schema file, resets tables and
//! sequences between test cases, and drops the database again.
//!
//! The library never installs a tracing subscriber; that is left to the
//! hosting process.
pub mod config;
pub mod conn;
pub mod database;
pub mod error;
pub mod fixture;
pub mod naming;
pub mod reset;

pub use config::{ConnectionSettings, Options};
pub use database::TestDatabase;
pub use error::{HelperError, Result};
pub use naming::NameStrategy;
pub use reset::TruncateMode;
