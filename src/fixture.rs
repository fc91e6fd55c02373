//! Hooks for loading test data. The file format and the insertion strategy
//! belong to the caller.
use std::path::Path;

use postgres::Client;
use serde::de::DeserializeOwned;

use crate::database::TestDatabase;
use crate::error::{HelperError, Result};

impl TestDatabase {
    /// Read `path` and hand its bytes to `parse`. The parser's error is
    /// returned untouched.
    pub fn parse_mock_data<T, E, F>(
        &self,
        path: impl AsRef<Path>,
        parse: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce(Vec<u8>) -> std::result::Result<T, E>,
        E: From<std::io::Error>,
    {
        let bytes = std::fs::read(path)?;
        parse(bytes)
    }

    /// Decode a JSON fixture file into `T`.
    pub fn load_json_fixture<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T> {
        self.parse_mock_data(path, |bytes| {
            serde_json::from_slice(&bytes).map_err(HelperError::from)
        })
    }

    /// Hand the target connection to `insert`.
    pub fn load_data<T, E, F>(&mut self, insert: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Client) -> std::result::Result<T, E>,
        E: From<HelperError>,
    {
        let client = self.client()?;
        insert(client)
    }
}
