//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::{self, Store, TestSheet, TestSheetState};
use crate::{Config, Mode};
use tempfile::TempDir;
use uuid::Uuid;

/// A sandwiches home directory with a Config pointing at its own in-memory spreadsheet, seeded with
/// the default sales, surplus and stock data. Holds TempDir to keep the directory alive for the
/// duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("sandwiches");
        let secret_path = temp_dir.path().join("client_secret.json");

        let secret_content = r#"{
            "installed": {
                "client_id": "test-client-id",
                "client_secret": "test-secret",
                "redirect_uris": ["http://localhost"],
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;
        std::fs::write(&secret_path, secret_content).unwrap();

        // A fresh spreadsheet id keeps tests from sharing TestSheet state
        let rand = Uuid::new_v4().to_string().replace('-', "");
        let sheet_url = format!("https://docs.google.com/spreadsheets/d/{rand}/edit");
        let config = Config::create(&root, &secret_path, &sheet_url)
            .await
            .unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// A `Store` over this environment's TestSheet.
    pub async fn store(&self) -> Box<dyn Store + Send> {
        api::store(&self.config, Mode::Test).await.unwrap()
    }

    /// Gets the current state of the TestSheet associated with this environment.
    pub fn get_state(&self) -> TestSheetState {
        TestSheet::new(self.config.spreadsheet_id()).get_state()
    }

    /// Replaces the state of the TestSheet associated with this environment.
    pub fn set_state(&self, state: TestSheetState) {
        TestSheet::new(self.config.spreadsheet_id()).set_state(state)
    }
}
