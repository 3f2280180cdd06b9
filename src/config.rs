//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `UNIT_OF_WORK_TIMEOUT_MS` (optional): deadline for one deposit, withdrawal
///   or transfer, defaults to 5000
/// - `LEDGER_PAGE_SIZE` (optional): default number of ledger entries per query, defaults to 100
/// - `SEED_DEMO_ACCOUNTS` (optional): open three demo accounts on an empty store
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_unit_of_work_timeout_ms")]
    pub unit_of_work_timeout_ms: u64,

    #[serde(default = "default_ledger_page_size")]
    pub ledger_page_size: u32,

    #[serde(default)]
    pub seed_demo_accounts: bool,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_unit_of_work_timeout_ms() -> u64 {
    5_000
}

fn default_ledger_page_size() -> u32 {
    100
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Deadline applied to every unit of work.
    pub fn unit_of_work_timeout(&self) -> Duration {
        Duration::from_millis(self.unit_of_work_timeout_ms)
    }
}
