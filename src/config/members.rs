//! Member seed configuration loading from mess.toml
//!
//! The optional TOML file names the mess and lists members to create on first run.
//! Seeding is additive: members whose name already exists are left alone.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Used when `MESS_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "mess.toml";

/// Configuration structure representing the entire mess.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Printed as the heading of the monthly statement
    #[serde(default)]
    pub mess_name: Option<String>,
    /// Members to seed
    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

/// Configuration for a single member
#[derive(Debug, Deserialize, Clone)]
pub struct MemberConfig {
    /// Member name
    pub name: String,
    /// Contact detail, empty when omitted
    #[serde(default)]
    pub contact: String,
    /// Recorded as an "Initial Deposit" when positive
    #[serde(default)]
    pub initial_deposit: f64,
}

/// Loads the mess configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {path_ref:?}: {e}"),
    })
}

/// Loads the configuration named by `MESS_CONFIG` (default `./mess.toml`).
///
/// A missing file is not an error; it yields `Ok(None)`.
pub fn load_default_config() -> Result<Option<Config>> {
    let path = std::env::var("MESS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if !Path::new(&path).exists() {
        debug!("No configuration file at {path}, skipping");
        return Ok(None);
    }
    load_config(path).map(Some)
}
