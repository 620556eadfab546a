use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Everything has a default; a `.env` file is honored when present.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory uploads are persisted into. Created on demand; no cleanup
    /// or expiry policy.
    pub temp_dir: PathBuf,
    /// Optional TrueType font for the redacted preview renderer. When unset
    /// the renderer probes well-known system locations.
    pub font_path: Option<String>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            temp_dir: std::env::var("TEMP_DIR")
                .unwrap_or_else(|_| "./temp".to_string())
                .into(),
            font_path: std::env::var("FONT_PATH").ok(),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            temp_dir: PathBuf::from("./temp"),
            font_path: None,
            rust_log: "info".to_string(),
        }
    }
}
