use std::str::FromStr;

use anyhow::{bail, Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    /// In-process store; data lives only as long as the process.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown store backend `{other}` (expected `mongo` or `memory`)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub mongodb_collection: String,
    pub store_backend: StoreBackend,
    pub enforce_unique_names: bool,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            mongodb_uri: env_or("MONGODB_URI", "mongodb://127.0.0.1:27017"),
            mongodb_database: env_or("MONGODB_DATABASE", "db"),
            mongodb_collection: env_or("MONGODB_COLLECTION", "products"),
            store_backend: env_or("STORE_BACKEND", "mongo")
                .parse()
                .context("STORE_BACKEND is invalid")?,
            enforce_unique_names: parse_bool(&env_or("ENFORCE_UNIQUE_NAMES", "true"))
                .context("ENFORCE_UNIQUE_NAMES must be a boolean")?,
            host: env_or("HOST", "127.0.0.1"),
            port: env_or("PORT", "3000")
                .parse()
                .context("PORT must be a valid number")?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => bail!("expected true/false, got `{other}`"),
    }
}
