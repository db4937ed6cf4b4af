//! Load service config from a JSON file and/or environment variables.
//!
//! Variables: `SERVICE_CONFIG` (JSON file used as the base), `SERVER_PORT`,
//! `BASE_PATH`, `DATASOURCE` (`memory|json|sqlite`), `DATASOURCE_COLLECTIONS`
//! (comma-separated), `DATASOURCE_FILE_PATH`, `DATABASE_PATH`,
//! `DATABASE_MAX_CONNECTIONS`.

use crate::config::types::*;
use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Read a JSON `ServiceConfig` from disk.
pub fn load_from_file(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

/// Load `.env` if present, then build config from process environment.
pub fn load_from_env() -> Result<ServiceConfig, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    from_lookup(|key| std::env::var(key).ok())
}

/// Build config from a variable lookup. Environment values override the file named by `SERVICE_CONFIG`.
pub fn from_lookup<F>(lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let mut config = match var("SERVICE_CONFIG") {
        Some(path) => load_from_file(Path::new(&path))?,
        None => ServiceConfig::default(),
    };

    if let Some(port) = var("SERVER_PORT") {
        config.server_port = parse("SERVER_PORT", &port)?;
    }
    if let Some(base) = var("BASE_PATH") {
        config.base_path = base;
    }

    if let Some(kind) = var("DATASOURCE") {
        config.datasource = match kind.to_lowercase().as_str() {
            "memory" => DatasourceConfig::Memory {
                collections: var("DATASOURCE_COLLECTIONS")
                    .map(|s| split_list(&s))
                    .unwrap_or_else(|| vec![DEFAULT_COLLECTION.to_string()]),
            },
            "json" => DatasourceConfig::Json {
                file_path: var("DATASOURCE_FILE_PATH")
                    .map(PathBuf::from)
                    .ok_or(ConfigError::MissingVariable("DATASOURCE_FILE_PATH"))?,
            },
            "sqlite" => DatasourceConfig::Sqlite {
                database_path: var("DATABASE_PATH").ok_or(ConfigError::MissingVariable("DATABASE_PATH"))?,
                max_connections: match var("DATABASE_MAX_CONNECTIONS") {
                    Some(n) => parse("DATABASE_MAX_CONNECTIONS", &n)?,
                    None => DEFAULT_MAX_CONNECTIONS,
                },
            },
            _ => {
                return Err(ConfigError::InvalidValue {
                    name: "DATASOURCE",
                    value: kind,
                })
            }
        };
    }
    Ok(config)
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
