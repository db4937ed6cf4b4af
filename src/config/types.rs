//! Service configuration types (JSON file and environment).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_COLLECTION: &str = "default";

/// Which storage backend to construct, with its connection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasourceConfig {
    Memory {
        /// Collections that exist (empty) at startup.
        #[serde(default)]
        collections: Vec<String>,
    },
    Json {
        /// Existing JSON document holding every collection.
        file_path: PathBuf,
    },
    Sqlite {
        /// File path, `:memory:`, or `sqlite:` URL.
        database_path: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        DatasourceConfig::Memory {
            collections: vec![DEFAULT_COLLECTION.to_string()],
        }
    }
}

impl DatasourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            DatasourceConfig::Memory { .. } => "memory",
            DatasourceConfig::Json { .. } => "json",
            DatasourceConfig::Sqlite { .. } => "sqlite",
        }
    }
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_server_port() -> u16 {
    DEFAULT_SERVER_PORT
}

fn default_base_path() -> String {
    "/".into()
}

fn default_body_limit() -> usize {
    DEFAULT_BODY_LIMIT_BYTES
}

/// Per-field request validation rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// field name -> rule
pub type CollectionRules = HashMap<String, ValidationRule>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Prefix under which collection routes are mounted.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    #[serde(default)]
    pub datasource: DatasourceConfig,
    /// collection name -> field rules, applied to create/update requests.
    #[serde(default)]
    pub validation: HashMap<String, CollectionRules>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            server_port: DEFAULT_SERVER_PORT,
            base_path: default_base_path(),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            datasource: DatasourceConfig::default(),
            validation: HashMap::new(),
        }
    }
}
