//! Datasource SDK: interchangeable datastore adapters (memory, JSON file, SQLite)
//! behind one CRUD contract, plus the axum glue for scaffolded REST services.

pub mod config;
pub mod datastore;
pub mod error;
pub mod handlers;
pub mod id;
pub mod record;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_from_env, validate, DatasourceConfig, ServiceConfig, ValidationRule};
pub use datastore::{connect, Datastore, JsonFileDatastore, MemoryDatastore, SqliteDatastore};
pub use error::{AppError, ConfigError, DatastoreError, ErrorKind};
pub use id::create_id;
pub use record::Record;
pub use response::{Envelope, Status};
pub use routes::{collection_routes, common_routes, service_router};
pub use state::AppState;
