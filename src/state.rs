//! Shared application state for all routes.

use crate::config::ServiceConfig;
use crate::datastore::Datastore;
use crate::error::ConfigError;
use crate::service::CompiledRules;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Datastore>,
    /// collection name -> compiled field rules
    pub validation: Arc<HashMap<String, CompiledRules>>,
}

impl AppState {
    /// Fails only if a validation pattern does not compile.
    pub fn new(store: Arc<dyn Datastore>, config: &ServiceConfig) -> Result<Self, ConfigError> {
        let validation = config
            .validation
            .iter()
            .map(|(collection, rules)| {
                CompiledRules::compile(collection, rules).map(|c| (collection.clone(), c))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(AppState {
            store,
            validation: Arc::new(validation),
        })
    }

    pub fn rules_for(&self, collection: &str) -> Option<&CompiledRules> {
        self.validation.get(collection)
    }
}
