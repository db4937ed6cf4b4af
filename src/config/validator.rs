//! Config validation: datasource parameters and request rules.

use crate::config::{DatasourceConfig, ServiceConfig, ValidationRule};
use crate::error::ConfigError;
use regex::Regex;

pub fn validate(config: &ServiceConfig) -> Result<(), ConfigError> {
    if !config.base_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "base_path must start with '/': {}",
            config.base_path
        )));
    }
    if config.body_limit_bytes == 0 {
        return Err(ConfigError::Validation("body_limit_bytes must be positive".into()));
    }
    validate_datasource(&config.datasource)?;

    for (collection, rules) in &config.validation {
        if collection.is_empty() {
            return Err(ConfigError::Validation("validation collection name is empty".into()));
        }
        for (field, rule) in rules {
            validate_rule(collection, field, rule)?;
        }
    }
    Ok(())
}

pub fn validate_datasource(datasource: &DatasourceConfig) -> Result<(), ConfigError> {
    match datasource {
        DatasourceConfig::Memory { collections } => {
            if collections.iter().any(|c| c.trim().is_empty()) {
                return Err(ConfigError::Validation("memory collection names must be non-empty".into()));
            }
        }
        DatasourceConfig::Json { file_path } => {
            if file_path.as_os_str().is_empty() {
                return Err(ConfigError::Validation("json datasource requires file_path".into()));
            }
        }
        DatasourceConfig::Sqlite {
            database_path,
            max_connections,
        } => {
            if database_path.trim().is_empty() {
                return Err(ConfigError::Validation("sqlite datasource requires database_path".into()));
            }
            if *max_connections == 0 {
                return Err(ConfigError::Validation("max_connections must be at least 1".into()));
            }
        }
    }
    Ok(())
}

fn validate_rule(collection: &str, field: &str, rule: &ValidationRule) -> Result<(), ConfigError> {
    if let Some(pattern) = &rule.pattern {
        Regex::new(pattern).map_err(|e| {
            ConfigError::Validation(format!("{}.{}: invalid pattern: {}", collection, field, e))
        })?;
    }
    if let (Some(min), Some(max)) = (rule.min_length, rule.max_length) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "{}.{}: min_length {} exceeds max_length {}",
                collection, field, min, max
            )));
        }
    }
    if let (Some(min), Some(max)) = (rule.minimum, rule.maximum) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "{}.{}: minimum {} exceeds maximum {}",
                collection, field, min, max
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_rule(rule: ValidationRule) -> ServiceConfig {
        let mut rules = HashMap::new();
        rules.insert("name".to_string(), rule);
        let mut config = ServiceConfig::default();
        config.validation.insert("beers".into(), rules);
        config
    }

    #[test]
    fn default_config_is_valid() {
        validate(&ServiceConfig::default()).unwrap();
    }

    #[test]
    fn rejects_zero_connections() {
        let config = ServiceConfig {
            datasource: DatasourceConfig::Sqlite {
                database_path: "x.db".into(),
                max_connections: 0,
            },
            ..ServiceConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_relative_base_path() {
        let config = ServiceConfig {
            base_path: "api".into(),
            ..ServiceConfig::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_bad_pattern() {
        let config = with_rule(ValidationRule {
            pattern: Some("(".into()),
            ..Default::default()
        });
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("beers.name"));
    }

    #[test]
    fn rejects_inverted_length_bounds() {
        let config = with_rule(ValidationRule {
            min_length: Some(10),
            max_length: Some(2),
            ..Default::default()
        });
        assert!(validate(&config).is_err());
    }
}
