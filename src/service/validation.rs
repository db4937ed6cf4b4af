//! Field rules applied to request bodies before they reach the datastore.
//!
//! Creates are checked against every rule of the collection; updates only
//! against the rules of the fields they carry.

use crate::config::{CollectionRules, ValidationRule};
use crate::error::{AppError, ConfigError};
use crate::record::Record;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

/// One field's rule with its pattern compiled.
#[derive(Clone, Debug)]
struct FieldRule {
    rule: ValidationRule,
    pattern: Option<Regex>,
}

/// A collection's rules, compiled once when the service state is built.
#[derive(Clone, Debug, Default)]
pub struct CompiledRules {
    fields: HashMap<String, FieldRule>,
}

impl CompiledRules {
    pub fn compile(collection: &str, rules: &CollectionRules) -> Result<Self, ConfigError> {
        let mut fields = HashMap::with_capacity(rules.len());
        for (field, rule) in rules {
            let pattern = match rule.pattern.as_deref() {
                Some(p) => Some(Regex::new(p).map_err(|e| {
                    ConfigError::Validation(format!("{}.{}: invalid pattern: {}", collection, field, e))
                })?),
                None => None,
            };
            fields.insert(
                field.clone(),
                FieldRule {
                    rule: rule.clone(),
                    pattern,
                },
            );
        }
        Ok(CompiledRules { fields })
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Full check for a new record: every `required` field must be present and non-null.
    pub fn validate(body: &Record, rules: &CompiledRules) -> Result<(), AppError> {
        for (field, compiled) in &rules.fields {
            match body.get(field) {
                None | Some(Value::Null) if is_required(&compiled.rule) => return Err(required(field)),
                Some(value) => check(field, value, compiled)?,
                None => {}
            }
        }
        Ok(())
    }

    /// Partial check for an update. Absent fields are ignored; a required field
    /// may not be nulled out.
    pub fn validate_partial(body: &Record, rules: &CompiledRules) -> Result<(), AppError> {
        for (field, value) in body {
            let Some(compiled) = rules.fields.get(field) else {
                continue;
            };
            if value.is_null() && is_required(&compiled.rule) {
                return Err(required(field));
            }
            check(field, value, compiled)?;
        }
        Ok(())
    }
}

fn is_required(rule: &ValidationRule) -> bool {
    rule.required.unwrap_or(false)
}

fn required(field: &str) -> AppError {
    AppError::Validation(format!("{} is required", field))
}

/// Run every constraint of `compiled` against a present value. Null passes.
fn check(field: &str, value: &Value, compiled: &FieldRule) -> Result<(), AppError> {
    if value.is_null() {
        return Ok(());
    }
    let rule = &compiled.rule;
    let outcome = check_format(value, rule)
        .and_then(|_| check_length(value, rule))
        .and_then(|_| check_pattern(value, compiled.pattern.as_ref()))
        .and_then(|_| check_allowed(value, rule))
        .and_then(|_| check_range(value, rule));
    outcome.map_err(|reason| AppError::Validation(format!("{} {}", field, reason)))
}

fn check_format(value: &Value, rule: &ValidationRule) -> Result<(), String> {
    let (Some(format), Some(s)) = (rule.format.as_deref(), value.as_str()) else {
        return Ok(());
    };
    let valid = match format.to_ascii_lowercase().as_str() {
        "email" => s.len() >= 3 && s.split_once('@').is_some_and(|(u, d)| !u.is_empty() && !d.is_empty()),
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        "date-time" => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        _ => true,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("must be a valid {}", format))
    }
}

fn check_length(value: &Value, rule: &ValidationRule) -> Result<(), String> {
    let Some(s) = value.as_str() else {
        return Ok(());
    };
    let len = s.chars().count();
    match (rule.min_length, rule.max_length) {
        (Some(min), _) if len < min as usize => Err(format!("must be at least {} characters", min)),
        (_, Some(max)) if len > max as usize => Err(format!("must be at most {} characters", max)),
        _ => Ok(()),
    }
}

fn check_pattern(value: &Value, pattern: Option<&Regex>) -> Result<(), String> {
    let (Some(re), Some(s)) = (pattern, value.as_str()) else {
        return Ok(());
    };
    if re.is_match(s) {
        Ok(())
    } else {
        Err(format!("does not match {}", re.as_str()))
    }
}

fn check_allowed(value: &Value, rule: &ValidationRule) -> Result<(), String> {
    let Some(allowed) = &rule.allowed else {
        return Ok(());
    };
    if allowed.iter().any(|candidate| same_value(value, candidate)) {
        return Ok(());
    }
    let shown: Vec<String> = allowed.iter().map(Value::to_string).collect();
    Err(format!("must be one of [{}]", shown.join(", ")))
}

fn check_range(value: &Value, rule: &ValidationRule) -> Result<(), String> {
    let Some(n) = value.as_f64() else {
        return Ok(());
    };
    match (rule.minimum, rule.maximum) {
        (Some(min), _) if n < min => Err(format!("must be at least {}", min)),
        (_, Some(max)) if n > max => Err(format!("must be at most {}", max)),
        _ => Ok(()),
    }
}

/// JSON equality, except numbers compare by value (`1` equals `1.0`).
fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}
