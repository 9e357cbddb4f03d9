//! Per-column validation rules, compiled once when the schema is built.

use crate::config::ValidationRule;
use crate::error::{AppError, ConfigError};
use regex::Regex;
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct FieldRule {
    rule: ValidationRule,
    pattern: Option<Regex>,
}

impl FieldRule {
    /// Compile a declared rule; a bad pattern is a declaration error, not a request error.
    pub fn compile(column: &str, rule: &ValidationRule) -> Result<Self, ConfigError> {
        let pattern = rule
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ConfigError::Validation(format!("invalid pattern for {}: {}", column, e)))?;
        Ok(FieldRule {
            rule: rule.clone(),
            pattern,
        })
    }

    pub fn forces_required(&self) -> bool {
        self.rule.required == Some(true)
    }

    /// Check a present, non-null value.
    pub fn check(&self, col: &str, v: &Value) -> Result<(), AppError> {
        if v.is_null() {
            return Ok(());
        }
        let rule = &self.rule;
        if let Some(format) = &rule.format {
            check_format(col, v, format)?;
        }
        if let Some(s) = v.as_str() {
            let len = s.chars().count();
            if let Some(max) = rule.max_length {
                if len > max as usize {
                    return Err(AppError::Validation(format!(
                        "{} must be at most {} characters",
                        col, max
                    )));
                }
            }
            if let Some(min) = rule.min_length {
                if len < min as usize {
                    return Err(AppError::Validation(format!(
                        "{} must be at least {} characters",
                        col, min
                    )));
                }
            }
            if let Some(re) = &self.pattern {
                if !re.is_match(s) {
                    return Err(AppError::Validation(format!(
                        "{} does not match required pattern",
                        col
                    )));
                }
            }
        }
        if let Some(allowed) = &rule.allowed {
            if !allowed.iter().any(|a| value_eq(v, a)) {
                return Err(AppError::Validation(format!(
                    "{} must be one of: {:?}",
                    col,
                    allowed.iter().take(5).collect::<Vec<_>>()
                )));
            }
        }
        if let Some(n) = v.as_f64() {
            if let Some(min) = rule.minimum {
                if n < min {
                    return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
                }
            }
            if let Some(max) = rule.maximum {
                if n > max {
                    return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
                }
            }
        }
        Ok(())
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn check_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else { return Ok(()) };
    match format.to_lowercase().as_str() {
        "email" => {
            let valid = s
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !valid {
                return Err(AppError::Validation(format!("{} must be a valid email", col)));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(AppError::Validation(format!("{} must be a valid UUID", col)));
            }
        }
        _ => {}
    }
    Ok(())
}
