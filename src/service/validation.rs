//! Declarative request validation.
//!
//! Each DTO declares a [`FieldRules`] table. [`RequestValidator`] checks a
//! JSON body against it and reports every violation, grouped per field,
//! including properties the table does not declare.

use crate::error::{AppError, FieldError};
use crate::service::PhoneValidator;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Uuid,
    Phone,
}

/// Regex compiled once, when the rule is declared.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
    /// Reported when the value does not match.
    message: String,
}

/// Constraints on one string field.
#[derive(Clone, Debug, Default)]
pub struct FieldRule {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub format: Option<Format>,
}

impl FieldRule {
    pub fn required() -> Self {
        FieldRule {
            required: true,
            ..Default::default()
        }
    }

    pub fn optional() -> Self {
        FieldRule::default()
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: &str, message: &str) -> Self {
        self.pattern = Some(Pattern {
            source: pattern.to_string(),
            regex: Regex::new(pattern).ok(),
            message: message.to_string(),
        });
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }
}

/// Ordered field table for one DTO.
#[derive(Clone, Debug, Default)]
pub struct FieldRules {
    fields: Vec<(String, FieldRule)>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, rule: FieldRule) -> Self {
        self.fields.push((name.to_string(), rule));
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }
}

#[derive(Clone)]
pub struct RequestValidator {
    phone: Arc<dyn PhoneValidator>,
}

impl RequestValidator {
    pub fn new(phone: Arc<dyn PhoneValidator>) -> Self {
        RequestValidator { phone }
    }

    /// Full check: required fields must be present.
    pub fn validate(&self, body: &Map<String, Value>, rules: &FieldRules) -> Result<(), AppError> {
        self.check(body, rules, false)
    }

    /// For PATCH bodies: only fields that are present are checked.
    pub fn validate_partial(&self, body: &Map<String, Value>, rules: &FieldRules) -> Result<(), AppError> {
        self.check(body, rules, true)
    }

    /// Checks one value that does not come from a body, such as a query-string filter.
    pub fn validate_value(&self, name: &str, value: &str, rule: &FieldRule) -> Result<(), AppError> {
        let messages = self.field_messages(name, &Value::String(value.to_string()), rule)?;
        if messages.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(vec![FieldError {
                field: name.to_string(),
                messages,
            }]))
        }
    }

    fn check(&self, body: &Map<String, Value>, rules: &FieldRules, partial: bool) -> Result<(), AppError> {
        let mut errors = Vec::new();
        for (name, rule) in &rules.fields {
            let messages = match body.get(name) {
                None | Some(Value::Null) => {
                    if rule.required && !partial {
                        vec![format!("{} should not be empty", name)]
                    } else {
                        Vec::new()
                    }
                }
                Some(value) => self.field_messages(name, value, rule)?,
            };
            if !messages.is_empty() {
                errors.push(FieldError {
                    field: name.clone(),
                    messages,
                });
            }
        }
        for key in body.keys() {
            if !rules.declares(key) {
                errors.push(FieldError::new(key, format!("property {} should not exist", key)));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    fn field_messages(&self, name: &str, value: &Value, rule: &FieldRule) -> Result<Vec<String>, AppError> {
        let Some(s) = value.as_str() else {
            return Ok(vec![format!("{} must be a string", name)]);
        };
        let mut out = Vec::new();
        let len = s.chars().count();
        if rule.required && s.trim().is_empty() {
            out.push(format!("{} should not be empty", name));
        }
        if let Some(min) = rule.min_length {
            if len < min {
                out.push(format!("{} must be longer than or equal to {} characters", name, min));
            }
        }
        if let Some(max) = rule.max_length {
            if len > max {
                out.push(format!("{} must be shorter than or equal to {} characters", name, max));
            }
        }
        if let Some(pattern) = &rule.pattern {
            let re = pattern
                .regex
                .as_ref()
                .ok_or_else(|| AppError::Internal(format!("invalid pattern for {}: {}", name, pattern.source)))?;
            if !re.is_match(s) {
                out.push(pattern.message.clone());
            }
        }
        match rule.format {
            Some(Format::Email) if !is_email(s) => out.push(format!("{} must be an email", name)),
            Some(Format::Uuid) if uuid::Uuid::parse_str(s).is_err() => {
                out.push(format!("{} must be a UUID", name))
            }
            Some(Format::Phone) if !self.phone.is_valid(s) => {
                out.push("Please provide a valid phone number in international format".to_string())
            }
            _ => {}
        }
        Ok(out)
    }
}

fn is_email(s: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

/// Drops spaces, dashes and parentheses: `+1 (415) 555-2671` -> `+14155552671`.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect()
}

/// Applies `f` to the string value of `field`, if there is one.
pub fn normalize_field(body: &mut Map<String, Value>, field: &str, f: impl Fn(&str) -> String) {
    if let Some(Value::String(s)) = body.get_mut(field) {
        *s = f(s);
    }
}
