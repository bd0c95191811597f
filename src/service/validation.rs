//! Request validation: per-field rules for text inputs, and id parsing.

use crate::error::AppError;
use regex::Regex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Url,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FieldRule {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<&'static str>,
    pub format: Option<Format>,
}

pub const USERNAME: FieldRule = FieldRule {
    required: true,
    min_length: Some(2),
    max_length: Some(50),
    pattern: Some(r"^[A-Za-z0-9_\-. ]+$"),
    format: None,
};

pub const PASSWORD_MIN_CHARS: usize = 8;
/// bcrypt ignores everything past this many bytes.
pub const PASSWORD_MAX_BYTES: usize = 72;

pub const EMAIL: FieldRule = FieldRule {
    required: false,
    min_length: None,
    max_length: Some(255),
    pattern: None,
    format: Some(Format::Email),
};

pub const GAME_NAME: FieldRule = FieldRule {
    required: true,
    min_length: Some(1),
    max_length: Some(255),
    pattern: None,
    format: None,
};

pub const URL: FieldRule = FieldRule {
    required: false,
    min_length: None,
    max_length: Some(512),
    pattern: None,
    format: Some(Format::Url),
};

pub const LONG_TEXT: FieldRule = FieldRule {
    required: false,
    min_length: None,
    max_length: Some(50_000),
    pattern: None,
    format: None,
};

pub const SHORT_TEXT: FieldRule = FieldRule {
    required: false,
    min_length: None,
    max_length: Some(255),
    pattern: None,
    format: None,
};

pub struct RequestValidator;

impl RequestValidator {
    /// Absent or empty values fail only when the rule is `required`.
    pub fn check(field: &str, value: Option<&str>, rule: &FieldRule) -> Result<(), AppError> {
        let v = match value.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ if rule.required => return Err(AppError::Validation(format!("{} is required", field))),
            _ => return Ok(()),
        };
        let len = v.chars().count();
        if let Some(max) = rule.max_length {
            if len > max {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    field, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    field, min
                )));
            }
        }
        if let Some(pattern) = rule.pattern {
            let re = Regex::new(pattern)
                .map_err(|_| AppError::Validation(format!("invalid pattern for {}", field)))?;
            if !re.is_match(v) {
                return Err(AppError::Validation(format!(
                    "{} does not match required pattern",
                    field
                )));
            }
        }
        if let Some(format) = rule.format {
            validate_format(field, v, format)?;
        }
        Ok(())
    }

    /// Passwords are hashed exactly as sent, so they are measured untrimmed
    /// and capped in bytes rather than characters.
    pub fn check_password(field: &str, value: &str) -> Result<(), AppError> {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{} is required", field)));
        }
        if value.len() > PASSWORD_MAX_BYTES {
            return Err(AppError::Validation(format!(
                "{} must be at most {} bytes",
                field, PASSWORD_MAX_BYTES
            )));
        }
        if value.chars().count() < PASSWORD_MIN_CHARS {
            return Err(AppError::Validation(format!(
                "{} must be at least {} characters",
                field, PASSWORD_MIN_CHARS
            )));
        }
        Ok(())
    }

    /// Numeric range check for optional scores.
    pub fn check_range(field: &str, value: Option<f64>, min: f64, max: f64) -> Result<(), AppError> {
        match value {
            Some(v) if !(min..=max).contains(&v) => Err(AppError::Validation(format!(
                "{} must be between {} and {}",
                field, min, max
            ))),
            _ => Ok(()),
        }
    }
}

fn validate_format(field: &str, v: &str, format: Format) -> Result<(), AppError> {
    match format {
        Format::Email => {
            if !v.contains('@') || v.len() < 3 {
                return Err(AppError::Validation(format!("{} must be a valid email", field)));
            }
        }
        Format::Url => {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(AppError::Validation(format!("{} must be an http(s) URL", field)));
            }
        }
    }
    Ok(())
}

/// Path ids are positive integers.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AppError::BadRequest("invalid id".into())),
    }
}
