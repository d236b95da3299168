//! Field validation rules
//!
//! A [`ValidationRule`] is a pure acceptance test for one configuration
//! field. Rules are stateless and compiled once; integrations declare their
//! rule sets as statics.

use std::fmt;
use std::ops::RangeInclusive;

use regex::Regex;
use thiserror::Error;

/// Validation failure listing every rejected field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for {}", .fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<String>,
}

enum Check {
    Pattern(Regex),
    Range(RangeInclusive<u32>),
}

/// Acceptance test for one string field
pub struct ValidationRule {
    field: &'static str,
    check: Check,
}

impl ValidationRule {
    /// Rule accepting strings that match `pattern`.
    ///
    /// # Panics
    /// If `pattern` does not compile. Rules are built from literals.
    pub fn pattern(field: &'static str, pattern: &str) -> Self {
        let regex = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid pattern for {}: {}", field, e));
        Self {
            field,
            check: Check::Pattern(regex),
        }
    }

    /// Rule accepting decimal integers within `range`
    pub fn range(field: &'static str, range: RangeInclusive<u32>) -> Self {
        Self {
            field,
            check: Check::Range(range),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn test(&self, value: &str) -> bool {
        match &self.check {
            Check::Pattern(regex) => regex.is_match(value),
            Check::Range(range) => value
                .trim()
                .parse::<u32>()
                .map(|n| range.contains(&n))
                .unwrap_or(false),
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = match &self.check {
            Check::Pattern(regex) => regex.as_str().to_string(),
            Check::Range(range) => format!("{}..={}", range.start(), range.end()),
        };
        f.debug_struct("ValidationRule")
            .field("field", &self.field)
            .field("check", &check)
            .finish()
    }
}

/// Per-field outcome of validating a whole configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    fields: Vec<(&'static str, bool)>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `rule` against `value` and record the outcome
    pub fn check(mut self, rule: &ValidationRule, value: &str) -> Self {
        self.fields.push((rule.field(), rule.test(value)));
        self
    }

    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|(_, ok)| *ok)
    }

    /// Whether `field` passed. Unknown fields count as valid.
    pub fn is_field_valid(&self, field: &str) -> bool {
        self.fields
            .iter()
            .filter(|(name, _)| *name == field)
            .all(|(_, ok)| *ok)
    }

    pub fn invalid_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, ok)| !*ok)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn fields(&self) -> &[(&'static str, bool)] {
        &self.fields
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationError {
                fields: self
                    .invalid_fields()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
        }
    }
}
