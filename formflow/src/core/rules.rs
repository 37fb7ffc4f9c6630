//! Field rule and dependency rule tables.
//!
//! Rules are static data consulted by [`crate::core::validator`]. Custom
//! predicates are plain function pointers so tables stay `Clone` and `Debug`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

/// Inputs a custom predicate may consult besides the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckContext {
    pub now: DateTime<Utc>,
}

/// Custom check over a field's raw value.
pub type Predicate = fn(&str, &CheckContext) -> bool;

/// Cross-field check: `(value, dependent_value) -> valid`.
pub type DependencyPredicate = fn(&str, &str) -> bool;

/// Constraints for one field, checked as required, pattern, length, custom.
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
    pub required: bool,
    pub pattern: Option<Regex>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub validate: Option<Predicate>,
}

impl FieldRule {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn optional() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).with_context(|| format!("compile pattern {pattern}"))?;
        self.pattern = Some(regex);
        Ok(self)
    }

    pub fn with_length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn with_validate(mut self, predicate: Predicate) -> Self {
        self.validate = Some(predicate);
        self
    }
}

/// Ties a field's validity to the current value of another field.
#[derive(Debug, Clone)]
pub struct DependencyRule {
    pub depends_on: String,
    pub validate: DependencyPredicate,
}

/// Field rule table plus dependency table.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    fields: BTreeMap<String, FieldRule>,
    dependencies: BTreeMap<String, DependencyRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the built-in job application layout.
    pub fn builtin() -> Result<Self> {
        Ok(Self::new()
            .with_field_rule("fullName", FieldRule::required().with_length(2, 100))
            .with_field_rule(
                "email",
                FieldRule::required().with_pattern(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")?,
            )
            .with_field_rule(
                "mobile",
                FieldRule::required().with_pattern(r"^\+?[0-9\s-]{10,}$")?,
            )
            .with_field_rule("dob", FieldRule::required().with_validate(adult_age))
            .with_field_rule("country", FieldRule::required())
            .with_field_rule("city", FieldRule::required())
            .with_field_rule(
                "expectedSalary",
                FieldRule::optional().with_validate(salary_in_range),
            )
            .with_dependency("city", "country", both_present)
            .with_dependency("alternateContact", "mobile", differs_when_present))
    }

    pub fn with_field_rule(mut self, field: &str, rule: FieldRule) -> Self {
        self.fields.insert(field.to_string(), rule);
        self
    }

    pub fn with_dependency(
        mut self,
        field: &str,
        depends_on: &str,
        validate: DependencyPredicate,
    ) -> Self {
        self.dependencies.insert(
            field.to_string(),
            DependencyRule {
                depends_on: depends_on.to_string(),
                validate,
            },
        );
        self
    }

    pub fn field_rule(&self, field: &str) -> Option<&FieldRule> {
        self.fields.get(field)
    }

    pub fn dependency(&self, field: &str) -> Option<&DependencyRule> {
        self.dependencies.get(field)
    }
}

const MS_PER_YEAR: f64 = 365.25 * 24.0 * 60.0 * 60.0 * 1000.0;
const MIN_AGE_YEARS: f64 = 18.0;
const MAX_AGE_YEARS: f64 = 100.0;

/// Parse a date-of-birth value: `YYYY-MM-DD` (UTC midnight) or RFC 3339.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Age in years using a fixed 365.25-day year.
pub fn age_in_years(born: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - born).num_milliseconds() as f64 / MS_PER_YEAR
}

/// Valid when the date parses and the age lies in `[18, 100]`.
pub fn adult_age(value: &str, ctx: &CheckContext) -> bool {
    parse_date(value).is_some_and(|born| {
        let age = age_in_years(born, ctx.now);
        (MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&age)
    })
}

/// Valid when the amount is in `(0, 1_000_000)`; blank counts as zero.
pub fn salary_in_range(value: &str, _ctx: &CheckContext) -> bool {
    let trimmed = value.trim();
    let amount = if trimmed.is_empty() {
        0.0
    } else {
        match trimmed.parse::<f64>() {
            Ok(amount) => amount,
            Err(_) => return false,
        }
    };
    amount > 0.0 && amount < 1_000_000.0
}

fn both_present(value: &str, dependent: &str) -> bool {
    !value.is_empty() && !dependent.is_empty()
}

fn differs_when_present(value: &str, dependent: &str) -> bool {
    value.is_empty() || value != dependent
}
