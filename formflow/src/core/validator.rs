//! Step validation: field rules plus cross-field dependencies.

use crate::core::layout::FormLayout;
use crate::core::rules::{CheckContext, FieldRule, RuleSet};
use crate::core::types::{ErrorKind, FieldMap, StepReport, ValidationError};

/// Validate every field assigned to `step`, in document order.
///
/// A step outside the layout has no fields and is trivially valid. Calling
/// this twice on unchanged values yields the same report.
pub fn validate_step(
    step: u32,
    layout: &FormLayout,
    rules: &RuleSet,
    values: &FieldMap,
    ctx: &CheckContext,
) -> StepReport {
    let mut report = StepReport {
        step,
        is_valid: true,
        errors: Vec::new(),
        first_invalid: None,
    };
    let Some(spec) = layout.step(step) else {
        return report;
    };

    for field in &spec.fields {
        // Missing scalar fields read as empty text; list values skip the rules.
        let value = match values.get(&field.name) {
            Some(v) => v.as_text(),
            None if !field.kind.is_list() => Some(""),
            None => None,
        };

        let base_error = match (rules.field_rule(&field.name), value) {
            (Some(rule), Some(value)) => check_field_rule(rule, value, ctx),
            _ => None,
        };

        // Dependencies only resolve against fields of the same step.
        let dependency_failed = rules.dependency(&field.name).is_some_and(|dep| {
            let in_step = spec.fields.iter().any(|f| f.name == dep.depends_on);
            if !in_step {
                return false;
            }
            let dependent_value = values
                .get(&dep.depends_on)
                .and_then(|v| v.as_text())
                .unwrap_or("");
            !(dep.validate)(value.unwrap_or(""), dependent_value)
        });

        let error = if dependency_failed {
            rules
                .dependency(&field.name)
                .map(|dep| ValidationError::dependency(&field.name, &dep.depends_on))
        } else {
            base_error.map(|kind| ValidationError::new(&field.name, kind))
        };

        if let Some(error) = error {
            report.is_valid = false;
            if report.first_invalid.is_none() {
                report.first_invalid = Some(field.name.clone());
            }
            report.errors.push(error);
        }
    }

    report
}

/// Apply one field rule; the first failing check wins.
fn check_field_rule(rule: &FieldRule, value: &str, ctx: &CheckContext) -> Option<ErrorKind> {
    if rule.required && value.trim().is_empty() {
        return Some(ErrorKind::Required);
    }
    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(value) {
            return Some(ErrorKind::InvalidFormat);
        }
    }
    let len = value.chars().count();
    if rule.min_length.is_some_and(|min| len < min) || rule.max_length.is_some_and(|max| len > max)
    {
        return Some(ErrorKind::InvalidFormat);
    }
    if let Some(validate) = rule.validate {
        if !validate(value, ctx) {
            return Some(ErrorKind::InvalidValue);
        }
    }
    None
}
