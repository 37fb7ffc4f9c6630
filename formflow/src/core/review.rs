//! Read-only summary rows shown on the terminal step.

use crate::core::layout::{FormLayout, ReviewFormat};
use crate::core::types::{FieldMap, FieldValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRow {
    pub field: String,
    /// Display slot id (`review-<field>`).
    pub slot: String,
    pub text: String,
}

/// Project live values into review rows, in document order.
pub fn review_rows(layout: &FormLayout, values: &FieldMap) -> Vec<ReviewRow> {
    layout
        .fields()
        .filter_map(|field| {
            let text = match &field.review {
                ReviewFormat::Hidden => return None,
                ReviewFormat::Plain => or_default(scalar(values, &field.name), "Not provided"),
                ReviewFormat::Optional => or_default(scalar(values, &field.name), "Not specified"),
                ReviewFormat::Photo => or_default(scalar(values, &field.name), "No Image"),
                ReviewFormat::List => or_default(list(values, &field.name), "None"),
                ReviewFormat::Amount { currency_field } => {
                    let amount = scalar(values, &field.name);
                    if amount.is_empty() {
                        "Not specified".to_string()
                    } else {
                        format!("{} {}", scalar(values, currency_field), amount)
                    }
                }
            };
            Some(ReviewRow {
                field: field.name.clone(),
                slot: format!("review-{}", field.name),
                text,
            })
        })
        .collect()
}

fn scalar(values: &FieldMap, name: &str) -> String {
    match values.get(name) {
        Some(FieldValue::Text(value)) => value.clone(),
        Some(FieldValue::Many(_)) => list(values, name),
        None => String::new(),
    }
}

fn list(values: &FieldMap, name: &str) -> String {
    match values.get(name) {
        Some(FieldValue::Many(entries)) => entries
            .iter()
            .filter(|entry| !entry.trim().is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        Some(FieldValue::Text(value)) => value.clone(),
        None => String::new(),
    }
}

fn or_default(text: String, default: &str) -> String {
    if text.is_empty() {
        default.to_string()
    } else {
        text
    }
}
