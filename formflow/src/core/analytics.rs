//! Per-session usage analytics.
//!
//! The session owns one [`Analytics`] value and passes timestamps in; nothing
//! here reads the clock.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One failed field recorded during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub field: String,
    pub step: u32,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// Step-time histogram, field interaction counts and timestamped error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    /// Epoch milliseconds of the last step-time mark.
    pub start_time: i64,
    /// Accumulated milliseconds per step number.
    pub step_times: BTreeMap<u32, i64>,
    pub field_interactions: BTreeMap<String, u32>,
    pub errors: Vec<ErrorEvent>,
}

impl Analytics {
    pub fn new(now_ms: i64) -> Self {
        Self {
            start_time: now_ms,
            step_times: BTreeMap::new(),
            field_interactions: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Attribute time since the last mark to `step` and restart the mark.
    ///
    /// A clock that moved backwards contributes nothing.
    pub fn record_step_time(&mut self, step: u32, now_ms: i64) {
        let elapsed = now_ms.saturating_sub(self.start_time).max(0);
        *self.step_times.entry(step).or_insert(0) += elapsed;
        self.start_time = now_ms;
    }

    pub fn record_interaction(&mut self, field: &str) {
        *self
            .field_interactions
            .entry(field.to_string())
            .or_insert(0) += 1;
    }

    pub fn record_error(&mut self, field: &str, step: u32, now_ms: i64) {
        self.errors.push(ErrorEvent {
            field: field.to_string(),
            step,
            timestamp: now_ms,
        });
    }
}
