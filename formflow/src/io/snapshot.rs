//! Autosave snapshot persistence with a debounced write.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::debounce::Debouncer;
use crate::core::layout::{FieldKind, FormLayout};
use crate::core::types::{FieldMap, FieldValue};
use crate::io::config::FormConfig;
use crate::io::store::KeyValueStore;

/// Reads and writes the flat field map under one fixed key.
///
/// File fields are skipped in both directions. The adapter owns the autosave
/// debouncer, so edits only [`schedule`](Self::schedule) a write and
/// [`flush_if_due`](Self::flush_if_due) performs it after the quiet period.
pub struct PersistenceAdapter<S: KeyValueStore> {
    store: S,
    key: String,
    file_fields: BTreeSet<String>,
    debouncer: Debouncer,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S, config: &FormConfig, layout: &FormLayout) -> Self {
        let file_fields = layout
            .fields()
            .filter(|field| field.kind == FieldKind::File)
            .map(|field| field.name.clone())
            .collect();
        Self {
            store,
            key: config.storage_key.clone(),
            file_fields,
            debouncer: Debouncer::new(config.autosave_debounce_ms),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write the snapshot now.
    pub fn save(&mut self, values: &FieldMap) -> Result<()> {
        let persisted: FieldMap = values
            .iter()
            .filter(|(name, _)| !self.file_fields.contains(name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let payload = serde_json::to_string(&persisted).context("serialize snapshot")?;
        self.store
            .set(&self.key, &payload)
            .with_context(|| format!("save snapshot '{}'", self.key))?;
        debug!(key = %self.key, fields = persisted.len(), "snapshot saved");
        Ok(())
    }

    /// Read the snapshot, `None` when absent or unreadable.
    ///
    /// Entries that are neither strings nor string arrays are dropped.
    pub fn load(&self) -> Result<Option<FieldMap>> {
        let Some(raw) = self
            .store
            .get(&self.key)
            .with_context(|| format!("load snapshot '{}'", self.key))?
        else {
            return Ok(None);
        };
        let parsed: serde_json::Map<String, Value> = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(key = %self.key, error = %err, "ignoring unreadable snapshot");
                return Ok(None);
            }
        };
        let values = parsed
            .into_iter()
            .filter(|(name, _)| !self.file_fields.contains(name.as_str()))
            .filter_map(|(name, value)| field_value(value).map(|value| (name, value)))
            .collect::<FieldMap>();
        debug!(key = %self.key, fields = values.len(), "snapshot loaded");
        Ok(Some(values))
    }

    /// Remove the snapshot and drop any pending write.
    pub fn clear(&mut self) -> Result<()> {
        self.debouncer.cancel();
        self.store
            .remove(&self.key)
            .with_context(|| format!("clear snapshot '{}'", self.key))?;
        info!(key = %self.key, "snapshot cleared");
        Ok(())
    }

    /// Note an edit at `now_ms`; restarts the quiet period.
    pub fn schedule(&mut self, now_ms: i64) {
        self.debouncer.touch(now_ms);
    }

    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Write the snapshot if the quiet period has elapsed. Returns whether a
    /// write happened.
    ///
    /// A failed write stays pending and is retried one quiet period later.
    pub fn flush_if_due(&mut self, now_ms: i64, values: &FieldMap) -> Result<bool> {
        if !self.debouncer.fire_if_due(now_ms) {
            return Ok(false);
        }
        if let Err(err) = self.save(values) {
            self.debouncer.touch(now_ms);
            return Err(err);
        }
        Ok(true)
    }
}

fn field_value(value: Value) -> Option<FieldValue> {
    match value {
        Value::String(text) => Some(FieldValue::Text(text)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(FieldValue::Many),
        _ => None,
    }
}
