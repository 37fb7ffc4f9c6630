//! Step controller: one form session from page load to submission.
//!
//! [`FormSession`] owns the authoritative [`FormState`], uses the validator as
//! the guard for forward transitions, and drives autosave and analytics as
//! side effects. Submission lives in [`crate::submit`].

use anyhow::{Result, anyhow, bail};
use tracing::{debug, info, warn};

use crate::core::analytics::Analytics;
use crate::core::layout::{FieldKind, FormLayout};
use crate::core::reference::{CountryCatalog, SelectOption, city_options, country_options};
use crate::core::review::review_rows;
use crate::core::rules::{CheckContext, RuleSet};
use crate::core::state::{FormState, Rejection, Transition};
use crate::core::types::{FieldValue, StepReport};
use crate::core::validator::validate_step;
use crate::io::clock::Clock;
use crate::io::config::FormConfig;
use crate::io::snapshot::PersistenceAdapter;
use crate::io::store::KeyValueStore;

const COUNTRY_FIELD: &str = "country";
const CITY_FIELD: &str = "city";

/// Result of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    Moved { from: u32, to: u32 },
    /// Validation of the current step failed; the step is unchanged.
    Invalid(StepReport),
    Rejected(Rejection),
    /// A submission is outstanding.
    Blocked,
}

impl NavOutcome {
    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Static inputs of a session.
#[derive(Debug, Clone)]
pub struct FormDefinition {
    pub layout: FormLayout,
    pub rules: RuleSet,
    /// `None` runs the dropdowns in degraded mode.
    pub catalog: Option<CountryCatalog>,
}

impl FormDefinition {
    /// Built-in layout, rules and bundled country data.
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            layout: FormLayout::builtin(),
            rules: RuleSet::builtin()?,
            catalog: Some(CountryCatalog::builtin()?),
        })
    }
}

pub struct FormSession<S: KeyValueStore, C: Clock> {
    pub(crate) definition: FormDefinition,
    pub(crate) config: FormConfig,
    pub(crate) state: FormState,
    pub(crate) analytics: Analytics,
    pub(crate) persistence: PersistenceAdapter<S>,
    pub(crate) clock: C,
    pub(crate) country_options: Vec<SelectOption>,
    pub(crate) city_options: Vec<SelectOption>,
}

impl<S: KeyValueStore, C: Clock> FormSession<S, C> {
    /// Start a session on step 1, restoring answers from the snapshot.
    ///
    /// Snapshot read failures are logged and the session starts empty.
    pub fn start(definition: FormDefinition, config: FormConfig, store: S, clock: C) -> Self {
        let layout = &definition.layout;
        let persistence = PersistenceAdapter::new(store, &config, layout);
        let mut values = layout.default_values();
        match persistence.load() {
            Ok(Some(saved)) => {
                let mut restored = 0usize;
                for (name, value) in saved {
                    let Some(field) = layout.field(&name) else {
                        continue;
                    };
                    if field.kind.is_list() != matches!(value, FieldValue::Many(_)) {
                        continue;
                    }
                    values.insert(name, value);
                    restored += 1;
                }
                info!(restored, "restored saved answers");
            }
            Ok(None) => debug!("no saved answers"),
            Err(err) => warn!(error = %format!("{err:#}"), "could not read saved answers"),
        }

        let country_options = country_options(definition.catalog.as_ref());
        let mut session = Self {
            state: FormState::new(layout.total_steps(), values),
            analytics: Analytics::new(clock.now_ms()),
            persistence,
            clock,
            config,
            country_options,
            city_options: Vec::new(),
            definition,
        };
        session.refresh_cities();
        session
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn definition(&self) -> &FormDefinition {
        &self.definition
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn persistence(&self) -> &PersistenceAdapter<S> {
        &self.persistence
    }

    pub fn country_options(&self) -> &[SelectOption] {
        &self.country_options
    }

    pub fn city_options(&self) -> &[SelectOption] {
        &self.city_options
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.state.values.get(field)
    }

    /// Validate `step`, publish its errors inline and log them to analytics.
    pub fn validate(&mut self, step: u32) -> StepReport {
        let now = self.clock.now();
        let report = validate_step(
            step,
            &self.definition.layout,
            &self.definition.rules,
            &self.state.values,
            &CheckContext { now },
        );
        self.state.publish_report(&report);
        for err in &report.errors {
            self.analytics
                .record_error(&err.field, step, now.timestamp_millis());
        }
        report
    }

    /// Move forward one step if the current step validates.
    pub fn advance(&mut self) -> NavOutcome {
        let Some(from) = self.begin_navigation() else {
            return NavOutcome::Blocked;
        };
        let target = match self.state.target_for(Transition::Advance) {
            Ok(target) => target,
            Err(rejection) => return self.rejected(rejection),
        };
        let report = self.validate(from);
        if !report.is_valid {
            debug!(step = from, errors = report.errors.len(), "advance blocked by validation");
            return NavOutcome::Invalid(report);
        }
        self.state.mark_valid(from);
        self.enter(target);
        NavOutcome::Moved { from, to: target }
    }

    /// Move back one step without validating.
    pub fn retreat(&mut self) -> NavOutcome {
        let Some(from) = self.begin_navigation() else {
            return NavOutcome::Blocked;
        };
        match self.state.target_for(Transition::Retreat) {
            Ok(target) => {
                self.enter(target);
                NavOutcome::Moved { from, to: target }
            }
            Err(rejection) => self.rejected(rejection),
        }
    }

    /// Jump back to an already completed step.
    pub fn jump_to(&mut self, target: u32) -> NavOutcome {
        let Some(from) = self.begin_navigation() else {
            return NavOutcome::Blocked;
        };
        match self.state.target_for(Transition::JumpTo(target)) {
            Ok(target) => {
                self.enter(target);
                NavOutcome::Moved { from, to: target }
            }
            Err(rejection) => self.rejected(rejection),
        }
    }

    /// Common prologue: refuse while submitting, clear the global message and
    /// attribute elapsed time to the step being left.
    fn begin_navigation(&mut self) -> Option<u32> {
        if self.state.is_submitting {
            debug!("navigation ignored while submitting");
            return None;
        }
        self.state.global_error = None;
        self.state.notice = None;
        let step = self.state.current_step;
        self.analytics.record_step_time(step, self.clock.now_ms());
        Some(step)
    }

    fn rejected(&self, rejection: Rejection) -> NavOutcome {
        debug!(step = self.state.current_step, ?rejection, "navigation rejected");
        NavOutcome::Rejected(rejection)
    }

    /// Apply a resolved transition and refresh the review on the terminal step.
    pub(crate) fn enter(&mut self, target: u32) {
        let from = self.state.current_step;
        self.state.move_to(target);
        if self.state.is_terminal() {
            self.refresh_review();
        }
        info!(from, to = self.state.current_step, "step changed");
    }

    fn refresh_review(&mut self) {
        let layout = &self.definition.layout;
        self.state.data = layout.group_values(&self.state.values);
        self.state.review = review_rows(layout, &self.state.values);
    }

    /// Replace a field's value and schedule an autosave.
    ///
    /// Changing the country repopulates the city options, clears a city that
    /// does not belong to the new country and saves immediately.
    pub fn set_field(&mut self, field: &str, value: FieldValue) -> Result<()> {
        let kind = self.field_kind(field)?;
        if kind.is_list() != matches!(value, FieldValue::Many(_)) {
            bail!("field '{field}' expects a {} value", shape(kind));
        }
        let changed = self.state.values.get(field) != Some(&value);
        self.state.values.insert(field.to_string(), value);
        self.persistence.schedule(self.clock.now_ms());

        if field == COUNTRY_FIELD && changed {
            self.refresh_cities();
            self.persistence.save(&self.state.values)?;
        }
        Ok(())
    }

    /// Append an empty entry to a repeated field; returns its index.
    pub fn add_entry(&mut self, field: &str) -> Result<usize> {
        let entries = self.entries_mut(field)?;
        entries.push(String::new());
        let index = entries.len() - 1;
        self.persistence.schedule(self.clock.now_ms());
        Ok(index)
    }

    pub fn set_entry(&mut self, field: &str, index: usize, value: &str) -> Result<()> {
        let entries = self.entries_mut(field)?;
        let slot = entries
            .get_mut(index)
            .ok_or_else(|| anyhow!("field '{field}' has no entry {index}"))?;
        *slot = value.to_string();
        self.persistence.schedule(self.clock.now_ms());
        Ok(())
    }

    pub fn remove_entry(&mut self, field: &str, index: usize) -> Result<()> {
        let entries = self.entries_mut(field)?;
        if index >= entries.len() {
            bail!("field '{field}' has no entry {index}");
        }
        entries.remove(index);
        self.persistence.schedule(self.clock.now_ms());
        Ok(())
    }

    /// Count a focus interaction on a field.
    pub fn focus_field(&mut self, field: &str) -> Result<()> {
        self.field_kind(field)?;
        self.analytics.record_interaction(field);
        Ok(())
    }

    /// Flush a due autosave. Returns whether the snapshot was written.
    pub fn tick(&mut self) -> Result<bool> {
        let now_ms = self.clock.now_ms();
        self.persistence.flush_if_due(now_ms, &self.state.values)
    }

    fn field_kind(&self, field: &str) -> Result<FieldKind> {
        self.definition
            .layout
            .field(field)
            .map(|spec| spec.kind)
            .ok_or_else(|| anyhow!("unknown field '{field}'"))
    }

    fn entries_mut(&mut self, field: &str) -> Result<&mut Vec<String>> {
        let kind = self.field_kind(field)?;
        if kind != FieldKind::Repeated {
            bail!("field '{field}' is not a repeated field");
        }
        let value = self
            .state
            .values
            .entry(field.to_string())
            .or_insert_with(|| FieldValue::Many(Vec::new()));
        match value {
            FieldValue::Many(entries) => Ok(entries),
            FieldValue::Text(_) => Err(anyhow!("field '{field}' holds a scalar value")),
        }
    }

    pub(crate) fn refresh_cities(&mut self) {
        let catalog = self.definition.catalog.as_ref();
        let country = self
            .state
            .values
            .get(COUNTRY_FIELD)
            .and_then(|value| value.as_text())
            .unwrap_or("")
            .to_string();
        self.city_options = city_options(catalog, &country);

        let Some(catalog) = catalog else {
            return;
        };
        let stale = self
            .state
            .values
            .get(CITY_FIELD)
            .and_then(|value| value.as_text())
            .is_some_and(|city| !city.is_empty() && !catalog.has_city(&country, city));
        if stale {
            debug!(country = %country, "clearing city outside selected country");
            self.state
                .values
                .insert(CITY_FIELD.to_string(), FieldValue::text(""));
        }
    }
}

fn shape(kind: FieldKind) -> &'static str {
    if kind.is_list() { "list" } else { "text" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ErrorKind;
    use crate::io::store::MemoryStore;
    use crate::test_support::{ManualClock, fill_step, memory_session};

    #[test]
    fn starts_on_first_step() {
        let session = memory_session(ManualClock::default());
        let state = session.state();
        assert_eq!(state.current_step, 1);
        assert_eq!(state.last_valid_step, 1);
        assert!(!state.is_submitting);
        assert_eq!(state.total_steps, 6);
        assert_eq!(session.city_options().len(), 1);
    }

    /// A failed guard leaves the step unchanged and focuses the first error.
    #[test]
    fn advance_with_invalid_step_stays_put() {
        let mut session = memory_session(ManualClock::default());
        let outcome = session.advance();
        let NavOutcome::Invalid(report) = outcome else {
            panic!("expected invalid, got {outcome:?}");
        };
        assert_eq!(report.first_invalid.as_deref(), Some("fullName"));
        assert_eq!(session.state().current_step, 1);
        assert_eq!(session.state().focus.as_deref(), Some("fullName"));
        assert_eq!(session.state().errors["fullName"], "This field is required");
        assert_eq!(session.analytics().errors.len(), report.errors.len());
    }

    #[test]
    fn advance_with_valid_step_moves_and_raises_high_water_mark() {
        let mut session = memory_session(ManualClock::default());
        fill_step(&mut session, 1);
        assert_eq!(session.advance(), NavOutcome::Moved { from: 1, to: 2 });
        fill_step(&mut session, 2);
        assert_eq!(session.advance(), NavOutcome::Moved { from: 2, to: 3 });
        assert_eq!(session.state().last_valid_step, 2);
        assert!(session.state().errors.is_empty());
    }

    #[test]
    fn retreat_is_unconditional_above_first_step() {
        let mut session = memory_session(ManualClock::default());
        assert_eq!(
            session.retreat(),
            NavOutcome::Rejected(Rejection::AtFirstStep)
        );
        fill_step(&mut session, 1);
        session.advance();
        session
            .set_field("email", FieldValue::text("broken"))
            .expect("set");
        assert_eq!(session.retreat(), NavOutcome::Moved { from: 2, to: 1 });
        assert_eq!(session.state().last_valid_step, 1);
    }

    #[test]
    fn jump_forward_is_a_no_op() {
        let mut session = memory_session(ManualClock::default());
        for step in 1..=3 {
            fill_step(&mut session, step);
            assert!(session.advance().moved());
        }
        let before = session.state().clone();
        for target in [4, 5, 6, 9] {
            assert!(matches!(
                session.jump_to(target),
                NavOutcome::Rejected(Rejection::NotCompleted { .. })
            ));
            assert_eq!(session.state().current_step, before.current_step);
            assert_eq!(session.state().last_valid_step, before.last_valid_step);
        }
        assert_eq!(session.jump_to(2), NavOutcome::Moved { from: 4, to: 2 });
    }

    /// Step time is attributed to the step being left, even when the move fails.
    #[test]
    fn step_time_recorded_on_every_attempt() {
        let clock = ManualClock::default();
        let mut session = memory_session(clock.clone());
        clock.advance_ms(1_000);
        session.advance();
        fill_step(&mut session, 1);
        clock.advance_ms(2_000);
        session.advance();
        clock.advance_ms(500);
        session.retreat();
        assert_eq!(session.analytics().step_times[&1], 3_000);
        assert_eq!(session.analytics().step_times[&2], 500);
    }

    #[test]
    fn entering_terminal_step_builds_review() {
        let mut session = memory_session(ManualClock::default());
        for step in 1..=5 {
            fill_step(&mut session, step);
            assert!(session.advance().moved(), "step {step}");
        }
        let state = session.state();
        assert!(state.is_terminal());
        assert_eq!(
            state.data["personalInfo"]["fullName"],
            FieldValue::text("Jane Doe")
        );
        assert!(state.review.iter().any(|row| row.text == "USD 85000"));
        assert_eq!(
            session.advance(),
            NavOutcome::Rejected(Rejection::AtTerminalStep)
        );
    }

    #[test]
    fn navigation_blocked_while_submitting() {
        let mut session = memory_session(ManualClock::default());
        fill_step(&mut session, 1);
        session.state.is_submitting = true;
        assert_eq!(session.advance(), NavOutcome::Blocked);
        assert_eq!(session.retreat(), NavOutcome::Blocked);
        assert_eq!(session.jump_to(1), NavOutcome::Blocked);
        assert_eq!(session.state().current_step, 1);
        assert!(session.analytics().step_times.is_empty());
    }

    #[test]
    fn set_field_rejects_unknown_fields_and_wrong_shapes() {
        let mut session = memory_session(ManualClock::default());
        let err = session
            .set_field("nickname", FieldValue::text("J"))
            .expect_err("unknown");
        assert!(err.to_string().contains("unknown field"));
        let err = session
            .set_field("softSkills", FieldValue::text("Teamwork"))
            .expect_err("shape");
        assert!(err.to_string().contains("expects a list value"));
    }

    /// Edits are written once after the quiet period.
    #[test]
    fn edits_autosave_after_debounce() {
        let clock = ManualClock::default();
        let mut session = memory_session(clock.clone());
        session
            .set_field("fullName", FieldValue::text("J"))
            .expect("set");
        clock.advance_ms(300);
        session
            .set_field("fullName", FieldValue::text("Jane"))
            .expect("set");
        clock.advance_ms(499);
        assert!(!session.tick().expect("tick"));
        clock.advance_ms(1);
        assert!(session.tick().expect("tick"));
        let saved = session.persistence().load().expect("load").expect("saved");
        assert_eq!(saved["fullName"], FieldValue::text("Jane"));
    }

    #[test]
    fn country_change_clears_foreign_city_and_saves_now() {
        let mut session = memory_session(ManualClock::default());
        session
            .set_field("country", FieldValue::text("US"))
            .expect("set");
        assert_eq!(session.city_options().len(), 11);
        session
            .set_field("city", FieldValue::text("Chicago"))
            .expect("set");
        session
            .set_field("country", FieldValue::text("CA"))
            .expect("set");
        assert_eq!(session.value("city"), Some(&FieldValue::text("")));
        let saved = session.persistence().load().expect("load").expect("saved");
        assert_eq!(saved["country"], FieldValue::text("CA"));
    }

    #[test]
    fn repeated_entries_can_be_added_edited_and_removed() {
        let mut session = memory_session(ManualClock::default());
        let first = session.add_entry("certifications").expect("add");
        let second = session.add_entry("certifications").expect("add");
        session
            .set_entry("certifications", first, "AWS SAA")
            .expect("set");
        session.set_entry("certifications", second, "CKA").expect("set");
        session.remove_entry("certifications", first).expect("remove");
        assert_eq!(
            session.value("certifications"),
            Some(&FieldValue::many(["CKA"]))
        );
        assert!(session.remove_entry("certifications", 5).is_err());
        assert!(session.add_entry("email").is_err());
    }

    #[test]
    fn focus_counts_interactions() {
        let mut session = memory_session(ManualClock::default());
        session.focus_field("email").expect("focus");
        session.focus_field("email").expect("focus");
        assert_eq!(session.analytics().field_interactions["email"], 2);
        assert!(session.focus_field("nope").is_err());
    }

    /// Restoring ignores unknown keys, file fields and mismatched shapes.
    #[test]
    fn start_restores_known_fields_only() {
        let mut store = MemoryStore::new();
        store
            .set(
                "multiStepFormData",
                r#"{"fullName":"Jane","profilePhoto":"me.png","retired":"x","softSkills":"oops","technicalSkills":["Rust"]}"#,
            )
            .expect("seed");
        let session = FormSession::start(
            FormDefinition::builtin().expect("definition"),
            FormConfig::default(),
            store,
            ManualClock::default(),
        );
        assert_eq!(session.value("fullName"), Some(&FieldValue::text("Jane")));
        assert_eq!(session.value("profilePhoto"), Some(&FieldValue::text("")));
        assert_eq!(session.value("retired"), None);
        assert_eq!(session.value("softSkills"), Some(&FieldValue::Many(Vec::new())));
        assert_eq!(
            session.value("technicalSkills"),
            Some(&FieldValue::many(["Rust"]))
        );
    }

    #[test]
    fn degraded_reference_data_still_validates() {
        let mut definition = FormDefinition::builtin().expect("definition");
        definition.catalog = None;
        let mut session = FormSession::start(
            definition,
            FormConfig::default(),
            MemoryStore::new(),
            ManualClock::default(),
        );
        assert_eq!(session.country_options().len(), 2);
        assert!(session.country_options()[1].disabled);
        fill_step(&mut session, 1);
        session.advance();
        fill_step(&mut session, 2);
        assert!(session.advance().moved());
        let report = session.validate(2);
        assert!(report.errors.iter().all(|e| e.kind != ErrorKind::Dependency));
    }
}
