//! Render projection: everything a UI needs to draw the current step.
//!
//! [`project`] is a pure function of session state; a renderer never reads
//! [`FormState`] directly and never mutates it.

use std::collections::BTreeMap;

use crate::core::reference::SelectOption;
use crate::core::review::ReviewRow;
use crate::core::state::FormState;
use crate::io::clock::Clock;
use crate::io::store::KeyValueStore;
use crate::session::FormSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepIndicator {
    pub step: u32,
    pub active: bool,
    pub completed: bool,
    /// Clicking the indicator jumps back to this step.
    pub selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormView {
    pub current_step: u32,
    pub total_steps: u32,
    pub progress_percent: u32,
    pub indicators: Vec<StepIndicator>,
    pub show_prev: bool,
    pub show_next: bool,
    pub show_submit: bool,
    /// False while a submission is outstanding.
    pub controls_enabled: bool,
    pub loading: bool,
    pub field_errors: BTreeMap<String, String>,
    pub focus: Option<String>,
    pub global_error: Option<String>,
    pub notice: Option<String>,
    pub country_options: Vec<SelectOption>,
    pub city_options: Vec<SelectOption>,
    /// Only populated on the terminal step.
    pub review: Vec<ReviewRow>,
}

/// Progress through the form, `0` on the first step and `100` on the last.
pub fn progress_percent(step: u32, total: u32) -> u32 {
    if total <= 1 {
        return 100;
    }
    let done = f64::from(step.saturating_sub(1)) / f64::from(total - 1);
    (done * 100.0).round() as u32
}

pub fn step_indicators(state: &FormState) -> Vec<StepIndicator> {
    (1..=state.total_steps)
        .map(|step| {
            let completed = step < state.current_step;
            StepIndicator {
                step,
                active: step == state.current_step,
                completed,
                selectable: completed && !state.is_submitting,
            }
        })
        .collect()
}

pub fn project<S: KeyValueStore, C: Clock>(session: &FormSession<S, C>) -> FormView {
    let state = session.state();
    let terminal = state.is_terminal();
    let idle = !state.is_submitting;
    FormView {
        current_step: state.current_step,
        total_steps: state.total_steps,
        progress_percent: progress_percent(state.current_step, state.total_steps),
        indicators: step_indicators(state),
        show_prev: state.current_step > 1,
        show_next: !terminal,
        show_submit: terminal,
        controls_enabled: idle,
        loading: !idle,
        field_errors: state.errors.clone(),
        focus: state.focus.clone(),
        global_error: state.global_error.clone(),
        notice: state.notice.clone(),
        country_options: session.country_options().to_vec(),
        city_options: session.city_options().to_vec(),
        review: if terminal {
            state.review.clone()
        } else {
            Vec::new()
        },
    }
}

impl<S: KeyValueStore, C: Clock> FormSession<S, C> {
    pub fn view(&self) -> FormView {
        project(self)
    }
}
