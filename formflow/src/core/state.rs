//! The form's single mutable aggregate and its step transitions.
//!
//! Transition rules are decided here without side effects; the session in
//! [`crate::session`] supplies the validation guard and drives persistence and
//! analytics around them.

use std::collections::BTreeMap;

use crate::core::review::ReviewRow;
use crate::core::types::{FieldMap, GroupedData, StepReport};

/// Requested change of the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Forward by one; guarded by validation of the current step.
    Advance,
    /// Back by one; never validated.
    Retreat,
    /// User jump to an already completed step.
    JumpTo(u32),
    /// Engine-initiated move to any step (failed submission validation).
    SystemJump(u32),
}

/// Why a transition could not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AtFirstStep,
    AtTerminalStep,
    /// Jump target has not been completed yet (`target >= current`).
    NotCompleted { target: u32 },
    OutOfRange { target: u32 },
}

/// Authoritative form model; rendering is a projection of this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    /// 1-indexed, always within `[1, total_steps]`.
    pub current_step: u32,
    pub total_steps: u32,
    /// Grouped snapshot, recomputed on each entry into the terminal step.
    pub data: GroupedData,
    /// Field to message for the step validated last.
    pub errors: BTreeMap<String, String>,
    /// High-water mark of validated steps, never above `current_step`.
    pub last_valid_step: u32,
    pub is_submitting: bool,
    /// Live field values.
    pub values: FieldMap,
    pub review: Vec<ReviewRow>,
    /// Field that should receive focus and be scrolled into view.
    pub focus: Option<String>,
    pub global_error: Option<String>,
    pub notice: Option<String>,
}

impl FormState {
    pub fn new(total_steps: u32, values: FieldMap) -> Self {
        Self {
            current_step: 1,
            total_steps,
            data: GroupedData::new(),
            errors: BTreeMap::new(),
            last_valid_step: 1,
            is_submitting: false,
            values,
            review: Vec::new(),
            focus: None,
            global_error: None,
            notice: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.current_step == self.total_steps
    }

    /// Resolve the destination of `transition` from the current step.
    pub fn target_for(&self, transition: Transition) -> Result<u32, Rejection> {
        let current = self.current_step;
        match transition {
            Transition::Advance if current >= self.total_steps => Err(Rejection::AtTerminalStep),
            Transition::Advance => Ok(current + 1),
            Transition::Retreat if current <= 1 => Err(Rejection::AtFirstStep),
            Transition::Retreat => Ok(current - 1),
            Transition::JumpTo(target) if target == 0 => Err(Rejection::OutOfRange { target }),
            Transition::JumpTo(target) if target >= current => {
                Err(Rejection::NotCompleted { target })
            }
            Transition::JumpTo(target) => Ok(target),
            Transition::SystemJump(target) if target == 0 || target > self.total_steps => {
                Err(Rejection::OutOfRange { target })
            }
            Transition::SystemJump(target) => Ok(target),
        }
    }

    /// Record that `step` passed validation.
    pub fn mark_valid(&mut self, step: u32) {
        self.last_valid_step = self.last_valid_step.max(step);
    }

    /// Move to `target`, keeping `last_valid_step <= current_step`.
    pub fn move_to(&mut self, target: u32) {
        let target = target.clamp(1, self.total_steps);
        self.current_step = target;
        self.last_valid_step = self.last_valid_step.min(target);
    }

    /// Replace displayed errors with the ones from `report`.
    pub fn publish_report(&mut self, report: &StepReport) {
        self.errors = report
            .errors
            .iter()
            .map(|err| (err.field.clone(), err.message()))
            .collect();
        self.focus = report.first_invalid.clone();
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
        self.focus = None;
    }

    /// Return to the initial state with fresh values.
    pub fn reset(&mut self, values: FieldMap) {
        *self = Self::new(self.total_steps, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ErrorKind, ValidationError};

    fn state_at(step: u32) -> FormState {
        let mut state = FormState::new(6, FieldMap::new());
        state.current_step = step;
        state
    }

    #[test]
    fn advance_stops_at_terminal_step() {
        assert_eq!(state_at(5).target_for(Transition::Advance), Ok(6));
        assert_eq!(
            state_at(6).target_for(Transition::Advance),
            Err(Rejection::AtTerminalStep)
        );
    }

    #[test]
    fn retreat_stops_at_first_step() {
        assert_eq!(state_at(2).target_for(Transition::Retreat), Ok(1));
        assert_eq!(
            state_at(1).target_for(Transition::Retreat),
            Err(Rejection::AtFirstStep)
        );
    }

    /// Jumps only go to completed steps; any `target >= current` is rejected.
    #[test]
    fn jump_only_reaches_completed_steps() {
        let state = state_at(4);
        for target in 4..=8 {
            assert_eq!(
                state.target_for(Transition::JumpTo(target)),
                Err(Rejection::NotCompleted { target })
            );
        }
        assert_eq!(state.target_for(Transition::JumpTo(2)), Ok(2));
        assert_eq!(
            state.target_for(Transition::JumpTo(0)),
            Err(Rejection::OutOfRange { target: 0 })
        );
    }

    #[test]
    fn system_jump_may_move_forward_within_range() {
        let state = state_at(1);
        assert_eq!(state.target_for(Transition::SystemJump(5)), Ok(5));
        assert_eq!(
            state.target_for(Transition::SystemJump(7)),
            Err(Rejection::OutOfRange { target: 7 })
        );
    }

    /// Backward moves pull the high-water mark down with them.
    #[test]
    fn last_valid_step_never_exceeds_current_step() {
        let mut state = state_at(1);
        for step in 1..=4 {
            state.mark_valid(step);
            state.move_to(step + 1);
            assert_eq!(state.last_valid_step, step);
        }
        state.move_to(2);
        assert_eq!(state.last_valid_step, 2);
        assert!(state.last_valid_step <= state.current_step);
    }

    #[test]
    fn publish_report_replaces_errors_and_sets_focus() {
        let mut state = state_at(2);
        state
            .errors
            .insert("stale".to_string(), "old message".to_string());
        let report = StepReport {
            step: 2,
            is_valid: false,
            errors: vec![
                ValidationError::new("email", ErrorKind::InvalidFormat),
                ValidationError::dependency("city", "country"),
            ],
            first_invalid: Some("email".to_string()),
        };
        state.publish_report(&report);
        assert_eq!(state.errors.len(), 2);
        assert_eq!(state.errors["email"], "Invalid format");
        assert_eq!(state.focus.as_deref(), Some("email"));
    }

    #[test]
    fn reset_restores_initial_values() {
        let mut state = state_at(6);
        state.last_valid_step = 5;
        state.is_submitting = true;
        state.reset(FieldMap::new());
        assert_eq!(state, FormState::new(6, FieldMap::new()));
    }
}
