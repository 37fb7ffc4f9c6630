//! Submission orchestration for a [`FormSession`].
//!
//! Submission is split around its one suspension point: [`begin_submission`]
//! re-validates and builds the request, the caller delivers it, and
//! [`complete_submission`] applies the outcome. While a
//! [`PendingSubmission`] is outstanding the session reports
//! `is_submitting` and refuses navigation and further submissions.
//!
//! [`begin_submission`]: FormSession::begin_submission
//! [`complete_submission`]: FormSession::complete_submission

use anyhow::Result;
use tracing::{error, info, warn};

use crate::core::analytics::Analytics;
use crate::core::state::Transition;
use crate::error::SubmissionError;
use crate::io::clock::Clock;
use crate::io::store::KeyValueStore;
use crate::io::submitter::{SubmissionPayload, SubmitRequest, SubmitResponse, Submitter};
use crate::session::FormSession;

const SUCCESS_NOTICE: &str = "Form submitted successfully!";

/// A validated submission waiting for its transport result.
///
/// Hand it back through [`FormSession::complete_submission`] or
/// [`FormSession::abort_submission`]; until then the session stays in the
/// submitting state.
#[derive(Debug)]
#[must_use = "a pending submission must be completed"]
pub struct PendingSubmission {
    request: SubmitRequest,
}

impl PendingSubmission {
    pub fn request(&self) -> &SubmitRequest {
        &self.request
    }
}

impl<S: KeyValueStore, C: Clock> FormSession<S, C> {
    /// Validate and submit in one call.
    pub fn submit<T: Submitter>(&mut self, submitter: &T) -> Result<(), SubmissionError> {
        let pending = self.begin_submission()?;
        let result = submitter.submit(pending.request());
        self.complete_submission(pending, result)
    }

    /// Re-validate every step and build the request.
    ///
    /// On the first invalid step the session moves there, shows the generic
    /// failure message and nothing is sent.
    pub fn begin_submission(&mut self) -> Result<PendingSubmission, SubmissionError> {
        if self.state.is_submitting {
            warn!("submission ignored: already in flight");
            return Err(SubmissionError::InFlight);
        }
        self.state.is_submitting = true;
        self.state.global_error = None;
        self.state.notice = None;

        for step in 1..=self.state.total_steps {
            let report = self.validate(step);
            if report.is_valid {
                continue;
            }
            // Engine-initiated, so it may land ahead of the current step.
            if let Ok(target) = self.state.target_for(Transition::SystemJump(step)) {
                self.enter(target);
            }
            let err = SubmissionError::LocalValidationFailed { step };
            warn!(step, errors = report.errors.len(), "submission blocked by validation");
            self.state.global_error = Some(err.user_message().to_string());
            self.state.is_submitting = false;
            return Err(err);
        }

        let request = SubmitRequest {
            endpoint: self.config.endpoint.clone(),
            csrf_token: self.config.csrf_token.clone(),
            payload: SubmissionPayload {
                form_data: self.state.values.clone(),
                analytics: self.analytics.clone(),
            },
        };
        info!(endpoint = %request.endpoint, fields = request.payload.form_data.len(), "submitting form");
        Ok(PendingSubmission { request })
    }

    /// Apply the transport result of a pending submission.
    ///
    /// Success clears the snapshot and resets the session to step 1. Failure
    /// keeps the snapshot and analytics and rolls back to the last valid step.
    /// `is_submitting` is cleared either way.
    pub fn complete_submission(
        &mut self,
        _pending: PendingSubmission,
        result: Result<SubmitResponse>,
    ) -> Result<(), SubmissionError> {
        let outcome = match result {
            Ok(response) if response.is_success() => Ok(()),
            Ok(response) => Err(SubmissionError::ServerRejected {
                status: response.status,
            }),
            Err(err) => Err(SubmissionError::TransportFailure(format!("{err:#}"))),
        };

        match &outcome {
            Ok(()) => self.finish_success(),
            Err(err) => self.recover_from(err),
        }
        self.state.is_submitting = false;
        outcome
    }

    /// Give up on a pending submission without a transport result.
    ///
    /// The session leaves the submitting state and keeps its step, values,
    /// analytics and snapshot. Nothing was sent, so no message is shown.
    pub fn abort_submission(&mut self, _pending: PendingSubmission) {
        self.state.is_submitting = false;
        info!("submission aborted");
    }

    fn finish_success(&mut self) {
        if let Err(err) = self.persistence.clear() {
            warn!(error = %format!("{err:#}"), "could not clear saved answers");
        }
        let defaults = self.definition.layout.default_values();
        self.state.reset(defaults);
        self.state.notice = Some(SUCCESS_NOTICE.to_string());
        self.analytics = Analytics::new(self.clock.now_ms());
        self.refresh_cities();
        info!("form submitted");
    }

    fn recover_from(&mut self, err: &SubmissionError) {
        error!(error = %err, "form submission failed");
        self.state.global_error = Some(err.user_message().to_string());
        if self.state.last_valid_step < self.state.current_step {
            self.enter(self.state.last_valid_step);
        }
    }
}
