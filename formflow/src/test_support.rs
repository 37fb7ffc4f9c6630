//! Test-only helpers: a manual clock, a scripted submitter and a filled-in
//! applicant.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};

use crate::core::types::FieldValue;
use crate::io::clock::Clock;
use crate::io::config::FormConfig;
use crate::io::store::{FileStore, KeyValueStore, MemoryStore};
use crate::io::submitter::{SubmitRequest, SubmitResponse, Submitter};
use crate::session::{FormDefinition, FormSession};

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now_ms: Rc::new(Cell::new(now.timestamp_millis())),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now_ms.set(now.timestamp_millis());
    }
}

impl Default for ManualClock {
    /// 2024-06-01T12:00:00Z.
    fn default() -> Self {
        Self {
            now_ms: Rc::new(Cell::new(1_717_243_200_000)),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_ms.get())
            .single()
            .unwrap_or_default()
    }

    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }
}

/// Submitter that replays queued results and records every request.
#[derive(Default)]
pub struct ScriptedSubmitter {
    results: RefCell<VecDeque<Result<SubmitResponse>>>,
    requests: RefCell<Vec<SubmitRequest>>,
}

impl ScriptedSubmitter {
    pub fn new(results: Vec<Result<SubmitResponse>>) -> Self {
        Self {
            results: RefCell::new(results.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self::new(vec![Ok(SubmitResponse { status })])
    }

    pub fn requests(&self) -> Vec<SubmitRequest> {
        self.requests.borrow().clone()
    }
}

impl Submitter for ScriptedSubmitter {
    fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted response left")))
    }
}

/// Config used by test sessions.
pub fn test_config() -> FormConfig {
    FormConfig {
        csrf_token: "test-csrf-token".to_string(),
        ..FormConfig::default()
    }
}

pub fn session_with<S: KeyValueStore>(store: S, clock: ManualClock) -> FormSession<S, ManualClock> {
    let definition = FormDefinition::builtin().expect("builtin definition");
    FormSession::start(definition, test_config(), store, clock)
}

/// Fresh session over an empty in-memory store.
pub fn memory_session(clock: ManualClock) -> FormSession<MemoryStore, ManualClock> {
    session_with(MemoryStore::new(), clock)
}

/// File store in a fresh temp dir. Keep the guard alive for the test.
pub fn temp_file_store() -> (tempfile::TempDir, FileStore) {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = FileStore::new(temp.path().join("storage"));
    (temp, store)
}

/// Valid answers for `step`, in entry order.
pub fn valid_answers(step: u32) -> Vec<(&'static str, FieldValue)> {
    let t = FieldValue::text;
    match step {
        1 => vec![
            ("fullName", t("Jane Doe")),
            ("dob", t("1990-05-15")),
            ("gender", t("female")),
        ],
        2 => vec![
            ("email", t("jane@example.com")),
            ("mobile", t("+1 555-000-1111")),
            ("country", t("US")),
            ("city", t("Chicago")),
            ("currentAddress", t("1 Main St")),
        ],
        3 => vec![
            ("highestDegree", t("bachelor")),
            ("fieldOfStudy", t("Computer Science")),
            ("institution", t("State University")),
            ("graduationYear", t("2012")),
        ],
        4 => vec![
            ("currentJobTitle", t("Engineer")),
            ("companyName", t("Acme")),
            ("totalExperience", t("10")),
        ],
        5 => vec![
            ("technicalSkills", FieldValue::many(["Rust", "SQL"])),
            ("softSkills", FieldValue::many(["Teamwork"])),
            ("jobType", t("full-time")),
            ("expectedSalary", t("85000")),
            ("salaryCurrency", t("USD")),
        ],
        _ => Vec::new(),
    }
}

/// Enter the valid answers for `step`.
pub fn fill_step<S: KeyValueStore, C: Clock>(session: &mut FormSession<S, C>, step: u32) {
    for (field, value) in valid_answers(step) {
        session
            .set_field(field, value)
            .unwrap_or_else(|err| panic!("set {field}: {err:#}"));
    }
}

/// Enter valid answers for every step without navigating.
pub fn fill_all<S: KeyValueStore, C: Clock>(session: &mut FormSession<S, C>) {
    let total = session.state().total_steps;
    for step in 1..=total {
        fill_step(session, step);
    }
}

/// Fill and advance until the terminal step is reached.
pub fn walk_to_review<S: KeyValueStore, C: Clock>(session: &mut FormSession<S, C>) {
    while !session.state().is_terminal() {
        let step = session.state().current_step;
        fill_step(session, step);
        let outcome = session.advance();
        assert!(outcome.moved(), "step {step}: {outcome:?}");
    }
}
