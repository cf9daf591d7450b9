use super::catalog::{normalize, Lesson, LessonKey, LoadWarning, Week};
use super::filter::{self, FilterSpec};
use super::model::{AssignReport, MoveOutcome, ScheduleModel};
use super::selection::Selection;
use super::summary::{summarize, Summary};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Loading,
    Ready,
    Submitting,
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Submitting => "submitting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{operation} is not allowed while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "invalid_state",
            Self::ReferenceNotFound(_) => "reference_not_found",
        }
    }
}

/// Outcome reported by whoever delivers a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Delivered,
    Failed(String),
}

/// What goes out on submit: the pass-through params plus weeks and summary.
/// Pool and selection are never part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPayload {
    pub params: Map<String, Value>,
    pub weeks: Vec<Week>,
    pub summary: Summary,
}

impl SubmissionPayload {
    pub fn to_json(&self) -> Value {
        let mut out = self.params.clone();
        out.insert(
            "weeks".to_string(),
            serde_json::to_value(&self.weeks).unwrap_or(Value::Array(Vec::new())),
        );
        out.insert(
            "summary".to_string(),
            serde_json::to_value(&self.summary).unwrap_or(Value::Null),
        );
        Value::Object(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub payload: SubmissionPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: SessionState,
    pub weeks: Vec<Week>,
    pub pool: Vec<Lesson>,
    pub pool_size: usize,
    pub summary: Summary,
    pub params: Map<String, Value>,
    pub selection: Vec<LessonKey>,
    pub query: String,
    pub filter: FilterSpec,
    pub filter_labels: Vec<String>,
    pub modules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
}

/// One editing lifecycle: `Loading -> Ready <-> Submitting`, `Ready -> Closed`.
#[derive(Debug, Clone)]
pub struct EditSession {
    state: SessionState,
    model: ScheduleModel,
    params: Map<String, Value>,
    selection: Selection,
    query: String,
    filter: FilterSpec,
    default_filter: FilterSpec,
    pending: Option<Submission>,
    last_failure: Option<String>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(FilterSpec::default())
    }
}

impl EditSession {
    /// A session waiting for its schedule. `default_filter` is what the pool
    /// view starts with and what a filter reset returns to.
    pub fn new(default_filter: FilterSpec) -> Self {
        Self {
            state: SessionState::Loading,
            model: ScheduleModel::default(),
            params: Map::new(),
            selection: Selection::default(),
            query: String::new(),
            filter: default_filter.clone(),
            default_filter,
            pending: None,
            last_failure: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn model(&self) -> &ScheduleModel {
        &self.model
    }

    /// Derived from the weeks on every call.
    pub fn summary(&self) -> Summary {
        self.model.summary()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn pending_submission(&self) -> Option<&Submission> {
        self.pending.as_ref()
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Runs after every structural change, never in the middle of one.
    fn refresh(&mut self) {
        let dropped = self.selection.reconcile(self.model.pool());
        if dropped > 0 {
            debug!(dropped, "selection reconciled against pool");
        }
    }

    fn moved(&mut self, outcome: MoveOutcome, reference: impl FnOnce() -> String) -> Result<MoveOutcome, SessionError> {
        match outcome {
            MoveOutcome::NotFound => Err(SessionError::ReferenceNotFound(reference())),
            MoveOutcome::Unchanged => Ok(outcome),
            MoveOutcome::Moved => {
                self.refresh();
                Ok(outcome)
            }
        }
    }

    pub fn load(&mut self, input: &Value) -> Result<Vec<LoadWarning>, SessionError> {
        self.require("load", &[SessionState::Loading])?;
        let normalized = normalize(input);
        if !normalized.warnings.is_empty() {
            warn!(
                count = normalized.warnings.len(),
                "input schedule needed repairs"
            );
        }
        self.model = ScheduleModel::new(normalized.weeks, normalized.pool);
        self.params = normalized.params;
        self.state = SessionState::Ready;
        self.refresh();
        info!(
            weeks = self.model.weeks().len(),
            pool = self.model.pool().len(),
            "schedule loaded"
        );
        Ok(normalized.warnings)
    }

    pub fn set_filter(&mut self, query: impl Into<String>, spec: FilterSpec) -> Result<(), SessionError> {
        self.require("filter", &[SessionState::Ready, SessionState::Submitting])?;
        self.query = query.into();
        self.filter = spec;
        Ok(())
    }

    pub fn reset_filter(&mut self) -> Result<(), SessionError> {
        let spec = self.default_filter.clone();
        self.set_filter(String::new(), spec)
    }

    /// The pool as shown: filter pipeline output with the selection pinned in front.
    pub fn displayed_pool(&self) -> Vec<Lesson> {
        let pool = self.model.pool();
        let filtered = filter::apply(pool, &self.query, &self.filter);
        self.selection.pin(pool, filtered)
    }

    pub fn toggle_selection(&mut self, key: &LessonKey) -> Result<bool, SessionError> {
        self.require("select", &[SessionState::Ready, SessionState::Submitting])?;
        self.selection
            .toggle(key, self.model.pool())
            .ok_or_else(|| SessionError::ReferenceNotFound(format!("lesson {} is not in the pool", key)))
    }

    pub fn clear_selection(&mut self) -> Result<(), SessionError> {
        self.require("select", &[SessionState::Ready, SessionState::Submitting])?;
        self.selection.clear();
        Ok(())
    }

    pub fn move_within_week(&mut self, week: u32, from: usize, to: usize) -> Result<MoveOutcome, SessionError> {
        self.require("moveWithinWeek", &[SessionState::Ready])?;
        let outcome = self.model.move_within_week(week, from, to);
        self.moved(outcome, || format!("week {} index {}", week, from))
    }

    pub fn move_between_weeks(
        &mut self,
        source_week: u32,
        source_index: usize,
        dest_week: u32,
        dest_index: usize,
    ) -> Result<MoveOutcome, SessionError> {
        self.require("moveBetweenWeeks", &[SessionState::Ready])?;
        let outcome = self
            .model
            .move_between_weeks(source_week, source_index, dest_week, dest_index);
        self.moved(outcome, || {
            format!(
                "week {} index {} -> week {}",
                source_week, source_index, dest_week
            )
        })
    }

    pub fn discard_to_pool(&mut self, week: u32, index: usize) -> Result<MoveOutcome, SessionError> {
        self.require("discard", &[SessionState::Ready])?;
        let outcome = self.model.discard_to_pool(week, index);
        self.moved(outcome, || format!("week {} index {}", week, index))
    }

    pub fn assign_from_pool(&mut self, keys: &[LessonKey], week: u32) -> Result<AssignReport, SessionError> {
        self.require("assign", &[SessionState::Ready])?;
        let report = self
            .model
            .assign_from_pool(keys, week)
            .ok_or_else(|| SessionError::ReferenceNotFound(format!("week {}", week)))?;
        self.refresh();
        debug!(
            week,
            assigned = report.assigned,
            skipped = report.skipped_duplicates,
            missing = report.missing,
            "assigned from pool"
        );
        Ok(report)
    }

    /// Assigns every selected lesson, in selection order.
    pub fn assign_selection(&mut self, week: u32) -> Result<AssignReport, SessionError> {
        let keys = self.selection.keys().to_vec();
        self.assign_from_pool(&keys, week)
    }

    /// Freezes the current weeks and summary for delivery. Edits are refused
    /// until [`EditSession::acknowledge`] is called.
    pub fn submit(&mut self) -> Result<Submission, SessionError> {
        self.require("submit", &[SessionState::Ready])?;
        let weeks = self.model.weeks().to_vec();
        let summary = summarize(&weeks);
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            payload: SubmissionPayload {
                params: self.params.clone(),
                weeks,
                summary,
            },
        };
        self.pending = Some(submission.clone());
        self.state = SessionState::Submitting;
        info!(submission = %submission.id, total_minutes = submission.payload.summary.total_minutes, "submission started");
        Ok(submission)
    }

    pub fn acknowledge(&mut self, ack: Ack) -> Result<(), SessionError> {
        self.require("acknowledge", &[SessionState::Submitting])?;
        let id = self.pending.take().map(|s| s.id).unwrap_or_default();
        match ack {
            Ack::Delivered => {
                info!(submission = %id, "submission delivered");
                self.last_failure = None;
            }
            Ack::Failed(reason) => {
                warn!(submission = %id, reason = %reason, "submission failed");
                self.last_failure = Some(reason);
            }
        }
        self.state = SessionState::Ready;
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), SessionError> {
        self.require("close", &[SessionState::Ready])?;
        self.state = SessionState::Closed;
        Ok(())
    }

    pub fn view(&self) -> Result<SessionView, SessionError> {
        if self.state == SessionState::Loading {
            return Err(SessionError::InvalidState {
                operation: "view",
                state: self.state,
            });
        }
        Ok(SessionView {
            state: self.state,
            weeks: self.model.weeks().to_vec(),
            pool: self.displayed_pool(),
            pool_size: self.model.pool().len(),
            summary: self.model.summary(),
            params: self.params.clone(),
            selection: self.selection.keys().to_vec(),
            query: self.query.clone(),
            filter: self.filter.clone(),
            filter_labels: filter::describe(&self.query, &self.filter),
            modules: filter::modules(self.model.pool()),
            pending_submission_id: self.pending.as_ref().map(|s| s.id.clone()),
            last_failure: self.last_failure.clone(),
        })
    }
}
