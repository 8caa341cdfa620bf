use std::sync::Arc;

use shared::{
    domain::{AssignedCv, Reviewee, RevieweeId, ReviewerInfo},
    protocol::{AssignedResponse, ReviewSubmission},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::{ensure_success, ClientError},
    session::SessionGate,
};

/// Shown when a six-field submission still has blank entries.
pub const BLANK_RATINGS_MESSAGE: &str = "Please fill out all review fields before submitting.";
/// Shown when the queue affordance is exercised with no quota headroom left.
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "All reviews completed!";

const LOAD_ASSIGNED_FAILED_MESSAGE: &str = "Failed to fetch assigned CVs";
const FETCH_NEXT_FAILED_MESSAGE: &str = "Failed to fetch next CV";
const SUBMIT_FAILED_MESSAGE: &str = "Review submission failed";

/// Number of structured rating fields; see
/// [`shared::domain::REVIEW_CRITERIA`] for their prompts.
pub const RATING_FIELDS: usize = 6;

/// Shared-queue surface.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum QueueSurface {
    /// Nothing on deck: initial state, or the queue ran dry.
    #[default]
    Empty,
    /// A CV is loaded and open for comments.
    Loaded { reviewee: Reviewee },
    /// The loaded CV's review went through; fetch again to continue.
    Submitted { reviewee: Reviewee },
}

#[derive(Debug, Default)]
struct WorkflowState {
    queue: QueueSurface,
    queue_draft: String,
    loading_next: bool,
    reviewer: Option<ReviewerInfo>,
    assigned: Vec<AssignedCv>,
    loading_assigned: bool,
    selected: Option<AssignedCv>,
    ratings: [String; RATING_FIELDS],
    submitted_assigned: bool,
    error: Option<String>,
}

/// Point-in-time view of the workflow for rendering.
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub queue: QueueSurface,
    pub queue_draft: String,
    pub loading_next: bool,
    pub reviewer: Option<ReviewerInfo>,
    pub assigned: Vec<AssignedCv>,
    pub loading_assigned: bool,
    pub selected: Option<AssignedCv>,
    pub ratings: [String; RATING_FIELDS],
    pub submitted_assigned: bool,
    pub error: Option<String>,
}

/// The reviewer's two surfaces over one shared quota: the anonymous pull
/// queue and the personal assigned list.
///
/// Operations hold the state lock only around transitions, never across a
/// network call; an operation already in flight suppresses a re-entrant
/// trigger of itself via its loading flag. There is no cancellation: when
/// overlapping calls race, the last response to land wins.
pub struct ReviewWorkflow {
    gate: Arc<SessionGate>,
    inner: Mutex<WorkflowState>,
}

impl ReviewWorkflow {
    pub fn new(gate: Arc<SessionGate>) -> Self {
        Self {
            gate,
            inner: Mutex::new(WorkflowState::default()),
        }
    }

    /// Refreshes the assigned list and quota counters from the server,
    /// replacing both wholesale.
    pub async fn load_assigned(&self) -> Result<(), ClientError> {
        {
            let mut state = self.inner.lock().await;
            if state.loading_assigned {
                debug!("workflow: assigned refresh already in flight; skipping");
                return Ok(());
            }
            state.loading_assigned = true;
            state.error = None;
        }
        let outcome = self.fetch_assigned().await;
        let mut state = self.inner.lock().await;
        state.loading_assigned = false;
        match outcome {
            Ok(response) => {
                for item in &response.assigned {
                    if let Err(err) = item.validate() {
                        warn!("workflow: assigned row failed validation: {err}");
                    }
                }
                info!(
                    reviewer_id = response.reviewer.id.0,
                    assigned = response.assigned.len(),
                    reviewed = response.reviewer.reviewed_count,
                    quota = response.reviewer.reviews_number,
                    "workflow: assigned list loaded"
                );
                state.reviewer = Some(response.reviewer);
                state.assigned = response.assigned;
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn fetch_assigned(&self) -> Result<AssignedResponse, ClientError> {
        let response = self.gate.get("/reviewer/assigned").await?;
        let response = ensure_success(response, LOAD_ASSIGNED_FAILED_MESSAGE).await?;
        Ok(response.json().await?)
    }

    /// Pulls the next CV from the shared queue. Requires loaded reviewer info
    /// with quota headroom; both guards fail before any network call. The
    /// previous submission flag is cleared up front and the draft on the way
    /// out, so a failed fetch leaves the prior CV open for editing rather
    /// than marked submitted.
    pub async fn fetch_next(&self) -> Result<(), ClientError> {
        {
            let mut state = self.inner.lock().await;
            if state.loading_next {
                debug!("workflow: next-CV fetch already in flight; skipping");
                return Ok(());
            }
            let Some(reviewer) = state.reviewer.as_ref() else {
                return Err(ClientError::precondition(
                    "reviewer details are not loaded yet; refresh the assigned list first",
                ));
            };
            if !reviewer.has_remaining_reviews() {
                return Err(ClientError::precondition(QUOTA_EXHAUSTED_MESSAGE));
            }
            state.loading_next = true;
            state.error = None;
            if let QueueSurface::Submitted { reviewee } = state.queue.clone() {
                state.queue = QueueSurface::Loaded { reviewee };
            }
        }
        let outcome = self.fetch_next_reviewee().await;
        let mut state = self.inner.lock().await;
        state.loading_next = false;
        state.queue_draft.clear();
        match outcome {
            Ok(Some(reviewee)) => {
                info!(reviewee_id = reviewee.id.0, "workflow: next CV loaded");
                state.queue = QueueSurface::Loaded { reviewee };
                Ok(())
            }
            Ok(None) => {
                info!("workflow: queue is empty");
                state.queue = QueueSurface::Empty;
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn fetch_next_reviewee(&self) -> Result<Option<Reviewee>, ClientError> {
        let response = self.gate.get("/reviewer/next").await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let response = ensure_success(response, FETCH_NEXT_FAILED_MESSAGE).await?;
        Ok(Some(response.json().await?))
    }

    /// Submits the queue draft for the loaded CV: the draft is split on
    /// newlines, each line trimmed, blank lines dropped, order kept. Only
    /// valid while a CV is loaded, and the draft must yield at least one
    /// comment; both guards fail before any network call.
    pub async fn submit_queue_review(&self) -> Result<(), ClientError> {
        let (reviewee, comments) = {
            let mut state = self.inner.lock().await;
            state.error = None;
            let QueueSurface::Loaded { reviewee } = state.queue.clone() else {
                return Err(record_precondition(
                    &mut state,
                    "no CV is loaded; fetch the next CV first",
                ));
            };
            let comments = split_comments(&state.queue_draft);
            if comments.is_empty() {
                return Err(record_precondition(
                    &mut state,
                    "enter at least one comment before submitting",
                ));
            }
            (reviewee, comments)
        };
        match self.post_review(reviewee.id, comments).await {
            Ok(()) => {
                {
                    let mut state = self.inner.lock().await;
                    state.queue = QueueSurface::Submitted { reviewee };
                }
                info!("workflow: queue review submitted");
                self.load_assigned().await
            }
            Err(err) => {
                self.inner.lock().await.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Opens an assigned CV for structured review. The six rating fields
    /// always start blank, whatever was in them before.
    pub async fn open_assigned(&self, reviewee_id: RevieweeId) -> Result<(), ClientError> {
        let mut state = self.inner.lock().await;
        let Some(item) = state
            .assigned
            .iter()
            .find(|item| item.reviewee.id == reviewee_id)
            .cloned()
        else {
            return Err(record_precondition(
                &mut state,
                format!("reviewee {} is not on the assigned list", reviewee_id.0),
            ));
        };
        state.selected = Some(item);
        state.ratings = Default::default();
        state.submitted_assigned = false;
        state.error = None;
        Ok(())
    }

    pub async fn set_rating(
        &self,
        index: usize,
        value: impl Into<String>,
    ) -> Result<(), ClientError> {
        let mut state = self.inner.lock().await;
        if state.selected.is_none() {
            return Err(ClientError::precondition("no assigned CV is open"));
        }
        let Some(slot) = state.ratings.get_mut(index) else {
            return Err(ClientError::precondition(format!(
                "rating index {index} is out of range; there are {RATING_FIELDS} fields"
            )));
        };
        *slot = value.into();
        Ok(())
    }

    /// Submits the six structured fields for the open assigned CV, verbatim
    /// and in prompt order. Every field must be non-blank after trimming;
    /// the guard fails before any network call.
    pub async fn submit_assigned_review(&self) -> Result<(), ClientError> {
        let (reviewee_id, comments) = {
            let mut state = self.inner.lock().await;
            state.error = None;
            let Some(selected) = state.selected.as_ref() else {
                return Err(record_precondition(&mut state, "no assigned CV is open"));
            };
            let reviewee_id = selected.reviewee.id;
            if state.ratings.iter().any(|rating| rating.trim().is_empty()) {
                return Err(record_precondition(&mut state, BLANK_RATINGS_MESSAGE));
            }
            (reviewee_id, state.ratings.to_vec())
        };
        match self.post_review(reviewee_id, comments).await {
            Ok(()) => {
                self.inner.lock().await.submitted_assigned = true;
                info!(
                    reviewee_id = reviewee_id.0,
                    "workflow: assigned review submitted"
                );
                self.load_assigned().await
            }
            Err(err) => {
                self.inner.lock().await.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Drops the current selection. The next open resets the fields anyway.
    pub async fn close_assigned(&self) {
        self.inner.lock().await.selected = None;
    }

    async fn post_review(
        &self,
        reviewee_id: RevieweeId,
        comments: Vec<String>,
    ) -> Result<(), ClientError> {
        let submission = ReviewSubmission {
            reviewee_id,
            comments,
        };
        let response = self.gate.post_json("/reviewer/review", &submission).await?;
        ensure_success(response, SUBMIT_FAILED_MESSAGE).await?;
        Ok(())
    }

    /// Queue affordance gate: true only while the quota has headroom.
    pub async fn has_remaining_reviews(&self) -> bool {
        self.inner
            .lock()
            .await
            .reviewer
            .as_ref()
            .is_some_and(ReviewerInfo::has_remaining_reviews)
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.inner.lock().await;
        WorkflowSnapshot {
            queue: state.queue.clone(),
            queue_draft: state.queue_draft.clone(),
            loading_next: state.loading_next,
            reviewer: state.reviewer.clone(),
            assigned: state.assigned.clone(),
            loading_assigned: state.loading_assigned,
            selected: state.selected.clone(),
            ratings: state.ratings.clone(),
            submitted_assigned: state.submitted_assigned,
            error: state.error.clone(),
        }
    }

    pub async fn queue(&self) -> QueueSurface {
        self.inner.lock().await.queue.clone()
    }

    pub async fn set_queue_draft(&self, text: impl Into<String>) {
        self.inner.lock().await.queue_draft = text.into();
    }

    pub async fn queue_draft(&self) -> String {
        self.inner.lock().await.queue_draft.clone()
    }

    pub async fn reviewer(&self) -> Option<ReviewerInfo> {
        self.inner.lock().await.reviewer.clone()
    }

    pub async fn assigned(&self) -> Vec<AssignedCv> {
        self.inner.lock().await.assigned.clone()
    }

    pub async fn selected_assigned(&self) -> Option<AssignedCv> {
        self.inner.lock().await.selected.clone()
    }

    pub async fn ratings(&self) -> [String; RATING_FIELDS] {
        self.inner.lock().await.ratings.clone()
    }

    pub async fn assigned_submitted(&self) -> bool {
        self.inner.lock().await.submitted_assigned
    }

    pub async fn is_loading_next(&self) -> bool {
        self.inner.lock().await.loading_next
    }

    pub async fn is_loading_assigned(&self) -> bool {
        self.inner.lock().await.loading_assigned
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.lock().await.error.clone()
    }

    pub async fn dismiss_error(&self) {
        self.inner.lock().await.error = None;
    }
}

fn record_precondition(state: &mut WorkflowState, message: impl Into<String>) -> ClientError {
    let err = ClientError::precondition(message);
    state.error = Some(err.to_string());
    err
}

/// Splits free-form draft text into the comments array: one entry per line,
/// trimmed, blank lines dropped, order preserved.
pub fn split_comments(draft: &str) -> Vec<String> {
    draft
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
