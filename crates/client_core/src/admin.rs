use std::sync::Arc;

use serde::de::DeserializeOwned;
use shared::domain::{Review, Reviewee, ReviewerRecord};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::{ensure_success, ClientError},
    session::SessionGate,
};

const LOAD_FAILED_MESSAGE: &str = "Failed to fetch data";
const ALLOCATE_FAILED_MESSAGE: &str = "Allocation failed";

#[derive(Debug, Default)]
struct AdminState {
    reviewees: Vec<Reviewee>,
    reviewers: Vec<ReviewerRecord>,
    reviews: Vec<Review>,
    loading: bool,
    allocating: bool,
    error: Option<String>,
}

/// Admin surface: the three listings plus the allocation trigger. Same slot
/// discipline as the review workflow: one loading flag per operation, one
/// error slot, collections replaced wholesale.
pub struct AdminDashboard {
    gate: Arc<SessionGate>,
    inner: Mutex<AdminState>,
}

impl AdminDashboard {
    pub fn new(gate: Arc<SessionGate>) -> Self {
        Self {
            gate,
            inner: Mutex::new(AdminState::default()),
        }
    }

    /// Loads all three listings concurrently and replaces them wholesale.
    pub async fn load_all(&self) -> Result<(), ClientError> {
        {
            let mut state = self.inner.lock().await;
            if state.loading {
                debug!("admin: listings load already in flight; skipping");
                return Ok(());
            }
            state.loading = true;
            state.error = None;
        }
        let outcome = futures::try_join!(
            self.fetch_list::<Reviewee>("/admin/reviewees"),
            self.fetch_list::<ReviewerRecord>("/admin/reviewers"),
            self.fetch_list::<Review>("/admin/reviews"),
        );
        let mut state = self.inner.lock().await;
        state.loading = false;
        match outcome {
            Ok((reviewees, reviewers, reviews)) => {
                info!(
                    reviewees = reviewees.len(),
                    reviewers = reviewers.len(),
                    reviews = reviews.len(),
                    "admin: listings loaded"
                );
                state.reviewees = reviewees;
                state.reviewers = reviewers;
                state.reviews = reviews;
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Triggers a server-side allocation pass, then refreshes the reviewee
    /// listing (assignments moved; the other listings are untouched). A
    /// failed refresh after a successful pass is only logged.
    pub async fn allocate(&self) -> Result<(), ClientError> {
        {
            let mut state = self.inner.lock().await;
            if state.allocating {
                debug!("admin: allocation already in flight; skipping");
                return Ok(());
            }
            state.allocating = true;
            state.error = None;
        }
        let outcome = self.run_allocation().await;
        let mut state = self.inner.lock().await;
        state.allocating = false;
        match outcome {
            Ok(reviewees) => {
                if let Some(reviewees) = reviewees {
                    state.reviewees = reviewees;
                }
                Ok(())
            }
            Err(err) => {
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn run_allocation(&self) -> Result<Option<Vec<Reviewee>>, ClientError> {
        let response = self.gate.post("/admin/allocate").await?;
        ensure_success(response, ALLOCATE_FAILED_MESSAGE).await?;
        info!("admin: allocation pass triggered");
        match self.fetch_list::<Reviewee>("/admin/reviewees").await {
            Ok(reviewees) => Ok(Some(reviewees)),
            Err(err) => {
                warn!("admin: reviewee refresh after allocation failed: {err}");
                Ok(None)
            }
        }
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ClientError> {
        let response = self.gate.get(path).await?;
        let response = ensure_success(response, LOAD_FAILED_MESSAGE).await?;
        Ok(response.json().await?)
    }

    pub async fn reviewees(&self) -> Vec<Reviewee> {
        self.inner.lock().await.reviewees.clone()
    }

    pub async fn reviewers(&self) -> Vec<ReviewerRecord> {
        self.inner.lock().await.reviewers.clone()
    }

    pub async fn reviews(&self) -> Vec<Review> {
        self.inner.lock().await.reviews.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.lock().await.loading
    }

    pub async fn is_allocating(&self) -> bool {
        self.inner.lock().await.allocating
    }

    pub async fn error(&self) -> Option<String> {
        self.inner.lock().await.error.clone()
    }

    pub async fn dismiss_error(&self) {
        self.inner.lock().await.error = None;
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
