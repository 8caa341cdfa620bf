use super::*;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use shared::{domain::ReviewerId, error::ErrorBody};
use std::time::Duration;
use tokio::{net::TcpListener, sync::Notify};

use crate::session::MemoryCredentialStore;

struct ReviewServer {
    reviewer: ReviewerInfo,
    assigned: Vec<AssignedCv>,
    queue: Vec<Reviewee>,
    submissions: Vec<ReviewSubmission>,
    assigned_calls: u32,
    next_calls: u32,
    review_calls: u32,
    fail_assigned: Option<String>,
    fail_next: Option<String>,
    fail_review: Option<String>,
    hold_assigned: Option<Arc<Notify>>,
    hold_next: Option<Arc<Notify>>,
}

impl Default for ReviewServer {
    fn default() -> Self {
        Self {
            reviewer: reviewer_info(0, 8),
            assigned: Vec::new(),
            queue: Vec::new(),
            submissions: Vec::new(),
            assigned_calls: 0,
            next_calls: 0,
            review_calls: 0,
            fail_assigned: None,
            fail_next: None,
            fail_review: None,
            hold_assigned: None,
            hold_next: None,
        }
    }
}

#[derive(Clone)]
struct ReviewServerState {
    inner: Arc<Mutex<ReviewServer>>,
}

fn reviewer_info(reviewed_count: u32, reviews_number: u32) -> ReviewerInfo {
    ReviewerInfo {
        id: ReviewerId(7),
        name: "asha".to_string(),
        profiles: vec!["Software".to_string()],
        reviewed_count,
        reviews_number,
    }
}

fn cv(id: i64, name: &str) -> Reviewee {
    Reviewee {
        id: RevieweeId(id),
        name: name.to_string(),
        roll_no: format!("22CS3{id:03}"),
        email: None,
        cv_link: format!("https://drive.example.com/{id}"),
        profile: "Software".to_string(),
        status: false,
        assigned_to_id: None,
        submission_time: None,
    }
}

fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 9, 0, 0).unwrap()
}

fn assigned_cv(id: i64, name: &str) -> AssignedCv {
    AssignedCv {
        reviewee: cv(id, name),
        assigned_at: ts(1),
        submitted_at: None,
    }
}

async fn handle_assigned(State(state): State<ReviewServerState>) -> Response {
    let mut server = state.inner.lock().await;
    server.assigned_calls += 1;
    if let Some(hold) = server.hold_assigned.clone() {
        drop(server);
        hold.notified().await;
        server = state.inner.lock().await;
    }
    if let Some(message) = &server.fail_assigned {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(message)),
        )
            .into_response();
    }
    Json(AssignedResponse {
        reviewer: server.reviewer.clone(),
        assigned: server.assigned.clone(),
    })
    .into_response()
}

async fn handle_next(State(state): State<ReviewServerState>) -> Response {
    let mut server = state.inner.lock().await;
    server.next_calls += 1;
    if let Some(hold) = server.hold_next.clone() {
        drop(server);
        hold.notified().await;
        server = state.inner.lock().await;
    }
    if let Some(message) = &server.fail_next {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(message)),
        )
            .into_response();
    }
    if server.queue.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    Json(server.queue.remove(0)).into_response()
}

async fn handle_review(
    State(state): State<ReviewServerState>,
    Json(submission): Json<ReviewSubmission>,
) -> Response {
    let mut server = state.inner.lock().await;
    server.review_calls += 1;
    if let Some(message) = &server.fail_review {
        return (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message))).into_response();
    }
    server.reviewer.reviewed_count += 1;
    server.submissions.push(submission);
    StatusCode::CREATED.into_response()
}

async fn spawn_review_server() -> anyhow::Result<(String, ReviewServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ReviewServerState {
        inner: Arc::new(Mutex::new(ReviewServer::default())),
    };
    let app = Router::new()
        .route("/reviewer/assigned", get(handle_assigned))
        .route("/reviewer/next", get(handle_next))
        .route("/reviewer/review", post(handle_review))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

async fn workflow_against(server_url: &str) -> ReviewWorkflow {
    let store = Arc::new(MemoryCredentialStore::default());
    let gate = Arc::new(SessionGate::new(server_url, store).expect("gate"));
    ReviewWorkflow::new(gate)
}

#[tokio::test]
async fn load_assigned_replaces_the_list_and_counters() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    {
        let mut server = state.inner.lock().await;
        server.reviewer = reviewer_info(3, 8);
        server.assigned = vec![assigned_cv(41, "Asha"), assigned_cv(42, "Bala")];
    }
    let workflow = workflow_against(&server_url).await;

    workflow.load_assigned().await.expect("load assigned");

    assert_eq!(workflow.assigned().await.len(), 2);
    let reviewer = workflow.reviewer().await.expect("reviewer");
    assert_eq!(reviewer.reviewed_count, 3);
    assert!(!workflow.is_loading_assigned().await);
    assert!(workflow.error().await.is_none());
}

#[tokio::test]
async fn failed_refresh_preserves_the_assigned_list() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.assigned = vec![assigned_cv(41, "Asha")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("first load");

    state.inner.lock().await.fail_assigned = Some("db offline".to_string());
    let err = workflow.load_assigned().await.expect_err("must fail");

    assert_eq!(err.to_string(), "db offline");
    assert_eq!(workflow.assigned().await.len(), 1);
    assert_eq!(workflow.error().await.as_deref(), Some("db offline"));
    assert!(!workflow.is_loading_assigned().await);
}

#[tokio::test]
async fn a_second_refresh_while_one_is_in_flight_is_skipped() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    let hold = Arc::new(Notify::new());
    {
        let mut server = state.inner.lock().await;
        server.assigned = vec![assigned_cv(41, "Asha")];
        server.hold_assigned = Some(hold.clone());
    }
    let workflow = Arc::new(workflow_against(&server_url).await);
    let background = tokio::spawn({
        let workflow = workflow.clone();
        async move { workflow.load_assigned().await }
    });
    tokio::time::timeout(Duration::from_secs(1), async {
        while state.inner.lock().await.assigned_calls == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first refresh timeout");
    assert!(workflow.is_loading_assigned().await);

    workflow.load_assigned().await.expect("suppressed refresh");
    assert_eq!(state.inner.lock().await.assigned_calls, 1);

    hold.notify_one();
    background.await.expect("join").expect("load assigned");
    assert_eq!(workflow.assigned().await.len(), 1);
    assert!(!workflow.is_loading_assigned().await);
}

#[tokio::test]
async fn fetch_next_loads_a_cv_and_resets_the_draft() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.queue = vec![cv(31, "First Applicant")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.set_queue_draft("left over from before").await;

    workflow.fetch_next().await.expect("fetch next");

    assert_eq!(
        workflow.queue().await,
        QueueSurface::Loaded {
            reviewee: cv(31, "First Applicant")
        }
    );
    assert!(workflow.queue_draft().await.is_empty());
    assert!(!workflow.is_loading_next().await);
}

#[tokio::test]
async fn an_empty_queue_parks_the_surface() {
    let (server_url, _state) = spawn_review_server().await.expect("spawn server");
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");

    workflow.fetch_next().await.expect("fetch next");

    assert_eq!(workflow.queue().await, QueueSurface::Empty);
    assert!(workflow.error().await.is_none());
}

#[tokio::test]
async fn fetch_next_requires_loaded_reviewer_details() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    let workflow = workflow_against(&server_url).await;

    let err = workflow.fetch_next().await.expect_err("must fail");

    assert!(matches!(err, ClientError::Precondition(_)));
    assert_eq!(state.inner.lock().await.next_calls, 0);
}

#[tokio::test]
async fn an_exhausted_quota_blocks_the_fetch_before_any_request() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.reviewer = reviewer_info(8, 8);
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    assert!(!workflow.has_remaining_reviews().await);

    let err = workflow.fetch_next().await.expect_err("must fail");

    assert_eq!(err.to_string(), QUOTA_EXHAUSTED_MESSAGE);
    assert_eq!(state.inner.lock().await.next_calls, 0);
}

#[tokio::test]
async fn one_review_short_of_the_quota_still_fetches() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    {
        let mut server = state.inner.lock().await;
        server.reviewer = reviewer_info(7, 8);
        server.queue = vec![cv(31, "Last One")];
    }
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    assert!(workflow.has_remaining_reviews().await);

    workflow.fetch_next().await.expect("fetch next");
    assert!(matches!(workflow.queue().await, QueueSurface::Loaded { .. }));
}

#[tokio::test]
async fn a_failed_fetch_keeps_the_loaded_cv_open() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.queue = vec![cv(31, "First Applicant")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.fetch_next().await.expect("first fetch");
    workflow.set_queue_draft("half-written comments").await;

    state.inner.lock().await.fail_next = Some("queue backend down".to_string());
    let err = workflow.fetch_next().await.expect_err("must fail");

    assert_eq!(err.to_string(), "queue backend down");
    assert_eq!(
        workflow.queue().await,
        QueueSurface::Loaded {
            reviewee: cv(31, "First Applicant")
        }
    );
    assert!(workflow.queue_draft().await.is_empty());
    assert_eq!(
        workflow.error().await.as_deref(),
        Some("queue backend down")
    );
}

#[tokio::test]
async fn a_second_fetch_while_one_is_in_flight_is_skipped() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    let hold = Arc::new(Notify::new());
    {
        let mut server = state.inner.lock().await;
        server.queue = vec![cv(31, "First Applicant")];
        server.hold_next = Some(hold.clone());
    }
    let workflow = Arc::new(workflow_against(&server_url).await);
    workflow.load_assigned().await.expect("load assigned");

    let background = tokio::spawn({
        let workflow = workflow.clone();
        async move { workflow.fetch_next().await }
    });
    tokio::time::timeout(Duration::from_secs(1), async {
        while state.inner.lock().await.next_calls == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first fetch timeout");
    assert!(workflow.is_loading_next().await);

    workflow.fetch_next().await.expect("suppressed fetch");
    assert_eq!(state.inner.lock().await.next_calls, 1);

    hold.notify_one();
    background.await.expect("join").expect("fetch next");
    assert_eq!(
        workflow.queue().await,
        QueueSurface::Loaded {
            reviewee: cv(31, "First Applicant")
        }
    );
    assert!(!workflow.is_loading_next().await);
}

#[tokio::test]
async fn submitting_the_queue_draft_splits_lines_and_refreshes() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.queue = vec![cv(31, "First Applicant")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.fetch_next().await.expect("fetch next");
    workflow
        .set_queue_draft("Good formatting\n\n  Minor typos  \n")
        .await;

    workflow.submit_queue_review().await.expect("submit");

    {
        let server = state.inner.lock().await;
        assert_eq!(server.submissions.len(), 1);
        assert_eq!(server.submissions[0].reviewee_id, RevieweeId(31));
        assert_eq!(
            server.submissions[0].comments,
            vec!["Good formatting", "Minor typos"]
        );
        assert_eq!(server.assigned_calls, 2);
    }
    assert!(matches!(
        workflow.queue().await,
        QueueSurface::Submitted { .. }
    ));
    assert_eq!(
        workflow.reviewer().await.expect("reviewer").reviewed_count,
        1
    );
}

#[tokio::test]
async fn queue_submission_requires_a_loaded_cv() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    let workflow = workflow_against(&server_url).await;

    let err = workflow.submit_queue_review().await.expect_err("must fail");

    assert!(matches!(err, ClientError::Precondition(_)));
    assert!(workflow.error().await.is_some());
    assert_eq!(state.inner.lock().await.review_calls, 0);
}

#[tokio::test]
async fn queue_submission_requires_at_least_one_comment() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.queue = vec![cv(31, "First Applicant")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.fetch_next().await.expect("fetch next");
    workflow.set_queue_draft("   \n\n  ").await;

    let err = workflow.submit_queue_review().await.expect_err("must fail");

    assert!(matches!(err, ClientError::Precondition(_)));
    assert_eq!(state.inner.lock().await.review_calls, 0);
}

#[tokio::test]
async fn a_rejected_queue_submission_surfaces_the_server_message() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.queue = vec![cv(31, "First Applicant")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.fetch_next().await.expect("fetch next");
    workflow.set_queue_draft("Readable and concise").await;

    state.inner.lock().await.fail_review = Some("Review window closed".to_string());
    let err = workflow.submit_queue_review().await.expect_err("must fail");

    assert_eq!(err.to_string(), "Review window closed");
    assert!(matches!(workflow.queue().await, QueueSurface::Loaded { .. }));
    // No refresh rides a failed submission.
    assert_eq!(state.inner.lock().await.assigned_calls, 1);
}

#[tokio::test]
async fn a_failed_fetch_still_clears_the_submitted_badge() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.queue = vec![cv(31, "First Applicant")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.fetch_next().await.expect("fetch next");
    workflow.set_queue_draft("Readable and concise").await;
    workflow.submit_queue_review().await.expect("submit");
    assert!(matches!(
        workflow.queue().await,
        QueueSurface::Submitted { .. }
    ));

    state.inner.lock().await.fail_next = Some("queue backend down".to_string());
    let _ = workflow.fetch_next().await.expect_err("must fail");

    // Demoted to Loaded on the way in, so the prior CV reopens for editing.
    assert_eq!(
        workflow.queue().await,
        QueueSurface::Loaded {
            reviewee: cv(31, "First Applicant")
        }
    );
}

#[tokio::test]
async fn opening_an_assigned_cv_resets_the_scorecard() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.assigned = vec![assigned_cv(41, "Asha")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");

    workflow.open_assigned(RevieweeId(41)).await.expect("open");
    workflow.set_rating(0, "Crisp layout").await.expect("rate");
    workflow.open_assigned(RevieweeId(41)).await.expect("reopen");

    assert!(workflow.ratings().await.iter().all(String::is_empty));
    assert!(!workflow.assigned_submitted().await);
    assert_eq!(
        workflow.selected_assigned().await.expect("selected").reviewee.id,
        RevieweeId(41)
    );
}

#[tokio::test]
async fn closing_the_assigned_cv_drops_the_selection() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.assigned = vec![assigned_cv(41, "Asha")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.open_assigned(RevieweeId(41)).await.expect("open");
    workflow.set_rating(0, "Crisp layout").await.expect("rate");

    workflow.close_assigned().await;

    let snapshot = workflow.snapshot().await;
    assert!(snapshot.selected.is_none());
    assert_eq!(snapshot.assigned.len(), 1);
    // The scorecard only resets on the next open.
    assert_eq!(snapshot.ratings[0], "Crisp layout");
}

#[tokio::test]
async fn open_rejects_a_reviewee_outside_the_assigned_list() {
    let (server_url, _state) = spawn_review_server().await.expect("spawn server");
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");

    let err = workflow
        .open_assigned(RevieweeId(99))
        .await
        .expect_err("must fail");

    assert!(matches!(err, ClientError::Precondition(_)));
    assert!(workflow.error().await.is_some());
    assert!(workflow.selected_assigned().await.is_none());
}

#[tokio::test]
async fn assigned_submission_requires_all_six_fields() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.assigned = vec![assigned_cv(41, "Asha")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.open_assigned(RevieweeId(41)).await.expect("open");
    for index in 0..RATING_FIELDS - 1 {
        workflow.set_rating(index, "Fine").await.expect("rate");
    }
    // Whitespace does not count as filled.
    workflow
        .set_rating(RATING_FIELDS - 1, "   ")
        .await
        .expect("rate");

    let err = workflow
        .submit_assigned_review()
        .await
        .expect_err("must fail");

    assert_eq!(err.to_string(), BLANK_RATINGS_MESSAGE);
    assert_eq!(
        workflow.error().await.as_deref(),
        Some(BLANK_RATINGS_MESSAGE)
    );
    assert_eq!(state.inner.lock().await.review_calls, 0);
    assert!(!workflow.assigned_submitted().await);
}

#[tokio::test]
async fn assigned_submission_sends_the_fields_in_prompt_order() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.assigned = vec![assigned_cv(41, "Asha")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.open_assigned(RevieweeId(41)).await.expect("open");
    let entries = [
        "Clean two-column layout",
        "Strong fit for software",
        "Projects need more depth",
        "A few tense slips",
        "Quantify the impact",
        "Add a links section",
    ];
    for (index, entry) in entries.iter().enumerate() {
        workflow.set_rating(index, *entry).await.expect("rate");
    }

    workflow.submit_assigned_review().await.expect("submit");

    {
        let server = state.inner.lock().await;
        assert_eq!(server.submissions.len(), 1);
        assert_eq!(server.submissions[0].reviewee_id, RevieweeId(41));
        assert_eq!(server.submissions[0].comments, entries);
        assert_eq!(server.assigned_calls, 2);
    }
    assert!(workflow.assigned_submitted().await);
    assert!(workflow.error().await.is_none());
}

#[tokio::test]
async fn a_rejected_assigned_submission_surfaces_the_server_message() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    {
        let mut server = state.inner.lock().await;
        server.assigned = vec![assigned_cv(41, "Asha")];
        server.fail_review = Some("Reviewee already reviewed".to_string());
    }
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.open_assigned(RevieweeId(41)).await.expect("open");
    for index in 0..RATING_FIELDS {
        workflow.set_rating(index, "Fine").await.expect("rate");
    }

    let err = workflow
        .submit_assigned_review()
        .await
        .expect_err("must fail");

    assert_eq!(err.to_string(), "Reviewee already reviewed");
    assert!(!workflow.assigned_submitted().await);
    assert_eq!(
        workflow.error().await.as_deref(),
        Some("Reviewee already reviewed")
    );
}

#[tokio::test]
async fn set_rating_outside_the_scorecard_is_rejected() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.assigned = vec![assigned_cv(41, "Asha")];
    let workflow = workflow_against(&server_url).await;
    workflow.load_assigned().await.expect("load assigned");
    workflow.open_assigned(RevieweeId(41)).await.expect("open");

    let err = workflow
        .set_rating(RATING_FIELDS, "overflow")
        .await
        .expect_err("must fail");

    assert!(matches!(err, ClientError::Precondition(_)));
    // API misuse, not a user-facing failure; the error banner stays clear.
    assert!(workflow.error().await.is_none());
}

#[tokio::test]
async fn dismissing_the_error_clears_the_slot() {
    let (server_url, state) = spawn_review_server().await.expect("spawn server");
    state.inner.lock().await.fail_assigned = Some("db offline".to_string());
    let workflow = workflow_against(&server_url).await;
    let _ = workflow.load_assigned().await.expect_err("must fail");
    assert!(workflow.error().await.is_some());

    workflow.dismiss_error().await;
    assert!(workflow.error().await.is_none());
}

#[test]
fn split_comments_trims_and_drops_blank_lines() {
    assert_eq!(
        split_comments("Good formatting\n\n  Minor typos  \n"),
        vec!["Good formatting", "Minor typos"]
    );
    assert!(split_comments("").is_empty());
    assert!(split_comments("  \n \n").is_empty());
    assert_eq!(split_comments("One line"), vec!["One line"]);
}
