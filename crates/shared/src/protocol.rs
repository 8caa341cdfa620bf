use serde::{Deserialize, Serialize};

use crate::domain::{AssignedCv, Principal, RevieweeId, ReviewerInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub reviewer: Principal,
}

/// GET `/reviewer/assigned` payload: the reviewer's quota counters together
/// with their current assigned list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignedResponse {
    pub reviewer: ReviewerInfo,
    pub assigned: Vec<AssignedCv>,
}

/// POST `/reviewer/review` payload. Both review surfaces submit this shape;
/// only how `comments` is assembled differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub reviewee_id: RevieweeId,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvSubmissionRequest {
    pub name: String,
    pub roll_no: String,
    pub email: String,
    pub cv_link: String,
    pub profile: String,
}
