use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(RevieweeId);
id_newtype!(ReviewerId);
id_newtype!(ReviewId);

/// The six structured review prompts, in the order they are submitted.
pub const REVIEW_CRITERIA: [&str; 6] = [
    "Structure & Format",
    "Relevance to Domain",
    "Depth of Explanation",
    "Language and Grammar",
    "Improvements in Projects",
    "Additional Suggestions",
];

/// Profiles a CV can be submitted under.
pub const PROFILE_OPTIONS: [&str; 6] = [
    "Core",
    "Consult",
    "Data",
    "Finance/Quant",
    "Product/FMCG",
    "Software",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Reviewer,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: ReviewerId,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub profiles: Vec<String>,
}

/// An authenticated session: bearer token plus the principal it belongs to.
/// Persisted verbatim under the durable session key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub principal: Principal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewee {
    pub id: RevieweeId,
    pub name: String,
    pub roll_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub cv_link: String,
    pub profile: String,
    /// True once a review for this CV has been submitted.
    #[serde(default)]
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<ReviewerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_time: Option<DateTime<Utc>>,
}

/// A CV on a reviewer's personal assigned list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedCv {
    #[serde(flatten)]
    pub reviewee: Reviewee,
    pub assigned_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl AssignedCv {
    /// Checks the pairing the server promises: `submitted_at` is present
    /// exactly when `status` is set, and never precedes `assigned_at`.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.reviewee.status != self.submitted_at.is_some() {
            return Err(DomainError::SubmissionFlagMismatch {
                reviewee: self.reviewee.id,
            });
        }
        if let Some(submitted_at) = self.submitted_at {
            if submitted_at < self.assigned_at {
                return Err(DomainError::SubmittedBeforeAssigned {
                    reviewee: self.reviewee.id,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerInfo {
    pub id: ReviewerId,
    pub name: String,
    #[serde(default)]
    pub profiles: Vec<String>,
    pub reviewed_count: u32,
    pub reviews_number: u32,
}

impl ReviewerInfo {
    pub fn has_remaining_reviews(&self) -> bool {
        self.reviewed_count < self.reviews_number
    }
}

/// The admin listing's view of a reviewer, including their current workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerRecord {
    pub id: ReviewerId,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub profiles: Vec<String>,
    pub reviewed_count: u32,
    pub reviews_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub admin: bool,
    #[serde(default, rename = "assignedCVs")]
    pub assigned_cvs: Vec<Reviewee>,
}

/// A completed review. `comments` keeps the reviewer's submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub comments: Vec<String>,
    pub submission_time: DateTime<Utc>,
    pub reviewee: Reviewee,
    pub reviewer: ReviewerInfo,
}
