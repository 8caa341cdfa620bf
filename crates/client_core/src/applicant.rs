use shared::{domain::PROFILE_OPTIONS, protocol::CvSubmissionRequest};
use tracing::info;

use crate::{
    error::{ensure_success, ClientError},
    session::SessionGate,
};

const SUBMIT_CV_FAILED_MESSAGE: &str = "Submission failed";

/// A CV submission as entered on the landing form.
#[derive(Debug, Clone, Default)]
pub struct CvSubmission {
    pub name: String,
    pub roll_no: String,
    pub email: String,
    pub cv_link: String,
    pub profile: String,
}

impl CvSubmission {
    /// The field checks the form runs before any network call.
    pub fn validate(&self) -> Result<(), ClientError> {
        let required = [
            &self.name,
            &self.roll_no,
            &self.email,
            &self.cv_link,
            &self.profile,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(ClientError::precondition(
                "Please fill in all required fields",
            ));
        }
        if !is_institute_email(&self.email) {
            return Err(ClientError::precondition(
                "Email must end with @kgpian.iitkgp.ac.in",
            ));
        }
        if !is_valid_roll_no(self.roll_no.trim()) {
            return Err(ClientError::precondition(
                "Roll must start with 22XX3… or 23XX1…, where XX are letters",
            ));
        }
        if !PROFILE_OPTIONS.contains(&self.profile.as_str()) {
            return Err(ClientError::precondition(format!(
                "Profile must be one of: {}",
                PROFILE_OPTIONS.join(", ")
            )));
        }
        Ok(())
    }

    /// Validates locally, then submits. Validation failures never reach the
    /// network.
    pub async fn submit(&self, gate: &SessionGate) -> Result<(), ClientError> {
        self.validate()?;
        let request = CvSubmissionRequest {
            name: self.name.clone(),
            roll_no: self.roll_no.trim().to_string(),
            email: self.email.clone(),
            cv_link: self.cv_link.clone(),
            profile: self.profile.clone(),
        };
        let response = gate.post_json("/reviewee/submit", &request).await?;
        ensure_success(response, SUBMIT_CV_FAILED_MESSAGE).await?;
        info!(roll_no = %request.roll_no, "applicant: CV submitted");
        Ok(())
    }
}

/// `^[^@]+@kgpian\.iitkgp\.ac\.in$` without pulling in a regex engine.
fn is_institute_email(email: &str) -> bool {
    let Some(local) = email.strip_suffix("@kgpian.iitkgp.ac.in") else {
        return false;
    };
    !local.is_empty() && !local.contains('@')
}

/// Admitted roll patterns: `22` + two letters + `3`, or `23` + two letters
/// + `1`, with any tail.
fn is_valid_roll_no(roll_no: &str) -> bool {
    let bytes = roll_no.as_bytes();
    if bytes.len() < 5 {
        return false;
    }
    if !bytes[2].is_ascii_alphabetic() || !bytes[3].is_ascii_alphabetic() {
        return false;
    }
    match &bytes[..2] {
        b"22" => bytes[4] == b'3',
        b"23" => bytes[4] == b'1',
        _ => false,
    }
}
