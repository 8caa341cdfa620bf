//! Client-side state machines for the CV review desk: session lifecycle,
//! reviewer workflow, admin dashboard, applicant submission, and the table
//! sorting engine shared by every list surface.
//!
//! Everything here is UI-agnostic. Each surface owns its state behind a
//! `Mutex` and exposes `&self` async operations, so a CLI or GUI frontend
//! can share one instance across tasks.

pub mod admin;
pub mod applicant;
pub mod error;
pub mod session;
pub mod sorting;
pub mod workflow;

pub use admin::AdminDashboard;
pub use applicant::CvSubmission;
pub use error::ClientError;
pub use session::{CredentialStore, DurableCredentialStore, MemoryCredentialStore, SessionGate};
pub use sorting::{
    assigned_engine, review_engine, reviewee_engine, reviewer_engine, Direction, ReviewColumn,
    RevieweeColumn, ReviewerColumn, SortEngine, SortState, SortValue,
};
pub use workflow::{QueueSurface, ReviewWorkflow, WorkflowSnapshot};
