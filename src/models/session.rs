use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One care encounter for a patient.
///
/// A session is open from creation until it is explicitly closed. The
/// `closed` flag transitions false→true exactly once and never reverts.
/// At most one open session exists per (patient, therapist) pair; starting
/// a session while one is open returns the existing session instead of
/// creating a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    /// Set at creation, immutable afterwards.
    pub started_at: DateTime<Utc>,
    pub closed: bool,
}

/// Input for creating a session through the REST surface. The therapist
/// comes from the request principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionInput {
    pub patient_id: Uuid,
}

/// Input for updating a session. The only mutable field is `closed`, and
/// only in the false→true direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSessionInput {
    pub closed: Option<bool>,
}

/// Response when starting a session.
///
/// `created` is false when an open session already existed for the patient
/// and was returned instead of a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    #[serde(flatten)]
    pub session: Session,
    pub created: bool,
}

/// Response when closing a session without the fragment header: the closed
/// session plus the freshly generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseSessionResponse {
    pub session: Session,
    pub report: crate::report::GeneratedReport,
}
