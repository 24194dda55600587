use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated principal.
///
/// Therapists own patients, activity templates, and sessions. The password
/// hash never leaves the store layer and is not part of this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a therapist (CLI only; there is no public signup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTherapistInput {
    pub username: String,
    pub password: String,
}

/// Credentials submitted at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Successful login response: a bearer token plus the principal it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub therapist: Therapist,
}
