use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recorded application of an [`ActivityTemplate`] within a session.
///
/// Multiple instances of the same template may exist in one session.
/// Activities can only be added while the session is open; response and
/// notes stay editable afterwards.
///
/// [`ActivityTemplate`]: super::ActivityTemplate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionActivity {
    pub id: Uuid,
    pub session_id: Uuid,
    pub template_id: Uuid,
    pub response: ActivityResponse,
    pub notes: Option<String>,
    /// Set at creation, immutable afterwards.
    pub recorded_at: DateTime<Utc>,
}

/// How the patient responded to an activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityResponse {
    Positive,
    Negative,
}

impl ActivityResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// Input for attaching templates to a session in bulk (page flow). The
/// whole batch is applied atomically or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddActivitiesInput {
    pub template_ids: Vec<Uuid>,
}

/// Input for creating a single activity through the REST surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivityInput {
    pub session_id: Uuid,
    pub template_id: Uuid,
    /// Defaults to `positive` when omitted.
    pub response: Option<ActivityResponse>,
    pub notes: Option<String>,
}

/// Input for editing an activity's response and notes. All fields optional
/// for partial updates; a blank notes string clears the stored notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateActivityInput {
    pub response: Option<ActivityResponse>,
    pub notes: Option<String>,
}

/// Page-flow edit payload. The response arrives as a raw string and is
/// validated explicitly so a bad value surfaces as a validation error
/// rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditActivityForm {
    pub response: String,
    pub notes: Option<String>,
}
