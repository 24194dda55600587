use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A person under a therapist's care.
///
/// Owned exclusively by one therapist; identity is immutable, name and
/// birth date are mutable. Deleting a patient cascades to their sessions
/// and recorded activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new patient. The owning therapist comes from the
/// request principal, never from the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientInput {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
}

impl CreatePatientInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name is required".into()));
        }
        Ok(())
    }
}

/// Input for updating a patient. All fields are optional for partial updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePatientInput {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

impl UpdatePatientInput {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::Validation("name is required".into()));
            }
        }
        Ok(())
    }
}
