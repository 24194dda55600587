use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A reusable activity label a therapist defines once and selects into
/// sessions. Templates are never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTemplate {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an activity template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateInput {
    pub description: String,
}

impl CreateTemplateInput {
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::Validation("description is required".into()));
        }
        Ok(())
    }
}

/// Input for updating an activity template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTemplateInput {
    pub description: Option<String>,
}

impl UpdateTemplateInput {
    pub fn validate(&self) -> Result<()> {
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(Error::Validation("description is required".into()));
            }
        }
        Ok(())
    }
}
