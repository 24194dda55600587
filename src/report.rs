//! Session report generation.
//!
//! A report is a static HTML snapshot of one session's activities, written
//! under `{media_root}/reports/` at a stable, content-derived path:
//! `sessao-{session_id}-{patient name slug}.html`. Regenerating overwrites
//! the previous document, so edits made after a report was produced are
//! reflected only by regenerating.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ActivityResponse, Patient, Session, Therapist};

const TEMPLATE: &str = include_str!("templates/session_report.html");

/// Everything the report template needs, joined by the store.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReportData {
    pub session: Session,
    pub patient: Patient,
    pub therapist: Therapist,
    /// Newest-first, matching the session activity list.
    pub activities: Vec<ReportActivity>,
}

/// One activity line in a report: the template description joined onto the
/// recorded response.
#[derive(Debug, Clone, Serialize)]
pub struct ReportActivity {
    pub description: String,
    pub response: ActivityResponse,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A generated report: the rendered document plus where it lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub stable_key: String,
    /// Public URL path: `{media_url}reports/{stable_key}.html`.
    pub url: String,
    pub html: String,
}

/// Writes rendered reports into the media area.
#[derive(Clone, Debug)]
pub struct ReportStore {
    reports_dir: PathBuf,
    media_url: String,
}

impl ReportStore {
    pub fn new(media_root: impl Into<PathBuf>, media_url: impl Into<String>) -> Self {
        Self {
            reports_dir: media_root.into().join("reports"),
            media_url: media_url.into(),
        }
    }

    /// Render the report and persist it at its stable key, overwriting any
    /// prior document for the same session.
    pub fn generate(&self, data: &SessionReportData) -> Result<GeneratedReport> {
        let stable_key = stable_key(data.session.id, &data.patient.name);
        let html = render(data)?;

        std::fs::create_dir_all(&self.reports_dir)?;
        let path = self.reports_dir.join(format!("{}.html", stable_key));
        std::fs::write(&path, &html)?;
        tracing::debug!("wrote session report to {}", path.display());

        let url = format!("{}reports/{}.html", self.media_url, stable_key);
        Ok(GeneratedReport {
            stable_key,
            url,
            html,
        })
    }
}

/// Deterministic report identifier: `sessao-{session_id}-{slug}`.
pub fn stable_key(session_id: Uuid, patient_name: &str) -> String {
    let slug = slugify(patient_name);
    if slug.is_empty() {
        format!("sessao-{}", session_id)
    } else {
        format!("sessao-{}-{}", session_id, slug)
    }
}

/// Lowercase, collapse non-alphanumeric runs to single hyphens, trim.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_hyphen = false;
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

fn render(data: &SessionReportData) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("session_report", TEMPLATE)?;
    let template = env.get_template("session_report")?;
    let html = template.render(context! {
        session => data.session,
        patient => data.patient,
        therapist => data.therapist,
        activities => data.activities,
        generated_at => Utc::now(),
    })?;
    Ok(html)
}
