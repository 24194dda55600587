use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;

use super::middleware::{bearer_token, CurrentTherapist};
use super::AppState;

/// Incremental-UI mode: a request carrying the `HX-Request` header gets
/// back only the fragment it needs instead of the full payload.
fn wants_fragment(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Auth
// ============================================================

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<LoginResponse>> {
    let therapist = state.db.verify_credentials(&input.username, &input.password)?;
    let token = state.db.create_token(therapist.id)?;
    tracing::info!(therapist = %therapist.username, "login");
    Ok(Json(LoginResponse { token, therapist }))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    // The middleware already validated the token, so it is present here.
    let token = bearer_token(&headers).ok_or(Error::Auth)?;
    state.db.revoke_token(&token)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Dashboard
// ============================================================

/// Open sessions for the principal, newest-first.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
) -> Result<Json<Vec<Session>>> {
    state.db.open_sessions(therapist.id).map(Json)
}

// ============================================================
// Patients
// ============================================================

pub async fn list_patients(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
) -> Result<Json<Vec<Patient>>> {
    state.db.list_patients(therapist.id).map(Json)
}

pub async fn get_patient(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>> {
    state.db.get_patient(therapist.id, id).map(Json)
}

pub async fn create_patient(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Json(input): Json<CreatePatientInput>,
) -> Result<(StatusCode, Json<Patient>)> {
    state
        .db
        .create_patient(therapist.id, input)
        .map(|p| (StatusCode::CREATED, Json(p)))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePatientInput>,
) -> Result<Json<Patient>> {
    state.db.update_patient(therapist.id, id, input).map(Json)
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.db.delete_patient(therapist.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Session lifecycle (page flow)
// ============================================================

/// Start a session for a patient. When the patient already has an open
/// session, it is returned instead of a duplicate, with `created: false`
/// and a 200 rather than a 201.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(patient_id): Path<Uuid>,
) -> Result<(StatusCode, Json<StartSessionResponse>)> {
    let (session, created) = state.db.start_session(therapist.id, patient_id)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(StartSessionResponse { session, created })))
}

pub async fn session_history(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<Session>>> {
    state.db.session_history(therapist.id, patient_id).map(Json)
}

/// Close a session and generate its report. Idempotent: closing an
/// already-closed session regenerates the report without error. With the
/// fragment header only the session status comes back.
pub async fn close_session(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response> {
    let (session, transitioned) = state.db.close_session(therapist.id, id)?;
    if transitioned {
        tracing::info!(session = %session.id, "session closed");
    }

    if wants_fragment(&headers) {
        return Ok(Json(session).into_response());
    }

    let data = state.db.session_report_data(therapist.id, id)?;
    let report = state.reports.generate(&data)?;
    Ok(Json(CloseSessionResponse { session, report }).into_response())
}

/// Regenerate and return the report for a session (open or closed). The
/// document is re-rendered from current data and overwrites the previous
/// one at the same stable key.
pub async fn session_report(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<Json<crate::report::GeneratedReport>> {
    let data = state.db.session_report_data(therapist.id, id)?;
    let report = state.reports.generate(&data)?;
    Ok(Json(report))
}

pub async fn list_session_activities(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<SessionActivity>>> {
    state
        .db
        .activities_for_session(therapist.id, session_id)
        .map(Json)
}

/// Attach the selected templates to the session, all-or-nothing.
pub async fn add_session_activities(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(session_id): Path<Uuid>,
    Json(input): Json<AddActivitiesInput>,
) -> Result<(StatusCode, Json<Vec<SessionActivity>>)> {
    state
        .db
        .add_activities(therapist.id, session_id, &input.template_ids)
        .map(|a| (StatusCode::CREATED, Json(a)))
}

/// Edit one activity's response/notes. The response arrives as a string
/// and anything outside {positive, negative} is a validation error. With
/// the fragment header the refreshed activity list comes back instead of
/// the single activity.
pub async fn edit_activity(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(form): Json<EditActivityForm>,
) -> Result<Response> {
    let response = ActivityResponse::from_str(&form.response).ok_or_else(|| {
        Error::Validation(format!(
            "invalid response '{}': must be 'positive' or 'negative'",
            form.response
        ))
    })?;

    let updated = state.db.update_activity(
        therapist.id,
        id,
        UpdateActivityInput {
            response: Some(response),
            notes: form.notes,
        },
    )?;

    if wants_fragment(&headers) {
        let activities = state
            .db
            .activities_for_session(therapist.id, updated.session_id)?;
        return Ok(Json(activities).into_response());
    }

    Ok(Json(updated).into_response())
}

// ============================================================
// Sessions (REST)
// ============================================================

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
) -> Result<Json<Vec<Session>>> {
    state.db.list_sessions(therapist.id).map(Json)
}

/// REST create follows the same at-most-one-open rule as the page flow:
/// an existing open session is returned with a 200 instead of a 201.
pub async fn create_session(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Json(input): Json<CreateSessionInput>,
) -> Result<(StatusCode, Json<StartSessionResponse>)> {
    let (session, created) = state.db.start_session(therapist.id, input.patient_id)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(StartSessionResponse { session, created })))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>> {
    state.db.get_session(therapist.id, id).map(Json)
}

pub async fn update_session(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSessionInput>,
) -> Result<Json<Session>> {
    state.db.update_session(therapist.id, id, input).map(Json)
}

pub async fn delete_session(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.db.delete_session(therapist.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Activity templates
// ============================================================

pub async fn list_templates(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
) -> Result<Json<Vec<ActivityTemplate>>> {
    state.db.list_templates(therapist.id).map(Json)
}

pub async fn get_template(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivityTemplate>> {
    state.db.get_template(therapist.id, id).map(Json)
}

pub async fn create_template(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Json(input): Json<CreateTemplateInput>,
) -> Result<(StatusCode, Json<ActivityTemplate>)> {
    state
        .db
        .create_template(therapist.id, input)
        .map(|t| (StatusCode::CREATED, Json(t)))
}

pub async fn update_template(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTemplateInput>,
) -> Result<Json<ActivityTemplate>> {
    state.db.update_template(therapist.id, id, input).map(Json)
}

pub async fn delete_template(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.db.delete_template(therapist.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Session activities (REST)
// ============================================================

/// Query parameters for listing activities: scope comes from the parent
/// session, so the session id is required.
#[derive(Debug, Deserialize)]
pub struct ListActivitiesQuery {
    pub session_id: Uuid,
}

pub async fn list_activities(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Query(query): Query<ListActivitiesQuery>,
) -> Result<Json<Vec<SessionActivity>>> {
    state
        .db
        .activities_for_session(therapist.id, query.session_id)
        .map(Json)
}

pub async fn create_activity(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Json(input): Json<CreateActivityInput>,
) -> Result<(StatusCode, Json<SessionActivity>)> {
    state
        .db
        .create_activity(therapist.id, input)
        .map(|a| (StatusCode::CREATED, Json(a)))
}

pub async fn get_activity(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionActivity>> {
    state.db.get_activity(therapist.id, id).map(Json)
}

pub async fn update_activity(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateActivityInput>,
) -> Result<Json<SessionActivity>> {
    state.db.update_activity(therapist.id, id, input).map(Json)
}

pub async fn delete_activity(
    State(state): State<AppState>,
    Extension(CurrentTherapist(therapist)): Extension<CurrentTherapist>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.db.delete_activity(therapist.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
