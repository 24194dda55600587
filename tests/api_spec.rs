use axum::http::StatusCode;
use axum_test::TestServer;
use tempfile::TempDir;
use terapia::api::{create_router, AppState};
use terapia::db::Database;
use terapia::models::*;
use terapia::report::GeneratedReport;
use terapia::report::ReportStore;
use uuid::Uuid;

struct TestApp {
    server: TestServer,
    media: TempDir,
    db: Database,
}

fn setup() -> TestApp {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    let media = TempDir::new().expect("Failed to create media dir");
    let state = AppState {
        db: db.clone(),
        reports: ReportStore::new(media.path(), "/media/"),
    };
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");
    TestApp { server, media, db }
}

/// Register a therapist through the store (there is no signup endpoint)
/// and log in through the API.
async fn login(app: &TestApp, username: &str) -> String {
    app.db
        .create_therapist(CreateTherapistInput {
            username: username.to_string(),
            password: "s3cret".to_string(),
        })
        .expect("Failed to create therapist");

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&LoginInput {
            username: username.to_string(),
            password: "s3cret".to_string(),
        })
        .await;
    response.assert_status_ok();
    response.json::<LoginResponse>().token
}

async fn create_patient(app: &TestApp, token: &str, name: &str) -> Patient {
    let response = app
        .server
        .post("/api/v1/patients")
        .authorization_bearer(token)
        .json(&CreatePatientInput {
            name: name.to_string(),
            birth_date: None,
        })
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Patient>()
}

async fn create_template(app: &TestApp, token: &str, description: &str) -> ActivityTemplate {
    let response = app
        .server
        .post("/api/v1/activity-templates")
        .authorization_bearer(token)
        .json(&CreateTemplateInput {
            description: description.to_string(),
        })
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<ActivityTemplate>()
}

async fn start_session(app: &TestApp, token: &str, patient_id: Uuid) -> Session {
    let response = app
        .server
        .post(&format!("/api/v1/patients/{}/start-session", patient_id))
        .authorization_bearer(token)
        .await;
    response.json::<StartSessionResponse>().session
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let app = setup();
        login(&app, "ana").await;

        let response = app
            .server
            .post("/api/v1/auth/login")
            .json(&LoginInput {
                username: "ana".to_string(),
                password: "wrong".to_string(),
            })
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = setup();

        let response = app.server.get("/api/v1/patients").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_revokes_the_token() {
        let app = setup();
        let token = login(&app, "ana").await;

        app.server
            .post("/api/v1/auth/logout")
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let response = app
            .server
            .get("/api/v1/patients")
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}

mod patients {
    use super::*;

    #[tokio::test]
    async fn create_and_retrieve() {
        let app = setup();
        let token = login(&app, "ana").await;

        let patient = create_patient(&app, &token, "Ana Silva").await;

        let response = app
            .server
            .get(&format!("/api/v1/patients/{}", patient.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Patient>().name, "Ana Silva");
    }

    #[tokio::test]
    async fn empty_name_is_a_validation_error() {
        let app = setup();
        let token = login(&app, "ana").await;

        let response = app
            .server
            .post("/api/v1/patients")
            .authorization_bearer(&token)
            .json(&CreatePatientInput {
                name: "".to_string(),
                birth_date: None,
            })
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn another_therapists_patient_is_not_found() {
        let app = setup();
        let ana_token = login(&app, "ana").await;
        let bia_token = login(&app, "bia").await;

        let patient = create_patient(&app, &ana_token, "Ana Silva").await;

        let response = app
            .server
            .get(&format!("/api/v1/patients/{}", patient.id))
            .authorization_bearer(&bia_token)
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_returns_no_content() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;

        app.server
            .delete(&format!("/api/v1/patients/{}", patient.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        app.server
            .get(&format!("/api/v1/patients/{}", patient.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn starting_twice_returns_the_same_session() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;

        let first = app
            .server
            .post(&format!("/api/v1/patients/{}/start-session", patient.id))
            .authorization_bearer(&token)
            .await;
        first.assert_status(StatusCode::CREATED);
        let first = first.json::<StartSessionResponse>();
        assert!(first.created);

        let second = app
            .server
            .post(&format!("/api/v1/patients/{}/start-session", patient.id))
            .authorization_bearer(&token)
            .await;
        second.assert_status_ok();
        let second = second.json::<StartSessionResponse>();
        assert!(!second.created);
        assert_eq!(first.session.id, second.session.id);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_returns_a_report() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let session = start_session(&app, &token, patient.id).await;

        let first = app
            .server
            .post(&format!("/api/v1/sessions/{}/close", session.id))
            .authorization_bearer(&token)
            .await;
        first.assert_status_ok();
        let first = first.json::<CloseSessionResponse>();
        assert!(first.session.closed);
        assert!(first.report.stable_key.starts_with("sessao-"));

        let second = app
            .server
            .post(&format!("/api/v1/sessions/{}/close", session.id))
            .authorization_bearer(&token)
            .await;
        second.assert_status_ok();
        assert!(second.json::<CloseSessionResponse>().session.closed);
    }

    #[tokio::test]
    async fn close_with_fragment_header_returns_only_the_session() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let session = start_session(&app, &token, patient.id).await;

        let response = app
            .server
            .post(&format!("/api/v1/sessions/{}/close", session.id))
            .authorization_bearer(&token)
            .add_header("HX-Request", "true")
            .await;
        response.assert_status_ok();

        let body = response.json::<serde_json::Value>();
        assert_eq!(body["closed"], serde_json::json!(true));
        assert!(body.get("report").is_none());
    }

    #[tokio::test]
    async fn a_closed_session_cannot_be_reopened_over_rest() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let session = start_session(&app, &token, patient.id).await;

        app.server
            .post(&format!("/api/v1/sessions/{}/close", session.id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let response = app
            .server
            .put(&format!("/api/v1/sessions/{}", session.id))
            .authorization_bearer(&token)
            .json(&UpdateSessionInput {
                closed: Some(false),
            })
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn dashboard_lists_only_open_sessions() {
        let app = setup();
        let token = login(&app, "ana").await;
        let first = create_patient(&app, &token, "First").await;
        let second = create_patient(&app, &token, "Second").await;

        let closed = start_session(&app, &token, first.id).await;
        app.server
            .post(&format!("/api/v1/sessions/{}/close", closed.id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();
        let open = start_session(&app, &token, second.id).await;

        let response = app
            .server
            .get("/api/v1/dashboard")
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();

        let sessions = response.json::<Vec<Session>>();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, open.id);
    }

    #[tokio::test]
    async fn history_includes_closed_sessions_newest_first() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;

        let first = start_session(&app, &token, patient.id).await;
        app.server
            .post(&format!("/api/v1/sessions/{}/close", first.id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();
        let second = start_session(&app, &token, patient.id).await;

        let response = app
            .server
            .get(&format!("/api/v1/patients/{}/history", patient.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status_ok();

        let history = response.json::<Vec<Session>>();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);
    }
}

mod activities {
    use super::*;

    #[tokio::test]
    async fn bulk_add_creates_one_row_per_template() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let template = create_template(&app, &token, "Eye contact").await;
        let session = start_session(&app, &token, patient.id).await;

        let response = app
            .server
            .post(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&token)
            .json(&AddActivitiesInput {
                template_ids: vec![template.id, template.id],
            })
            .await;
        response.assert_status(StatusCode::CREATED);

        let added = response.json::<Vec<SessionActivity>>();
        assert_eq!(added.len(), 2);
        assert!(added.iter().all(|a| a.response == ActivityResponse::Positive));
    }

    #[tokio::test]
    async fn empty_selection_is_a_validation_error() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let session = start_session(&app, &token, patient.id).await;

        let response = app
            .server
            .post(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&token)
            .json(&AddActivitiesInput {
                template_ids: vec![],
            })
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn adding_to_a_closed_session_is_a_conflict() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let template = create_template(&app, &token, "Eye contact").await;
        let session = start_session(&app, &token, patient.id).await;

        app.server
            .post(&format!("/api/v1/sessions/{}/close", session.id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let response = app
            .server
            .post(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&token)
            .json(&AddActivitiesInput {
                template_ids: vec![template.id],
            })
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn a_foreign_template_rolls_back_the_batch() {
        let app = setup();
        let ana_token = login(&app, "ana").await;
        let bia_token = login(&app, "bia").await;
        let patient = create_patient(&app, &ana_token, "Ana Silva").await;
        let mine = create_template(&app, &ana_token, "Eye contact").await;
        let foreign = create_template(&app, &bia_token, "Foreign").await;
        let session = start_session(&app, &ana_token, patient.id).await;

        let response = app
            .server
            .post(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&ana_token)
            .json(&AddActivitiesInput {
                template_ids: vec![mine.id, foreign.id],
            })
            .await;
        response.assert_status(StatusCode::NOT_FOUND);

        let list = app
            .server
            .get(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&ana_token)
            .await;
        assert!(list.json::<Vec<SessionActivity>>().is_empty());
    }

    #[tokio::test]
    async fn edit_rejects_an_unknown_response_value() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let template = create_template(&app, &token, "Eye contact").await;
        let session = start_session(&app, &token, patient.id).await;

        let added = app
            .server
            .post(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&token)
            .json(&AddActivitiesInput {
                template_ids: vec![template.id],
            })
            .await
            .json::<Vec<SessionActivity>>();

        let response = app
            .server
            .post(&format!("/api/v1/session-activities/{}/edit", added[0].id))
            .authorization_bearer(&token)
            .json(&EditActivityForm {
                response: "neutral".to_string(),
                notes: None,
            })
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn edit_with_fragment_header_returns_the_refreshed_list() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let template = create_template(&app, &token, "Eye contact").await;
        let session = start_session(&app, &token, patient.id).await;

        let added = app
            .server
            .post(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&token)
            .json(&AddActivitiesInput {
                template_ids: vec![template.id],
            })
            .await
            .json::<Vec<SessionActivity>>();

        let response = app
            .server
            .post(&format!("/api/v1/session-activities/{}/edit", added[0].id))
            .authorization_bearer(&token)
            .add_header("HX-Request", "true")
            .json(&EditActivityForm {
                response: "negative".to_string(),
                notes: Some("avoided gaze".to_string()),
            })
            .await;
        response.assert_status_ok();

        let list = response.json::<Vec<SessionActivity>>();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].response, ActivityResponse::Negative);
        assert_eq!(list[0].notes.as_deref(), Some("avoided gaze"));
    }
}

mod reports {
    use super::*;

    #[tokio::test]
    async fn full_session_flow_produces_the_expected_report() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let template = create_template(&app, &token, "Eye contact").await;
        let session = start_session(&app, &token, patient.id).await;

        let added = app
            .server
            .post(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&token)
            .json(&AddActivitiesInput {
                template_ids: vec![template.id],
            })
            .await
            .json::<Vec<SessionActivity>>();

        app.server
            .post(&format!("/api/v1/session-activities/{}/edit", added[0].id))
            .authorization_bearer(&token)
            .json(&EditActivityForm {
                response: "negative".to_string(),
                notes: Some("avoided gaze".to_string()),
            })
            .await
            .assert_status_ok();

        let close = app
            .server
            .post(&format!("/api/v1/sessions/{}/close", session.id))
            .authorization_bearer(&token)
            .await;
        close.assert_status_ok();
        let close = close.json::<CloseSessionResponse>();

        let expected_key = format!("sessao-{}-ana-silva", session.id);
        assert_eq!(close.report.stable_key, expected_key);
        assert_eq!(
            close.report.url,
            format!("/media/reports/{}.html", expected_key)
        );
        assert!(close.report.html.contains("Ana Silva"));
        assert!(close.report.html.contains("Eye contact"));
        assert!(close.report.html.contains("negative"));
        assert!(close.report.html.contains("avoided gaze"));

        let path = app
            .media
            .path()
            .join("reports")
            .join(format!("{}.html", expected_key));
        let on_disk = std::fs::read_to_string(path).expect("Report file missing");
        assert!(on_disk.contains("avoided gaze"));
    }

    #[tokio::test]
    async fn regenerating_reflects_later_edits_at_the_same_key() {
        let app = setup();
        let token = login(&app, "ana").await;
        let patient = create_patient(&app, &token, "Ana Silva").await;
        let template = create_template(&app, &token, "Eye contact").await;
        let session = start_session(&app, &token, patient.id).await;

        let added = app
            .server
            .post(&format!("/api/v1/sessions/{}/activities", session.id))
            .authorization_bearer(&token)
            .json(&AddActivitiesInput {
                template_ids: vec![template.id],
            })
            .await
            .json::<Vec<SessionActivity>>();

        let first = app
            .server
            .get(&format!("/api/v1/sessions/{}/report", session.id))
            .authorization_bearer(&token)
            .await
            .json::<GeneratedReport>();
        assert!(!first.html.contains("stale note"));

        // Edit after the first report was generated.
        app.server
            .post(&format!("/api/v1/session-activities/{}/edit", added[0].id))
            .authorization_bearer(&token)
            .json(&EditActivityForm {
                response: "positive".to_string(),
                notes: Some("stale note replaced".to_string()),
            })
            .await
            .assert_status_ok();

        let second = app
            .server
            .get(&format!("/api/v1/sessions/{}/report", session.id))
            .authorization_bearer(&token)
            .await
            .json::<GeneratedReport>();

        assert_eq!(first.stable_key, second.stable_key);
        assert!(second.html.contains("stale note replaced"));

        let path = app
            .media
            .path()
            .join("reports")
            .join(format!("{}.html", second.stable_key));
        let on_disk = std::fs::read_to_string(path).expect("Report file missing");
        assert!(on_disk.contains("stale note replaced"));
    }
}
