//! Integration tests for the HTTP session-result client.
//!
//! Tests run against a local mockito server; no real API is contacted.

use athlete_timer_core::storage::{ApiConfig, Database};
use athlete_timer_core::{ApiClient, SessionKind, SessionResult, SessionSink, SubmitError};
use chrono::Utc;
use mockito::Matcher;
use serde_json::json;

fn config_for(url: &str, max_attempts: u32) -> ApiConfig {
    ApiConfig {
        base_url: Some(url.to_string()),
        timeout_secs: 5,
        max_attempts,
        backoff_ms: 1,
    }
}

fn sample_result(kind: SessionKind) -> SessionResult {
    let now = Utc::now();
    SessionResult {
        kind,
        sets_completed: 2,
        total_sets: 3,
        total_elapsed_secs: 60,
        skipped_early: true,
        started_at: now,
        finished_at: now,
    }
}

#[test]
fn submits_result_with_bearer_token() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/sessions/pt_exercise")
        .match_header("authorization", "Bearer tok-123")
        .match_body(Matcher::PartialJson(json!({
            "kind": "pt_exercise",
            "sets_completed": 2,
            "skipped_early": true
        })))
        .with_status(201)
        .create();

    let client = ApiClient::new(&config_for(&server.url(), 3), Some("tok-123".into())).unwrap();
    client
        .submit_session_result(SessionKind::PtExercise, &sample_result(SessionKind::PtExercise))
        .unwrap();
    mock.assert();
}

#[test]
fn server_errors_are_retried_then_reported() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/sessions/rest")
        .with_status(503)
        .with_body("maintenance")
        .expect(3)
        .create();

    let client = ApiClient::new(&config_for(&server.url(), 3), None).unwrap();
    let err = client
        .submit_session_result(SessionKind::Rest, &sample_result(SessionKind::Rest))
        .unwrap_err();
    mock.assert();
    match err {
        SubmitError::Rejected { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[test]
fn client_errors_are_not_retried() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/sessions/meditation")
        .with_status(422)
        .with_body("{\"error\":\"bad payload\"}")
        .expect(1)
        .create();

    let client = ApiClient::new(&config_for(&server.url(), 5), None).unwrap();
    let err = client
        .submit_session_result(SessionKind::Meditation, &sample_result(SessionKind::Meditation))
        .unwrap_err();
    mock.assert();
    assert!(matches!(err, SubmitError::Rejected { status: 422, .. }));
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let client = ApiClient::new(&config_for("http://127.0.0.1:9", 2), None).unwrap();
    let err = client
        .submit_session_result(SessionKind::Rest, &sample_result(SessionKind::Rest))
        .unwrap_err();
    assert!(matches!(err, SubmitError::Transport { attempts: 2, .. }));
}

#[test]
fn flush_pending_marks_rows_synced() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("results.db")).unwrap();
    db.record_result(&sample_result(SessionKind::PtExercise)).unwrap();
    db.record_result(&sample_result(SessionKind::PtExercise)).unwrap();

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/sessions/pt_exercise")
        .with_status(200)
        .expect(2)
        .create();

    let client = ApiClient::new(&config_for(&server.url(), 1), None).unwrap();
    assert_eq!(client.flush_pending(&db).unwrap(), 2);
    mock.assert();
    assert!(db.unsynced_results().unwrap().is_empty());
    assert_eq!(client.flush_pending(&db).unwrap(), 0);
}
