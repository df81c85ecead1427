//! Integration tests for the profile, account and matching endpoints.

use std::sync::Arc;

use chrono::Utc;
use mockito::{Matcher, Server, ServerGuard};
use resumatch_core::api::{account, matching, profile, UploadFile};
use resumatch_core::error::TransportError;
use resumatch_core::session::token::encode_unsigned;
use resumatch_core::storage::MemoryStore;
use resumatch_core::{App, Config, CoreError, MatchRequest, MatchSession, ValidationError};
use serde_json::json;

fn logged_in_app(server: &ServerGuard) -> App {
    let mut config = Config::default();
    config.api.base_url = server.url();
    let app = App::with_scopes(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStore::new()),
    )
    .unwrap();
    let token = encode_unsigned(&json!({ "sub": "ada", "exp": Utc::now().timestamp() + 3600 }));
    app.sessions
        .commit_credentials(&token, "ada@example.com", "ada", true)
        .unwrap();
    app
}

fn report_body(met: &[&str], missing: &[&str]) -> String {
    json!({
        "scores": [0.5],
        "met_requirements": met,
        "missing_requirements": missing,
        "requirement_explanations": {},
        "ai_suggestions": []
    })
    .to_string()
}

/// Test: a match submission is multipart and drives the reconciler.
#[tokio::test]
async fn test_submit_match_request() {
    let mut server = Server::new_async().await;
    let upload = server
        .mock("POST", "/upload-resume/")
        .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="resume"; filename="cv.txt""#.into()),
            Matcher::Regex(r#"name="job_description""#.into()),
            Matcher::Regex("Docker and AWS".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(report_body(&["SQL"], &["Docker", "AWS"]))
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let mut session = MatchSession::new();
    let request = MatchRequest::new(
        UploadFile::new("cv.txt", b"SQL, Python".to_vec()),
        "SQL, Docker and AWS",
    );

    assert!(session.submit(&app.client, request).await.unwrap());
    assert_eq!(session.reconciler().score().to_string(), "33.3");

    session.reconciler_mut().mark_met("Docker");
    assert_eq!(session.reconciler().effective_met(), vec!["SQL", "Docker"]);
    assert_eq!(session.reconciler().effective_missing(), vec!["AWS"]);
    assert_eq!(session.reconciler().score().to_string(), "66.7");

    upload.assert_async().await;
}

/// Test: invalid match input never reaches the backend.
#[tokio::test]
async fn test_submit_rejects_blank_job_description() {
    let mut server = Server::new_async().await;
    let upload = server
        .mock("POST", "/upload-resume/")
        .expect(0)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let mut session = MatchSession::new();
    let request = MatchRequest::new(UploadFile::new("cv.txt", b"SQL".to_vec()), "   ");

    let err = session.submit(&app.client, request).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::MissingField(ref f)) if f == "job_description"
    ));
    upload.assert_async().await;
}

/// Test: a response to an older request does not replace a newer result.
#[tokio::test]
async fn test_stale_match_response_is_dropped() {
    let mut server = Server::new_async().await;
    let _first = server
        .mock("POST", "/upload-resume/")
        .match_body(Matcher::Regex("first job".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(report_body(&["COBOL"], &[]))
        .create_async()
        .await;
    let _second = server
        .mock("POST", "/upload-resume/")
        .match_body(Matcher::Regex("second job".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(report_body(&["Rust"], &["Go"]))
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let resume = UploadFile::new("cv.txt", b"Rust".to_vec());
    let mut session = MatchSession::new();

    // The first request is issued, then overtaken by a second one that
    // completes first.
    let stale = session.begin();
    let stale_report = matching::upload_resume(&app.client, resume.clone(), "first job")
        .await
        .unwrap();
    let request = MatchRequest::new(resume, "second job");
    assert!(session.submit(&app.client, request).await.unwrap());

    assert!(!session.accept(stale, stale_report));
    assert_eq!(session.reconciler().effective_met(), vec!["Rust"]);
    assert_eq!(session.reconciler().effective_missing(), vec!["Go"]);
}

/// Test: mismatched password confirmation is rejected locally.
#[tokio::test]
async fn test_change_password_mismatch_sends_nothing() {
    let mut server = Server::new_async().await;
    let change = server
        .mock("POST", "/account/change-password/")
        .expect(0)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let err = account::change_password(&app.client, "old", "new-one", "new-two")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::Mismatch { .. })
    ));
    change.assert_async().await;
}

/// Test: a valid password change posts both passwords as multipart.
#[tokio::test]
async fn test_change_password() {
    let mut server = Server::new_async().await;
    let change = server
        .mock("POST", "/account/change-password/")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="current_password""#.into()),
            Matcher::Regex(r#"name="new_password""#.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok": true, "message": "Password updated"}"#)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let ack = account::change_password(&app.client, "old", "new", "new")
        .await
        .unwrap();

    assert!(ack.ok);
    assert_eq!(ack.message.as_deref(), Some("Password updated"));
    change.assert_async().await;
}

/// Test: wrong current password surfaces the backend detail.
#[tokio::test]
async fn test_change_password_backend_rejection() {
    let mut server = Server::new_async().await;
    let _change = server
        .mock("POST", "/account/change-password/")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "Current password is incorrect"}"#)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let err = account::change_password(&app.client, "bad", "new", "new")
        .await
        .unwrap_err();

    match err {
        CoreError::Transport(TransportError::Status { status, ref detail }) => {
            assert_eq!(status, 400);
            assert_eq!(detail, "Current password is incorrect");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(app.sessions.is_authenticated());
}

/// Test: a 200 whose body says `"ok": false` is an error, not a success.
#[tokio::test]
async fn test_change_password_not_accepted() {
    let mut server = Server::new_async().await;
    let _change = server
        .mock("POST", "/account/change-password/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok": false, "message": "Password too weak"}"#)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let err = account::change_password(&app.client, "old", "new", "new")
        .await
        .unwrap_err();

    match err {
        CoreError::Transport(TransportError::Rejected(ref message)) => {
            assert_eq!(message, "Password too weak");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "Transport error: Request not accepted: Password too weak");
}

/// Test: a blank verification code is rejected locally.
#[tokio::test]
async fn test_verify_email_requires_code() {
    let mut server = Server::new_async().await;
    let verify = server
        .mock("POST", "/account/verify-email/")
        .match_body(Matcher::UrlEncoded("code".into(), "123456".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"email_verified": true}"#)
        .expect(1)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    assert!(matches!(
        account::verify_email(&app.client, " ").await,
        Err(CoreError::Validation(ValidationError::MissingField(_)))
    ));
    let verified = account::verify_email(&app.client, "123456").await.unwrap();

    assert!(verified.email_verified);
    verify.assert_async().await;
}

/// Test: deleting the account logs out locally.
#[tokio::test]
async fn test_delete_account_logs_out() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("DELETE", "/account/delete/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok": true}"#)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    account::delete_account(&app.client, &app.sessions).await.unwrap();

    assert!(!app.sessions.is_authenticated());
    assert!(!app.client.auth_header().is_set());
    delete.assert_async().await;
}

/// Test: login activity and remote session logout.
#[tokio::test]
async fn test_login_activity_and_logout_session() {
    let mut server = Server::new_async().await;
    let _activity = server
        .mock("GET", "/account/login-activity/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"events": [
                {"session_id": "abc", "timestamp": "2025-03-01T10:15:00", "ip": "10.0.0.1",
                 "device": "Mozilla/5.0 (X11; Linux x86_64) Firefox/120.0", "current_session": true},
                {"session_id": "def", "timestamp": "2025-02-27T08:00:00", "current_session": false}
            ]}"#,
        )
        .create_async()
        .await;
    let logout = server
        .mock("POST", "/account/logout-session/")
        .match_body(Matcher::Json(json!({ "session_id": "def" })))
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let events = account::login_activity(&app.client).await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(events[0].current_session);
    assert_eq!(
        account::browser_name(events[0].device.as_deref().unwrap_or_default()),
        "Firefox"
    );

    assert!(account::logout_session(&app.client, "").await.is_err());
    let ack = account::logout_session(&app.client, "def").await.unwrap();
    assert!(ack.ok);
    logout.assert_async().await;
}

/// Test: account update reports whether the email changed.
#[tokio::test]
async fn test_update_account() {
    let mut server = Server::new_async().await;
    let _update = server
        .mock("PATCH", "/account/update/")
        .match_body(Matcher::Regex(r#"name="email""#.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"email_changed": true, "email_verified": false}"#)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let updated = account::update_account(&app.client, "ada", "ada@new.example.com")
        .await
        .unwrap();

    assert!(updated.email_changed);
    assert_eq!(updated.email_verified, Some(false));
}

/// Test: profile edits send only the provided fields.
#[tokio::test]
async fn test_update_profile_partial() {
    let mut server = Server::new_async().await;
    let update = server
        .mock("PATCH", "/profile/update/")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="bio""#.into()),
            Matcher::Regex("Rustacean".into()),
        ]))
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let changes = profile::ProfileUpdate {
        bio: Some("Rustacean".into()),
        ..profile::ProfileUpdate::default()
    };
    let ack = profile::update_profile(&app.client, &changes).await.unwrap();

    assert!(ack.ok);
    update.assert_async().await;
}

/// Test: trends and profile image upload.
#[tokio::test]
async fn test_trends_and_profile_image() {
    let mut server = Server::new_async().await;
    let _trends = server
        .mock("GET", "/profile/trends/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r##"{"trends": [{"title": "Async Rust", "type": "skill"}, {"title": "Staff track", "tag": "#career"}]}"##)
        .create_async()
        .await;
    let image = server
        .mock("POST", "/upload-profile-image/")
        .match_body(Matcher::Regex(r#"name="image"; filename="me.png""#.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok": true, "profile_image_url": "/media/me.png"}"#)
        .create_async()
        .await;

    let app = logged_in_app(&server);
    let trends = profile::trends(&app.client).await.unwrap();
    let tags: Vec<String> = trends.iter().map(|t| t.display_tag()).collect();
    assert_eq!(tags, vec!["#skill", "#career"]);

    let uploaded = profile::upload_profile_image(&app.client, UploadFile::new("me.png", b"PNG".to_vec()))
        .await
        .unwrap();
    assert_eq!(uploaded.profile_image_url, "/media/me.png");
    image.assert_async().await;
}
