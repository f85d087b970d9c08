use std::{collections::HashMap, env};

use axum::http::{header, Method, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use collegeportal::{
    config::{session::validate_production_config, SessionConfig},
    models::user::Level,
    test_utils::test_helpers::{
        get_request, insert_test_student, json_request, session_cookie, RecordingEmailService,
        TestApp,
    },
};
use serial_test::serial;
use tower_sessions::cookie::{Cookie, SameSite};

#[derive(Default)]
struct EnvGuard {
    original: HashMap<String, Option<String>>,
}

impl EnvGuard {
    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.original
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
        env::set_var(key, value.into());
    }

    fn remove(&mut self, key: &str) {
        self.original
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
        env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.original.drain() {
            match value {
                Some(v) => env::set_var(&key, v),
                None => env::remove_var(&key),
            }
        }
    }
}

#[tokio::test]
#[serial]
async fn login_cookie_flags_are_secure_in_production() {
    let mut env_guard = EnvGuard::default();
    env_guard.set("ENVIRONMENT", "production");
    env_guard.set("FORCE_HTTPS", "true");
    env_guard.set("SESSION_SECRET", STANDARD.encode([42u8; 64]));
    env_guard.remove("SESSION_TTL_HOURS");

    validate_production_config().expect("hardened configuration to validate");
    let session = SessionConfig::from_env().expect("session config");

    let app = TestApp::with_options(RecordingEmailService::new(), |config| {
        config.session = session;
    })
    .await;
    insert_test_student(&app.pool, "secure@example.com", "password123", Level::First)
        .await
        .unwrap();

    let response = app
        .send(json_request(
            Method::POST,
            "/login",
            None,
            serde_json::json!({ "email": "secure@example.com", "password": "password123" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie_header = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie to be issued")
        .to_str()
        .expect("cookie header to be valid ASCII");

    let cookie = Cookie::parse(cookie_header).expect("cookie header to parse correctly");

    assert_eq!(cookie.name(), "__Host-session", "cookie name should be hardened");
    assert_eq!(cookie.http_only(), Some(true), "HttpOnly flag must be set");
    assert_eq!(cookie.secure(), Some(true), "Secure flag must be enabled");
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    assert_eq!(
        cookie.path().unwrap_or("/"),
        "/",
        "cookie path must be root for __Host- prefix"
    );
}

#[tokio::test]
#[serial]
async fn login_sets_fixed_expiry_and_rotates_session_id() {
    let app = TestApp::new().await;
    insert_test_student(&app.pool, "ttl@example.com", "password123", Level::Second)
        .await
        .unwrap();

    let first = app.login("ttl@example.com", "password123").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/login",
            Some(&first),
            serde_json::json!({ "email": "ttl@example.com", "password": "password123" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = session_cookie(&response).expect("second login issues a cookie");
    assert_ne!(first, second, "session id must change on login");

    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("cookie header");
    let cookie = Cookie::parse(raw).expect("cookie to parse");
    let max_age = cookie.max_age().expect("fixed lifetime cookie");
    assert!(max_age <= time::Duration::hours(24));
    assert!(max_age > time::Duration::hours(23));
}

async fn stored_expiries(app: &TestApp) -> Vec<String> {
    sqlx::query_scalar("SELECT CAST(expiry_date AS TEXT) FROM sessions ORDER BY id")
        .fetch_all(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn activity_does_not_extend_a_login_session() {
    let app = TestApp::new().await;
    insert_test_student(&app.pool, "idle@example.com", "password123", Level::First)
        .await
        .unwrap();

    let cookie = app.login("idle@example.com", "password123").await;
    let before = stored_expiries(&app).await;
    assert_eq!(before.len(), 1);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    for _ in 0..2 {
        let response = app
            .send(get_request("/api/student/profile", Some(&cookie)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers().get(header::SET_COOKIE).is_none(),
            "authenticated reads must not re-issue the cookie"
        );
    }

    assert_eq!(stored_expiries(&app).await, before);
}

#[test]
#[serial]
fn production_requires_https_flag() {
    let mut env_guard = EnvGuard::default();
    env_guard.set("ENVIRONMENT", "production");
    env_guard.remove("FORCE_HTTPS");
    env_guard.set("SESSION_SECRET", "a".repeat(64));

    assert!(
        validate_production_config().is_err(),
        "FORCE_HTTPS must be enforced in production"
    );
}

#[test]
#[serial]
fn production_rejects_weak_secrets() {
    let mut env_guard = EnvGuard::default();
    env_guard.set("ENVIRONMENT", "production");
    env_guard.set("FORCE_HTTPS", "true");
    env_guard.set("SESSION_SECRET", "changeme");

    assert!(
        validate_production_config().is_err(),
        "Weak or default session secrets must be rejected in production"
    );
}

#[test]
#[serial]
fn development_skips_production_checks() {
    let mut env_guard = EnvGuard::default();
    env_guard.set("ENVIRONMENT", "development");
    env_guard.remove("FORCE_HTTPS");
    env_guard.remove("SESSION_SECRET");

    assert!(validate_production_config().is_ok());
}
