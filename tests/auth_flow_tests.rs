use axum::http::{header, Method, StatusCode};
use collegeportal::{
    models::user::Level,
    test_utils::test_helpers::{
        count_rows, empty_request, get_request, insert_test_admin, insert_test_student,
        json_request, multipart_request, read_json, session_cookie, RecordingEmailService, TestApp,
    },
};
use serde_json::json;

fn signup_fields<'a>(email: &'a str, role: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("first_name", "Nour"),
        ("last_name", "Ali"),
        ("email", email),
        ("password", "password123"),
        ("phone_num", "01000000000"),
        ("gender", "female"),
        ("level", "2"),
        ("role", role),
    ]
}

#[tokio::test]
async fn student_signup_creates_student_row() {
    let app = TestApp::new().await;

    let response = app
        .send(multipart_request(
            Method::POST,
            "/signup",
            None,
            &signup_fields("nour@example.com", "student"),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["role"], "student");

    let level: i64 = sqlx::query_scalar(
        "SELECT s.level FROM students s JOIN users u ON u.id = s.user_id WHERE u.email = ?",
    )
    .bind("nour@example.com")
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(level, 2);
    assert_eq!(count_rows(&app.pool, "admins").await, 0);
}

#[tokio::test]
async fn admin_signup_is_rejected_unless_enabled() {
    let app = TestApp::new().await;
    let response = app
        .send(multipart_request(
            Method::POST,
            "/signup",
            None,
            &signup_fields("boss@example.com", "admin"),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(count_rows(&app.pool, "users").await, 0);

    let open = TestApp::with_options(RecordingEmailService::new(), |config| {
        config.allow_admin_signup = true;
    })
    .await;
    let response = open
        .send(multipart_request(
            Method::POST,
            "/signup",
            None,
            &signup_fields("boss@example.com", "admin"),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(count_rows(&open.pool, "admins").await, 1);
    assert_eq!(count_rows(&open.pool, "students").await, 0);
}

#[tokio::test]
async fn signup_validation_errors_use_the_envelope() {
    let app = TestApp::new().await;
    let response = app
        .send(multipart_request(
            Method::POST,
            "/signup",
            None,
            &[
                ("first_name", "Nour"),
                ("last_name", "Ali"),
                ("email", "nour@example.com"),
                ("password", "short"),
                ("level", "1"),
            ],
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Password must be at least 8 characters");
}

#[tokio::test]
async fn login_establishes_role_session() {
    let app = TestApp::new().await;
    insert_test_admin(&app.pool, "admin@example.com", "password123")
        .await
        .unwrap();

    let response = app
        .send(json_request(
            Method::POST,
            "/login",
            None,
            json!({ "email": "Admin@Example.com ", "password": "password123" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("session cookie");
    let body = read_json(response).await;
    assert_eq!(body["role"], "admin");

    let response = app.send(get_request("/api/is_admin", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["isAdmin"], true);
}

#[tokio::test]
async fn wrong_password_is_401_without_cookie() {
    let app = TestApp::new().await;
    insert_test_student(&app.pool, "s@example.com", "password123", Level::First)
        .await
        .unwrap();

    let response = app
        .send(json_request(
            Method::POST,
            "/login",
            None,
            json!({ "email": "s@example.com", "password": "wrong-password" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(
        read_json(response).await["message"],
        "Invalid email or password."
    );
}

#[tokio::test]
async fn role_gate_separates_admins_and_students() {
    let app = TestApp::new().await;
    insert_test_admin(&app.pool, "admin@example.com", "password123")
        .await
        .unwrap();
    insert_test_student(&app.pool, "s@example.com", "password123", Level::First)
        .await
        .unwrap();

    let student = app.login("s@example.com", "password123").await;
    let admin = app.login("admin@example.com", "password123").await;

    let response = app.send(get_request("/admin/students", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.send(get_request("/api/is_admin", Some(&student))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(response).await["isAdmin"], false);

    let response = app.send(get_request("/admin/students", Some(&admin))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(get_request("/api/student/profile", Some(&admin)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(get_request("/api/student/profile", Some(&student)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["student"]["level"], 1);
}

#[tokio::test]
async fn anonymous_requests_are_401() {
    let app = TestApp::new().await;

    for uri in ["/admin/students", "/api/student/courses", "/api/is_admin"] {
        let response = app.send(get_request(uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(read_json(response).await["success"], false);
    }
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = TestApp::new().await;
    insert_test_student(&app.pool, "s@example.com", "password123", Level::First)
        .await
        .unwrap();
    let cookie = app.login("s@example.com", "password123").await;

    let response = app
        .send(empty_request(Method::POST, "/api/logout", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(get_request("/api/student/profile", Some(&cookie)))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_login_body_is_a_validation_error() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request(
            Method::POST,
            "/login",
            None,
            json!({ "email": "a@b.com" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn non_multipart_signup_is_a_validation_error() {
    let app = TestApp::new().await;

    let response = app
        .send(json_request(
            Method::POST,
            "/signup",
            None,
            json!({ "email": "a@b.com" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["success"], false);
}
