use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, Request},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::{self, handlers as auth_handlers};
use crate::config::{self, SessionLayer};
use crate::handlers;
use crate::models::user::Role;
use crate::AppState;

pub fn build_router(state: AppState, session_layer: SessionLayer) -> Router {
    let config = state.config.clone();

    let public_routes = Router::new()
        .route("/signup", post(auth_handlers::signup_handler))
        .route("/login", post(auth_handlers::login_handler))
        .route("/api/logout", post(auth_handlers::logout_handler));

    let authenticated_routes = Router::new()
        .route("/api/is_admin", get(auth_handlers::is_admin_handler))
        .route_layer(middleware::from_fn(auth::require_auth));

    let admin_routes = Router::new()
        .route("/admin/admin-profile", get(handlers::admin_profile_handler))
        // Students
        .route("/admin/students", get(handlers::list_students_handler))
        .route("/add-student", post(handlers::add_student_handler))
        .route("/student/{id}", get(handlers::get_student_handler))
        .route("/edit-student/{id}", put(handlers::edit_student_handler))
        .route("/delete-student/{id}", delete(handlers::delete_student_handler))
        // Admins
        .route("/admin/admins", get(handlers::list_admins_handler))
        .route("/add-admin", post(handlers::add_admin_handler))
        .route("/admin/{id}", get(handlers::get_admin_handler))
        .route("/edit-admin/{id}", put(handlers::edit_admin_handler))
        .route("/delete-admin/{id}", delete(handlers::delete_admin_handler))
        // Courses
        .route("/admin/courses", get(handlers::list_courses_handler))
        .route("/api/courses", post(handlers::create_course_handler))
        .route("/api/courses/search", get(handlers::search_courses_handler))
        .route(
            "/api/course/{id}",
            get(handlers::get_course_handler).put(handlers::update_course_handler),
        )
        .route("/api/courses/{id}", delete(handlers::delete_course_handler))
        // Bulk import
        .route("/add-students-bulk", post(handlers::import_students_handler))
        .route("/add-courses-bulk", post(handlers::import_courses_handler))
        // Notifications
        .route("/admin/send-message", post(handlers::send_message_handler))
        .route(
            "/admin/sent-notifications",
            get(handlers::sent_notifications_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            Role::Admin,
            auth::require_role,
        ));

    let student_routes = Router::new()
        .route("/api/student/profile", get(handlers::student_profile_handler))
        .route("/api/student/courses", get(handlers::student_courses_handler))
        .route(
            "/api/student/courses/{id}",
            get(handlers::student_course_handler),
        )
        .route(
            "/student/send-message",
            post(handlers::student_send_message_handler),
        )
        .route(
            "/student/receive-notifications",
            get(handlers::receive_notifications_handler),
        )
        .route(
            "/student/receive-notifications/{id}/read",
            post(handlers::mark_notification_read_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            Role::Student,
            auth::require_role,
        ));

    let cors_layer = CorsLayer::new()
        .allow_origin(config.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(admin_routes)
        .merge(student_routes)
        // Static files
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .nest_service("/files", ServeDir::new(&config.files_dir))
        // Layers
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(session_layer)
        .layer(cors_layer)
        .layer(middleware::from_fn(add_security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn add_security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        "Referrer-Policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if config::is_production() {
        headers.insert(
            "Strict-Transport-Security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains; preload"),
        );
    }

    response
}
