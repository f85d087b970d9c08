use collegeportal::{
    config::{validate_production_config, AppConfig},
    db, routes, services, AppState,
};

use std::net::SocketAddr;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "collegeportal=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    validate_production_config()?;
    let config = AppConfig::from_env()?;

    // Database connection
    let pool = db::create_pool().await?;

    // Run migrations
    db::run_migrations(&pool).await?;

    for dir in [&config.upload_dir, &config.files_dir] {
        tokio::fs::create_dir_all(dir).await?;
    }

    // Session store
    let session_store = SqliteStore::new(pool.clone())
        .with_table_name("sessions")
        .map_err(anyhow::Error::msg)?;
    session_store.migrate().await?;
    let session_layer = config.session.create_layer(session_store);

    let mailer = services::create_email_service();
    let addr: SocketAddr = config.bind_address().parse()?;
    let app_state = AppState::new(pool, config, mailer);

    let app = routes::build_router(app_state, session_layer);

    tracing::info!("Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
