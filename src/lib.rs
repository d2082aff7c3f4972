//! Portfolio Showcase - library for app logic and testing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod repository;
pub mod routes;
pub mod snapshot;
pub mod state;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use state::{AppState, StartupError, Storage};

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::snapshot::AutoBackup;

/// Global request body cap. Sits above the 5 MB image limit so the upload
/// handler can report oversized files itself.
const BODY_LIMIT: usize = 6 * 1024 * 1024;

/// CORS for the configured frontend origins. Credentials are allowed so the
/// session cookie travels with cross-origin requests.
pub fn configure_cors(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config.allowed_origins);
    tracing::info!("CORS configured");

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/api/login", post(routes::auth::login))
        .route("/api/logout", post(routes::auth::logout))
        .route("/api/auth/user", get(routes::auth::current_user))
        .route(
            "/api/certificates",
            get(routes::certificates::list_public).post(routes::certificates::create),
        )
        .route("/api/certificates/all", get(routes::certificates::list_all))
        .route(
            "/api/certificates/{id}",
            axum::routing::delete(routes::certificates::delete),
        )
        .route(
            "/api/reviews",
            get(routes::reviews::list_public).post(routes::reviews::submit),
        )
        .route("/api/reviews/all", get(routes::reviews::list_all))
        .route("/api/reviews/{id}/approve", patch(routes::reviews::approve))
        .route(
            "/api/reviews/{id}",
            axum::routing::delete(routes::reviews::delete),
        )
        .route("/api/contact", post(routes::contact::submit))
        .route("/api/contact/messages", get(routes::contact::list_messages))
        .route("/api/contact/unread-count", get(routes::contact::unread_count))
        .route("/api/contact/{id}/read", put(routes::contact::mark_read))
        .route(
            "/api/contact/{id}",
            axum::routing::delete(routes::contact::delete),
        )
        .route(
            "/api/projects",
            get(routes::projects::list_public).post(routes::projects::create),
        )
        .route("/api/projects/all", get(routes::projects::list_all))
        .route(
            "/api/projects/{id}",
            put(routes::projects::update)
                .patch(routes::projects::update)
                .delete(routes::projects::delete),
        )
        .route("/api/uploads", post(routes::upload::upload_image))
        .route(
            "/api/admin/backup",
            get(routes::backup::status).post(routes::backup::trigger_backup),
        )
        .route("/api/admin/restore", post(routes::backup::trigger_restore))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/ready", get(routes::health::health_ready))
        .nest_service("/uploads", uploads)
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(cors)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = AppConfig::from_env()?;
    tracing::info!(
        environment = %config.environment,
        database = config.database.is_some(),
        "Configuration loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| crate::config::ConfigError::Invalid {
            key: "HOST/PORT",
            value: format!("{}:{}", config.host, config.port),
        })?;
    let backup_interval = config.snapshot.interval;

    let state = AppState::build(config).await?;

    let auto_backup = if state.snapshots.is_configured() {
        Some(AutoBackup::spawn(state.snapshots.clone(), backup_interval))
    } else {
        tracing::info!("Auto backup disabled");
        None
    };

    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(auto_backup) = auto_backup {
        auto_backup.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_create_app_serves_health() {
        let app = test_support::app(test_support::state().await);
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin_with_credentials() {
        let app = test_support::app(test_support::state().await);
        let req = Request::get("/api/projects")
            .header("origin", "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(
            res.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );
        assert_eq!(res.headers()["access-control-allow-credentials"], "true");
    }

    #[tokio::test]
    async fn test_uploaded_files_are_served() {
        let state = test_support::state().await;
        let dir = state.config.upload_dir.clone();
        tokio::fs::write(dir.join("served-check.txt"), b"hello")
            .await
            .unwrap();
        let res = test_support::app(state)
            .oneshot(
                Request::get("/uploads/served-check.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
