use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints open to anonymous clients. A signed-in user requesting `/login` is sent to
/// the dashboard by the session gate before reaching these handlers.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check; exempt from the session gate.
        .route("/health", get(|| async { "ok" }))
        // GET /login?callbackUrl=...  POST /login
        // Login form data and credential submission.
        .route("/login", get(handlers::login_page).post(handlers::login))
}
