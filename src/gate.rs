//! Session gate: the request-level access check in front of every route.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

use crate::session::SessionManager;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Path prefixes that bypass the gate entirely: static assets, framework resources,
/// API docs and the health check.
const EXEMPT_PREFIXES: &[&str] = &[
    "/api",
    "/static",
    "/_next/static",
    "/_next/image",
    "/swagger-ui",
    "/health",
];

/// Image files are served without a session wherever they live.
const EXEMPT_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".webp"];

/// GateDecision
///
/// Outcome of the gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin,
    RedirectToDashboard,
}

pub fn is_exempt(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || EXEMPT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Everything under `/dashboard` is protected; every other path is public.
pub fn is_protected(path: &str) -> bool {
    path == DASHBOARD_PATH
        || path
            .strip_prefix(DASHBOARD_PATH)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// decide
///
/// | authenticated | protected | decision |
/// |---|---|---|
/// | yes | yes | allow |
/// | no | yes | login |
/// | yes | no | dashboard |
/// | no | no | allow |
pub fn decide(authenticated: bool, path: &str) -> GateDecision {
    match (authenticated, is_protected(path)) {
        (true, true) | (false, false) => GateDecision::Allow,
        (false, true) => GateDecision::RedirectToLogin,
        (true, false) => GateDecision::RedirectToDashboard,
    }
}

/// Login URL that sends the user back to `target` after signing in.
pub fn login_redirect_url(target: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("callbackUrl", target)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// session_gate
///
/// Middleware applied to the whole router. Exempt paths pass straight through; for
/// everything else the session is resolved once and the decision table applied. An
/// allowed request carries its `Principal` (if any) in the request extensions.
pub async fn session_gate(
    State(sessions): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    let principal = sessions.current_session(request.headers());

    match decide(principal.is_some(), &path) {
        GateDecision::Allow => {
            if let Some(principal) = principal {
                request.extensions_mut().insert(principal);
            }
            next.run(request).await
        }
        GateDecision::RedirectToLogin => {
            let target = request
                .uri()
                .path_and_query()
                .map_or(path.as_str(), |pq| pq.as_str());
            tracing::debug!(path = %path, "no session for protected path, redirecting to login");
            Redirect::to(&login_redirect_url(target)).into_response()
        }
        GateDecision::RedirectToDashboard => {
            tracing::debug!(path = %path, "signed-in user on public path, redirecting to dashboard");
            Redirect::to(DASHBOARD_PATH).into_response()
        }
    }
}
