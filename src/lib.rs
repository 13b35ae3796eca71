use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity: credential checks, signed sessions and the request gate.
pub mod auth;
pub mod gate;
pub mod session;

// Invoice domain: form schema, mutation orchestration and the listing cache.
pub mod cache;
pub mod pipeline;
pub mod validation;

// Infrastructure and HTTP surface.
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Dashboard).
pub mod routes;
use routes::{dashboard, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use auth::{CredentialVerifier, Principal};
pub use cache::{CacheState, InMemoryViewCache};
pub use config::AppConfig;
pub use pipeline::InvoicePipeline;
pub use repository::{PostgresRepository, RepositoryState};
pub use session::SessionManager;

/// ApiDoc
///
/// Auto-generated OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_page, handlers::login, handlers::logout,
        handlers::get_overview, handlers::list_invoices, handlers::get_invoice,
        handlers::list_customers, handlers::create_invoice, handlers::update_invoice,
        handlers::delete_invoice
    ),
    components(
        schemas(
            models::Invoice, models::InvoiceStatus, models::InvoiceRow, models::InvoicesPage,
            models::CustomerField, models::CardData, models::RawInvoiceForm, models::FormState,
            models::LoginForm, models::LoginPage, models::MessageResponse, auth::Principal,
        )
    ),
    tags(
        (name = "invoice-dashboard", description = "Invoice Admin Dashboard API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single shared container for every service the handlers need. Built once at startup;
/// each field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, an in-memory double in tests).
    pub repo: RepositoryState,
    /// Rendered-listing cache invalidated by every invoice mutation.
    pub cache: CacheState,
    pub sessions: SessionManager,
    pub verifier: CredentialVerifier,
    pub pipeline: InvoicePipeline,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Wires the session manager, credential verifier and mutation pipeline over the
    /// injected repository and cache.
    pub fn new(repo: RepositoryState, cache: CacheState, config: AppConfig) -> Self {
        Self {
            sessions: SessionManager::from_config(&config),
            verifier: CredentialVerifier::new(repo.clone()),
            pipeline: InvoicePipeline::new(repo.clone(), cache.clone(), config.failure_policy),
            repo,
            cache,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Lets the session gate pull only the session manager out of the shared state.
impl FromRef<AppState> for SessionManager {
    fn from_ref(app_state: &AppState) -> SessionManager {
        app_state.sessions.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, applies the session gate to every route and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(dashboard::dashboard_routes())
        .with_state(state.clone())
        // Session Gate: runs for every path, including unmatched ones, so anonymous
        // requests under /dashboard never learn which routes exist.
        .layer(middleware::from_fn_with_state(state, gate::session_gate));

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request tracing span from the method, URI and `x-request-id` header so
/// every log line for one request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
