use crate::{
    AppState,
    auth::{AuthError, Principal},
    cache::listing_key,
    gate::{DASHBOARD_PATH, LOGIN_PATH},
    models::{
        CardData, CustomerField, FormState, Invoice, InvoicesPage, LoginForm, LoginPage,
        MessageResponse, RawInvoiceForm,
    },
    pipeline::{LISTING_PATH, MutationOutcome, PersistenceFailure},
    repository::RepositoryError,
};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

/// Shown for every credential rejection, whatever the actual cause.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong.";

// --- Query Structs ---

/// InvoiceListQuery
///
/// Search and pagination parameters for the invoice listing. A missing, non-numeric or
/// zero page falls back to page 1.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InvoiceListQuery {
    /// Free-text search over customer, amount, date and status.
    pub query: Option<String>,
    /// 1-based page number.
    pub page: Option<String>,
}

impl InvoiceListQuery {
    fn page_number(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|page| page.trim().parse::<u32>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1)
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    /// Where to go after a successful login.
    pub callback_url: Option<String>,
}

// --- Response Mapping ---

impl IntoResponse for MutationOutcome {
    fn into_response(self) -> Response {
        match self {
            MutationOutcome::Redirect(location) => Redirect::to(location).into_response(),
            // Validation failures are a normal answer for the form, not an HTTP error.
            MutationOutcome::Rejected(state) => (StatusCode::OK, Json(state)).into_response(),
        }
    }
}

impl IntoResponse for PersistenceFailure {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(MessageResponse::new(self.message)),
        )
            .into_response()
    }
}

fn read_failed(operation: &'static str, error: RepositoryError) -> StatusCode {
    tracing::error!(operation, error = %error, "dashboard read failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Accepts only same-origin absolute paths as post-login targets.
///
/// Browsers drop tabs and line breaks while parsing a `Location`, so `/\t/host` would
/// become the protocol-relative `//host`. Any control character or whitespace
/// disqualifies the target before the prefix checks run.
pub fn safe_redirect_target(target: Option<&str>) -> &str {
    match target {
        Some(path)
            if path.starts_with('/')
                && !path.chars().any(|c| c.is_control() || c.is_whitespace())
                && !path.starts_with("//")
                && !path.contains('\\') =>
        {
            path
        }
        _ => DASHBOARD_PATH,
    }
}

// --- Session Handlers ---

/// login_page
///
/// [Public Route] Data for the login form: the page to return to after signing in.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginQuery),
    responses((status = 200, description = "Login form data", body = LoginPage))
)]
pub async fn login_page(Query(query): Query<LoginQuery>) -> Json<LoginPage> {
    Json(LoginPage {
        callback_url: safe_redirect_target(query.callback_url.as_deref()).to_string(),
    })
}

/// login
///
/// [Public Route] Verifies the submitted credentials. On success the session cookie is
/// set and the browser is sent to `redirectTo`; on rejection any existing session is
/// cleared and a generic message returned.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Signed in"),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 500, description = "Infrastructure fault", body = MessageResponse)
    )
)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    match state.verifier.verify(&form.email, &form.password).await {
        Ok(principal) => match state.sessions.establish_session(&principal) {
            Ok(cookie) => {
                let target = safe_redirect_target(form.redirect_to.as_deref());
                ([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to establish session");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(MessageResponse::new(SOMETHING_WENT_WRONG)),
                )
                    .into_response()
            }
        },
        Err(AuthError::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            [(header::SET_COOKIE, state.sessions.clear_session())],
            Json(MessageResponse::new(INVALID_CREDENTIALS)),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "credential verification failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::new(SOMETHING_WENT_WRONG)),
            )
                .into_response()
        }
    }
}

/// logout
///
/// [Dashboard Route] Clears the session and returns to the login page.
#[utoipa::path(
    post,
    path = "/dashboard/logout",
    responses((status = 303, description = "Signed out"))
)]
pub async fn logout(principal: Principal, State(state): State<AppState>) -> Response {
    tracing::info!(account_id = %principal.id, "signed out");
    (
        [(header::SET_COOKIE, state.sessions.clear_session())],
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}

// --- Dashboard Reads ---

/// get_overview
///
/// [Dashboard Route] Card counters for the dashboard landing page.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Overview", body = CardData))
)]
pub async fn get_overview(State(state): State<AppState>) -> Result<Json<CardData>, StatusCode> {
    state
        .repo
        .fetch_card_data()
        .await
        .map(Json)
        .map_err(|e| read_failed("fetch_card_data", e))
}

/// list_invoices
///
/// [Dashboard Route] One page of the searchable listing, read through the view cache.
#[utoipa::path(
    get,
    path = "/dashboard/invoices",
    params(InvoiceListQuery),
    responses((status = 200, description = "Invoice page", body = InvoicesPage))
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<InvoiceListQuery>,
) -> Result<Json<InvoicesPage>, StatusCode> {
    let query = params.query.clone().unwrap_or_default();
    let current_page = params.page_number();
    let key = listing_key(LISTING_PATH, &query, current_page);

    if let Some(page) = state.cache.get(&key).await {
        return Ok(Json(page));
    }
    // Taken before the store read so a write landing mid-read keeps this page out.
    let generation = state.cache.generation().await;

    let (invoices, total_pages) = tokio::try_join!(
        state.repo.fetch_filtered_invoices(&query, current_page),
        state.repo.fetch_invoice_pages(&query),
    )
    .map_err(|e| read_failed("list_invoices", e))?;

    let page = InvoicesPage {
        invoices,
        query,
        current_page,
        total_pages,
    };
    state.cache.put(key, page.clone(), generation).await;
    Ok(Json(page))
}

/// get_invoice
///
/// [Dashboard Route] A single invoice, as loaded into the edit form.
#[utoipa::path(
    get,
    path = "/dashboard/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Found", body = Invoice),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>, StatusCode> {
    match state.repo.fetch_invoice_by_id(id).await {
        Ok(Some(invoice)) => Ok(Json(invoice)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => Err(read_failed("fetch_invoice_by_id", e)),
    }
}

/// list_customers
///
/// [Dashboard Route] Options for the customer picker.
#[utoipa::path(
    get,
    path = "/dashboard/customers",
    responses((status = 200, description = "Customers", body = [CustomerField]))
)]
pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerField>>, StatusCode> {
    state
        .repo
        .fetch_customers()
        .await
        .map(Json)
        .map_err(|e| read_failed("fetch_customers", e))
}

// --- Invoice Mutations ---

/// create_invoice
///
/// [Dashboard Route] Create form submission.
#[utoipa::path(
    post,
    path = "/dashboard/invoices",
    request_body(content = RawInvoiceForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Created; redirect to listing"),
        (status = 200, description = "Rejected form", body = FormState),
        (status = 500, description = "Persistence fault", body = MessageResponse)
    )
)]
pub async fn create_invoice(
    principal: Principal,
    State(state): State<AppState>,
    Form(raw): Form<RawInvoiceForm>,
) -> Result<MutationOutcome, PersistenceFailure> {
    state.pipeline.create(&principal, raw).await
}

/// update_invoice
///
/// [Dashboard Route] Edit form submission. The target id is the route parameter; an
/// `id` in the body is ignored.
#[utoipa::path(
    put,
    path = "/dashboard/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body(content = RawInvoiceForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Updated; redirect to listing"),
        (status = 200, description = "Rejected form", body = FormState),
        (status = 500, description = "Persistence fault", body = MessageResponse)
    )
)]
pub async fn update_invoice(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(raw): Form<RawInvoiceForm>,
) -> Result<MutationOutcome, PersistenceFailure> {
    state.pipeline.update(&principal, id, raw).await
}

/// delete_invoice
///
/// [Dashboard Route] Deletes by id. Answers 204 whether or not the row still existed.
#[utoipa::path(
    delete,
    path = "/dashboard/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 204, description = "Deleted (or already absent)"),
        (status = 500, description = "Persistence fault", body = MessageResponse)
    )
)]
pub async fn delete_invoice(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, PersistenceFailure> {
    state.pipeline.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
