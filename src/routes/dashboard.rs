use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Dashboard Router Module
///
/// Everything under `/dashboard`. The session gate guarantees a resolved `Principal` in
/// the request extensions for every handler here.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        // GET /dashboard
        // Overview cards (invoice/customer counts, paid and pending totals).
        .route("/dashboard", get(handlers::get_overview))
        // POST /dashboard/logout
        .route("/dashboard/logout", post(handlers::logout))
        // GET /dashboard/invoices?query=...&page=...  POST /dashboard/invoices
        // Cached, searchable listing and the create form target.
        .route(
            "/dashboard/invoices",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        // GET/POST/PUT/DELETE /dashboard/invoices/{id}
        // Edit form source, update (POST for HTML forms, PUT for API clients) and delete.
        .route(
            "/dashboard/invoices/{id}",
            get(handlers::get_invoice)
                .post(handlers::update_invoice)
                .put(handlers::update_invoice)
                .delete(handlers::delete_invoice),
        )
        // POST /dashboard/invoices/{id}/delete
        // Delete from a plain HTML form, which cannot send DELETE.
        .route("/dashboard/invoices/{id}/delete", post(handlers::delete_invoice))
        // GET /dashboard/customers
        // Customer picker options for the invoice forms.
        .route("/dashboard/customers", get(handlers::list_customers))
}
