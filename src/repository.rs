use crate::models::{
    Account, CardData, CustomerField, Invoice, InvoiceChanges, InvoiceRow, NewInvoice,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Rows per page of the invoice listing.
pub const ITEMS_PER_PAGE: u32 = 6;

/// RepositoryError
///
/// Infrastructure-level persistence fault. Never a user-correctable condition.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Abstract contract for every persistence operation. Handlers and the mutation
/// pipeline only see this trait, so tests can substitute an in-memory double.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum's
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError>;

    // --- Invoice Writes ---
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<Uuid, RepositoryError>;
    // Returns the number of rows touched; zero means the id does not exist.
    async fn update_invoice(&self, id: Uuid, changes: &InvoiceChanges) -> Result<u64, RepositoryError>;
    async fn delete_invoice(&self, id: Uuid) -> Result<u64, RepositoryError>;

    // --- Dashboard Reads ---
    async fn fetch_filtered_invoices(&self, query: &str, page: u32) -> Result<Vec<InvoiceRow>, RepositoryError>;
    async fn fetch_invoice_pages(&self, query: &str) -> Result<u32, RepositoryError>;
    async fn fetch_invoice_by_id(&self, id: Uuid) -> Result<Option<Invoice>, RepositoryError>;
    async fn fetch_customers(&self) -> Result<Vec<CustomerField>, RepositoryError>;
    async fn fetch_card_data(&self) -> Result<CardData, RepositoryError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. The pool is constructed at startup and injected.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Page count for `total` matching rows, never less than zero pages.
pub fn page_count(total: i64) -> u32 {
    let total = u32::try_from(total.max(0)).unwrap_or(u32::MAX);
    total.div_ceil(ITEMS_PER_PAGE)
}

/// Search pattern shared by the listing and page-count queries.
fn search_pattern(query: &str) -> String {
    format!("%{query}%")
}

#[async_trait]
impl Repository for PostgresRepository {
    /// find_account_by_email
    ///
    /// Exact match on the unique email column.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, name, email, password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    /// insert_invoice
    ///
    /// The customer reference is cast to UUID here, so an unknown or malformed id is
    /// rejected by the database rather than by the form schema.
    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<Uuid, RepositoryError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO invoices (id, customer_id, amount, status, date)
            VALUES ($1, $2::uuid, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(invoice.id)
        .bind(&invoice.customer_id)
        .bind(invoice.amount_cents)
        .bind(invoice.status.as_str())
        .bind(invoice.date)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// update_invoice
    ///
    /// Only customer, amount and status are writable.
    async fn update_invoice(&self, id: Uuid, changes: &InvoiceChanges) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET customer_id = $2::uuid, amount = $3, status = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.customer_id)
        .bind(changes.amount_cents)
        .bind(changes.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// fetch_filtered_invoices
    ///
    /// Case-insensitive search across customer name/email, amount, date and status,
    /// newest first.
    async fn fetch_filtered_invoices(&self, query: &str, page: u32) -> Result<Vec<InvoiceRow>, RepositoryError> {
        let offset = i64::from(page.max(1) - 1) * i64::from(ITEMS_PER_PAGE);
        let rows = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT
                invoices.id,
                customers.name,
                customers.email,
                customers.image_url,
                invoices.amount,
                invoices.date,
                invoices.status
            FROM invoices
            JOIN customers ON invoices.customer_id = customers.id
            WHERE
                customers.name ILIKE $1 OR
                customers.email ILIKE $1 OR
                invoices.amount::text ILIKE $1 OR
                invoices.date::text ILIKE $1 OR
                invoices.status ILIKE $1
            ORDER BY invoices.date DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search_pattern(query))
        .bind(i64::from(ITEMS_PER_PAGE))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_invoice_pages(&self, query: &str) -> Result<u32, RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM invoices
            JOIN customers ON invoices.customer_id = customers.id
            WHERE
                customers.name ILIKE $1 OR
                customers.email ILIKE $1 OR
                invoices.amount::text ILIKE $1 OR
                invoices.date::text ILIKE $1 OR
                invoices.status ILIKE $1
            "#,
        )
        .bind(search_pattern(query))
        .fetch_one(&self.pool)
        .await?;
        Ok(page_count(total))
    }

    async fn fetch_invoice_by_id(&self, id: Uuid) -> Result<Option<Invoice>, RepositoryError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, customer_id::text AS customer_id, amount, status, date
            FROM invoices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invoice)
    }

    async fn fetch_customers(&self) -> Result<Vec<CustomerField>, RepositoryError> {
        let customers = sqlx::query_as::<_, CustomerField>(
            "SELECT id::text AS id, name FROM customers ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    /// fetch_card_data
    ///
    /// Compiles the overview counters. The three statements are independent, so they
    /// are issued concurrently on the pool.
    async fn fetch_card_data(&self) -> Result<CardData, RepositoryError> {
        let invoice_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool);
        let customer_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool);
        let totals = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'paid' THEN amount ELSE 0 END), 0)::bigint,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN amount ELSE 0 END), 0)::bigint
            FROM invoices
            "#,
        )
        .fetch_one(&self.pool);

        let (number_of_invoices, number_of_customers, (total_paid_invoices, total_pending_invoices)) =
            tokio::try_join!(invoice_count, customer_count, totals)?;

        Ok(CardData {
            number_of_invoices,
            number_of_customers,
            total_paid_invoices,
            total_pending_invoices,
        })
    }
}
