//! Invoice mutation pipeline: validate → derive → persist → invalidate → redirect.

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::Principal,
    cache::CacheState,
    config::PersistenceFailurePolicy,
    models::{FieldErrors, FormState, InvoiceChanges, NewInvoice, RawInvoiceForm},
    repository::{RepositoryError, RepositoryState},
    validation::{FORM_INVALID_MESSAGE, validate_invoice},
};

/// Route of the invoice listing; the cache key prefix and the post-mutation redirect.
pub const LISTING_PATH: &str = "/dashboard/invoices";

pub const CREATE_FAILED: &str = "Database error: failed to create invoice.";
pub const UPDATE_FAILED: &str = "Database error: failed to update invoice.";
pub const DELETE_FAILED: &str = "Database error: failed to delete invoice.";

/// MutationOutcome
///
/// Result of a create/update submission that did not hit a persistence fault.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The write went through (or was attempted under the redirect policy); navigate here.
    Redirect(&'static str),
    /// The form was rejected; nothing was written.
    Rejected(FormState),
}

/// PersistenceFailure
///
/// A write reached the store and failed. `message` is safe to show to the user; the
/// underlying fault is kept as the error source for logging.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PersistenceFailure {
    pub message: &'static str,
    #[source]
    pub source: RepositoryError,
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// InvoicePipeline
///
/// Orchestrates the three invoice mutations over an injected repository and cache.
#[derive(Clone)]
pub struct InvoicePipeline {
    repo: RepositoryState,
    cache: CacheState,
    policy: PersistenceFailurePolicy,
    today: fn() -> NaiveDate,
}

impl InvoicePipeline {
    pub fn new(repo: RepositoryState, cache: CacheState, policy: PersistenceFailurePolicy) -> Self {
        Self {
            repo,
            cache,
            policy,
            today: utc_today,
        }
    }

    /// Replaces the calendar used to stamp new invoices.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// create
    ///
    /// Validates the submission, stamps a fresh id and today's UTC date, inserts, then
    /// invalidates the listing and redirects to it.
    pub async fn create(
        &self,
        principal: &Principal,
        raw: RawInvoiceForm,
    ) -> Result<MutationOutcome, PersistenceFailure> {
        let payload = match validate_invoice(&raw) {
            Ok(payload) => payload,
            Err(errors) => return Ok(rejected(errors, raw)),
        };

        let invoice = NewInvoice {
            id: Uuid::new_v4(),
            customer_id: payload.customer_id,
            amount_cents: payload.amount_cents,
            status: payload.status,
            date: (self.today)(),
        };

        match self.repo.insert_invoice(&invoice).await {
            Ok(id) => {
                tracing::info!(account_id = %principal.id, invoice_id = %id, "invoice created");
            }
            Err(source) => {
                tracing::error!(account_id = %principal.id, error = %source, "invoice insert failed");
                self.on_write_failure(CREATE_FAILED, source)?;
            }
        }

        Ok(self.finish().await)
    }

    /// update
    ///
    /// Same schema as create. The target id comes from the route only; date and id are
    /// never touched.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        raw: RawInvoiceForm,
    ) -> Result<MutationOutcome, PersistenceFailure> {
        let payload = match validate_invoice(&raw) {
            Ok(payload) => payload,
            Err(errors) => return Ok(rejected(errors, raw)),
        };

        let changes = InvoiceChanges {
            customer_id: payload.customer_id,
            amount_cents: payload.amount_cents,
            status: payload.status,
        };

        match self.repo.update_invoice(id, &changes).await {
            Ok(0) => {
                tracing::warn!(account_id = %principal.id, invoice_id = %id, "update matched no invoice");
            }
            Ok(_) => {
                tracing::info!(account_id = %principal.id, invoice_id = %id, "invoice updated");
            }
            Err(source) => {
                tracing::error!(account_id = %principal.id, invoice_id = %id, error = %source, "invoice update failed");
                self.on_write_failure(UPDATE_FAILED, source)?;
            }
        }

        Ok(self.finish().await)
    }

    /// delete
    ///
    /// Deleting an id that is already gone is not an error. Failures always surface.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), PersistenceFailure> {
        let rows = self.repo.delete_invoice(id).await.map_err(|source| {
            tracing::error!(account_id = %principal.id, invoice_id = %id, error = %source, "invoice delete failed");
            PersistenceFailure {
                message: DELETE_FAILED,
                source,
            }
        })?;

        tracing::info!(account_id = %principal.id, invoice_id = %id, rows, "invoice delete issued");
        self.cache.invalidate(LISTING_PATH).await;
        Ok(())
    }

    /// Applies the configured policy to a failed create/update write.
    fn on_write_failure(
        &self,
        message: &'static str,
        source: RepositoryError,
    ) -> Result<(), PersistenceFailure> {
        match self.policy {
            PersistenceFailurePolicy::Surface => Err(PersistenceFailure { message, source }),
            PersistenceFailurePolicy::Redirect => Ok(()),
        }
    }

    async fn finish(&self) -> MutationOutcome {
        self.cache.invalidate(LISTING_PATH).await;
        MutationOutcome::Redirect(LISTING_PATH)
    }
}

fn rejected(errors: FieldErrors, raw: RawInvoiceForm) -> MutationOutcome {
    tracing::debug!(fields = ?errors.keys().collect::<Vec<_>>(), "invoice form rejected");
    MutationOutcome::Rejected(FormState {
        message: Some(FORM_INVALID_MESSAGE.to_string()),
        errors,
        values: Some(raw),
    })
}
