use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Records (Mapped to Database) ---

/// Account
///
/// A dashboard login record from the `users` table. Seeded out of band and only ever
/// read by the credential verifier.
#[derive(Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    // Unique per account.
    pub email: String,
    // bcrypt hash; the column is named `password` in the seed schema.
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// InvoiceStatus
///
/// Closed set of invoice states. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown invoice status: {0:?}")]
pub struct UnknownStatus(pub String);

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// Lets `FromRow` decode the text column straight into the enum.
impl TryFrom<String> for InvoiceStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Invoice
///
/// A full invoice record from the `invoices` table. `amount` is in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: Uuid,
    pub customer_id: String,
    pub amount: i32,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    #[ts(type = "string")]
    pub date: NaiveDate,
}

/// NewInvoice
///
/// Fully derived insert payload produced by the create pipeline. The id and date are
/// assigned server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoice {
    pub id: Uuid,
    pub customer_id: String,
    pub amount_cents: i32,
    pub status: InvoiceStatus,
    pub date: NaiveDate,
}

/// InvoiceChanges
///
/// The mutable part of an invoice. Id and date never change after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceChanges {
    pub customer_id: String,
    pub amount_cents: i32,
    pub status: InvoiceStatus,
}

// --- Read Models (Dashboard) ---

/// InvoiceRow
///
/// One row of the invoice listing, joined with its customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub image_url: String,
    pub amount: i32,
    #[ts(type = "string")]
    pub date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
}

/// InvoicesPage
///
/// A single page of the filtered listing plus what the pagination UI needs. This is the
/// value held by the listing cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoicesPage {
    pub invoices: Vec<InvoiceRow>,
    pub query: String,
    pub current_page: u32,
    pub total_pages: u32,
}

/// CustomerField
///
/// Minimal customer projection used to fill the customer picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct CustomerField {
    pub id: String,
    pub name: String,
}

/// CardData
///
/// Dashboard overview counters. Totals are in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CardData {
    pub number_of_invoices: i64,
    pub number_of_customers: i64,
    pub total_paid_invoices: i64,
    pub total_pending_invoices: i64,
}

// --- Form Payloads (Input Schemas) ---

/// RawInvoiceForm
///
/// The untyped invoice form exactly as submitted. Every field is optional so a missing
/// field becomes a validation error instead of a decoding failure. Any `id` or `date`
/// sent by the client is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RawInvoiceForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Field name → ordered list of human-readable messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// FormState
///
/// What the invoice form gets back after a rejected submission: a top-level message,
/// the per-field errors and an echo of the submitted values for refilling the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FormState {
    pub message: Option<String>,
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<RawInvoiceForm>,
}

/// LoginForm
///
/// Credentials submitted by the login form. `redirectTo` carries the page the user was
/// headed to before the gate sent them to `/login`.
#[derive(Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// LoginPage
///
/// Data for rendering the login form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LoginPage {
    pub callback_url: String,
}

/// MessageResponse
///
/// Generic single-message body used for rejections and faults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
