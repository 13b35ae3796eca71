//! Invoice form schema and credential shape checks.
//!
//! Validation is total: it never panics or errors out on malformed input, it always
//! yields either the typed payload or the complete set of field errors.

use crate::models::{FieldErrors, InvoiceStatus, RawInvoiceForm};

pub const FIELD_CUSTOMER_ID: &str = "customerId";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_STATUS: &str = "status";

/// Top-level message attached to every rejected invoice submission.
pub const FORM_INVALID_MESSAGE: &str = "Form validation failed.";

pub const CUSTOMER_REQUIRED: &str = "Please select a customer.";
pub const AMOUNT_NOT_POSITIVE: &str = "Amount must be greater than 0.";
pub const AMOUNT_NOT_A_NUMBER: &str = "Amount must be a number.";
pub const AMOUNT_TOO_LARGE: &str = "Amount is too large.";
pub const STATUS_REQUIRED: &str = "Please select an invoice status.";

/// Minimum password length accepted by the login form.
pub const MIN_PASSWORD_LEN: usize = 6;

/// InvoicePayload
///
/// A submission that passed the schema. `amount_cents` is already in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePayload {
    pub customer_id: String,
    pub amount_cents: i32,
    pub status: InvoiceStatus,
}

/// validate_invoice
///
/// Checks every field of the raw form and reports all violations together.
pub fn validate_invoice(raw: &RawInvoiceForm) -> Result<InvoicePayload, FieldErrors> {
    let mut errors = FieldErrors::new();

    let customer_id = match raw.customer_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => {
            push_error(&mut errors, FIELD_CUSTOMER_ID, CUSTOMER_REQUIRED);
            None
        }
    };

    let amount_cents = match coerce_amount(raw.amount.as_deref()) {
        Ok(cents) => Some(cents),
        Err(message) => {
            push_error(&mut errors, FIELD_AMOUNT, message);
            None
        }
    };

    let status = match raw.status.as_deref().map(str::parse::<InvoiceStatus>) {
        Some(Ok(status)) => Some(status),
        _ => {
            push_error(&mut errors, FIELD_STATUS, STATUS_REQUIRED);
            None
        }
    };

    match (customer_id, amount_cents, status) {
        (Some(customer_id), Some(amount_cents), Some(status)) if errors.is_empty() => {
            Ok(InvoicePayload {
                customer_id,
                amount_cents,
                status,
            })
        }
        _ => Err(errors),
    }
}

/// coerce_amount
///
/// Turns the submitted amount (major units, e.g. `"20.50"`) into cents. A missing or
/// blank amount coerces to zero and so fails the positivity rule.
fn coerce_amount(raw: Option<&str>) -> Result<i32, &'static str> {
    let text = raw.map(str::trim).unwrap_or_default();
    let amount = if text.is_empty() {
        0.0
    } else {
        text.parse::<f64>().map_err(|_| AMOUNT_NOT_A_NUMBER)?
    };

    if !amount.is_finite() {
        return Err(AMOUNT_NOT_A_NUMBER);
    }
    if amount <= 0.0 {
        return Err(AMOUNT_NOT_POSITIVE);
    }

    let cents = (amount * 100.0).round();
    if cents < 1.0 {
        return Err(AMOUNT_NOT_POSITIVE);
    }
    if cents > f64::from(i32::MAX) {
        return Err(AMOUNT_TOO_LARGE);
    }
    // In range and integral after the checks above.
    Ok(cents as i32)
}

fn push_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

/// is_valid_email
///
/// Structural email check: one `@`, a non-empty local part and a dotted domain with no
/// empty labels. No whitespace anywhere.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// credentials_well_formed
///
/// Shape gate run before any account lookup.
pub fn credentials_well_formed(email: &str, password: &str) -> bool {
    is_valid_email(email) && password.chars().count() >= MIN_PASSWORD_LEN
}
