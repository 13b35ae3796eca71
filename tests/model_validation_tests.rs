mod common;

use common::raw_form;
use invoice_dashboard::{
    models::{InvoiceStatus, RawInvoiceForm},
    validation::{
        AMOUNT_NOT_A_NUMBER, AMOUNT_NOT_POSITIVE, CUSTOMER_REQUIRED, FIELD_AMOUNT,
        FIELD_CUSTOMER_ID, FIELD_STATUS, STATUS_REQUIRED, credentials_well_formed,
        validate_invoice,
    },
};

#[test]
fn test_valid_form_is_coerced_to_cents() {
    let payload = validate_invoice(&raw_form("c1", "15.00", "paid")).unwrap();

    assert_eq!(payload.customer_id, "c1");
    assert_eq!(payload.amount_cents, 1500);
    assert_eq!(payload.status, InvoiceStatus::Paid);
}

#[test]
fn test_every_invalid_field_is_reported_together() {
    let errors = validate_invoice(&raw_form("", "0", "bad")).unwrap_err();

    assert_eq!(errors.len(), 3);
    assert_eq!(errors[FIELD_CUSTOMER_ID], vec![CUSTOMER_REQUIRED.to_string()]);
    assert_eq!(errors[FIELD_AMOUNT], vec![AMOUNT_NOT_POSITIVE.to_string()]);
    assert_eq!(errors[FIELD_STATUS], vec![STATUS_REQUIRED.to_string()]);
}

#[test]
fn test_missing_fields_are_validation_errors() {
    let errors = validate_invoice(&RawInvoiceForm::default()).unwrap_err();

    assert!(errors.contains_key(FIELD_CUSTOMER_ID));
    // A missing amount coerces to zero and fails positivity, not the type check.
    assert_eq!(errors[FIELD_AMOUNT], vec![AMOUNT_NOT_POSITIVE.to_string()]);
    assert!(errors.contains_key(FIELD_STATUS));
}

#[test]
fn test_non_numeric_amount_is_reported_against_amount() {
    for input in ["abc", "12,50", "NaN", "inf"] {
        let errors = validate_invoice(&raw_form("c1", input, "pending")).unwrap_err();
        assert_eq!(
            errors[FIELD_AMOUNT],
            vec![AMOUNT_NOT_A_NUMBER.to_string()],
            "input {input}"
        );
        assert_eq!(errors.len(), 1);
    }
}

#[test]
fn test_amount_must_be_strictly_positive() {
    for input in ["0", "0.00", "-5", "   "] {
        let errors = validate_invoice(&raw_form("c1", input, "pending")).unwrap_err();
        assert_eq!(errors[FIELD_AMOUNT], vec![AMOUNT_NOT_POSITIVE.to_string()], "input {input}");
    }
}

#[test]
fn test_status_is_a_closed_set() {
    assert!(validate_invoice(&raw_form("c1", "1", "pending")).is_ok());
    assert!(validate_invoice(&raw_form("c1", "1", "paid")).is_ok());

    for status in ["PAID", "overdue", ""] {
        let errors = validate_invoice(&raw_form("c1", "1", status)).unwrap_err();
        assert_eq!(errors[FIELD_STATUS], vec![STATUS_REQUIRED.to_string()], "status {status:?}");
    }
}

#[test]
fn test_blank_customer_is_rejected() {
    let errors = validate_invoice(&raw_form("   ", "1", "paid")).unwrap_err();
    assert_eq!(errors[FIELD_CUSTOMER_ID], vec![CUSTOMER_REQUIRED.to_string()]);
}

#[test]
fn test_form_decodes_camel_case_and_ignores_unknown_fields() {
    let raw: RawInvoiceForm = serde_json::from_value(serde_json::json!({
        "id": "00000000-0000-0000-0000-000000000001",
        "customerId": "c9",
        "amount": "7.25",
        "status": "pending",
        "date": "1999-01-01"
    }))
    .unwrap();

    let payload = validate_invoice(&raw).unwrap();
    assert_eq!(payload.customer_id, "c9");
    assert_eq!(payload.amount_cents, 725);
}

#[test]
fn test_login_shape_gate() {
    assert!(credentials_well_formed("user@nextmail.com", "123456"));
    assert!(!credentials_well_formed("user@nextmail.com", "12345"));
    assert!(!credentials_well_formed("not-an-email", "123456"));
    assert!(!credentials_well_formed("", ""));
}
