#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use invoice_dashboard::{
    AppState,
    auth::Principal,
    cache::{CacheState, InMemoryViewCache},
    config::{AppConfig, PersistenceFailurePolicy},
    models::{
        Account, CardData, CustomerField, Invoice, InvoiceChanges, InvoiceRow, InvoiceStatus,
        NewInvoice, RawInvoiceForm,
    },
    repository::{ITEMS_PER_PAGE, Repository, RepositoryError, RepositoryState, page_count},
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

pub const TEST_EMAIL: &str = "user@nextmail.com";
pub const TEST_PASSWORD: &str = "123456";

// --- MOCK REPOSITORY IMPLEMENTATION ---

/// In-memory stand-in for Postgres. Records every write it receives so tests can assert
/// on exactly what the pipeline persisted, and can be switched into a failing mode.
#[derive(Default)]
pub struct MockRepository {
    pub accounts: Vec<Account>,
    pub invoices: Mutex<BTreeMap<Uuid, Invoice>>,
    pub customers: Vec<CustomerField>,

    // Call journals
    pub email_lookups: Mutex<Vec<String>>,
    pub inserts: Mutex<Vec<NewInvoice>>,
    pub updates: Mutex<Vec<(Uuid, InvoiceChanges)>>,
    pub deletes: Mutex<Vec<Uuid>>,
    pub listing_reads: Mutex<u32>,

    // When set, every write fails as if the database were unreachable.
    pub fail_writes: bool,
}

impl MockRepository {
    pub fn with_account(email: &str, password: &str) -> Self {
        Self {
            accounts: vec![account(email, password)],
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn seed_invoice(&self, invoice: Invoice) {
        self.invoices.lock().unwrap().insert(invoice.id, invoice);
    }

    pub fn write_count(&self) -> usize {
        self.inserts.lock().unwrap().len()
            + self.updates.lock().unwrap().len()
            + self.deletes.lock().unwrap().len()
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn matching_rows(&self, query: &str) -> Vec<InvoiceRow> {
        let needle = query.to_lowercase();
        let mut rows: Vec<InvoiceRow> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|invoice| {
                needle.is_empty()
                    || invoice.customer_id.to_lowercase().contains(&needle)
                    || invoice.status.as_str().contains(&needle)
                    || invoice.amount.to_string().contains(&needle)
            })
            .map(|invoice| InvoiceRow {
                id: invoice.id,
                name: format!("Customer {}", invoice.customer_id),
                email: format!("{}@customers.test", invoice.customer_id),
                image_url: "/customers/placeholder.png".to_string(),
                amount: invoice.amount,
                date: invoice.date,
                status: invoice.status,
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        self.email_lookups.lock().unwrap().push(email.to_string());
        Ok(self.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn insert_invoice(&self, invoice: &NewInvoice) -> Result<Uuid, RepositoryError> {
        self.inserts.lock().unwrap().push(invoice.clone());
        self.check_writable()?;
        self.seed_invoice(Invoice {
            id: invoice.id,
            customer_id: invoice.customer_id.clone(),
            amount: invoice.amount_cents,
            status: invoice.status,
            date: invoice.date,
        });
        Ok(invoice.id)
    }

    async fn update_invoice(&self, id: Uuid, changes: &InvoiceChanges) -> Result<u64, RepositoryError> {
        self.updates.lock().unwrap().push((id, changes.clone()));
        self.check_writable()?;
        let mut invoices = self.invoices.lock().unwrap();
        match invoices.get_mut(&id) {
            Some(invoice) => {
                invoice.customer_id = changes.customer_id.clone();
                invoice.amount = changes.amount_cents;
                invoice.status = changes.status;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<u64, RepositoryError> {
        self.deletes.lock().unwrap().push(id);
        self.check_writable()?;
        Ok(u64::from(self.invoices.lock().unwrap().remove(&id).is_some()))
    }

    async fn fetch_filtered_invoices(&self, query: &str, page: u32) -> Result<Vec<InvoiceRow>, RepositoryError> {
        *self.listing_reads.lock().unwrap() += 1;
        let skip = (page.max(1) - 1) as usize * ITEMS_PER_PAGE as usize;
        Ok(self
            .matching_rows(query)
            .into_iter()
            .skip(skip)
            .take(ITEMS_PER_PAGE as usize)
            .collect())
    }

    async fn fetch_invoice_pages(&self, query: &str) -> Result<u32, RepositoryError> {
        Ok(page_count(self.matching_rows(query).len() as i64))
    }

    async fn fetch_invoice_by_id(&self, id: Uuid) -> Result<Option<Invoice>, RepositoryError> {
        Ok(self.invoices.lock().unwrap().get(&id).cloned())
    }

    async fn fetch_customers(&self) -> Result<Vec<CustomerField>, RepositoryError> {
        Ok(self.customers.clone())
    }

    async fn fetch_card_data(&self) -> Result<CardData, RepositoryError> {
        let invoices = self.invoices.lock().unwrap();
        let total = |status: InvoiceStatus| -> i64 {
            invoices
                .values()
                .filter(|invoice| invoice.status == status)
                .map(|invoice| i64::from(invoice.amount))
                .sum()
        };
        Ok(CardData {
            number_of_invoices: invoices.len() as i64,
            number_of_customers: self.customers.len() as i64,
            total_paid_invoices: total(InvoiceStatus::Paid),
            total_pending_invoices: total(InvoiceStatus::Pending),
        })
    }
}

// --- Fixtures ---

/// Account whose stored hash is a real (low-cost) bcrypt hash of `password`.
pub fn account(email: &str, password: &str) -> Account {
    Account {
        id: Uuid::new_v4(),
        name: "User".to_string(),
        email: email.to_string(),
        password_hash: bcrypt::hash(password, 4).unwrap(),
    }
}

pub fn principal() -> Principal {
    Principal {
        id: Uuid::from_u128(42),
        email: TEST_EMAIL.to_string(),
        name: "User".to_string(),
    }
}

pub fn raw_form(customer_id: &str, amount: &str, status: &str) -> RawInvoiceForm {
    RawInvoiceForm {
        customer_id: Some(customer_id.to_string()),
        amount: Some(amount.to_string()),
        status: Some(status.to_string()),
    }
}

pub fn invoice(customer_id: &str, amount: i32, status: InvoiceStatus) -> Invoice {
    Invoice {
        id: Uuid::new_v4(),
        customer_id: customer_id.to_string(),
        amount,
        status,
        date: fixed_today(),
    }
}

pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

pub fn config_with_policy(failure_policy: PersistenceFailurePolicy) -> AppConfig {
    AppConfig {
        failure_policy,
        ..AppConfig::default()
    }
}

/// Shared state over the given repository with a fresh, inspectable cache.
pub fn test_state(
    repo: Arc<MockRepository>,
    config: AppConfig,
) -> (AppState, Arc<InMemoryViewCache>) {
    let cache = Arc::new(InMemoryViewCache::new());
    let state = AppState::new(
        repo as RepositoryState,
        cache.clone() as CacheState,
        config,
    );
    (state, cache)
}
