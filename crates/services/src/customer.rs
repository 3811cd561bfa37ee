//! Customer directory: resolve-or-create by phone, field updates.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use hv_domain::Result;

/// A customer record.
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: i64,
    pub phone: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub address_line1: Option<String>,
    pub zip_code: Option<String>,
}

impl Customer {
    fn new(id: i64, phone: impl Into<String>) -> Self {
        Self {
            id,
            phone: phone.into(),
            first_name: None,
            last_name: None,
            email: None,
            address_line1: None,
            zip_code: None,
        }
    }
}

/// Partial update; only set fields are written.
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub address_line1: Option<String>,
    pub zip_code: Option<String>,
}

impl CustomerUpdate {
    /// Split a spoken full name into first/last.
    pub fn with_full_name(mut self, full_name: &str) -> Self {
        let mut parts = full_name.trim().splitn(2, char::is_whitespace);
        self.first_name = parts.next().map(str::to_owned);
        self.last_name = parts.next().map(|s| s.trim().to_owned());
        self
    }
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Resolve an existing customer by phone or create a new record.  Used
    /// on every inbound call.
    async fn get_or_create(&self, phone: &str) -> Result<Customer>;

    /// Apply a partial update.  Returns the updated record, or `None` for an
    /// unknown customer.
    async fn update(&self, customer_id: i64, update: CustomerUpdate) -> Result<Option<Customer>>;

    async fn get(&self, customer_id: i64) -> Result<Option<Customer>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct Directory {
    by_id: HashMap<i64, Customer>,
    by_phone: HashMap<String, i64>,
    next_id: i64,
}

#[derive(Default)]
pub struct InMemoryCustomers {
    directory: RwLock<Directory>,
}

impl InMemoryCustomers {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryCustomers {
    async fn get_or_create(&self, phone: &str) -> Result<Customer> {
        let mut directory = self.directory.write();
        if let Some(id) = directory.by_phone.get(phone) {
            if let Some(customer) = directory.by_id.get(id) {
                return Ok(customer.clone());
            }
        }

        directory.next_id += 1;
        let customer = Customer::new(directory.next_id, phone);
        directory.by_phone.insert(phone.to_owned(), customer.id);
        directory.by_id.insert(customer.id, customer.clone());
        tracing::info!(customer_id = customer.id, phone = %phone, "customer created");
        Ok(customer)
    }

    async fn update(&self, customer_id: i64, update: CustomerUpdate) -> Result<Option<Customer>> {
        let mut directory = self.directory.write();
        let Some(customer) = directory.by_id.get_mut(&customer_id) else {
            return Ok(None);
        };

        if let Some(v) = update.first_name {
            customer.first_name = Some(v);
        }
        if let Some(v) = update.last_name {
            customer.last_name = Some(v);
        }
        if let Some(v) = update.email {
            customer.email = Some(v);
        }
        if let Some(v) = update.address_line1 {
            customer.address_line1 = Some(v);
        }
        if let Some(v) = update.zip_code {
            customer.zip_code = Some(v);
        }
        Ok(Some(customer.clone()))
    }

    async fn get(&self, customer_id: i64) -> Result<Option<Customer>> {
        Ok(self.directory.read().by_id.get(&customer_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_or_create_is_stable_per_phone() {
        let customers = InMemoryCustomers::new();
        let a = customers.get_or_create("+15551234567").await.unwrap();
        let b = customers.get_or_create("+15551234567").await.unwrap();
        let c = customers.get_or_create("+15559999999").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(a.phone, "+15551234567");
    }

    #[tokio::test]
    async fn partial_update_leaves_other_fields() {
        let customers = InMemoryCustomers::new();
        let created = customers.get_or_create("+15551234567").await.unwrap();

        customers
            .update(
                created.id,
                CustomerUpdate::default().with_full_name("Jane Doe"),
            )
            .await
            .unwrap();
        let updated = customers
            .update(
                created.id,
                CustomerUpdate {
                    email: Some("jane@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .expect("customer exists");

        assert_eq!(updated.first_name.as_deref(), Some("Jane"));
        assert_eq!(updated.last_name.as_deref(), Some("Doe"));
        assert_eq!(updated.email.as_deref(), Some("jane@example.com"));

        assert!(customers
            .update(999, CustomerUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn single_word_name_has_no_last_name() {
        let update = CustomerUpdate::default().with_full_name("Cher");
        assert_eq!(update.first_name.as_deref(), Some("Cher"));
        assert_eq!(update.last_name, None);
    }
}
