//! Client directory: the service of record for customers.

use tracing::info;

use crate::db::CustomerStore;
use crate::entities::{Customer, CustomerUpdate, NewCustomer};
use crate::error::DirectoryError;

#[derive(Clone)]
pub struct CustomerDirectory {
    store: CustomerStore,
}

impl CustomerDirectory {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Customer>, DirectoryError> {
        Ok(self.store.list()?)
    }

    pub fn get(&self, id: i64) -> Result<Customer, DirectoryError> {
        self.store.get(id)?.ok_or(DirectoryError::NotFound(id))
    }

    /// Register a customer. Identity numbers are unique.
    pub fn register(&self, new: NewCustomer) -> Result<Customer, DirectoryError> {
        if self
            .store
            .find_by_identity_number(&new.identity_number)?
            .is_some()
        {
            return Err(DirectoryError::DuplicateIdentityNumber(new.identity_number));
        }

        // The UNIQUE constraint still catches a registration racing this one.
        let customer = self
            .store
            .insert(&new)?
            .ok_or_else(|| DirectoryError::DuplicateIdentityNumber(new.identity_number.clone()))?;

        info!(customer_id = customer.id, "customer registered");
        Ok(customer)
    }

    pub fn update(&self, id: i64, update: &CustomerUpdate) -> Result<Customer, DirectoryError> {
        let customer = self
            .store
            .update(id, update)?
            .ok_or(DirectoryError::NotFound(id))?;

        info!(customer_id = id, "customer updated");
        Ok(customer)
    }

    /// Remove a customer. Credit applications referencing it are not touched.
    pub fn remove(&self, id: i64) -> Result<(), DirectoryError> {
        if !self.store.delete(id)? {
            return Err(DirectoryError::NotFound(id));
        }
        info!(customer_id = id, "customer removed");
        Ok(())
    }
}
