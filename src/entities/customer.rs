// Customer Entity
//
// Customers are owned by the client directory service. The credit service
// only ever sees a `CustomerSnapshot`, a read-only copy of the display fields
// taken at verification time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical customer record kept by the client directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub identity_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Body of a customer registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub identity_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewCustomer {
    /// Trim every field and lowercase the email.
    pub fn normalized(self) -> Self {
        Self {
            identity_number: self.identity_number.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: normalized_email(&self.email),
            phone: self.phone.as_deref().map(|p| p.trim().to_string()),
            address: self.address.as_deref().map(|a| a.trim().to_string()),
        }
    }
}

fn normalized_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Partial update. The identity number is immutable and absent here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl CustomerUpdate {
    /// Same normalization as registration, applied to the present fields.
    pub fn normalized(self) -> Self {
        let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string());
        Self {
            first_name: trimmed(self.first_name),
            last_name: trimmed(self.last_name),
            email: self.email.as_deref().map(normalized_email),
            phone: trimmed(self.phone),
            address: trimmed(self.address),
        }
    }

    /// Apply the present fields onto `customer`.
    pub fn apply_to(&self, customer: &mut Customer) {
        if let Some(first_name) = &self.first_name {
            customer.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            customer.last_name = last_name.clone();
        }
        if let Some(email) = &self.email {
            customer.email = email.clone();
        }
        if self.phone.is_some() {
            customer.phone = self.phone.clone();
        }
        if self.address.is_some() {
            customer.address = self.address.clone();
        }
    }
}

/// Display attributes copied out of a verified customer.
///
/// Deserializes straight from the directory's customer payload; fields the
/// snapshot does not need are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub id: i64,
    pub identity_number: String,
    pub first_name: String,
    pub last_name: String,
}

impl CustomerSnapshot {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
