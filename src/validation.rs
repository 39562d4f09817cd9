//! Input-shape checks run by the HTTP layer before any business logic.
//!
//! Each check returns a message naming the offending field. Business ranges
//! (amount, term) are not checked here; the lifecycle owns them.

use rust_decimal::Decimal;

use crate::entities::{CustomerUpdate, NewCustomer};

pub type FieldResult = Result<(), String>;

pub const MIN_REASON_LEN: usize = 10;
pub const MAX_REASON_LEN: usize = 500;

pub fn positive_id(field: &str, id: i64) -> FieldResult {
    if id < 1 {
        return Err(format!("{} must be a positive integer", field));
    }
    Ok(())
}

pub const RATE_SCALE: u32 = 2;

pub fn interest_rate(rate: Decimal) -> FieldResult {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err("interest_rate must be between 0 and 100".to_string());
    }
    if rate.normalize().scale() > RATE_SCALE {
        return Err(format!(
            "interest_rate may have at most {} decimal places",
            RATE_SCALE
        ));
    }
    Ok(())
}

/// Empty reasons pass through so the lifecycle reports them as missing.
pub fn rejection_reason(reason: &str) -> FieldResult {
    let len = reason.trim().chars().count();
    if len == 0 {
        return Ok(());
    }
    if !(MIN_REASON_LEN..=MAX_REASON_LEN).contains(&len) {
        return Err(format!(
            "reason must be between {} and {} characters",
            MIN_REASON_LEN, MAX_REASON_LEN
        ));
    }
    Ok(())
}

fn identity_number(value: &str) -> FieldResult {
    let value = value.trim();
    if !(6..=15).contains(&value.len()) || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err("identity_number must be 6 to 15 digits".to_string());
    }
    Ok(())
}

fn person_name(field: &str, value: &str) -> FieldResult {
    let value = value.trim();
    let len = value.chars().count();
    if !(2..=50).contains(&len) {
        return Err(format!("{} must be between 2 and 50 characters", field));
    }
    if !value.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(format!("{} may only contain letters", field));
    }
    Ok(())
}

fn email(value: &str) -> FieldResult {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err("email must be a valid email address".to_string());
    }
    Ok(())
}

fn phone(value: &str) -> FieldResult {
    let value = value.trim();
    if !(7..=15).contains(&value.len()) || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err("phone must be 7 to 15 digits".to_string());
    }
    Ok(())
}

fn address(value: &str) -> FieldResult {
    if value.trim().chars().count() > 200 {
        return Err("address may not exceed 200 characters".to_string());
    }
    Ok(())
}

/// Check a registration, collecting every failing field.
pub fn new_customer(customer: &NewCustomer) -> Result<(), Vec<String>> {
    let mut checks = vec![
        identity_number(&customer.identity_number),
        person_name("first_name", &customer.first_name),
        person_name("last_name", &customer.last_name),
        email(&customer.email),
    ];
    if let Some(value) = &customer.phone {
        checks.push(phone(value));
    }
    if let Some(value) = &customer.address {
        checks.push(address(value));
    }
    collect(checks)
}

pub fn customer_update(update: &CustomerUpdate) -> Result<(), Vec<String>> {
    let mut checks = Vec::new();
    if let Some(value) = &update.first_name {
        checks.push(person_name("first_name", value));
    }
    if let Some(value) = &update.last_name {
        checks.push(person_name("last_name", value));
    }
    if let Some(value) = &update.email {
        checks.push(email(value));
    }
    if let Some(value) = &update.phone {
        checks.push(phone(value));
    }
    if let Some(value) = &update.address {
        checks.push(address(value));
    }
    collect(checks)
}

fn collect(checks: Vec<FieldResult>) -> Result<(), Vec<String>> {
    let errors: Vec<String> = checks.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
