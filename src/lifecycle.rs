//! Credit application lifecycle: creation gated by client verification, and
//! the one-way approve / reject / delete transitions.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::CreditStore;
use crate::entities::{
    CreditAction, CreditApplication, CustomerSnapshot, NewCreditApplication, RefusedTransition,
    Successor,
};
use crate::error::CreditError;
use crate::verification::{ClientVerifier, VerificationOutcome};

pub const MIN_AMOUNT: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(50_000_000, 0, 0, false, 0);
/// Amounts are held to currency scale (cents).
pub const AMOUNT_SCALE: u32 = 2;
pub const MIN_TERM_MONTHS: i64 = 6;
pub const MAX_TERM_MONTHS: i64 = 60;

/// Terms of a requested credit, as received from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditRequest {
    pub customer_id: i64,
    pub requested_amount: Decimal,
    pub term_months: i64,
    pub interest_rate: Decimal,
}

/// A freshly created application plus the customer it was verified against.
///
/// The snapshot is for display only; it is not stored with the application.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedCredit {
    pub credit: CreditApplication,
    pub customer: CustomerSnapshot,
}

/// Range checks applied at creation time.
pub fn validate_terms(requested_amount: Decimal, term_months: i64) -> Result<(), CreditError> {
    if requested_amount < MIN_AMOUNT
        || requested_amount > MAX_AMOUNT
        || requested_amount.normalize().scale() > AMOUNT_SCALE
    {
        return Err(CreditError::InvalidAmount(requested_amount));
    }
    if !(MIN_TERM_MONTHS..=MAX_TERM_MONTHS).contains(&term_months) {
        return Err(CreditError::InvalidTerm(term_months));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CreditLifecycle {
    store: CreditStore,
    verifier: Arc<dyn ClientVerifier>,
}

impl CreditLifecycle {
    pub fn new(store: CreditStore, verifier: Arc<dyn ClientVerifier>) -> Self {
        Self { store, verifier }
    }

    pub fn store(&self) -> &CreditStore {
        &self.store
    }

    /// Ask the directory about `customer_id`, folding the two failure
    /// outcomes into their distinct errors.
    pub async fn verify_customer(&self, customer_id: i64) -> Result<CustomerSnapshot, CreditError> {
        match self.verifier.verify(customer_id).await {
            VerificationOutcome::Found(snapshot) => Ok(snapshot),
            VerificationOutcome::NotFound => Err(CreditError::UnknownCustomer(customer_id)),
            VerificationOutcome::Unavailable { reason } => {
                Err(CreditError::DependencyUnavailable(reason))
            }
        }
    }

    /// Best-effort lookup used for display joins. Never fails.
    pub async fn lookup_customer(&self, customer_id: i64) -> Option<CustomerSnapshot> {
        match self.verifier.verify(customer_id).await {
            VerificationOutcome::Found(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// Create a pending application for a verified customer.
    ///
    /// Nothing is written unless verification returned `Found` and the
    /// amount and term are within range.
    pub async fn create(&self, request: CreditRequest) -> Result<CreatedCredit, CreditError> {
        let customer = self.verify_customer(request.customer_id).await?;
        validate_terms(request.requested_amount, request.term_months)?;

        let credit = self.store.insert(&NewCreditApplication::new(
            request.customer_id,
            request.requested_amount,
            request.term_months,
            request.interest_rate,
        ))?;

        info!(
            credit_id = credit.id,
            customer_id = credit.customer_id,
            amount = %credit.requested_amount,
            term_months = credit.term_months,
            "credit application created"
        );

        Ok(CreatedCredit { credit, customer })
    }

    pub fn get(&self, id: i64) -> Result<CreditApplication, CreditError> {
        self.store.get(id)?.ok_or(CreditError::NotFound(id))
    }

    pub fn list_all(&self) -> Result<Vec<CreditApplication>, CreditError> {
        Ok(self.store.list_all()?)
    }

    /// Applications of a customer, newest first.
    ///
    /// The caller is expected to have verified the customer already.
    pub fn list_by_customer(&self, customer_id: i64) -> Result<Vec<CreditApplication>, CreditError> {
        Ok(self.store.list_by_customer(customer_id)?)
    }

    pub fn approve(&self, id: i64) -> Result<CreditApplication, CreditError> {
        let credit = self.perform(id, CreditAction::Approve, None)?;
        info!(credit_id = id, "credit application approved");
        Ok(credit)
    }

    pub fn reject(&self, id: i64, reason: &str) -> Result<CreditApplication, CreditError> {
        if reason.trim().is_empty() {
            return Err(CreditError::MissingReason);
        }
        let credit = self.perform(id, CreditAction::Reject, Some(reason))?;
        info!(credit_id = id, "credit application rejected");
        Ok(credit)
    }

    pub fn delete(&self, id: i64) -> Result<(), CreditError> {
        self.perform(id, CreditAction::Remove, None)?;
        info!(credit_id = id, "credit application removed");
        Ok(())
    }

    /// Load, check the transition, then write conditionally on `pending`.
    ///
    /// Returns the record as it ended up; for a removal, the record as it
    /// was just before it was deleted.
    fn perform(
        &self,
        id: i64,
        action: CreditAction,
        rejection_reason: Option<&str>,
    ) -> Result<CreditApplication, CreditError> {
        let current = self.get(id)?;

        match action.apply(current.status)? {
            Successor::Status(next) => self
                .store
                .transition_if_pending(id, next, rejection_reason, Utc::now())?
                .ok_or_else(|| self.lost_race(id, action)),
            Successor::Removed => {
                if self.store.delete_if_pending(id)? {
                    Ok(current)
                } else {
                    Err(self.lost_race(id, action))
                }
            }
        }
    }

    /// The conditional write found no pending row: another request got
    /// there first. Re-read to report what it did.
    fn lost_race(&self, id: i64, action: CreditAction) -> CreditError {
        match self.store.get(id) {
            Ok(Some(credit)) => {
                warn!(
                    credit_id = id,
                    status = %credit.status,
                    action = action.as_str(),
                    "concurrent transition won"
                );
                RefusedTransition {
                    current: credit.status,
                    action,
                }
                .into()
            }
            Ok(None) => CreditError::NotFound(id),
            Err(e) => e.into(),
        }
    }
}
