// Credit Application Entity
//
// A credit application moves through a small, one-way state machine:
//
//   pending ──approve──► approved   (terminal)
//      │
//      ├──reject───────► rejected   (terminal)
//      └──delete───────► removed    (terminal)
//
// Every precondition check goes through `CreditAction::apply`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CREDIT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditStatus {
    Pending,
    Approved,
    Rejected,
}

impl CreditStatus {
    /// Storage and wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Pending => "pending",
            CreditStatus::Approved => "approved",
            CreditStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CreditStatus::Pending)
    }
}

impl fmt::Display for CreditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CreditStatus::Pending),
            "approved" => Ok(CreditStatus::Approved),
            "rejected" => Ok(CreditStatus::Rejected),
            other => Err(format!("unknown credit status '{}'", other)),
        }
    }
}

// ============================================================================
// TRANSITIONS
// ============================================================================

/// Something a caller asks to do with an existing application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditAction {
    Approve,
    Reject,
    Remove,
}

impl CreditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditAction::Approve => "approve",
            CreditAction::Reject => "reject",
            CreditAction::Remove => "remove",
        }
    }

    /// Transition function of the state machine.
    ///
    /// Returns the state the application ends up in, or the refused
    /// transition when `current` is terminal.
    pub fn apply(self, current: CreditStatus) -> Result<Successor, RefusedTransition> {
        match (current, self) {
            (CreditStatus::Pending, CreditAction::Approve) => {
                Ok(Successor::Status(CreditStatus::Approved))
            }
            (CreditStatus::Pending, CreditAction::Reject) => {
                Ok(Successor::Status(CreditStatus::Rejected))
            }
            (CreditStatus::Pending, CreditAction::Remove) => Ok(Successor::Removed),
            (current, action) => Err(RefusedTransition { current, action }),
        }
    }
}

/// Where an accepted transition leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Successor {
    Status(CreditStatus),
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefusedTransition {
    pub current: CreditStatus,
    pub action: CreditAction,
}

impl fmt::Display for RefusedTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            CreditAction::Remove => write!(
                f,
                "only pending applications may be removed (application is {})",
                self.current
            ),
            action => write!(
                f,
                "cannot {} an application that is already {}",
                action.as_str(),
                self.current
            ),
        }
    }
}

// ============================================================================
// CREDIT APPLICATION
// ============================================================================

/// Stored credit application.
///
/// `customer_id` points at a customer owned by the client directory. It was
/// confirmed to exist when the application was created and is never
/// re-checked afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    pub id: i64,
    pub customer_id: i64,
    pub requested_amount: Decimal,
    pub term_months: i64,
    pub interest_rate: Decimal,
    pub status: CreditStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values needed to persist a fresh application. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCreditApplication {
    pub customer_id: i64,
    pub requested_amount: Decimal,
    pub term_months: i64,
    pub interest_rate: Decimal,
    pub created_at: DateTime<Utc>,
}

impl NewCreditApplication {
    pub fn new(
        customer_id: i64,
        requested_amount: Decimal,
        term_months: i64,
        interest_rate: Decimal,
    ) -> Self {
        Self {
            customer_id,
            requested_amount,
            term_months,
            interest_rate,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_accepts_every_action() {
        assert_eq!(
            CreditAction::Approve.apply(CreditStatus::Pending),
            Ok(Successor::Status(CreditStatus::Approved))
        );
        assert_eq!(
            CreditAction::Reject.apply(CreditStatus::Pending),
            Ok(Successor::Status(CreditStatus::Rejected))
        );
        assert_eq!(
            CreditAction::Remove.apply(CreditStatus::Pending),
            Ok(Successor::Removed)
        );
    }

    #[test]
    fn test_terminal_states_refuse_everything() {
        for current in [CreditStatus::Approved, CreditStatus::Rejected] {
            assert!(current.is_terminal());
            for action in [CreditAction::Approve, CreditAction::Reject, CreditAction::Remove] {
                let refused = action.apply(current).unwrap_err();
                assert_eq!(refused.current, current);
                assert_eq!(refused.action, action);
            }
        }
    }

    #[test]
    fn test_refused_message_names_current_status() {
        let refused = CreditAction::Approve.apply(CreditStatus::Rejected).unwrap_err();
        assert_eq!(
            refused.to_string(),
            "cannot approve an application that is already rejected"
        );

        let refused = CreditAction::Remove.apply(CreditStatus::Approved).unwrap_err();
        assert!(refused.to_string().starts_with("only pending applications may be removed"));
    }

    #[test]
    fn test_status_round_trips_through_storage_text() {
        for status in [CreditStatus::Pending, CreditStatus::Approved, CreditStatus::Rejected] {
            assert_eq!(status.as_str().parse::<CreditStatus>(), Ok(status));
        }
        assert!("cancelled".parse::<CreditStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&CreditStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
    }
}
