// Entity Models
//
// Customers belong to the client directory; credit applications belong to
// the credit service. The two only meet through `CustomerSnapshot`.

pub mod credit;
pub mod customer;

pub use credit::{
    CreditAction, CreditApplication, CreditStatus, NewCreditApplication, RefusedTransition,
    Successor,
};
pub use customer::{Customer, CustomerSnapshot, CustomerUpdate, NewCustomer};
