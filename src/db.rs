use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::entities::{
    CreditApplication, CreditStatus, Customer, CustomerUpdate, NewCreditApplication, NewCustomer,
};
use crate::error::StoreError;

// ============================================================================
// CONNECTION HANDLE
// ============================================================================

/// How long a statement waits on a locked database file before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Owned handle to one SQLite database.
///
/// Each service opens its own database and hands the handle to its store.
/// Callers never touch the connection directly: every store operation
/// borrows it through `with_conn`, and the lock is released when that
/// scope ends, whichever way it ends.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // Enable WAL mode for crash recovery
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&guard)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_credit_database(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS credits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL,
            requested_amount TEXT NOT NULL,
            term_months INTEGER NOT NULL,
            interest_rate TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected')),
            rejection_reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_credits_customer ON credits(customer_id)",
        [],
    )?;

    Ok(())
}

pub fn setup_customer_database(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            identity_number TEXT UNIQUE NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            address TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// COLUMN HELPERS
// ============================================================================

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Read a TEXT column and parse it, reporting failures as conversion errors.
fn parsed_column<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> rusqlite::Result<T>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let text: String = row.get(idx)?;
    parse(&text).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parsed_column(row, idx, |s| {
        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
    })
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    parsed_column(row, idx, |s| s.parse::<Decimal>())
}

// ============================================================================
// CREDIT RECORD STORE
// ============================================================================

const CREDIT_COLUMNS: &str = "id, customer_id, requested_amount, term_months, interest_rate,
     status, rejection_reason, created_at, updated_at";

fn credit_from_row(row: &Row<'_>) -> rusqlite::Result<CreditApplication> {
    Ok(CreditApplication {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        requested_amount: decimal_column(row, 2)?,
        term_months: row.get(3)?,
        interest_rate: decimal_column(row, 4)?,
        status: parsed_column(row, 5, |s| s.parse::<CreditStatus>())?,
        rejection_reason: row.get(6)?,
        created_at: datetime_column(row, 7)?,
        updated_at: datetime_column(row, 8)?,
    })
}

fn fetch_credit(conn: &Connection, id: i64) -> Result<Option<CreditApplication>, StoreError> {
    let credit = conn
        .query_row(
            &format!("SELECT {} FROM credits WHERE id = ?1", CREDIT_COLUMNS),
            [id],
            credit_from_row,
        )
        .optional()?;
    Ok(credit)
}

/// Persistence for credit applications.
#[derive(Clone)]
pub struct CreditStore {
    db: Database,
}

impl CreditStore {
    /// Wrap `db`, creating the schema when it is missing.
    pub fn new(db: Database) -> Result<Self, StoreError> {
        db.with_conn(setup_credit_database)?;
        Ok(Self { db })
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::new(Database::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::new(Database::open_in_memory()?)
    }

    /// Insert a new application in the pending state.
    pub fn insert(&self, new: &NewCreditApplication) -> Result<CreditApplication, StoreError> {
        self.db.with_conn(|conn| {
            let created_at = timestamp(&new.created_at);
            conn.execute(
                "INSERT INTO credits (
                    customer_id, requested_amount, term_months, interest_rate,
                    status, rejection_reason, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?6)",
                params![
                    new.customer_id,
                    new.requested_amount.to_string(),
                    new.term_months,
                    new.interest_rate.to_string(),
                    CreditStatus::Pending.as_str(),
                    created_at,
                ],
            )?;

            let id = conn.last_insert_rowid();
            fetch_credit(conn, id)?.ok_or(StoreError::Corrupt {
                table: "credits",
                detail: format!("row {} vanished after insert", id),
            })
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<CreditApplication>, StoreError> {
        self.db.with_conn(|conn| fetch_credit(conn, id))
    }

    /// All applications, newest first.
    pub fn list_all(&self) -> Result<Vec<CreditApplication>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM credits ORDER BY created_at DESC, id DESC",
                CREDIT_COLUMNS
            ))?;
            let credits = stmt
                .query_map([], credit_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(credits)
        })
    }

    /// Applications of one customer, newest first.
    pub fn list_by_customer(&self, customer_id: i64) -> Result<Vec<CreditApplication>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM credits WHERE customer_id = ?1 ORDER BY created_at DESC, id DESC",
                CREDIT_COLUMNS
            ))?;
            let credits = stmt
                .query_map([customer_id], credit_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(credits)
        })
    }

    /// Move a pending application to `status`.
    ///
    /// Single conditional UPDATE: of two racing transitions only one can
    /// match `status = 'pending'`. Returns `None` when no pending row with
    /// this id exists any more.
    pub fn transition_if_pending(
        &self,
        id: i64,
        status: CreditStatus,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<CreditApplication>, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE credits
                 SET status = ?1, rejection_reason = ?2, updated_at = ?3
                 WHERE id = ?4 AND status = 'pending'",
                params![status.as_str(), rejection_reason, timestamp(&now), id],
            )?;

            if changed == 0 {
                return Ok(None);
            }
            fetch_credit(conn, id)
        })
    }

    /// Delete a pending application. Returns false when nothing was removed.
    pub fn delete_if_pending(&self, id: i64) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM credits WHERE id = ?1 AND status = 'pending'",
                [id],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM credits", [], |row| row.get(0))?;
            Ok(count)
        })
    }
}

// ============================================================================
// CUSTOMER STORE (client directory)
// ============================================================================

const CUSTOMER_COLUMNS: &str = "id, identity_number, first_name, last_name, email, phone,
     address, created_at, updated_at";

fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        identity_number: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        address: row.get(6)?,
        created_at: datetime_column(row, 7)?,
        updated_at: datetime_column(row, 8)?,
    })
}

fn fetch_customer(conn: &Connection, id: i64) -> Result<Option<Customer>, StoreError> {
    let customer = conn
        .query_row(
            &format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS),
            [id],
            customer_from_row,
        )
        .optional()?;
    Ok(customer)
}

/// Persistence for the client directory's customers.
#[derive(Clone)]
pub struct CustomerStore {
    db: Database,
}

impl CustomerStore {
    pub fn new(db: Database) -> Result<Self, StoreError> {
        db.with_conn(setup_customer_database)?;
        Ok(Self { db })
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::new(Database::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::new(Database::open_in_memory()?)
    }

    /// Insert a customer. Returns `None` when the identity number is taken;
    /// any other constraint failure is an error.
    pub fn insert(&self, new: &NewCustomer) -> Result<Option<Customer>, StoreError> {
        self.db.with_conn(|conn| {
            let now = timestamp(&Utc::now());
            let result = conn.execute(
                "INSERT INTO customers (
                    identity_number, first_name, last_name, email, phone, address,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    new.identity_number,
                    new.first_name,
                    new.last_name,
                    new.email,
                    new.phone,
                    new.address,
                    now,
                ],
            );

            match result {
                Ok(_) => fetch_customer(conn, conn.last_insert_rowid()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<Customer>, StoreError> {
        self.db.with_conn(|conn| fetch_customer(conn, id))
    }

    pub fn find_by_identity_number(
        &self,
        identity_number: &str,
    ) -> Result<Option<Customer>, StoreError> {
        self.db.with_conn(|conn| {
            let customer = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM customers WHERE identity_number = ?1",
                        CUSTOMER_COLUMNS
                    ),
                    [identity_number],
                    customer_from_row,
                )
                .optional()?;
            Ok(customer)
        })
    }

    /// All customers, most recently registered first.
    pub fn list(&self) -> Result<Vec<Customer>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM customers ORDER BY id DESC",
                CUSTOMER_COLUMNS
            ))?;
            let customers = stmt
                .query_map([], customer_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(customers)
        })
    }

    /// Apply `update` to an existing customer. Returns `None` when absent.
    pub fn update(&self, id: i64, update: &CustomerUpdate) -> Result<Option<Customer>, StoreError> {
        self.db.with_conn(|conn| {
            let Some(mut customer) = fetch_customer(conn, id)? else {
                return Ok(None);
            };
            update.apply_to(&mut customer);

            conn.execute(
                "UPDATE customers
                 SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4,
                     address = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    customer.first_name,
                    customer.last_name,
                    customer.email,
                    customer.phone,
                    customer.address,
                    timestamp(&Utc::now()),
                    id,
                ],
            )?;
            fetch_customer(conn, id)
        })
    }

    /// Returns false when no customer had this id.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM customers WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }
}
