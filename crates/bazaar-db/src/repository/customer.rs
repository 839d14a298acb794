//! # Customer Repository
//!
//! The shop's customer ledger.
//!
//! `balance` is what the customer owes: debt sales add to it, paying a
//! pending invoice subtracts from it. It may go negative (credit).

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use bazaar_core::validation::{validate_customer_name, validate_email, validate_phone};
use bazaar_core::{
    CoreError, Customer, CustomerRef, CustomerStatement, InvoiceFilter, InvoiceStatus, Money,
    NewCustomer, ValidationError,
};

use super::{clean, new_id};
use crate::error::DbResult;
use crate::scope::ShopScope;

const CUSTOMER_COLUMNS: &str = "id, shop_id, name, phone, email, notes, balance, created_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    scope: ShopScope,
}

impl CustomerRepository {
    pub(crate) fn new(scope: ShopScope) -> Self {
        CustomerRepository { scope }
    }

    /// Gets a customer by ID.
    ///
    /// ## Errors
    /// * `CustomerNotFound` - missing, or owned by another shop
    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        let mut conn = self.scope.pool().acquire().await?;
        fetch_customer(&mut conn, self.scope.shop_id(), id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()).into())
    }

    /// Lists the shop's customers by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE shop_id = ? ORDER BY name, id");
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(self.scope.shop_id())
            .fetch_all(self.scope.pool())
            .await?;

        Ok(customers)
    }

    /// Finds a customer by phone number.
    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.scope.pool().acquire().await?;
        fetch_by_phone(&mut conn, self.scope.shop_id(), phone.trim()).await
    }

    /// Adds a customer with a zero balance.
    pub async fn create(&self, input: &NewCustomer) -> DbResult<Customer> {
        validate_customer(input)?;

        let mut tx = self.scope.pool().begin().await?;
        if let Some(phone) = clean(&input.phone) {
            if fetch_by_phone(&mut tx, self.scope.shop_id(), &phone).await?.is_some() {
                return Err(ValidationError::Duplicate {
                    field: "phone".to_string(),
                    value: phone,
                }
                .into());
            }
        }
        let customer = insert_customer(&mut tx, self.scope.shop_id(), input).await?;
        tx.commit().await?;

        Ok(customer)
    }

    /// Replaces a customer's contact details. The balance is untouched.
    pub async fn update(&self, id: &str, input: &NewCustomer) -> DbResult<Customer> {
        validate_customer(input)?;

        let result = sqlx::query(
            "UPDATE customers SET name = ?, phone = ?, email = ?, notes = ? WHERE id = ? AND shop_id = ?",
        )
        .bind(input.name.trim())
        .bind(clean(&input.phone))
        .bind(clean(&input.email))
        .bind(clean(&input.notes))
        .bind(id)
        .bind(self.scope.shop_id())
        .execute(self.scope.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(id.to_string()).into());
        }

        info!(shop_id = %self.scope.shop_id(), customer_id = %id, "Customer updated");
        self.get(id).await
    }

    /// Deletes a customer.
    ///
    /// A customer who still owes money (or holds credit) cannot be deleted.
    /// Their past invoices keep the captured name and phone. Requires the
    /// owner role.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        self.scope.require_manager("deleting customers")?;

        let mut tx = self.scope.pool().begin().await?;
        let customer = fetch_customer(&mut tx, self.scope.shop_id(), id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()))?;

        if !customer.balance.is_zero() {
            return Err(ValidationError::InvalidFormat {
                field: "balance".to_string(),
                reason: format!(
                    "customer {} has an outstanding balance of {}",
                    customer.id, customer.balance
                ),
            }
            .into());
        }

        sqlx::query("DELETE FROM customers WHERE id = ? AND shop_id = ?")
            .bind(id)
            .bind(self.scope.shop_id())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(shop_id = %self.scope.shop_id(), customer_id = %id, "Customer deleted");
        Ok(())
    }

    /// The customer with their invoices (newest first) and what they owe on
    /// pending invoices.
    pub async fn statement(&self, id: &str) -> DbResult<CustomerStatement> {
        let customer = self.get(id).await?;

        let invoices = self
            .scope
            .invoices()
            .list_invoices(&InvoiceFilter {
                customer_id: Some(customer.id.clone()),
                ..InvoiceFilter::default()
            })
            .await?;

        let pending_total = invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Pending)
            .map(|i| i.total_amount)
            .sum();

        Ok(CustomerStatement {
            customer,
            invoices,
            pending_total,
        })
    }
}

fn validate_customer(input: &NewCustomer) -> DbResult<()> {
    validate_customer_name(&input.name)?;
    validate_phone(input.phone.as_deref())?;
    validate_email(input.email.as_deref())?;
    Ok(())
}

// =============================================================================
// Transaction Helpers
// =============================================================================

pub(crate) async fn fetch_customer(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ? AND shop_id = ?");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

async fn fetch_by_phone(
    conn: &mut SqliteConnection,
    shop_id: &str,
    phone: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE shop_id = ? AND phone = ? ORDER BY created_at LIMIT 1"
    );
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(shop_id)
        .bind(phone)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(customer)
}

async fn insert_customer(
    conn: &mut SqliteConnection,
    shop_id: &str,
    input: &NewCustomer,
) -> DbResult<Customer> {
    let customer = Customer {
        id: new_id(),
        shop_id: shop_id.to_string(),
        name: input.name.trim().to_string(),
        phone: clean(&input.phone),
        email: clean(&input.email),
        notes: clean(&input.notes),
        balance: Money::zero(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO customers (id, shop_id, name, phone, email, notes, balance, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.shop_id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(&customer.notes)
    .bind(customer.balance)
    .bind(customer.created_at)
    .execute(&mut *conn)
    .await?;

    info!(shop_id = %shop_id, customer_id = %customer.id, "Customer created");
    Ok(customer)
}

/// Resolves a checkout's customer reference.
///
/// ## Resolution
/// - `Existing { id }` → that customer of this shop, else `CustomerNotFound`
/// - `New(descriptor)` with a phone already known to the shop → reused
/// - `New(descriptor)` otherwise → created with a zero balance
pub(crate) async fn resolve_customer(
    conn: &mut SqliteConnection,
    shop_id: &str,
    customer: &CustomerRef,
) -> DbResult<Customer> {
    match customer {
        CustomerRef::Existing { id } => fetch_customer(conn, shop_id, id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(id.clone()).into()),

        CustomerRef::New(input) => {
            validate_customer(input)?;

            if let Some(phone) = clean(&input.phone) {
                if let Some(existing) = fetch_by_phone(conn, shop_id, &phone).await? {
                    debug!(customer_id = %existing.id, "Reusing customer by phone");
                    return Ok(existing);
                }
            }

            insert_customer(conn, shop_id, input).await
        }
    }
}

/// Adds `delta` to a customer's balance and returns the new balance.
///
/// Returns `None` when the customer no longer exists.
pub(crate) async fn adjust_balance(
    conn: &mut SqliteConnection,
    shop_id: &str,
    customer_id: &str,
    delta: Money,
) -> DbResult<Option<Money>> {
    let current: Option<Money> =
        sqlx::query_scalar("SELECT balance FROM customers WHERE id = ? AND shop_id = ?")
            .bind(customer_id)
            .bind(shop_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(current) = current else {
        warn!(customer_id = %customer_id, "Balance adjustment for missing customer skipped");
        return Ok(None);
    };

    let balance = current + delta;

    // Guarded on the value read so a concurrent writer cannot be overwritten.
    let result = sqlx::query(
        "UPDATE customers SET balance = ? WHERE id = ? AND shop_id = ? AND balance = ?",
    )
    .bind(balance)
    .bind(customer_id)
    .bind(shop_id)
    .bind(current)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict("customer", customer_id).into());
    }

    debug!(customer_id = %customer_id, delta = %delta, balance = %balance, "Balance adjusted");
    Ok(Some(balance))
}
