//! # Invoice Repository
//!
//! Checkout and the invoice lifecycle.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_invoice(request)                              │
//! │                                                                         │
//! │  validate request shape ─── EmptyCart / Validation                     │
//! │       │                                                                 │
//! │  BEGIN ───────────────────────────────────────────────────────────┐    │
//! │  │  load cart products (this shop only) ─── ProductNotFound        │    │
//! │  │  price_cart: summed demand vs stock ─── InsufficientStock       │    │
//! │  │  resolve customer (id / phone / new) ─── CustomerNotFound       │    │
//! │  │  UPDATE stock ... WHERE stock >= qty ─── ConcurrencyConflict    │    │
//! │  │  INSERT invoice + items (snapshots)                              │    │
//! │  │  debt: customer.balance += total                                 │    │
//! │  COMMIT ──────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  Any error rolls back every write. A conflict is retried once.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Balance Effects
//! ```text
//!   create (debt)          +total      pending
//!   pay                    -total      pending → paid
//!   refund (was pending)   -total      pending → refunded
//!   refund (was paid)       0          paid    → refunded
//! ```
//! Stock is restored on refund for lines whose product still exists.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use bazaar_core::checkout::{price_cart, CheckoutRequest};
use bazaar_core::{
    CoreError, Invoice, InvoiceDetail, InvoiceFilter, InvoiceItem, InvoiceStatus,
    TransitionOutcome,
};

use super::customer::{adjust_balance, resolve_customer};
use super::new_id;
use super::product::{fetch_product, return_stock, take_stock};
use crate::error::DbResult;
use crate::scope::ShopScope;

const INVOICE_COLUMNS: &str = "id, shop_id, created_at, total_amount, status, payment_method, \
     customer_id, customer_name, customer_phone, notes";

const ITEM_COLUMNS: &str =
    "id, invoice_id, product_id, product_name, quantity, price, tax_rate, line_total";

/// Repository for invoice database operations.
///
/// ## Usage
/// ```rust,ignore
/// let invoices = scope.invoices();
///
/// let detail = invoices.create_invoice(&request).await?;
/// invoices.pay_invoice(&detail.invoice.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    scope: ShopScope,
}

impl InvoiceRepository {
    pub(crate) fn new(scope: ShopScope) -> Self {
        InvoiceRepository { scope }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turns a cart into a persisted invoice.
    ///
    /// ## Errors
    /// * `EmptyCart`, `Validation` - bad request, nothing touched
    /// * `ProductNotFound` - any line names a product outside this shop
    /// * `InsufficientStock` - summed quantity exceeds stock for a product
    /// * `CustomerNotFound` - `CustomerRef::Existing` outside this shop
    /// * `ConcurrencyConflict` / `Busy` - lost a race twice in a row
    pub async fn create_invoice(&self, request: &CheckoutRequest) -> DbResult<InvoiceDetail> {
        request.validate()?;

        match self.try_create_invoice(request).await {
            Err(err) if err.is_conflict() => {
                warn!(shop_id = %self.scope.shop_id(), error = %err, "Checkout conflicted, retrying once");
                self.try_create_invoice(request).await
            }
            other => other,
        }
    }

    async fn try_create_invoice(&self, request: &CheckoutRequest) -> DbResult<InvoiceDetail> {
        let shop_id = self.scope.shop_id();
        let mut tx = self.scope.pool().begin().await?;

        let mut products = HashMap::new();
        for product_id in request.product_ids() {
            if let Some(product) = fetch_product(&mut tx, shop_id, &product_id).await? {
                products.insert(product_id, product);
            }
        }

        let cart = price_cart(&request.lines, &products)?;

        let customer = match &request.customer {
            Some(reference) => Some(resolve_customer(&mut tx, shop_id, reference).await?),
            None => None,
        };

        for (product_id, quantity) in cart.stock_demand() {
            take_stock(&mut tx, shop_id, &product_id, quantity).await?;
        }

        let invoice = Invoice {
            id: new_id(),
            shop_id: shop_id.to_string(),
            created_at: Utc::now(),
            total_amount: cart.total,
            status: request.initial_status(),
            payment_method: Some(request.payment_method),
            customer_id: customer.as_ref().map(|c| c.id.clone()),
            customer_name: customer.as_ref().map(|c| c.name.clone()),
            customer_phone: customer.as_ref().and_then(|c| c.phone.clone()),
            notes: request
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        };

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, shop_id, created_at, total_amount, status, payment_method,
                customer_id, customer_name, customer_phone, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.shop_id)
        .bind(invoice.created_at)
        .bind(invoice.total_amount)
        .bind(invoice.status)
        .bind(invoice.payment_method)
        .bind(&invoice.customer_id)
        .bind(&invoice.customer_name)
        .bind(&invoice.customer_phone)
        .bind(&invoice.notes)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(cart.lines.len());
        for line in cart.lines {
            let item = InvoiceItem {
                id: new_id(),
                invoice_id: invoice.id.clone(),
                product_id: Some(line.product_id),
                product_name: line.product_name,
                quantity: line.quantity,
                price: line.unit_price,
                tax_rate: line.tax_rate,
                line_total: line.line_total,
            };

            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, product_id, product_name,
                    quantity, price, tax_rate, line_total
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&item.invoice_id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.tax_rate)
            .bind(item.line_total)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        if invoice.status == InvoiceStatus::Pending {
            if let Some(customer_id) = &invoice.customer_id {
                adjust_balance(&mut tx, shop_id, customer_id, invoice.total_amount).await?;
            }
        }

        tx.commit().await?;

        info!(
            shop_id = %shop_id,
            invoice_id = %invoice.id,
            total = %invoice.total_amount,
            status = %invoice.status,
            lines = items.len(),
            "Invoice created"
        );

        Ok(InvoiceDetail { invoice, items })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Settles a pending invoice.
    ///
    /// Already paid or refunded invoices are left alone and reported as
    /// `Unchanged`.
    pub async fn pay_invoice(&self, id: &str) -> DbResult<TransitionOutcome> {
        let shop_id = self.scope.shop_id();
        let mut tx = self.scope.pool().begin().await?;

        let invoice = fetch_invoice(&mut tx, shop_id, id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

        let outcome = invoice.status.plan_transition(id, InvoiceStatus::Paid)?;
        if !outcome.is_applied() {
            debug!(invoice_id = %id, status = %invoice.status, "Pay ignored");
            return Ok(outcome);
        }

        set_status(&mut tx, &invoice, InvoiceStatus::Paid).await?;

        if let Some(customer_id) = &invoice.customer_id {
            adjust_balance(&mut tx, shop_id, customer_id, -invoice.total_amount).await?;
        }

        tx.commit().await?;

        info!(shop_id = %shop_id, invoice_id = %id, total = %invoice.total_amount, "Invoice paid");
        Ok(outcome)
    }

    /// Refunds an invoice: restores stock and undoes any open debt.
    ///
    /// Requires the owner role. Refunding twice is a no-op.
    pub async fn refund_invoice(&self, id: &str) -> DbResult<TransitionOutcome> {
        self.scope.require_manager("refunding invoices")?;

        let shop_id = self.scope.shop_id();
        let mut tx = self.scope.pool().begin().await?;

        let invoice = fetch_invoice(&mut tx, shop_id, id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

        let outcome = apply_refund(&mut tx, &invoice).await?;

        tx.commit().await?;

        if outcome.is_applied() {
            info!(shop_id = %shop_id, invoice_id = %id, from = %invoice.status, "Invoice refunded");
        }
        Ok(outcome)
    }

    /// Deletes an invoice and its lines.
    ///
    /// An invoice that is not yet refunded is refunded first in the same
    /// transaction, so stock and balances never leak. Requires the owner role.
    pub async fn delete_invoice(&self, id: &str) -> DbResult<()> {
        self.scope.require_manager("deleting invoices")?;

        let shop_id = self.scope.shop_id();
        let mut tx = self.scope.pool().begin().await?;

        let invoice = fetch_invoice(&mut tx, shop_id, id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;

        apply_refund(&mut tx, &invoice).await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM invoices WHERE id = ? AND shop_id = ?")
            .bind(id)
            .bind(shop_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(shop_id = %shop_id, invoice_id = %id, was = %invoice.status, "Invoice deleted");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets an invoice with its lines.
    pub async fn get_invoice(&self, id: &str) -> DbResult<InvoiceDetail> {
        let mut conn = self.scope.pool().acquire().await?;

        let invoice = fetch_invoice(&mut conn, self.scope.shop_id(), id)
            .await?
            .ok_or_else(|| CoreError::InvoiceNotFound(id.to_string()))?;
        let items = fetch_items(&mut conn, id).await?;

        Ok(InvoiceDetail { invoice, items })
    }

    /// Lists invoices, newest first.
    pub async fn list_invoices(&self, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            r#"
            SELECT {INVOICE_COLUMNS} FROM invoices
            WHERE shop_id = ?
              AND (? IS NULL OR status = ?)
              AND (? IS NULL OR customer_id = ?)
            ORDER BY created_at DESC, id
            LIMIT ?
            "#
        );
        let limit = filter.limit.map(i64::from).unwrap_or(-1);

        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(self.scope.shop_id())
            .bind(filter.status)
            .bind(filter.status)
            .bind(&filter.customer_id)
            .bind(&filter.customer_id)
            .bind(limit)
            .fetch_all(self.scope.pool())
            .await?;

        Ok(invoices)
    }

    /// Every invoice of the shop (dashboard input).
    pub async fn list_all(&self) -> DbResult<Vec<Invoice>> {
        self.list_invoices(&InvoiceFilter::default()).await
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

async fn fetch_invoice(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ? AND shop_id = ?");
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(invoice)
}

async fn fetch_items(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ? ORDER BY rowid");
    let items = sqlx::query_as::<_, InvoiceItem>(&sql)
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

/// Moves an invoice from its loaded status to `next`.
///
/// Guarded on the loaded status; a concurrent transition makes this a
/// `ConcurrencyConflict`.
async fn set_status(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    next: InvoiceStatus,
) -> DbResult<()> {
    let result =
        sqlx::query("UPDATE invoices SET status = ? WHERE id = ? AND shop_id = ? AND status = ?")
            .bind(next)
            .bind(&invoice.id)
            .bind(&invoice.shop_id)
            .bind(invoice.status)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict("invoice", invoice.id.clone()).into());
    }

    Ok(())
}

/// Refund effects inside the caller's transaction.
async fn apply_refund(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
) -> DbResult<TransitionOutcome> {
    let outcome = invoice
        .status
        .plan_transition(&invoice.id, InvoiceStatus::Refunded)?;
    if !outcome.is_applied() {
        debug!(invoice_id = %invoice.id, "Refund ignored, already refunded");
        return Ok(outcome);
    }

    for item in fetch_items(conn, &invoice.id).await? {
        let Some(product_id) = &item.product_id else {
            continue;
        };
        if !return_stock(conn, &invoice.shop_id, product_id, item.quantity).await? {
            debug!(product_id = %product_id, "Product gone, stock not restored");
        }
    }

    if invoice.status == InvoiceStatus::Pending {
        if let Some(customer_id) = &invoice.customer_id {
            adjust_balance(conn, &invoice.shop_id, customer_id, -invoice.total_amount).await?;
        }
    }

    set_status(conn, invoice, InvoiceStatus::Refunded).await?;

    Ok(outcome)
}
