//! # Shop Scope
//!
//! The capability a shop's staff works through.
//!
//! ## Tenant Isolation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::shop(&principal) ──► ShopScope { shop_id, principal }       │
//! │                                      │                                  │
//! │        ┌──────────────┬──────────────┼──────────────┬──────────────┐   │
//! │        ▼              ▼              ▼              ▼              ▼   │
//! │    products()    customers()    invoices()     expenses()     staff() │
//! │                                                                         │
//! │  Every repository handed out here carries the scope and binds          │
//! │  `shop_id` into each statement. A row of another shop is reported as   │
//! │  not found, exactly like a row that does not exist.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use bazaar_core::report::{summarize, DashboardSummary};
use bazaar_core::{CoreError, Principal, Shop, ShopSettings};

use crate::error::DbResult;
use crate::repository::customer::CustomerRepository;
use crate::repository::expense::ExpenseRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::product::ProductRepository;
use crate::repository::shop::ShopRepository;
use crate::repository::user::StaffRepository;

/// Access to exactly one shop's data on behalf of one principal.
#[derive(Debug, Clone)]
pub struct ShopScope {
    pool: SqlitePool,
    shop_id: String,
    principal: Principal,
}

impl ShopScope {
    pub(crate) fn new(pool: SqlitePool, shop_id: String, principal: Principal) -> Self {
        ShopScope {
            pool,
            shop_id,
            principal,
        }
    }

    /// The shop every query is bound to.
    pub fn shop_id(&self) -> &str {
        &self.shop_id
    }

    /// The caller acting through this scope.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fails unless the caller is an owner or a platform administrator.
    pub(crate) fn require_manager(&self, action: &str) -> DbResult<()> {
        if self.principal.can_manage() {
            return Ok(());
        }

        warn!(
            user_id = %self.principal.user_id,
            shop_id = %self.shop_id,
            action = action,
            "Manager role required"
        );
        Err(CoreError::access_denied(format!("{} requires the owner role", action)).into())
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.clone())
    }

    /// Checkout, payments, refunds and invoice history.
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.clone())
    }

    pub fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.clone())
    }

    /// The shop's user accounts.
    pub fn staff(&self) -> StaffRepository {
        StaffRepository::new(self.clone())
    }

    // =========================================================================
    // Shop
    // =========================================================================

    /// Loads the shop record.
    pub async fn shop(&self) -> DbResult<Shop> {
        ShopRepository::new(self.pool.clone()).get(&self.shop_id).await
    }

    /// Updates name, contact details, currency and low-stock threshold.
    ///
    /// Requires the owner role.
    pub async fn update_settings(&self, settings: &ShopSettings) -> DbResult<Shop> {
        self.require_manager("updating shop settings")?;
        ShopRepository::new(self.pool.clone())
            .update_settings(&self.shop_id, settings)
            .await
    }

    /// Month-to-date dashboard figures.
    pub async fn dashboard(&self, now: DateTime<Utc>) -> DbResult<DashboardSummary> {
        let shop = self.shop().await?;
        let invoices = self.invoices().list_all().await?;
        let expenses = self.expenses().list().await?;
        let customers = self.customers().list().await?;
        let products = self.products().list().await?;

        Ok(summarize(
            now,
            &invoices,
            &expenses,
            &customers,
            &products,
            shop.low_stock_threshold,
        ))
    }
}
