//! # Shop Repository
//!
//! Shop records: registration, settings, the activation kill-switch and
//! the cascade delete.
//!
//! ## Cascade Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  delete_cascade(shop_id)        one transaction, children first        │
//! │                                                                         │
//! │   invoice_items ─► invoices ─► subscriptions ─► expenses ─►            │
//! │   customers ─► products ─► users ─► shop                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use bazaar_core::validation::{
    validate_currency_code, validate_email, validate_low_stock_threshold, validate_phone,
    validate_shop_name,
};
use bazaar_core::{
    CoreError, NewShop, NewUser, Role, Shop, ShopSettings, User, DEFAULT_CURRENCY,
    DEFAULT_LOW_STOCK_THRESHOLD,
};

use super::user::{insert_user, prepare_user};
use super::{clean, new_id};
use crate::error::DbResult;

pub(crate) const SHOP_COLUMNS: &str = "id, name, phone, address, email, tax_number, \
     footer_message, currency, low_stock_threshold, is_active, subscription_end, created_at";

/// Row counts removed by a shop deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopDeletion {
    pub shop_id: String,
    pub invoice_items: u64,
    pub invoices: u64,
    pub subscriptions: u64,
    pub expenses: u64,
    pub customers: u64,
    pub products: u64,
    pub users: u64,
}

/// Repository for shop database operations.
#[derive(Debug, Clone)]
pub struct ShopRepository {
    pool: SqlitePool,
}

impl ShopRepository {
    /// Creates a new ShopRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShopRepository { pool }
    }

    /// Gets a shop by ID.
    ///
    /// ## Errors
    /// * `ShopNotFound` - no shop with this id
    pub async fn get(&self, id: &str) -> DbResult<Shop> {
        let mut conn = self.pool.acquire().await?;
        fetch_shop(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::ShopNotFound(id.to_string()).into())
    }

    /// Lists every shop, by name.
    pub async fn list(&self) -> DbResult<Vec<Shop>> {
        let sql = format!("SELECT {SHOP_COLUMNS} FROM shops ORDER BY name, id");
        let shops = sqlx::query_as::<_, Shop>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = shops.len(), "Listed shops");
        Ok(shops)
    }

    /// Creates a shop and its owner account in one transaction.
    ///
    /// ## Errors
    /// * `Validation` - bad shop fields, bad credentials, or a taken username
    pub async fn register(&self, input: &NewShop, owner: &NewUser) -> DbResult<(Shop, User)> {
        validate_shop_name(&input.name)?;
        validate_phone(input.phone.as_deref())?;
        validate_email(input.email.as_deref())?;

        let currency = input
            .currency
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        validate_currency_code(&currency)?;

        let threshold = input
            .low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        validate_low_stock_threshold(threshold)?;

        let now = Utc::now();
        let shop = Shop {
            id: new_id(),
            name: input.name.trim().to_string(),
            phone: clean(&input.phone),
            address: clean(&input.address),
            email: clean(&input.email),
            tax_number: None,
            footer_message: None,
            currency,
            low_stock_threshold: threshold,
            is_active: true,
            subscription_end: None,
            created_at: now,
        };

        // Hashing is slow; do it before the write lock is taken.
        let user = prepare_user(owner, Role::Owner, false, Some(shop.id.clone()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO shops (
                id, name, phone, address, email, tax_number, footer_message,
                currency, low_stock_threshold, is_active, subscription_end, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&shop.id)
        .bind(&shop.name)
        .bind(&shop.phone)
        .bind(&shop.address)
        .bind(&shop.email)
        .bind(&shop.tax_number)
        .bind(&shop.footer_message)
        .bind(&shop.currency)
        .bind(shop.low_stock_threshold)
        .bind(shop.is_active)
        .bind(shop.subscription_end)
        .bind(shop.created_at)
        .execute(&mut *tx)
        .await?;

        insert_user(&mut tx, &user).await?;

        tx.commit().await?;

        info!(shop_id = %shop.id, name = %shop.name, owner = %user.username, "Shop registered");
        Ok((shop, user))
    }

    /// Replaces the editable settings of a shop.
    pub async fn update_settings(&self, shop_id: &str, settings: &ShopSettings) -> DbResult<Shop> {
        validate_shop_name(&settings.name)?;
        validate_phone(settings.phone.as_deref())?;
        validate_email(settings.email.as_deref())?;
        let currency = settings.currency.trim().to_uppercase();
        validate_currency_code(&currency)?;
        validate_low_stock_threshold(settings.low_stock_threshold)?;

        let result = sqlx::query(
            r#"
            UPDATE shops SET
                name = ?,
                phone = ?,
                address = ?,
                email = ?,
                tax_number = ?,
                footer_message = ?,
                currency = ?,
                low_stock_threshold = ?
            WHERE id = ?
            "#,
        )
        .bind(settings.name.trim())
        .bind(clean(&settings.phone))
        .bind(clean(&settings.address))
        .bind(clean(&settings.email))
        .bind(clean(&settings.tax_number))
        .bind(clean(&settings.footer_message))
        .bind(&currency)
        .bind(settings.low_stock_threshold)
        .bind(shop_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ShopNotFound(shop_id.to_string()).into());
        }

        info!(shop_id = %shop_id, "Shop settings updated");
        self.get(shop_id).await
    }

    /// Flips `is_active` and returns the new value.
    pub async fn toggle_active(&self, shop_id: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE shops SET is_active = NOT is_active WHERE id = ?")
            .bind(shop_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ShopNotFound(shop_id.to_string()).into());
        }

        let is_active: bool = sqlx::query_scalar("SELECT is_active FROM shops WHERE id = ?")
            .bind(shop_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(shop_id = %shop_id, is_active = is_active, "Shop activation toggled");
        Ok(is_active)
    }

    /// Hard-deletes a shop and everything it owns.
    ///
    /// ## Errors
    /// * `ShopNotFound` - nothing is deleted
    pub async fn delete_cascade(&self, shop_id: &str) -> DbResult<ShopDeletion> {
        let mut tx = self.pool.begin().await?;

        if fetch_shop(&mut tx, shop_id).await?.is_none() {
            return Err(CoreError::ShopNotFound(shop_id.to_string()).into());
        }

        let mut deletion = ShopDeletion {
            shop_id: shop_id.to_string(),
            ..ShopDeletion::default()
        };

        deletion.invoice_items = sqlx::query(
            "DELETE FROM invoice_items WHERE invoice_id IN (SELECT id FROM invoices WHERE shop_id = ?)",
        )
        .bind(shop_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        deletion.invoices = delete_owned(&mut tx, "invoices", shop_id).await?;
        deletion.subscriptions = delete_owned(&mut tx, "subscriptions", shop_id).await?;
        deletion.expenses = delete_owned(&mut tx, "expenses", shop_id).await?;
        deletion.customers = delete_owned(&mut tx, "customers", shop_id).await?;
        deletion.products = delete_owned(&mut tx, "products", shop_id).await?;
        deletion.users = delete_owned(&mut tx, "users", shop_id).await?;

        sqlx::query("DELETE FROM shops WHERE id = ?")
            .bind(shop_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            shop_id = %shop_id,
            invoices = deletion.invoices,
            products = deletion.products,
            customers = deletion.customers,
            users = deletion.users,
            "Shop deleted"
        );
        Ok(deletion)
    }
}

/// Loads a shop on an existing connection or transaction.
pub(crate) async fn fetch_shop(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Shop>> {
    let sql = format!("SELECT {SHOP_COLUMNS} FROM shops WHERE id = ?");
    let shop = sqlx::query_as::<_, Shop>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(shop)
}

/// Deletes every row of `table` owned by the shop.
///
/// `table` is always one of the fixed names above, never caller input.
async fn delete_owned(conn: &mut SqliteConnection, table: &str, shop_id: &str) -> DbResult<u64> {
    let sql = format!("DELETE FROM {table} WHERE shop_id = ?");
    let result = sqlx::query(&sql).bind(shop_id).execute(&mut *conn).await?;

    debug!(table = table, rows = result.rows_affected(), "Deleted shop rows");
    Ok(result.rows_affected())
}
