//! # Product Repository
//!
//! Database operations for the shop's catalogue and stock.
//!
//! ## Stock Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock >= 0, always                                                    │
//! │                                                                         │
//! │  Checkout decrements with a conditional update:                        │
//! │                                                                         │
//! │    UPDATE products SET stock = stock - :qty                            │
//! │     WHERE id = :id AND shop_id = :shop AND stock >= :qty               │
//! │                                                                         │
//! │  0 rows affected ──► another checkout got there first                  │
//! │                 ──► ConcurrencyConflict, transaction rolls back        │
//! │                                                                         │
//! │  The schema's CHECK (stock >= 0) backs this up.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use bazaar_core::validation::{
    validate_barcode, validate_category, validate_price, validate_product_name, validate_restock,
    validate_stock, validate_tax_rate_bps, MAX_STOCK,
};
use bazaar_core::{CoreError, Product, ProductInput, ValidationError};

use super::{clean, new_id};
use crate::error::DbResult;
use crate::scope::ShopScope;

const PRODUCT_COLUMNS: &str = "id, shop_id, name, barcode, category, stock, buy_price, \
     sell_price, tax_rate, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let products = scope.products();
///
/// let tea = products.create(&input).await?;
/// products.restock(&tea.id, 24).await?;
/// let low = products.low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    scope: ShopScope,
}

impl ProductRepository {
    pub(crate) fn new(scope: ShopScope) -> Self {
        ProductRepository { scope }
    }

    /// Gets a product by ID.
    ///
    /// ## Errors
    /// * `ProductNotFound` - missing, or owned by another shop
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        let mut conn = self.scope.pool().acquire().await?;
        fetch_product(&mut conn, self.scope.shop_id(), id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Lists all products of the shop by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ? ORDER BY name, id");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(self.scope.shop_id())
            .fetch_all(self.scope.pool())
            .await?;

        Ok(products)
    }

    /// Looks a product up by its barcode.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let barcode = barcode.trim();
        debug!(shop_id = %self.scope.shop_id(), barcode = %barcode, "Looking up barcode");

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ? AND barcode = ?");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(self.scope.shop_id())
            .bind(barcode)
            .fetch_optional(self.scope.pool())
            .await?;

        Ok(product)
    }

    /// Products at or below the shop's low-stock threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let threshold: i64 =
            sqlx::query_scalar("SELECT low_stock_threshold FROM shops WHERE id = ?")
                .bind(self.scope.shop_id())
                .fetch_optional(self.scope.pool())
                .await?
                .ok_or_else(|| CoreError::ShopNotFound(self.scope.shop_id().to_string()))?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ? AND stock <= ? ORDER BY stock, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(self.scope.shop_id())
            .bind(threshold)
            .fetch_all(self.scope.pool())
            .await?;

        Ok(products)
    }

    /// Adds a product to the catalogue.
    ///
    /// Requires the owner role.
    pub async fn create(&self, input: &ProductInput) -> DbResult<Product> {
        self.scope.require_manager("creating products")?;
        validate_product(input)?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            shop_id: self.scope.shop_id().to_string(),
            name: input.name.trim().to_string(),
            barcode: clean(&input.barcode),
            category: clean(&input.category),
            stock: input.stock,
            buy_price: input.buy_price,
            sell_price: input.sell_price,
            tax_rate: input.tax_rate,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.scope.pool().begin().await?;
        ensure_barcode_free(&mut tx, &product.shop_id, product.barcode.as_deref(), None).await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, shop_id, name, barcode, category, stock,
                buy_price, sell_price, tax_rate, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.shop_id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.category)
        .bind(product.stock)
        .bind(product.buy_price)
        .bind(product.sell_price)
        .bind(product.tax_rate)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(shop_id = %product.shop_id, product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Replaces a product's fields.
    ///
    /// Past invoice lines keep their snapshots. Requires the owner role.
    pub async fn update(&self, id: &str, input: &ProductInput) -> DbResult<Product> {
        self.scope.require_manager("updating products")?;
        validate_product(input)?;

        let barcode = clean(&input.barcode);
        let mut tx = self.scope.pool().begin().await?;
        ensure_barcode_free(&mut tx, self.scope.shop_id(), barcode.as_deref(), Some(id)).await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?,
                barcode = ?,
                category = ?,
                stock = ?,
                buy_price = ?,
                sell_price = ?,
                tax_rate = ?,
                updated_at = ?
            WHERE id = ? AND shop_id = ?
            "#,
        )
        .bind(input.name.trim())
        .bind(&barcode)
        .bind(clean(&input.category))
        .bind(input.stock)
        .bind(input.buy_price)
        .bind(input.sell_price)
        .bind(input.tax_rate)
        .bind(Utc::now())
        .bind(id)
        .bind(self.scope.shop_id())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        tx.commit().await?;

        info!(shop_id = %self.scope.shop_id(), product_id = %id, "Product updated");
        self.get(id).await
    }

    /// Adds units to a product's stock and returns the updated product.
    ///
    /// Requires the owner role.
    pub async fn restock(&self, id: &str, quantity: i64) -> DbResult<Product> {
        self.scope.require_manager("restocking products")?;

        validate_restock(quantity)?;

        let mut conn = self.scope.pool().acquire().await?;
        if !return_stock(&mut conn, self.scope.shop_id(), id, quantity).await? {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }
        drop(conn);

        info!(shop_id = %self.scope.shop_id(), product_id = %id, quantity = quantity, "Product restocked");
        self.get(id).await
    }

    /// Deletes a product.
    ///
    /// Invoice lines that sold it keep their snapshot with `product_id`
    /// cleared. Requires the owner role.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        self.scope.require_manager("deleting products")?;

        let result = sqlx::query("DELETE FROM products WHERE id = ? AND shop_id = ?")
            .bind(id)
            .bind(self.scope.shop_id())
            .execute(self.scope.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(shop_id = %self.scope.shop_id(), product_id = %id, "Product deleted");
        Ok(())
    }
}

fn validate_product(input: &ProductInput) -> DbResult<()> {
    validate_product_name(&input.name)?;
    validate_barcode(input.barcode.as_deref())?;
    validate_category(input.category.as_deref())?;
    validate_stock(input.stock)?;
    validate_price("buy_price", input.buy_price)?;
    validate_price("sell_price", input.sell_price)?;
    validate_tax_rate_bps(input.tax_rate.bps())?;
    Ok(())
}

/// Fails if another product of the shop already carries `barcode`.
async fn ensure_barcode_free(
    conn: &mut SqliteConnection,
    shop_id: &str,
    barcode: Option<&str>,
    except_id: Option<&str>,
) -> DbResult<()> {
    let Some(barcode) = barcode else {
        return Ok(());
    };

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM products WHERE shop_id = ? AND barcode = ? AND id != ?)",
    )
    .bind(shop_id)
    .bind(barcode)
    .bind(except_id.unwrap_or(""))
    .fetch_one(&mut *conn)
    .await?;

    if taken {
        return Err(ValidationError::Duplicate {
            field: "barcode".to_string(),
            value: barcode.to_string(),
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Loads a product of the shop on the caller's connection.
pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    shop_id: &str,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ? AND shop_id = ?");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Takes `quantity` units out of stock, only if that many are available.
///
/// ## Errors
/// * `ConcurrencyConflict` - stock changed since it was checked
pub(crate) async fn take_stock(
    conn: &mut SqliteConnection,
    shop_id: &str,
    product_id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock - ?, updated_at = ?
        WHERE id = ? AND shop_id = ? AND stock >= ?
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(shop_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict("product", product_id).into());
    }

    debug!(product_id = %product_id, quantity = quantity, "Stock taken");
    Ok(())
}

/// Puts `quantity` units back. Returns `false` if the product is gone.
///
/// Stock never rises above `MAX_STOCK`.
///
/// ## Errors
/// * `OutOfRange` - the product exists but the new stock would exceed `MAX_STOCK`
pub(crate) async fn return_stock(
    conn: &mut SqliteConnection,
    shop_id: &str,
    product_id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock + ?, updated_at = ?
        WHERE id = ? AND shop_id = ? AND stock <= ?
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(shop_id)
    .bind(MAX_STOCK.saturating_sub(quantity))
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }

    if fetch_product(conn, shop_id, product_id).await?.is_none() {
        return Ok(false);
    }

    Err(ValidationError::OutOfRange {
        field: "stock".to_string(),
        min: 0,
        max: MAX_STOCK,
    }
    .into())
}
