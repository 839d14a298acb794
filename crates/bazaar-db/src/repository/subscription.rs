//! # Subscription Repository
//!
//! Paid renewals of a shop's access window and their audit trail.
//!
//! ## Renewal Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  renew(shop_id, "6 Months", 120.00)                                    │
//! │                                                                         │
//! │  Plan::from_str ─── UnknownPlan (nothing written)                      │
//! │  BEGIN                                                                 │
//! │    load shop ─── ShopNotFound                                          │
//! │    plan_renewal(current_end, plan, now)                                │
//! │    UPDATE shops SET subscription_end = ends_at, is_active = 1          │
//! │    INSERT subscriptions (append-only)                                  │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use bazaar_core::subscription::{plan_renewal, Plan};
use bazaar_core::validation::validate_price;
use bazaar_core::{CoreError, Money, Shop, Subscription};

use super::new_id;
use super::shop::fetch_shop;
use crate::error::DbResult;

const SUBSCRIPTION_COLUMNS: &str =
    "id, shop_id, plan_name, amount, duration_days, starts_at, ends_at, created_at";

/// Repository for subscription database operations.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    /// Creates a new SubscriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SubscriptionRepository { pool }
    }

    /// Renews a shop's subscription as of `now`.
    ///
    /// Returns the updated shop and the appended record.
    ///
    /// ## Errors
    /// * `UnknownPlan` - plan name not in the plan table
    /// * `Validation` - negative amount
    /// * `ShopNotFound`
    pub async fn renew(
        &self,
        shop_id: &str,
        plan_name: &str,
        amount: Money,
        now: DateTime<Utc>,
    ) -> DbResult<(Shop, Subscription)> {
        let plan: Plan = plan_name.parse()?;
        validate_price("amount", amount)?;

        let mut tx = self.pool.begin().await?;

        let mut shop = fetch_shop(&mut tx, shop_id)
            .await?
            .ok_or_else(|| CoreError::ShopNotFound(shop_id.to_string()))?;

        let renewal = plan_renewal(shop.subscription_end, plan, now);

        let result = sqlx::query(
            "UPDATE shops SET subscription_end = ?, is_active = 1 WHERE id = ?",
        )
        .bind(renewal.ends_at)
        .bind(shop_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::conflict("shop", shop_id).into());
        }

        let record = Subscription {
            id: new_id(),
            shop_id: shop_id.to_string(),
            plan_name: plan.name().to_string(),
            amount,
            duration_days: renewal.duration_days(),
            starts_at: renewal.starts_at,
            ends_at: renewal.ends_at,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, shop_id, plan_name, amount, duration_days, starts_at, ends_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.shop_id)
        .bind(&record.plan_name)
        .bind(record.amount)
        .bind(record.duration_days)
        .bind(record.starts_at)
        .bind(record.ends_at)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        shop.subscription_end = Some(renewal.ends_at);
        shop.is_active = true;

        info!(
            shop_id = %shop_id,
            plan = %plan,
            amount = %amount,
            starts_at = %renewal.starts_at,
            ends_at = %renewal.ends_at,
            "Subscription renewed"
        );
        Ok((shop, record))
    }

    /// Renewal history of a shop, newest first.
    pub async fn history(&self, shop_id: &str) -> DbResult<Vec<Subscription>> {
        let sql = format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE shop_id = ? ORDER BY created_at DESC, rowid DESC"
        );
        let records = sqlx::query_as::<_, Subscription>(&sql)
            .bind(shop_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}
