//! # Admin Panel
//!
//! Platform administration: the shop overview, renewals, the activation
//! kill-switch and shop deletion.
//!
//! Obtained through [`Database::admin`](crate::Database::admin), which only
//! hands it to principals with `is_admin`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use bazaar_core::subscription::{access_status, days_remaining, AccessStatus};
use bazaar_core::{Money, Principal, Shop, Subscription};

use crate::error::DbResult;
use crate::repository::shop::{ShopDeletion, ShopRepository};
use crate::repository::subscription::SubscriptionRepository;
use crate::scope::ShopScope;

/// One row of the admin overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopOverview {
    pub shop: Shop,
    pub access: AccessStatus,
    /// `None` when the shop has no expiry date.
    pub days_remaining: Option<i64>,
}

/// Capability for platform administrators.
#[derive(Debug, Clone)]
pub struct AdminPanel {
    pool: SqlitePool,
    principal: Principal,
}

impl AdminPanel {
    pub(crate) fn new(pool: SqlitePool, principal: Principal) -> Self {
        AdminPanel { pool, principal }
    }

    fn shops(&self) -> ShopRepository {
        ShopRepository::new(self.pool.clone())
    }

    fn subscriptions(&self) -> SubscriptionRepository {
        SubscriptionRepository::new(self.pool.clone())
    }

    /// Every shop with its access state as of `now`.
    pub async fn list_shops(&self, now: DateTime<Utc>) -> DbResult<Vec<ShopOverview>> {
        let shops = self.shops().list().await?;

        Ok(shops
            .into_iter()
            .map(|shop| ShopOverview {
                access: access_status(&shop, now),
                days_remaining: days_remaining(&shop, now),
                shop,
            })
            .collect())
    }

    pub async fn get_shop(&self, shop_id: &str) -> DbResult<Shop> {
        self.shops().get(shop_id).await
    }

    /// Acts inside a shop with administrator rights.
    pub async fn shop_scope(&self, shop_id: &str) -> DbResult<ShopScope> {
        let shop = self.get_shop(shop_id).await?;
        Ok(ShopScope::new(self.pool.clone(), shop.id, self.principal.clone()))
    }

    /// Renews a shop's subscription starting from the current time.
    pub async fn renew(
        &self,
        shop_id: &str,
        plan_name: &str,
        amount: Money,
    ) -> DbResult<(Shop, Subscription)> {
        self.renew_at(shop_id, plan_name, amount, Utc::now()).await
    }

    /// Same as [`renew`](Self::renew) with an explicit clock.
    pub async fn renew_at(
        &self,
        shop_id: &str,
        plan_name: &str,
        amount: Money,
        now: DateTime<Utc>,
    ) -> DbResult<(Shop, Subscription)> {
        info!(admin = %self.principal.user_id, shop_id = %shop_id, plan = %plan_name, "Renewal requested");
        self.subscriptions()
            .renew(shop_id, plan_name, amount, now)
            .await
    }

    /// Renewal history of a shop, newest first.
    pub async fn subscription_history(&self, shop_id: &str) -> DbResult<Vec<Subscription>> {
        self.subscriptions().history(shop_id).await
    }

    /// Flips the shop's `is_active` flag; returns the new value.
    pub async fn toggle_active(&self, shop_id: &str) -> DbResult<bool> {
        info!(admin = %self.principal.user_id, shop_id = %shop_id, "Toggling shop activation");
        self.shops().toggle_active(shop_id).await
    }

    /// Hard-deletes a shop and all of its data.
    pub async fn delete_shop(&self, shop_id: &str) -> DbResult<ShopDeletion> {
        info!(admin = %self.principal.user_id, shop_id = %shop_id, "Deleting shop");
        self.shops().delete_cascade(shop_id).await
    }
}
