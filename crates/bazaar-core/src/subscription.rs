//! # Subscription Lifecycle
//!
//! Date arithmetic for a shop's paid access window and the login gate.
//!
//! ## Renewal Anchoring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Renewed BEFORE expiry: extend from the current end (no lost days)     │
//! │                                                                         │
//! │    now ────────── end ══════════ +30d ══════════► new end              │
//! │                                                                         │
//! │  Renewed AFTER expiry: start from now (no free backdating)             │
//! │                                                                         │
//! │    end ────────── now ══════════ +30d ══════════► new end              │
//! │                                                                         │
//! │  new_end = max(now, end) + duration                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A shop without a `subscription_end` has no expiry enforced. It is still
//! subject to the `is_active` kill-switch.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::types::Shop;

// =============================================================================
// Plans
// =============================================================================

/// A subscription plan sold by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plan {
    #[serde(rename = "1 Month")]
    OneMonth,
    #[serde(rename = "6 Months")]
    SixMonths,
    #[serde(rename = "1 Year")]
    OneYear,
}

impl Plan {
    /// Every plan, shortest first.
    pub const ALL: [Plan; 3] = [Plan::OneMonth, Plan::SixMonths, Plan::OneYear];

    /// Display name, also the name accepted by `from_str`.
    pub fn name(&self) -> &'static str {
        match self {
            Plan::OneMonth => "1 Month",
            Plan::SixMonths => "6 Months",
            Plan::OneYear => "1 Year",
        }
    }

    /// Length of the plan in days.
    pub fn duration_days(&self) -> i64 {
        match self {
            Plan::OneMonth => 30,
            Plan::SixMonths => 180,
            Plan::OneYear => 365,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::days(self.duration_days())
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a plan name. Unknown names are rejected rather than defaulted.
impl FromStr for Plan {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Plan::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::UnknownPlan(wanted.to_string()))
    }
}

// =============================================================================
// Renewal
// =============================================================================

/// The window produced by one renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renewal {
    pub plan: Plan,
    /// `max(now, current_end)`.
    pub starts_at: DateTime<Utc>,
    /// `starts_at + plan duration`; the shop's new `subscription_end`.
    pub ends_at: DateTime<Utc>,
}

impl Renewal {
    pub fn duration_days(&self) -> i64 {
        self.plan.duration_days()
    }
}

/// Computes the window a renewal buys.
///
/// ## Example
/// ```rust
/// use bazaar_core::subscription::{plan_renewal, Plan};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let current_end = now + Duration::days(10);
///
/// let renewal = plan_renewal(Some(current_end), Plan::OneMonth, now);
/// assert_eq!(renewal.ends_at, current_end + Duration::days(30));
/// ```
pub fn plan_renewal(
    current_end: Option<DateTime<Utc>>,
    plan: Plan,
    now: DateTime<Utc>,
) -> Renewal {
    let starts_at = match current_end {
        Some(end) if end > now => end,
        _ => now,
    };

    Renewal {
        plan,
        starts_at,
        ends_at: starts_at + plan.duration(),
    }
}

// =============================================================================
// Access Gate
// =============================================================================

/// Whole days left in the shop's window.
///
/// Returns `None` when no `subscription_end` is set (no expiry enforced),
/// otherwise `max(0, floor(end - now))` in days.
pub fn days_remaining(shop: &Shop, now: DateTime<Utc>) -> Option<i64> {
    shop.subscription_end
        .map(|end| (end - now).num_days().max(0))
}

/// Whether staff of this shop may log in.
///
/// `is_active && (end unset || end > now)`
pub fn is_access_allowed(shop: &Shop, now: DateTime<Utc>) -> bool {
    shop.is_active && shop.subscription_end.map_or(true, |end| end > now)
}

/// Like [`is_access_allowed`] but says why access is refused.
pub fn check_access(shop: &Shop, now: DateTime<Utc>) -> CoreResult<()> {
    if !shop.is_active {
        return Err(CoreError::ShopSuspended(shop.id.clone()));
    }

    match shop.subscription_end {
        Some(end) if end <= now => Err(CoreError::SubscriptionExpired(shop.id.clone())),
        _ => Ok(()),
    }
}

/// Access state shown in the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AccessStatus {
    /// Active with no expiry date.
    Unlimited,
    /// Active and inside the paid window.
    Active { days_remaining: i64 },
    /// Paid window has ended.
    Expired,
    /// Switched off by an administrator (takes precedence over dates).
    Suspended,
}

/// Classifies a shop for the admin overview.
pub fn access_status(shop: &Shop, now: DateTime<Utc>) -> AccessStatus {
    if !shop.is_active {
        return AccessStatus::Suspended;
    }

    match shop.subscription_end {
        None => AccessStatus::Unlimited,
        Some(end) if end > now => AccessStatus::Active {
            days_remaining: (end - now).num_days(),
        },
        Some(_) => AccessStatus::Expired,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
