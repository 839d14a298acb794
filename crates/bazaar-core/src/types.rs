//! # Domain Types
//!
//! Core domain types used throughout Bazaar POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │                      ┌─────────────────┐                               │
//! │                      │      Shop       │  tenant boundary              │
//! │                      │  is_active      │                               │
//! │                      │  subscription_  │                               │
//! │                      │      end        │                               │
//! │                      └────────┬────────┘                               │
//! │        ┌──────────┬──────────┼──────────┬──────────┬─────────────┐    │
//! │        ▼          ▼          ▼          ▼          ▼             ▼    │
//! │     User      Product    Customer    Invoice    Expense   Subscription│
//! │                  ▲          ▲          │                              │
//! │                  │          └──────────┤ customer_id?                 │
//! │                  │                     ▼                              │
//! │                  └─────────────── InvoiceItem (product_id?)           │
//! │                                                                         │
//! │  Every row except platform admins carries exactly one shop_id.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are UUID v4 strings. Timestamps are UTC.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10%, 825 bps = 8.25%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the exact rate as a fraction: 1000 bps → 0.1.
    pub fn fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Users & Principals
// =============================================================================

/// Role of a user inside a shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shop owner: full control over the shop's data.
    Owner,
    /// Till operator: checkout, payments and read access.
    Cashier,
    /// Platform administrator role.
    Admin,
}

impl Role {
    /// Whether this role may run managerial or destructive operations.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Cashier => "cashier",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "cashier" | "worker" => Ok(Role::Cashier),
            "admin" => Ok(Role::Admin),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["owner".into(), "cashier".into(), "admin".into()],
            }),
        }
    }
}

/// A user account.
///
/// Platform administrators have `is_admin = true` and no shop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub is_admin: bool,
    pub shop_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns the principal this user acts as once authenticated.
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id.clone(),
            shop_id: self.shop_id.clone(),
            role: self.role,
            is_admin: self.is_admin,
        }
    }
}

/// Input for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

/// The authenticated caller of an operation.
///
/// Passed explicitly into every call instead of being read from ambient
/// session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub shop_id: Option<String>,
    pub role: Role,
    pub is_admin: bool,
}

impl Principal {
    /// Whether this caller may run managerial or destructive operations.
    pub fn can_manage(&self) -> bool {
        self.is_admin || self.role.can_manage()
    }
}

// =============================================================================
// Shop
// =============================================================================

/// A tenant: an isolated retail account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shop {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub tax_number: Option<String>,
    /// Printed at the bottom of receipts.
    pub footer_message: Option<String>,
    /// ISO 4217 code.
    pub currency: String,
    /// Products at or below this stock level are reported as low.
    pub low_stock_threshold: i64,
    /// Administrative kill-switch.
    pub is_active: bool,
    /// End of the paid access window. `None` means no expiry is enforced.
    pub subscription_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a shop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub currency: Option<String>,
    pub low_stock_threshold: Option<i64>,
}

/// Editable shop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSettings {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub tax_number: Option<String>,
    pub footer_message: Option<String>,
    pub currency: String,
    pub low_stock_threshold: i64,
}

impl From<&Shop> for ShopSettings {
    fn from(shop: &Shop) -> Self {
        ShopSettings {
            name: shop.name.clone(),
            phone: shop.phone.clone(),
            address: shop.address.clone(),
            email: shop.email.clone(),
            tax_number: shop.tax_number.clone(),
            footer_message: shop.footer_message.clone(),
            currency: shop.currency.clone(),
            low_stock_threshold: shop.low_stock_threshold,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    /// Unique within the shop.
    pub barcode: Option<String>,
    pub category: Option<String>,
    /// Never negative.
    pub stock: i64,
    pub buy_price: Money,
    pub sell_price: Money,
    pub tax_rate: TaxRate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks if `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Checks if stock is at or below the shop's threshold.
    pub fn is_low_stock(&self, threshold: i64) -> bool {
        self.stock <= threshold
    }
}

/// Input for creating or updating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub stock: i64,
    pub buy_price: Money,
    pub sell_price: Money,
    pub tax_rate: TaxRate,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer in the shop's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub shop_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    /// Positive = the customer owes the shop.
    pub balance: Money,
    pub created_at: DateTime<Utc>,
}

/// Descriptor for a customer captured at the till.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}

/// How a checkout identifies its customer.
///
/// An absent reference (`None`) is an anonymous sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerRef {
    /// An existing customer of the shop.
    Existing { id: String },
    /// A customer typed in at the till. Reused if the phone is known.
    New(NewCustomer),
}

// =============================================================================
// Invoice Status
// =============================================================================

/// The status of an invoice.
///
/// ## State Machine
/// ```text
///                 pay_invoice
///   ┌─────────┐ ─────────────► ┌────────┐
///   │ Pending │                │  Paid  │
///   └────┬────┘                └───┬────┘
///        │ refund_invoice          │ refund_invoice
///        ▼                         ▼
///   ┌──────────────────────────────────┐
///   │            Refunded              │  terminal
///   └──────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Refunded,
}

impl InvoiceStatus {
    /// Checks whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Pending, InvoiceStatus::Paid)
                | (InvoiceStatus::Pending, InvoiceStatus::Refunded)
                | (InvoiceStatus::Paid, InvoiceStatus::Refunded)
        )
    }

    /// Refunded invoices accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Refunded)
    }

    /// Decides what a request to move `invoice_id` to `next` does.
    ///
    /// Repeats and requests against a terminal invoice are no-ops.
    /// Moving backwards (`paid → pending`) is an error.
    pub fn plan_transition(
        &self,
        invoice_id: &str,
        next: InvoiceStatus,
    ) -> Result<TransitionOutcome, crate::error::CoreError> {
        if self.can_transition_to(next) {
            return Ok(TransitionOutcome::Applied {
                from: *self,
                to: next,
            });
        }

        if *self == next || self.is_terminal() {
            return Ok(TransitionOutcome::Unchanged { status: *self });
        }

        Err(crate::error::CoreError::InvalidStateTransition {
            invoice_id: invoice_id.to_string(),
            from: self.to_string(),
            to: next.to_string(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paid" => Ok(InvoiceStatus::Paid),
            "pending" => Ok(InvoiceStatus::Pending),
            "refunded" => Ok(InvoiceStatus::Refunded),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["paid".into(), "pending".into(), "refunded".into()],
            }),
        }
    }
}

/// Result of a status transition request.
///
/// Repeating a transition is a no-op rather than an error, so a double
/// click on "refund" cannot restore stock twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TransitionOutcome {
    Applied {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },
    Unchanged {
        status: InvoiceStatus,
    },
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer settles an invoice at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Bank or mobile transfer.
    Transfer,
    /// Sale on account: the customer pays later.
    Debt,
}

impl PaymentMethod {
    /// Status an invoice starts in when settled with this method.
    pub fn initial_status(&self) -> InvoiceStatus {
        match self {
            PaymentMethod::Debt => InvoiceStatus::Pending,
            _ => InvoiceStatus::Paid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Debt => "debt",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "transfer" | "bank_transfer" => Ok(PaymentMethod::Transfer),
            "debt" => Ok(PaymentMethod::Debt),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec![
                    "cash".into(),
                    "card".into(),
                    "transfer".into(),
                    "debt".into(),
                ],
            }),
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A persisted sale.
///
/// `total_amount` is fixed at checkout and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,
    pub shop_id: String,
    pub created_at: DateTime<Utc>,
    pub total_amount: Money,
    pub status: InvoiceStatus,
    pub payment_method: Option<PaymentMethod>,
    pub customer_id: Option<String>,
    /// Name captured at the till (kept even if the customer is deleted).
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
}

/// A line of an invoice.
///
/// Uses the snapshot pattern: name, price and tax rate are frozen at sale
/// time and do not follow later product edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    /// `None` once the product has been deleted.
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    /// Unit price before tax at sale time.
    pub price: Money,
    pub tax_rate: TaxRate,
    /// `price × (1 + tax) × quantity`.
    pub line_total: Money,
}

/// An invoice together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

/// Filter for invoice listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<String>,
    pub limit: Option<u32>,
}

/// A customer with their invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerStatement {
    pub customer: Customer,
    pub invoices: Vec<Invoice>,
    /// Σ totals of the customer's pending invoices.
    pub pending_total: Money,
}

// =============================================================================
// Expense
// =============================================================================

/// Money spent by the shop (rent, supplies, wages...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: String,
    pub shop_id: String,
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
    pub spent_at: DateTime<Utc>,
}

/// Input for recording an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
    /// Defaults to now.
    pub spent_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Subscription
// =============================================================================

/// Audit record of one renewal. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Subscription {
    pub id: String,
    pub shop_id: String,
    pub plan_name: String,
    pub amount: Money,
    pub duration_days: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
        assert_eq!(rate.fraction(), dec!(0.0825));
    }

    #[test]
    fn test_invoice_transitions() {
        use InvoiceStatus::*;

        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Refunded));
        assert!(Paid.can_transition_to(Refunded));

        assert!(!Paid.can_transition_to(Pending));
        assert!(!Paid.can_transition_to(Paid));
        assert!(!Refunded.can_transition_to(Paid));
        assert!(!Refunded.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Refunded));
        assert!(Refunded.is_terminal());
    }

    #[test]
    fn test_plan_transition() {
        use InvoiceStatus::*;

        assert_eq!(
            Pending.plan_transition("i", Paid).unwrap(),
            TransitionOutcome::Applied { from: Pending, to: Paid }
        );
        assert_eq!(
            Paid.plan_transition("i", Paid).unwrap(),
            TransitionOutcome::Unchanged { status: Paid }
        );
        assert_eq!(
            Refunded.plan_transition("i", Paid).unwrap(),
            TransitionOutcome::Unchanged { status: Refunded }
        );
        assert_eq!(
            Refunded.plan_transition("i", Refunded).unwrap(),
            TransitionOutcome::Unchanged { status: Refunded }
        );

        let err = Paid.plan_transition("inv-9", Pending).unwrap_err();
        assert!(err.to_string().contains("inv-9"));
    }

    #[test]
    fn test_payment_method_initial_status() {
        assert_eq!(PaymentMethod::Debt.initial_status(), InvoiceStatus::Pending);
        assert_eq!(PaymentMethod::Cash.initial_status(), InvoiceStatus::Paid);
        assert_eq!(PaymentMethod::Card.initial_status(), InvoiceStatus::Paid);
        assert_eq!(PaymentMethod::Transfer.initial_status(), InvoiceStatus::Paid);
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("Cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("debt".parse::<PaymentMethod>().unwrap(), PaymentMethod::Debt);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_role_parse_accepts_worker_alias() {
        assert_eq!("worker".parse::<Role>().unwrap(), Role::Cashier);
        assert!(Role::Owner.can_manage());
        assert!(!Role::Cashier.can_manage());
    }

    #[test]
    fn test_principal_can_manage() {
        let cashier = Principal {
            user_id: "u".into(),
            shop_id: Some("s".into()),
            role: Role::Cashier,
            is_admin: false,
        };
        assert!(!cashier.can_manage());

        let platform = Principal {
            is_admin: true,
            ..cashier
        };
        assert!(platform.can_manage());
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let user = User {
            id: "u-1".into(),
            username: "amina".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Owner,
            is_admin: false,
            shop_id: Some("s-1".into()),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }
}
