//! # Money Module
//!
//! Provides the `Money` type for handling monetary values exactly.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    10.0 × 1.1 × 2 = 22.000000000000004  ❌ WRONG!                       │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal                                             │
//! │    10 × 1.1 × 2 = 22.0                  ✅ exact                        │
//! │                                                                         │
//! │  Values keep full precision through pricing, totals and balances.      │
//! │  Rounding to 2 places happens only when a value is displayed.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let doubled = price * 2;             // 21.98
//! let total = price + Money::from_cents(500);
//!
//! assert_eq!(doubled.to_string(), "21.98");
//! assert_eq!(total, Money::from_cents(1599));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;
use crate::types::TaxRate;

/// Decimal places used when a value is shown to a person.
pub const DISPLAY_DECIMALS: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the shop's currency, held as an exact decimal.
///
/// ## Design Decisions
/// - **Signed**: customer balances go negative on overpayment
/// - **Full precision**: `unit × (1 + tax) × qty` is never rounded in storage
/// - **Numeric equality**: `22.0 == 22.00`
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.sell_price ──► CartLine.unit_price ──► InvoiceItem.line_total │
/// │                                                        │                │
/// │                                   Invoice.total_amount ◄┘               │
/// │                                        │                                │
/// │                     Customer.balance ◄─┘ (debt sales only)             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Creates a Money value from an exact decimal.
    #[inline]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from minor units (cents).
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.to_string(), "10.99");
    /// ```
    #[inline]
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    /// Zero money.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Returns the underlying decimal at full precision.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is exactly zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Checks if the value is above zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns the value rounded for display (2 places, half away from zero).
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let m = Money::from_decimal(Decimal::new(10_825, 3)); // 10.825
    /// assert_eq!(m.rounded(), Money::from_cents(1083));
    /// ```
    pub fn rounded(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Returns this amount with tax added on top.
    ///
    /// `gross = amount × (1 + bps / 10000)`, exact.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    /// use bazaar_core::types::TaxRate;
    ///
    /// let price = Money::from_cents(1000);           // 10.00
    /// let gross = price.with_tax(TaxRate::from_bps(1000)); // +10%
    /// assert_eq!(gross, Money::from_cents(1100));
    /// ```
    pub fn with_tax(&self, rate: TaxRate) -> Money {
        Money(self.0 * (Decimal::ONE + rate.fraction()))
    }

    /// Returns only the tax portion for this amount.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    /// use bazaar_core::types::TaxRate;
    ///
    /// let tax = Money::from_cents(1000).tax_portion(TaxRate::from_bps(825));
    /// assert_eq!(tax.to_string(), "0.83"); // 0.825 shown rounded
    /// ```
    pub fn tax_portion(&self, rate: TaxRate) -> Money {
        Money(self.0 * rate.fraction())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the value rounded to 2 places, without a currency symbol.
///
/// The currency belongs to the shop, so the caller adds it.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded().0)
    }
}

/// Parses a decimal string such as `"10.99"`.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Money)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * Decimal::from(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// SQLite Mapping
// =============================================================================

/// Money is stored as TEXT so SQLite never coerces it through a float.
#[cfg(feature = "sqlx")]
mod sqlite {
    use super::Money;
    use rust_decimal::Decimal;
    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::sqlite::{Sqlite, SqliteTypeInfo, SqliteValueRef};
    use sqlx::{Decode, Encode, Type};
    use std::str::FromStr;

    impl Type<Sqlite> for Money {
        fn type_info() -> SqliteTypeInfo {
            <String as Type<Sqlite>>::type_info()
        }

        fn compatible(ty: &SqliteTypeInfo) -> bool {
            <String as Type<Sqlite>>::compatible(ty)
        }
    }

    impl<'q> Encode<'q, Sqlite> for Money {
        fn encode_by_ref(
            &self,
            buf: &mut <Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
        ) -> Result<IsNull, BoxDynError> {
            <String as Encode<'q, Sqlite>>::encode(self.0.to_string(), buf)
        }
    }

    impl<'r> Decode<'r, Sqlite> for Money {
        fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
            let text = <&str as Decode<'r, Sqlite>>::decode(value)?;
            Ok(Money(Decimal::from_str(text)?))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.amount(), dec!(10.99));
        assert_eq!(money.to_string(), "10.99");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(550);

        assert_eq!(a + b, Money::from_cents(1550));
        assert_eq!(a - b, Money::from_cents(450));
        assert_eq!(b * 3, Money::from_cents(1650));
        assert_eq!(-a, Money::from_cents(-1000));

        let mut c = a;
        c += b;
        c -= Money::from_cents(50);
        assert_eq!(c, Money::from_cents(1500));
    }

    #[test]
    fn test_with_tax_is_exact() {
        // 10 × 1.1 × 2 must be exactly 22, not 22.000000000000004
        let line = Money::from_cents(1000).with_tax(TaxRate::from_bps(1000)) * 2;
        assert_eq!(line.amount(), dec!(22));
    }

    #[test]
    fn test_full_precision_is_kept() {
        let gross = Money::from_cents(1099).with_tax(TaxRate::from_bps(825));
        assert_eq!(gross.amount(), dec!(11.896675));
        assert_eq!(gross.rounded().amount(), dec!(11.90));
        assert_eq!(gross.to_string(), "11.90");
    }

    #[test]
    fn test_display_rounds_half_away_from_zero() {
        assert_eq!(Money::from(dec!(0.125)).to_string(), "0.13");
        assert_eq!(Money::from(dec!(-0.125)).to_string(), "-0.13");
        assert_eq!(Money::from(dec!(7)).to_string(), "7.00");
    }

    #[test]
    fn test_zero_tax_leaves_amount_unchanged() {
        let price = Money::from_cents(499);
        assert_eq!(price.with_tax(TaxRate::zero()), price);
        assert!(price.tax_portion(TaxRate::zero()).is_zero());
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::from_cents(-1).is_negative());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::zero().is_zero());
        assert!(!Money::zero().is_positive());
    }

    #[test]
    fn test_sum() {
        let total: Money = vec![Money::from_cents(100), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(350));
    }

    #[test]
    fn test_parse() {
        assert_eq!("12.50".parse::<Money>().unwrap(), Money::from_cents(1250));
        assert!("twelve".parse::<Money>().is_err());
    }

    #[test]
    fn test_equality_ignores_scale() {
        assert_eq!(Money::from(dec!(22.0)), Money::from(dec!(22.00)));
    }
}
