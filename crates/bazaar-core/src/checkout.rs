//! # Checkout
//!
//! Pure half of the checkout engine: validates a cart and prices it against
//! the products loaded by the database layer.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutRequest                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate()            ← THIS MODULE: empty cart, quantities, prices    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load products (shop-scoped, inside the transaction)      bazaar-db    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price_cart()          ← THIS MODULE: existence, stock, line totals     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  decrement stock, adjust balance, insert invoice + items  bazaar-db    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is mutated until `price_cart` has accepted every line.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CustomerRef, InvoiceStatus, PaymentMethod, Product, TaxRate};
use crate::validation::{validate_cart_size, validate_price, validate_quantity};

// =============================================================================
// Inputs
// =============================================================================

/// One line of a cart as sent by the till.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price before tax. May differ from the product's list price.
    pub unit_price: Money,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }
}

/// Everything needed to turn a cart into an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    /// Validates the request shape before any product is loaded.
    ///
    /// ## Rules
    /// - At least one line, at most MAX_CART_ITEMS
    /// - Each quantity in 1..=MAX_ITEM_QUANTITY
    /// - Each unit price non-negative
    /// - A debt sale needs a customer to owe the money
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        validate_cart_size(self.lines.len())?;

        for line in &self.lines {
            validate_quantity(line.quantity)?;
            validate_price("unit_price", line.unit_price)?;
        }

        if self.payment_method == PaymentMethod::Debt && self.customer.is_none() {
            return Err(ValidationError::Required {
                field: "customer (for debt sales)".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Status the invoice starts in.
    pub fn initial_status(&self) -> InvoiceStatus {
        self.payment_method.initial_status()
    }

    /// Product ids referenced by the cart, deduplicated, in cart order.
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if !ids.contains(&line.product_id) {
                ids.push(line.product_id.clone());
            }
        }
        ids
    }
}

// =============================================================================
// Priced Cart
// =============================================================================

/// A cart line after pricing, ready to be stored as an invoice item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: String,
    /// Snapshot of the product name at sale time.
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Snapshot of the product's tax rate at sale time.
    pub tax_rate: TaxRate,
    pub line_total: Money,
}

/// A fully priced cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    /// Σ line totals at full precision.
    pub total: Money,
}

impl PricedCart {
    /// Total quantity per product, in first-seen order.
    ///
    /// A product appearing on two lines is decremented once by the sum.
    pub fn stock_demand(&self) -> Vec<(String, i64)> {
        aggregate_demand(
            self.lines
                .iter()
                .map(|l| (l.product_id.as_str(), l.quantity)),
        )
    }
}

/// Computes a line's taxed total: `unit_price × (1 + tax/100) × quantity`.
///
/// ## Example
/// ```rust
/// use bazaar_core::checkout::line_total;
/// use bazaar_core::money::Money;
/// use bazaar_core::types::TaxRate;
///
/// let total = line_total(Money::from_cents(1000), TaxRate::from_bps(1000), 2);
/// assert_eq!(total, Money::from_cents(2200));
/// ```
pub fn line_total(unit_price: Money, tax_rate: TaxRate, quantity: i64) -> Money {
    unit_price.with_tax(tax_rate) * quantity
}

/// Prices a validated cart against the shop's products.
///
/// ## Arguments
/// * `lines` - Cart lines (already passed `CheckoutRequest::validate`)
/// * `products` - Products of the caller's shop, keyed by id
///
/// ## Errors
/// * `ProductNotFound` - a line references a product not in `products`.
///   The whole cart is rejected, no line is skipped.
/// * `InsufficientStock` - the summed quantity for a product exceeds its
///   stock. The first offending product in cart order is reported.
pub fn price_cart(lines: &[CartLine], products: &HashMap<String, Product>) -> CoreResult<PricedCart> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    for line in lines {
        if !products.contains_key(&line.product_id) {
            return Err(CoreError::ProductNotFound(line.product_id.clone()));
        }
    }

    let demand = aggregate_demand(lines.iter().map(|l| (l.product_id.as_str(), l.quantity)));
    for (product_id, requested) in &demand {
        let product = &products[product_id];
        if !product.can_sell(*requested) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
                available: product.stock,
                requested: *requested,
            });
        }
    }

    let priced: Vec<PricedLine> = lines
        .iter()
        .map(|line| {
            let product = &products[&line.product_id];
            PricedLine {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                tax_rate: product.tax_rate,
                line_total: line_total(line.unit_price, product.tax_rate, line.quantity),
            }
        })
        .collect();

    let total = priced.iter().map(|l| l.line_total).sum();

    Ok(PricedCart {
        lines: priced,
        total,
    })
}

fn aggregate_demand<'a>(lines: impl Iterator<Item = (&'a str, i64)>) -> Vec<(String, i64)> {
    let mut demand: Vec<(String, i64)> = Vec::new();
    for (product_id, qty) in lines {
        match demand.iter_mut().find(|(id, _)| id == product_id) {
            Some((_, total)) => *total += qty,
            None => demand.push((product_id.to_string(), qty)),
        }
    }
    demand
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn product(id: &str, name: &str, stock: i64, tax_bps: u32) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            shop_id: "shop-1".to_string(),
            name: name.to_string(),
            barcode: None,
            category: None,
            stock,
            buy_price: Money::from_cents(600),
            sell_price: Money::from_cents(1000),
            tax_rate: TaxRate::from_bps(tax_bps),
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<String, Product> {
        products.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    fn request(lines: Vec<CartLine>, method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            lines,
            customer: None,
            payment_method: method,
            notes: None,
        }
    }

    #[test]
    fn test_price_single_line_with_tax() {
        let products = catalog(vec![product("a", "Tea", 5, 1000)]);
        let lines = vec![CartLine::new("a", 2, Money::from_cents(1000))];

        let priced = price_cart(&lines, &products).unwrap();

        assert_eq!(priced.total.amount(), dec!(22));
        assert_eq!(priced.lines[0].product_name, "Tea");
        assert_eq!(priced.lines[0].tax_rate, TaxRate::from_bps(1000));
    }

    #[test]
    fn test_total_is_sum_of_lines_at_full_precision() {
        let products = catalog(vec![
            product("a", "Tea", 50, 825),
            product("b", "Rice", 50, 0),
            product("c", "Soap", 50, 1400),
        ]);
        let lines = vec![
            CartLine::new("a", 3, Money::from_cents(1099)),
            CartLine::new("b", 1, Money::from_cents(250)),
            CartLine::new("c", 7, Money::from_cents(333)),
        ];

        let priced = price_cart(&lines, &products).unwrap();

        let expected = dec!(10.99) * dec!(1.0825) * dec!(3)
            + dec!(2.50)
            + dec!(3.33) * dec!(1.14) * dec!(7);
        assert_eq!(priced.total.amount(), expected);
        let sum: Money = priced.lines.iter().map(|l| l.line_total).sum();
        assert_eq!(sum, priced.total);
    }

    #[test]
    fn test_unit_price_overrides_list_price() {
        let products = catalog(vec![product("a", "Tea", 5, 0)]);
        let lines = vec![CartLine::new("a", 1, Money::from_cents(800))];

        let priced = price_cart(&lines, &products).unwrap();
        assert_eq!(priced.total, Money::from_cents(800));
    }

    #[test]
    fn test_missing_product_rejects_whole_cart() {
        let products = catalog(vec![product("a", "Tea", 5, 0)]);
        let lines = vec![
            CartLine::new("a", 1, Money::from_cents(100)),
            CartLine::new("ghost", 1, Money::from_cents(100)),
        ];

        let err = price_cart(&lines, &products).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == "ghost"));
    }

    #[test]
    fn test_insufficient_stock_names_product() {
        let products = catalog(vec![product("a", "Tea", 1, 1000)]);
        let lines = vec![CartLine::new("a", 2, Money::from_cents(1000))];

        let err = price_cart(&lines, &products).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => {
                assert_eq!(product_id, "a");
                assert_eq!(name, "Tea");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_lines_are_summed_for_stock_check() {
        let products = catalog(vec![product("a", "Tea", 3, 0)]);
        let lines = vec![
            CartLine::new("a", 2, Money::from_cents(100)),
            CartLine::new("a", 2, Money::from_cents(100)),
        ];

        let err = price_cart(&lines, &products).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { requested: 4, available: 3, .. }
        ));
    }

    #[test]
    fn test_stock_demand_aggregates_in_cart_order() {
        let products = catalog(vec![
            product("a", "Tea", 10, 0),
            product("b", "Rice", 10, 0),
        ]);
        let lines = vec![
            CartLine::new("b", 1, Money::from_cents(100)),
            CartLine::new("a", 2, Money::from_cents(100)),
            CartLine::new("b", 3, Money::from_cents(100)),
        ];

        let priced = price_cart(&lines, &products).unwrap();
        assert_eq!(
            priced.stock_demand(),
            vec![("b".to_string(), 4), ("a".to_string(), 2)]
        );
    }

    #[test]
    fn test_validate_rejects_empty_cart() {
        let req = request(vec![], PaymentMethod::Cash);
        assert!(matches!(req.validate(), Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_validate_rejects_bad_lines() {
        let req = request(
            vec![CartLine::new("a", 0, Money::from_cents(100))],
            PaymentMethod::Cash,
        );
        assert!(matches!(req.validate(), Err(CoreError::Validation(_))));

        let req = request(
            vec![CartLine::new("a", 1, Money::from_cents(-100))],
            PaymentMethod::Cash,
        );
        assert!(matches!(req.validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_validate_debt_requires_customer() {
        let lines = vec![CartLine::new("a", 1, Money::from_cents(100))];
        let mut req = request(lines, PaymentMethod::Debt);
        assert!(req.validate().is_err());

        req.customer = Some(CustomerRef::Existing { id: "c-1".into() });
        assert!(req.validate().is_ok());
        assert_eq!(req.initial_status(), InvoiceStatus::Pending);
    }

    #[test]
    fn test_product_ids_deduplicated() {
        let req = request(
            vec![
                CartLine::new("a", 1, Money::zero()),
                CartLine::new("b", 1, Money::zero()),
                CartLine::new("a", 1, Money::zero()),
            ],
            PaymentMethod::Cash,
        );
        assert_eq!(req.product_ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
