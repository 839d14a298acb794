//! # Dashboard Reporting
//!
//! Month-to-date figures for the shop dashboard, computed in process over
//! rows the caller has already loaded.
//!
//! All day and month boundaries are midnight UTC.

use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Customer, Expense, Invoice, InvoiceStatus, Product};

/// Summary shown on the shop's landing screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Sales since midnight UTC, refunds excluded.
    pub today_sales: Money,
    /// Sales since the first of the month, refunds excluded.
    pub month_sales: Money,
    pub month_expenses: Money,
    /// `month_sales - month_expenses`.
    pub net: Money,
    /// Σ of positive customer balances.
    pub outstanding_debt: Money,
    pub pending_invoices: usize,
    pub low_stock_products: usize,
    pub invoice_count_today: usize,
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
}

/// Midnight UTC on the first day of the month containing `now`.
pub fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    let day = start_of_day(now);
    day - chrono::Duration::days(i64::from(now.day0()))
}

/// Builds the dashboard summary.
///
/// ## Example
/// ```rust
/// use bazaar_core::report::summarize;
/// use chrono::Utc;
///
/// let summary = summarize(Utc::now(), &[], &[], &[], &[], 5);
/// assert!(summary.month_sales.is_zero());
/// ```
pub fn summarize(
    now: DateTime<Utc>,
    invoices: &[Invoice],
    expenses: &[Expense],
    customers: &[Customer],
    products: &[Product],
    low_stock_threshold: i64,
) -> DashboardSummary {
    let today = start_of_day(now);
    let month = start_of_month(now);

    let counted = || {
        invoices
            .iter()
            .filter(|i| i.status != InvoiceStatus::Refunded && i.created_at <= now)
    };

    let today_invoices: Vec<&Invoice> = counted().filter(|i| i.created_at >= today).collect();
    let today_sales: Money = today_invoices.iter().map(|i| i.total_amount).sum();
    let month_sales: Money = counted()
        .filter(|i| i.created_at >= month)
        .map(|i| i.total_amount)
        .sum();

    let month_expenses: Money = expenses
        .iter()
        .filter(|e| e.spent_at >= month && e.spent_at <= now)
        .map(|e| e.amount)
        .sum();

    let outstanding_debt: Money = customers
        .iter()
        .filter(|c| c.balance.is_positive())
        .map(|c| c.balance)
        .sum();

    DashboardSummary {
        today_sales,
        month_sales,
        month_expenses,
        net: month_sales - month_expenses,
        outstanding_debt,
        pending_invoices: invoices
            .iter()
            .filter(|i| i.status == InvoiceStatus::Pending)
            .count(),
        low_stock_products: products
            .iter()
            .filter(|p| p.is_low_stock(low_stock_threshold))
            .count(),
        invoice_count_today: today_invoices.len(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, TaxRate};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 14, 30, 0).unwrap()
    }

    fn invoice(cents: i64, status: InvoiceStatus, at: DateTime<Utc>) -> Invoice {
        Invoice {
            id: uuid::Uuid::new_v4().to_string(),
            shop_id: "s".into(),
            created_at: at,
            total_amount: Money::from_cents(cents),
            status,
            payment_method: Some(PaymentMethod::Cash),
            customer_id: None,
            customer_name: None,
            customer_phone: None,
            notes: None,
        }
    }

    fn expense(cents: i64, at: DateTime<Utc>) -> Expense {
        Expense {
            id: "e".into(),
            shop_id: "s".into(),
            description: "rent".into(),
            amount: Money::from_cents(cents),
            category: None,
            spent_at: at,
        }
    }

    fn customer(cents: i64) -> Customer {
        Customer {
            id: "c".into(),
            shop_id: "s".into(),
            name: "Ali".into(),
            phone: None,
            email: None,
            notes: None,
            balance: Money::from_cents(cents),
            created_at: now(),
        }
    }

    fn product(stock: i64) -> Product {
        Product {
            id: "p".into(),
            shop_id: "s".into(),
            name: "Tea".into(),
            barcode: None,
            category: None,
            stock,
            buy_price: Money::zero(),
            sell_price: Money::from_cents(100),
            tax_rate: TaxRate::zero(),
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(
            start_of_day(now()),
            Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            start_of_month(now()),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_sales_exclude_refunds() {
        let invoices = vec![
            invoice(1000, InvoiceStatus::Paid, now() - Duration::hours(1)),
            invoice(500, InvoiceStatus::Pending, now() - Duration::hours(2)),
            invoice(9900, InvoiceStatus::Refunded, now() - Duration::hours(3)),
            invoice(2000, InvoiceStatus::Paid, now() - Duration::days(3)),
            invoice(7000, InvoiceStatus::Paid, now() - Duration::days(40)),
        ];

        let summary = summarize(now(), &invoices, &[], &[], &[], 5);

        assert_eq!(summary.today_sales, Money::from_cents(1500));
        assert_eq!(summary.month_sales, Money::from_cents(3500));
        assert_eq!(summary.invoice_count_today, 2);
        assert_eq!(summary.pending_invoices, 1);
    }

    #[test]
    fn test_net_and_debt() {
        let invoices = vec![invoice(10_000, InvoiceStatus::Paid, now())];
        let expenses = vec![
            expense(2500, now() - Duration::days(2)),
            expense(99_999, now() - Duration::days(60)),
        ];
        let customers = vec![customer(1200), customer(-300), customer(0)];

        let summary = summarize(now(), &invoices, &expenses, &customers, &[], 5);

        assert_eq!(summary.month_expenses, Money::from_cents(2500));
        assert_eq!(summary.net, Money::from_cents(7500));
        assert_eq!(summary.outstanding_debt, Money::from_cents(1200));
    }

    #[test]
    fn test_low_stock_count_uses_threshold() {
        let products = vec![product(0), product(5), product(6), product(40)];
        let summary = summarize(now(), &[], &[], &[], &products, 5);
        assert_eq!(summary.low_stock_products, 2);
    }
}
