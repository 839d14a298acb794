//! Catalogue, customers, expenses, staff, settings and the dashboard.

mod common;

use chrono::{Duration, TimeZone, Utc};

use bazaar_core::validation::MAX_STOCK;
use bazaar_core::{
    CoreError, ErrorKind, Money, NewExpense, NewUser, ProductInput, Role, ShopSettings, TaxRate,
    ValidationError,
};
use bazaar_db::DbError;
use common::{cash_sale, debt_sale, line, new_customer, product, Fixture, PASSWORD};

fn input(name: &str, barcode: Option<&str>, stock: i64) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        barcode: barcode.map(str::to_string),
        category: Some("Grocery".to_string()),
        stock,
        buy_price: Money::from_cents(100),
        sell_price: Money::from_cents(150),
        tax_rate: TaxRate::from_bps(500),
    }
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_product_crud() {
    let fx = Fixture::new().await;
    let products = fx.scope().products();

    let rice = products
        .create(&input("  Basmati Rice ", Some("590001"), 12))
        .await
        .unwrap();
    assert_eq!(rice.name, "Basmati Rice");

    let found = products.find_by_barcode("590001").await.unwrap().unwrap();
    assert_eq!(found.id, rice.id);

    let mut changed = input("Basmati Rice 5kg", Some("590001"), 8);
    changed.sell_price = Money::from_cents(899);
    let updated = products.update(&rice.id, &changed).await.unwrap();
    assert_eq!(updated.name, "Basmati Rice 5kg");
    assert_eq!(updated.stock, 8);
    assert_eq!(updated.sell_price, Money::from_cents(899));

    products.delete(&rice.id).await.unwrap();
    assert!(products.list().await.unwrap().is_empty());

    let err = products.delete(&rice.id).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_barcode_unique_per_shop() {
    let fx = Fixture::new().await;
    let products = fx.scope().products();

    products
        .create(&input("Cola", Some("123456"), 5))
        .await
        .unwrap();
    let err = products
        .create(&input("Cola Zero", Some("123456"), 5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::Validation(ValidationError::Duplicate { .. }))
    ));

    // Another shop may reuse the code.
    let (_, rival_owner) = common::register(&fx.db, "Rival Store", "rival").await;
    let rival = fx.db.shop(&rival_owner).unwrap();
    assert!(rival
        .products()
        .create(&input("Cola", Some("123456"), 5))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_invalid_product_is_rejected() {
    let fx = Fixture::new().await;
    let products = fx.scope().products();

    let err = products.create(&input("", None, 5)).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));

    let err = products.create(&input("Cola", None, -1)).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));

    assert!(products.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_low_stock_and_restock() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let scarce = product(&shop, "Saffron", 2, 900, 0).await;
    product(&shop, "Flour", 40, 200, 0).await;

    let low = shop.products().low_stock().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].id, scarce.id);

    let restocked = shop.products().restock(&scarce.id, 10).await.unwrap();
    assert_eq!(restocked.stock, 12);
    assert!(shop.products().low_stock().await.unwrap().is_empty());

    let err = shop.products().restock(&scarce.id, 0).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));

    let err = shop.products().restock("missing", 3).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_restock_cannot_overflow_stock() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let cumin = product(&shop, "Cumin", 5, 300, 0).await;

    let err = shop.products().restock(&cumin.id, i64::MAX).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
    ));

    let err = shop.products().restock(&cumin.id, MAX_STOCK).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
    ));

    // Row is untouched and still decodes.
    let stored = shop.products().get(&cumin.id).await.unwrap();
    assert_eq!(stored.stock, 5);
    assert_eq!(shop.products().list().await.unwrap().len(), 1);

    let topped = shop.products().restock(&cumin.id, MAX_STOCK - 5).await.unwrap();
    assert_eq!(topped.stock, MAX_STOCK);

    let err = shop.products().restock("missing", MAX_STOCK).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_cashier_cannot_edit_catalogue() {
    let fx = Fixture::new().await;
    let tea = product(&fx.scope(), "Black Tea", 5, 1000, 0).await;
    let till = fx.cashier().await;

    let err = till.products().create(&input("Cola", None, 1)).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));

    let err = till.products().restock(&tea.id, 5).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));

    assert_eq!(till.products().list().await.unwrap().len(), 1);
}

// =============================================================================
// Customers
// =============================================================================

#[tokio::test]
async fn test_customer_phone_is_unique() {
    let fx = Fixture::new().await;
    let customers = fx.scope().customers();

    customers
        .create(&new_customer("Amina", Some("0700 111 222")))
        .await
        .unwrap();
    let err = customers
        .create(&new_customer("Someone Else", Some("0700 111 222")))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));

    let found = customers.find_by_phone("0700 111 222").await.unwrap().unwrap();
    assert_eq!(found.name, "Amina");
}

#[tokio::test]
async fn test_customer_with_debt_cannot_be_deleted() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 5, 1000, 0).await;
    let amina = shop
        .customers()
        .create(&new_customer("Amina", None))
        .await
        .unwrap();

    let sale = shop
        .invoices()
        .create_invoice(&debt_sale(vec![line(&tea, 1)], &amina.id))
        .await
        .unwrap();

    let err = shop.customers().delete(&amina.id).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));

    shop.invoices().pay_invoice(&sale.invoice.id).await.unwrap();
    shop.customers().delete(&amina.id).await.unwrap();

    // The invoice keeps the captured name.
    let detail = shop.invoices().get_invoice(&sale.invoice.id).await.unwrap();
    assert_eq!(detail.invoice.customer_id, None);
    assert_eq!(detail.invoice.customer_name.as_deref(), Some("Amina"));
}

#[tokio::test]
async fn test_customer_update() {
    let fx = Fixture::new().await;
    let customers = fx.scope().customers();
    let amina = customers
        .create(&new_customer("Amina", None))
        .await
        .unwrap();

    let updated = customers
        .update(&amina.id, &new_customer("Amina Yusuf", Some("0700 999 000")))
        .await
        .unwrap();
    assert_eq!(updated.name, "Amina Yusuf");
    assert_eq!(updated.phone.as_deref(), Some("0700 999 000"));
    assert!(updated.balance.is_zero());
}

// =============================================================================
// Expenses
// =============================================================================

#[tokio::test]
async fn test_expense_range_is_half_open() {
    let fx = Fixture::new().await;
    let expenses = fx.scope().expenses();
    let march_1 = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let april_1 = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();

    for (description, at) in [
        ("Rent", march_1),
        ("Electricity", march_1 + Duration::days(14)),
        ("April rent", april_1),
    ] {
        expenses
            .create(&NewExpense {
                description: description.to_string(),
                amount: Money::from_cents(10_000),
                category: None,
                spent_at: Some(at),
            })
            .await
            .unwrap();
    }

    let march = expenses.list_between(march_1, april_1).await.unwrap();
    assert_eq!(march.len(), 2);
    assert_eq!(march[0].description, "Electricity");
    assert_eq!(march[1].description, "Rent");

    assert!(expenses.list_between(april_1, march_1).await.is_err());
}

#[tokio::test]
async fn test_expense_amount_must_be_positive() {
    let fx = Fixture::new().await;
    let expenses = fx.scope().expenses();

    let err = expenses
        .create(&NewExpense {
            description: "Free lunch".to_string(),
            amount: Money::zero(),
            category: None,
            spent_at: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));

    let rent = expenses
        .create(&NewExpense {
            description: "Rent".to_string(),
            amount: Money::from_cents(45_000),
            category: Some("Rent".to_string()),
            spent_at: None,
        })
        .await
        .unwrap();
    expenses.delete(&rent.id).await.unwrap();
    assert!(expenses.list().await.unwrap().is_empty());
}

// =============================================================================
// Staff & Settings
// =============================================================================

#[tokio::test]
async fn test_staff_management() {
    let fx = Fixture::new().await;
    let staff = fx.scope().staff();

    let cashier = staff
        .add_cashier(&NewUser {
            username: "till-2".to_string(),
            // Requested role is ignored.
            role: Role::Owner,
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    assert_eq!(cashier.role, Role::Cashier);
    assert_eq!(staff.list().await.unwrap().len(), 2);

    let principal = fx.db.authenticate("till-2", PASSWORD).await.unwrap();
    assert_eq!(principal.role, Role::Cashier);
    assert_eq!(principal.shop_id.as_deref(), Some(fx.shop.id.as_str()));

    let err = staff.remove(&fx.owner.user_id).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));

    staff.remove(&cashier.id).await.unwrap();
    assert_eq!(staff.list().await.unwrap().len(), 1);
    assert!(fx.db.authenticate("till-2", PASSWORD).await.is_err());
}

#[tokio::test]
async fn test_usernames_are_global() {
    let fx = Fixture::new().await;

    let err = fx
        .scope()
        .staff()
        .add_cashier(&NewUser {
            username: "owner".to_string(),
            password: PASSWORD.to_string(),
            role: Role::Cashier,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));
}

#[tokio::test]
async fn test_settings_update() {
    let fx = Fixture::new().await;
    let shop = fx.scope();

    let settings = ShopSettings {
        name: "Corner Store & Cafe".to_string(),
        phone: Some("+1 555 0100".to_string()),
        address: None,
        email: None,
        tax_number: Some("TX-42".to_string()),
        footer_message: Some("Thank you!".to_string()),
        currency: "EUR".to_string(),
        low_stock_threshold: 10,
    };
    let updated = shop.update_settings(&settings).await.unwrap();
    assert_eq!(updated.name, "Corner Store & Cafe");
    assert_eq!(updated.currency, "EUR");
    assert_eq!(updated.low_stock_threshold, 10);

    let till = fx.cashier().await;
    let err = till.update_settings(&settings).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_summary() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 20, 1000, 0).await;
    product(&shop, "Saffron", 1, 900, 0).await;
    let amina = shop
        .customers()
        .create(&new_customer("Amina", None))
        .await
        .unwrap();

    shop.invoices()
        .create_invoice(&cash_sale(vec![line(&tea, 3)]))
        .await
        .unwrap();
    shop.invoices()
        .create_invoice(&debt_sale(vec![line(&tea, 2)], &amina.id))
        .await
        .unwrap();
    let refunded = shop
        .invoices()
        .create_invoice(&cash_sale(vec![line(&tea, 5)]))
        .await
        .unwrap();
    shop.invoices()
        .refund_invoice(&refunded.invoice.id)
        .await
        .unwrap();

    shop.expenses()
        .create(&NewExpense {
            description: "Electricity".to_string(),
            amount: Money::from_cents(1_500),
            category: None,
            spent_at: None,
        })
        .await
        .unwrap();

    let summary = shop.dashboard(Utc::now()).await.unwrap();
    assert_eq!(summary.today_sales, Money::from_cents(5_000));
    assert_eq!(summary.month_sales, Money::from_cents(5_000));
    assert_eq!(summary.month_expenses, Money::from_cents(1_500));
    assert_eq!(summary.net, Money::from_cents(3_500));
    assert_eq!(summary.outstanding_debt, Money::from_cents(2_000));
    assert_eq!(summary.pending_invoices, 1);
    assert_eq!(summary.invoice_count_today, 2);
    assert_eq!(summary.low_stock_products, 1);
}
