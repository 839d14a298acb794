//! Checkout against a real database: pricing, stock, customers and races.

mod common;

use bazaar_core::checkout::CheckoutRequest;
use bazaar_core::{CoreError, CustomerRef, ErrorKind, InvoiceStatus, Money, PaymentMethod};
use bazaar_db::{Database, DbConfig, DbError};
use common::{cash_sale, debt_sale, line, new_customer, product, register, Fixture};

#[tokio::test]
async fn test_cash_sale_prices_with_tax_and_takes_stock() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 5, 1000, 1000).await;

    let detail = shop
        .invoices()
        .create_invoice(&cash_sale(vec![line(&tea, 2)]))
        .await
        .unwrap();

    assert_eq!(detail.invoice.total_amount, Money::from_cents(2200));
    assert_eq!(detail.invoice.status, InvoiceStatus::Paid);
    assert_eq!(detail.invoice.payment_method, Some(PaymentMethod::Cash));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].product_name, "Black Tea");
    assert_eq!(detail.items[0].line_total, Money::from_cents(2200));

    let tea = shop.products().get(&tea.id).await.unwrap();
    assert_eq!(tea.stock, 3);

    let stored = shop.invoices().get_invoice(&detail.invoice.id).await.unwrap();
    assert_eq!(stored.invoice.total_amount, Money::from_cents(2200));
    assert_eq!(stored.items.len(), 1);
}

#[tokio::test]
async fn test_insufficient_stock_changes_nothing() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 5, 1000, 0).await;
    let rice = product(&shop, "Rice", 1, 300, 0).await;

    let err = shop
        .invoices()
        .create_invoice(&cash_sale(vec![line(&tea, 2), line(&rice, 3)]))
        .await
        .unwrap_err();

    match err {
        DbError::Domain(CoreError::InsufficientStock {
            product_id,
            available,
            requested,
            ..
        }) => {
            assert_eq!(product_id, rice.id);
            assert_eq!(available, 1);
            assert_eq!(requested, 3);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(shop.products().get(&tea.id).await.unwrap().stock, 5);
    assert_eq!(shop.products().get(&rice.id).await.unwrap().stock, 1);
    assert!(shop.invoices().list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_product_lines_are_checked_together() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let cola = product(&shop, "Cola", 3, 150, 0).await;

    let err = shop
        .invoices()
        .create_invoice(&cash_sale(vec![line(&cola, 2), line(&cola, 2)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InsufficientStock));
    assert_eq!(shop.products().get(&cola.id).await.unwrap().stock, 3);

    let detail = shop
        .invoices()
        .create_invoice(&cash_sale(vec![line(&cola, 1), line(&cola, 2)]))
        .await
        .unwrap();
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.invoice.total_amount, Money::from_cents(450));
    assert_eq!(shop.products().get(&cola.id).await.unwrap().stock, 0);
}

#[tokio::test]
async fn test_missing_product_aborts_whole_cart() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 5, 1000, 0).await;

    let mut request = cash_sale(vec![line(&tea, 1)]);
    request.lines.push(bazaar_core::checkout::CartLine::new(
        "no-such-product",
        1,
        Money::from_cents(100),
    ));

    let err = shop.invoices().create_invoice(&request).await.unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(ref id)) if id == "no-such-product"));
    assert_eq!(shop.products().get(&tea.id).await.unwrap().stock, 5);
}

#[tokio::test]
async fn test_other_shops_products_are_invisible() {
    let fx = Fixture::new().await;
    let (_, rival_owner) = register(&fx.db, "Rival Store", "rival").await;
    let rival = fx.db.shop(&rival_owner).unwrap();
    let theirs = product(&rival, "Saffron", 10, 900, 0).await;

    let err = fx
        .scope()
        .invoices()
        .create_invoice(&cash_sale(vec![line(&theirs, 1)]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    assert_eq!(rival.products().get(&theirs.id).await.unwrap().stock, 10);
    assert!(fx.scope().products().get(&theirs.id).await.is_err());
}

#[tokio::test]
async fn test_debt_sale_raises_customer_balance() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 5, 1000, 1000).await;
    let amina = shop
        .customers()
        .create(&new_customer("Amina", Some("0700 111 222")))
        .await
        .unwrap();

    let detail = shop
        .invoices()
        .create_invoice(&debt_sale(vec![line(&tea, 2)], &amina.id))
        .await
        .unwrap();

    assert_eq!(detail.invoice.status, InvoiceStatus::Pending);
    assert_eq!(detail.invoice.customer_id.as_deref(), Some(amina.id.as_str()));
    assert_eq!(detail.invoice.customer_name.as_deref(), Some("Amina"));
    assert_eq!(detail.invoice.customer_phone.as_deref(), Some("0700 111 222"));

    let amina = shop.customers().get(&amina.id).await.unwrap();
    assert_eq!(amina.balance, Money::from_cents(2200));
}

#[tokio::test]
async fn test_new_customer_at_till_is_reused_by_phone() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 10, 500, 0).await;

    let typed_in = |name: &str| CheckoutRequest {
        lines: vec![line(&tea, 1)],
        customer: Some(CustomerRef::New(new_customer(name, Some("555-0199")))),
        payment_method: PaymentMethod::Debt,
        notes: None,
    };

    let first = shop.invoices().create_invoice(&typed_in("Omar")).await.unwrap();
    let second = shop
        .invoices()
        .create_invoice(&typed_in("Omar K."))
        .await
        .unwrap();

    assert_eq!(first.invoice.customer_id, second.invoice.customer_id);

    let customers = shop.customers().list().await.unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].name, "Omar");
    assert_eq!(customers[0].balance, Money::from_cents(1000));
}

#[tokio::test]
async fn test_debt_sale_needs_a_customer() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 5, 1000, 0).await;

    let mut request = cash_sale(vec![line(&tea, 1)]);
    request.payment_method = PaymentMethod::Debt;

    let err = shop.invoices().create_invoice(&request).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Validation));
    assert_eq!(shop.products().get(&tea.id).await.unwrap().stock, 5);
}

#[tokio::test]
async fn test_unknown_customer_rolls_back_stock() {
    let fx = Fixture::new().await;
    let shop = fx.scope();
    let tea = product(&shop, "Black Tea", 5, 1000, 0).await;

    let err = shop
        .invoices()
        .create_invoice(&debt_sale(vec![line(&tea, 1)], "ghost"))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Domain(CoreError::CustomerNotFound(_))));
    assert_eq!(shop.products().get(&tea.id).await.unwrap().stock, 5);
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let fx = Fixture::new().await;

    let err = fx
        .scope()
        .invoices()
        .create_invoice(&cash_sale(Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));
}

#[tokio::test]
async fn test_cashier_can_sell() {
    let fx = Fixture::new().await;
    let tea = product(&fx.scope(), "Black Tea", 5, 1000, 0).await;
    let till = fx.cashier().await;

    let detail = till
        .invoices()
        .create_invoice(&cash_sale(vec![line(&tea, 1)]))
        .await
        .unwrap();

    assert_eq!(detail.invoice.shop_id, fx.shop.id);
    assert_eq!(till.products().get(&tea.id).await.unwrap().stock, 4);
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new(dir.path().join("race.db")).max_connections(4);
    let db = Database::new(config).await.unwrap();

    let (_, owner) = register(&db, "Race Shop", "racer").await;
    let shop = db.shop(&owner).unwrap();
    let last = product(&shop, "Last Loaf", 1, 250, 0).await;

    let request = cash_sale(vec![line(&last, 1)]);
    let first = shop.invoices();
    let second = shop.invoices();

    let (a, b) = tokio::join!(
        first.create_invoice(&request),
        second.create_invoice(&request)
    );

    let results = [a, b];
    let sold = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(sold, 1);

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                err.kind(),
                Some(ErrorKind::InsufficientStock) | Some(ErrorKind::ConcurrencyConflict)
            ),
            "unexpected error: {err:?}"
        );
    }

    assert_eq!(shop.products().get(&last.id).await.unwrap().stock, 0);
    assert_eq!(shop.invoices().list_all().await.unwrap().len(), 1);

    db.close().await;
}
