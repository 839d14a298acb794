//! Shared fixtures for the integration tests.
//!
//! Every fixture runs against its own in-memory SQLite database.

#![allow(dead_code)]

use bazaar_core::checkout::{CartLine, CheckoutRequest};
use bazaar_core::{
    CustomerRef, Money, NewCustomer, NewShop, NewUser, PaymentMethod, Principal, Product,
    ProductInput, Role, Shop, TaxRate,
};
use bazaar_db::{Database, DbConfig, ShopScope};

pub const PASSWORD: &str = "test-password-1";

/// A database with one platform admin and one registered shop.
pub struct Fixture {
    pub db: Database,
    pub admin: Principal,
    pub shop: Shop,
    pub owner: Principal,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database");

        let admin = db
            .create_admin("platform", PASSWORD)
            .await
            .expect("admin account")
            .principal();

        let (shop, owner) = register(&db, "Corner Store", "owner").await;

        Fixture {
            db,
            admin,
            shop,
            owner,
        }
    }

    /// The owner's view of the shop.
    pub fn scope(&self) -> ShopScope {
        self.db.shop(&self.owner).expect("owner scope")
    }

    /// A cashier account in the fixture shop.
    pub async fn cashier(&self) -> ShopScope {
        let user = self
            .scope()
            .staff()
            .add_cashier(&NewUser {
                username: "till-1".to_string(),
                password: PASSWORD.to_string(),
                role: Role::Cashier,
            })
            .await
            .expect("cashier account");

        self.db.shop(&user.principal()).expect("cashier scope")
    }
}

/// Registers another shop and returns it with its owner.
pub async fn register(db: &Database, name: &str, username: &str) -> (Shop, Principal) {
    let (shop, owner) = db
        .register_shop(
            &NewShop {
                name: name.to_string(),
                ..NewShop::default()
            },
            &NewUser {
                username: username.to_string(),
                password: PASSWORD.to_string(),
                role: Role::Owner,
            },
        )
        .await
        .expect("shop registration");

    (shop, owner.principal())
}

/// Creates a product with the given stock, price and tax.
pub async fn product(scope: &ShopScope, name: &str, stock: i64, cents: i64, tax_bps: u32) -> Product {
    scope
        .products()
        .create(&ProductInput {
            name: name.to_string(),
            barcode: None,
            category: None,
            stock,
            buy_price: Money::zero(),
            sell_price: Money::from_cents(cents),
            tax_rate: TaxRate::from_bps(tax_bps),
        })
        .await
        .expect("product")
}

/// A cart line at the product's list price.
pub fn line(product: &Product, quantity: i64) -> CartLine {
    CartLine::new(&product.id, quantity, product.sell_price)
}

/// An anonymous sale.
pub fn cash_sale(lines: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        lines,
        customer: None,
        payment_method: PaymentMethod::Cash,
        notes: None,
    }
}

/// A sale on account for an existing customer.
pub fn debt_sale(lines: Vec<CartLine>, customer_id: &str) -> CheckoutRequest {
    CheckoutRequest {
        lines,
        customer: Some(CustomerRef::Existing {
            id: customer_id.to_string(),
        }),
        payment_method: PaymentMethod::Debt,
        notes: None,
    }
}

pub fn new_customer(name: &str, phone: Option<&str>) -> NewCustomer {
    NewCustomer {
        name: name.to_string(),
        phone: phone.map(str::to_string),
        ..NewCustomer::default()
    }
}
