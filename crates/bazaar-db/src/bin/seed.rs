//! # Seed Data Generator
//!
//! Populates a database with a demo shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./bazaar_dev.db with 40 products (default)
//! cargo run -p bazaar-db --bin seed
//!
//! # Custom product count and database path
//! cargo run -p bazaar-db --bin seed -- --count 200 --db ./data/bazaar.db
//! ```
//!
//! ## Generated Data
//! - Platform admin `admin` / `admin-pass-123`
//! - Shop "Demo Bazaar" with owner `demo` / `demo-pass-123` and a
//!   one-month subscription
//! - Products across a few categories, with varied prices and tax, some
//!   of them low on stock
//! - Two customers, one cash sale and one debt sale
//! - One expense

use std::env;

use bazaar_core::checkout::{CartLine, CheckoutRequest};
use bazaar_core::{
    CustomerRef, Money, NewCustomer, NewExpense, NewShop, NewUser, PaymentMethod, ProductInput,
    Role, TaxRate,
};
use bazaar_db::{Database, DbConfig, UserRepository};

/// Product names per category for realistic test data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Beverages",
        &["Black Tea", "Green Tea", "Coffee Beans", "Mineral Water", "Orange Juice", "Cola"],
    ),
    (
        "Grocery",
        &["Basmati Rice", "Lentils", "Chickpeas", "Flour", "Sugar", "Olive Oil"],
    ),
    (
        "Household",
        &["Dish Soap", "Laundry Powder", "Sponges", "Bin Bags", "Candles"],
    ),
    (
        "Spices",
        &["Cumin", "Saffron", "Black Pepper", "Cinnamon", "Cardamom", "Turmeric"],
    ),
];

/// Tax rates in basis points.
const TAX_RATES: &[u32] = &[0, 500, 825, 1000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut count: usize = 40;
    let mut db_path = String::from("./bazaar_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bazaar POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./bazaar_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Bazaar POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let users = UserRepository::new(db.pool().clone());
    if users.find_by_username("demo").await?.is_some() {
        println!("⚠ Database already has the demo shop");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admin = db.create_admin("admin", "admin-pass-123").await?;
    println!("✓ Admin account: {}", admin.username);

    let (shop, owner) = db
        .register_shop(
            &NewShop {
                name: "Demo Bazaar".to_string(),
                phone: Some("+1 555 0100".to_string()),
                address: Some("1 Market Street".to_string()),
                ..NewShop::default()
            },
            &NewUser {
                username: "demo".to_string(),
                password: "demo-pass-123".to_string(),
                role: Role::Owner,
            },
        )
        .await?;
    println!("✓ Shop '{}' with owner '{}'", shop.name, owner.username);

    db.admin(&admin.principal())?
        .renew(&shop.id, "1 Month", Money::from_cents(2900))
        .await?;
    println!("✓ Subscription: 1 Month");

    let scope = db.shop(&owner.principal())?;

    let mut created = Vec::new();
    let mut seed = 0usize;
    'outer: for (category, names) in CATEGORIES {
        for name in names.iter() {
            for pack in ["250g", "500g", "1kg"] {
                if created.len() >= count {
                    break 'outer;
                }
                let product = scope.products().create(&generate_product(category, name, pack, seed)).await?;
                created.push(product);
                seed += 1;
            }
        }
    }
    println!("✓ Generated {} products", created.len());

    let walk_in = scope
        .customers()
        .create(&NewCustomer {
            name: "Walk-in Regular".to_string(),
            phone: Some("+1 555 0111".to_string()),
            ..NewCustomer::default()
        })
        .await?;

    if created.len() >= 2 {
        let cash_sale = CheckoutRequest {
            lines: vec![
                CartLine::new(&created[0].id, 2, created[0].sell_price),
                CartLine::new(&created[1].id, 1, created[1].sell_price),
            ],
            customer: None,
            payment_method: PaymentMethod::Cash,
            notes: None,
        };
        let sale = scope.invoices().create_invoice(&cash_sale).await?;
        println!("✓ Cash sale {} total {}", sale.invoice.id, sale.invoice.total_amount);

        let debt_sale = CheckoutRequest {
            lines: vec![CartLine::new(&created[1].id, 3, created[1].sell_price)],
            customer: Some(CustomerRef::Existing {
                id: walk_in.id.clone(),
            }),
            payment_method: PaymentMethod::Debt,
            notes: Some("Pays on Friday".to_string()),
        };
        let sale = scope.invoices().create_invoice(&debt_sale).await?;
        println!("✓ Debt sale {} total {}", sale.invoice.id, sale.invoice.total_amount);
    }

    scope
        .expenses()
        .create(&NewExpense {
            description: "Shop rent".to_string(),
            amount: Money::from_cents(45_000),
            category: Some("Rent".to_string()),
            spent_at: None,
        })
        .await?;
    println!("✓ Expense recorded");

    println!();
    println!("✓ Seed complete!");
    println!("  Log in as 'demo' / 'demo-pass-123'");

    Ok(())
}

/// Generates one product input with deterministic but varied data.
fn generate_product(category: &str, name: &str, pack: &str, seed: usize) -> ProductInput {
    // 1.99 - 9.99
    let sell_cents = 199 + ((seed * 17) % 800) as i64;
    // 60-80% of the sell price
    let buy_cents = sell_cents * (60 + (seed % 20) as i64) / 100;

    ProductInput {
        name: format!("{} {}", name, pack),
        barcode: Some(format!("590{:010}", seed)),
        category: Some(category.to_string()),
        // Every ninth product starts low on stock
        stock: if seed % 9 == 4 { 2 } else { 10 + ((seed * 7) % 50) as i64 },
        buy_price: Money::from_cents(buy_cents),
        sell_price: Money::from_cents(sell_cents),
        tax_rate: TaxRate::from_bps(TAX_RATES[seed % TAX_RATES.len()]),
    }
}
