//! # Bazaar Console
//!
//! Back-office command line for Bazaar POS.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bazaar Console                                   │
//! │                                                                         │
//! │  bazaar.toml + BAZAAR_* ───► ConsoleConfig ───► Database (SQLite)      │
//! │                                                     │                   │
//! │  --user / --password ───► authenticate ───► Principal                  │
//! │                                                     │                   │
//! │                              ┌──────────────────────┴──────┐            │
//! │                              ▼                             ▼            │
//! │                         AdminPanel                    ShopScope         │
//! │                    shops, renew, toggle,        checkout, pay, refund, │
//! │                    delete-shop                   dashboard              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```bash
//! bazaar migrate
//! bazaar create-admin --admin-user root --admin-password 'long-secret-1'
//! bazaar register --name "Corner Store" --owner amina --owner-password 's3cret-pass'
//! bazaar -u root -p 'long-secret-1' renew <shop-id> "6 Months" 120.00
//! bazaar -u amina -p 's3cret-pass' checkout cart.json
//! ```
//!
//! Results are printed as JSON on stdout. Failures print
//! `{"code": ..., "message": ...}` on stderr and exit with status 1.

mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use bazaar_core::checkout::CheckoutRequest;
use bazaar_core::{Money, NewShop, NewUser, Principal, Role};
use bazaar_db::{Database, ShopScope};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::ConsoleConfig;
use crate::error::{ApiError, ErrorCode};

#[derive(Parser)]
#[command(name = "bazaar", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./bazaar.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configuration
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Username to act as
    #[arg(short, long, global = true, env = "BAZAAR_USER")]
    user: Option<String>,

    /// Password of that user
    #[arg(short, long, global = true, env = "BAZAAR_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Shop to act in (platform admins only)
    #[arg(long, global = true)]
    shop: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending schema migrations
    Migrate,

    /// Create a platform administrator account
    CreateAdmin {
        #[arg(long = "admin-user")]
        username: String,
        #[arg(long = "admin-password")]
        password: String,
    },

    /// Register a shop together with its owner account
    Register {
        /// Shop name
        #[arg(long)]
        name: String,
        /// Owner username
        #[arg(long)]
        owner: String,
        #[arg(long)]
        owner_password: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// ISO 4217 code, e.g. USD
        #[arg(long)]
        currency: Option<String>,
    },

    /// List every shop with its access state (admin)
    Shops,

    /// Renew a shop's subscription (admin)
    Renew {
        shop_id: String,
        /// "1 Month", "6 Months" or "1 Year"
        plan: String,
        /// Amount paid
        amount: Money,
    },

    /// Show a shop's renewal history (admin)
    History { shop_id: String },

    /// Switch a shop's activation on or off (admin)
    Toggle { shop_id: String },

    /// Delete a shop and all of its data (admin)
    DeleteShop { shop_id: String },

    /// Create an invoice from a JSON cart file
    Checkout {
        /// Path to a JSON checkout request
        cart: PathBuf,
    },

    /// Settle a pending invoice
    Pay { invoice_id: String },

    /// Refund an invoice
    Refund { invoice_id: String },

    /// Show today's and this month's figures
    Dashboard,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match ConsoleConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", ApiError::new(ErrorCode::ConfigError, err.to_string()));
            return ExitCode::FAILURE;
        }
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }

    init_tracing(&config.log_filter);

    match run(cli, config).await {
        Ok(output) => {
            match serde_json::to_string_pretty(&output) {
                Ok(json) => println!("{}", json),
                Err(_) => println!("{}", output),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            debug!(error = ?err, "Command failed");
            eprintln!("{}", ApiError::from_anyhow(&err));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, config: ConsoleConfig) -> anyhow::Result<Value> {
    info!(database = %config.database_path.display(), "Opening database");

    if let Command::Migrate = cli.command {
        let db = Database::new(config.db_config().run_migrations(false)).await?;
        db.run_migrations().await?;
        let (total, applied) = bazaar_db::migrations::migration_status(db.pool()).await?;
        db.close().await;
        return Ok(json!({ "total": total, "applied": applied }));
    }

    let db = Database::new(config.db_config()).await?;
    let output = dispatch(&db, &cli).await;
    db.close().await;
    output
}

async fn dispatch(db: &Database, cli: &Cli) -> anyhow::Result<Value> {
    match &cli.command {
        Command::Migrate => Ok(Value::Null),

        Command::CreateAdmin { username, password } => {
            let user = db.create_admin(username, password).await?;
            Ok(json!({ "id": user.id, "username": user.username }))
        }

        Command::Register {
            name,
            owner,
            owner_password,
            phone,
            address,
            email,
            currency,
        } => {
            let shop = NewShop {
                name: name.clone(),
                phone: phone.clone(),
                address: address.clone(),
                email: email.clone(),
                currency: currency.clone(),
                low_stock_threshold: None,
            };
            let owner = NewUser {
                username: owner.clone(),
                password: owner_password.clone(),
                role: Role::Owner,
            };

            let (shop, owner) = db.register_shop(&shop, &owner).await?;
            Ok(json!({ "shop": shop, "owner": { "id": owner.id, "username": owner.username } }))
        }

        Command::Shops => {
            let admin = db.admin(&login(db, cli).await?)?;
            Ok(serde_json::to_value(admin.list_shops(Utc::now()).await?)?)
        }

        Command::Renew {
            shop_id,
            plan,
            amount,
        } => {
            let admin = db.admin(&login(db, cli).await?)?;
            let (shop, subscription) = admin.renew(shop_id, plan, *amount).await?;
            Ok(json!({ "shop": shop, "subscription": subscription }))
        }

        Command::History { shop_id } => {
            let admin = db.admin(&login(db, cli).await?)?;
            Ok(serde_json::to_value(admin.subscription_history(shop_id).await?)?)
        }

        Command::Toggle { shop_id } => {
            let admin = db.admin(&login(db, cli).await?)?;
            let is_active = admin.toggle_active(shop_id).await?;
            Ok(json!({ "shop_id": shop_id, "is_active": is_active }))
        }

        Command::DeleteShop { shop_id } => {
            let admin = db.admin(&login(db, cli).await?)?;
            let deletion = admin.delete_shop(shop_id).await?;
            Ok(serde_json::to_value(deletion)?)
        }

        Command::Checkout { cart } => {
            let scope = shop_scope(db, cli).await?;
            let raw = std::fs::read_to_string(cart)
                .with_context(|| format!("reading cart file {}", cart.display()))?;
            let request: CheckoutRequest = serde_json::from_str(&raw)
                .with_context(|| format!("parsing cart file {}", cart.display()))?;

            let detail = scope.invoices().create_invoice(&request).await?;
            Ok(serde_json::to_value(detail)?)
        }

        Command::Pay { invoice_id } => {
            let scope = shop_scope(db, cli).await?;
            Ok(serde_json::to_value(scope.invoices().pay_invoice(invoice_id).await?)?)
        }

        Command::Refund { invoice_id } => {
            let scope = shop_scope(db, cli).await?;
            Ok(serde_json::to_value(scope.invoices().refund_invoice(invoice_id).await?)?)
        }

        Command::Dashboard => {
            let scope = shop_scope(db, cli).await?;
            Ok(serde_json::to_value(scope.dashboard(Utc::now()).await?)?)
        }
    }
}

/// Authenticates the `--user` / `--password` pair.
async fn login(db: &Database, cli: &Cli) -> anyhow::Result<Principal> {
    let (Some(user), Some(password)) = (&cli.user, &cli.password) else {
        return Err(ApiError::new(
            ErrorCode::Unauthorized,
            "--user and --password (or BAZAAR_USER and BAZAAR_PASSWORD) are required",
        )
        .into());
    };

    Ok(db.authenticate(user, password).await?)
}

/// The shop the caller acts in: their own, or `--shop` for admins.
async fn shop_scope(db: &Database, cli: &Cli) -> anyhow::Result<ShopScope> {
    let principal = login(db, cli).await?;

    if principal.is_admin {
        let shop_id = cli.shop.as_deref().ok_or_else(|| {
            ApiError::new(ErrorCode::ValidationError, "--shop is required for platform admins")
        })?;
        return Ok(db.admin(&principal)?.shop_scope(shop_id).await?);
    }

    Ok(db.shop(&principal)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_renew_parses_amount() {
        let cli = Cli::try_parse_from(["bazaar", "renew", "shop-1", "6 Months", "120.50"]).unwrap();

        match cli.command {
            Command::Renew {
                shop_id,
                plan,
                amount,
            } => {
                assert_eq!(shop_id, "shop-1");
                assert_eq!(plan, "6 Months");
                assert_eq!(amount, Money::from_cents(12050));
            }
            _ => panic!("expected renew"),
        }
    }

    #[test]
    fn test_demo_cart_parses() {
        let request: CheckoutRequest =
            serde_json::from_str(include_str!("../demos/cart.json")).unwrap();

        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].unit_price, Money::from_cents(1000));
        assert_eq!(request.payment_method, bazaar_core::PaymentMethod::Debt);
        assert!(matches!(request.customer, Some(bazaar_core::CustomerRef::New(_))));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_bad_amount_is_rejected() {
        assert!(Cli::try_parse_from(["bazaar", "renew", "shop-1", "1 Month", "lots"]).is_err());
    }
}
