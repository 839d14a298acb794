//! # Database Pool Management
//!
//! Connection pool creation, configuration and the entry points that hand
//! out tenant-scoped access.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ├── authenticate(username, password) ──► Principal               │
//! │       │                                                                 │
//! │       ├── shop(&principal)  ──► ShopScope   (one shop's data only)     │
//! │       │                                                                 │
//! │       └── admin(&principal) ──► AdminPanel  (platform administrators)  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so readers don't block
//! the single writer. Write transactions that lose a race surface as
//! [`DbError::Busy`] and are retried by checkout.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use bazaar_core::subscription::check_access;
use bazaar_core::{CoreError, NewShop, NewUser, Principal, Shop, User};

use crate::admin::AdminPanel;
use crate::auth::verify_password;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::shop::ShopRepository;
use crate::repository::user::UserRepository;
use crate::scope::ShopScope;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/bazaar/bazaar.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// How long a writer waits on a locked database before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps connections.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    in_memory: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
            in_memory: false,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated and disappears with the pool
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            // The database lives only as long as its single connection
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: None,
            run_migrations: true,
            in_memory: true,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let base = if self.in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}?mode=rwc",
                self.database_path.display()
            ))
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        Ok(base
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle.
///
/// Shop data is never reached directly from here: callers present a
/// [`Principal`] and receive a [`ShopScope`] bound to that principal's shop
/// or an [`AdminPanel`] if the principal is a platform administrator.
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Enables WAL, NORMAL synchronous and foreign keys
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            in_memory = config.is_in_memory(),
            "Initializing database connection"
        );

        let connect_options = config.connect_options()?;
        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer scoped repositories; this bypasses tenant isolation.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    /// Returns access to the principal's own shop.
    ///
    /// ## Errors
    /// * `AccessDenied` - the principal has no shop (e.g. a platform admin;
    ///   admins use [`AdminPanel::shop_scope`] instead)
    pub fn shop(&self, principal: &Principal) -> DbResult<ShopScope> {
        let shop_id = principal
            .shop_id
            .clone()
            .ok_or_else(|| CoreError::access_denied("principal is not attached to a shop"))?;

        Ok(ShopScope::new(self.pool.clone(), shop_id, principal.clone()))
    }

    /// Returns the platform administration panel.
    ///
    /// ## Errors
    /// * `AccessDenied` - the principal is not a platform administrator
    pub fn admin(&self, principal: &Principal) -> DbResult<AdminPanel> {
        if !principal.is_admin {
            warn!(user_id = %principal.user_id, "Non-admin requested admin panel");
            return Err(CoreError::access_denied("platform administrator required").into());
        }

        Ok(AdminPanel::new(self.pool.clone(), principal.clone()))
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Registers a shop together with its owner account, atomically.
    ///
    /// The owner's role is forced to `owner`.
    pub async fn register_shop(&self, shop: &NewShop, owner: &NewUser) -> DbResult<(Shop, User)> {
        ShopRepository::new(self.pool.clone())
            .register(shop, owner)
            .await
    }

    /// Creates a platform administrator account (no shop).
    pub async fn create_admin(&self, username: &str, password: &str) -> DbResult<User> {
        UserRepository::new(self.pool.clone())
            .create_admin(username, password)
            .await
    }

    /// Verifies credentials and returns the caller's principal.
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<Principal> {
        self.authenticate_at(username, password, Utc::now()).await
    }

    /// Same as [`authenticate`](Self::authenticate) with an explicit clock.
    ///
    /// ## Errors
    /// * `InvalidCredentials` - unknown user or wrong password
    /// * `ShopSuspended` / `SubscriptionExpired` - the user's shop fails the
    ///   access gate (platform admins are exempt)
    pub async fn authenticate_at(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Principal> {
        let user = UserRepository::new(self.pool.clone())
            .find_by_username(username)
            .await?;

        let user = match user {
            Some(user) if verify_password(password, &user.password_hash) => user,
            _ => {
                warn!(username = %username, "Failed login attempt");
                return Err(CoreError::InvalidCredentials.into());
            }
        };

        if !user.is_admin {
            let shop_id = user
                .shop_id
                .clone()
                .ok_or(CoreError::InvalidCredentials)?;
            let shop = ShopRepository::new(self.pool.clone()).get(&shop_id).await?;

            if let Err(err) = check_access(&shop, now) {
                warn!(username = %username, shop_id = %shop_id, error = %err, "Login refused by access gate");
                return Err(err.into());
            }
        }

        info!(user_id = %user.id, username = %user.username, "User authenticated");
        Ok(user.principal())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
