//! # User Repository
//!
//! Account storage. [`UserRepository`] serves login and platform setup;
//! [`StaffRepository`] is the shop-scoped view owners use to manage their
//! cashiers.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use bazaar_core::validation::{validate_password, validate_username};
use bazaar_core::{CoreError, NewUser, Role, User, ValidationError};

use super::new_id;
use crate::auth::hash_password;
use crate::error::DbResult;
use crate::scope::ShopScope;

const USER_COLUMNS: &str = "id, username, password_hash, role, is_admin, shop_id, created_at";

/// Repository for account lookups that are not tied to a shop.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Finds a user by username (exact match).
    pub async fn find_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Creates a platform administrator (no shop).
    pub async fn create_admin(&self, username: &str, password: &str) -> DbResult<User> {
        let input = NewUser {
            username: username.to_string(),
            password: password.to_string(),
            role: Role::Admin,
        };
        let user = prepare_user(&input, Role::Admin, true, None)?;

        let mut tx = self.pool.begin().await?;
        insert_user(&mut tx, &user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, username = %user.username, "Platform admin created");
        Ok(user)
    }
}

/// Repository for the staff accounts of one shop.
#[derive(Debug, Clone)]
pub struct StaffRepository {
    scope: ShopScope,
}

impl StaffRepository {
    pub(crate) fn new(scope: ShopScope) -> Self {
        StaffRepository { scope }
    }

    /// Lists the shop's accounts, owners first.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE shop_id = ? ORDER BY role = 'owner' DESC, username"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(self.scope.shop_id())
            .fetch_all(self.scope.pool())
            .await?;

        Ok(users)
    }

    /// Adds a cashier account to the shop.
    ///
    /// Requires the owner role. The requested role is ignored.
    pub async fn add_cashier(&self, input: &NewUser) -> DbResult<User> {
        self.scope.require_manager("adding staff")?;

        let user = prepare_user(
            input,
            Role::Cashier,
            false,
            Some(self.scope.shop_id().to_string()),
        )?;

        let mut tx = self.scope.pool().begin().await?;
        insert_user(&mut tx, &user).await?;
        tx.commit().await?;

        info!(
            shop_id = %self.scope.shop_id(),
            user_id = %user.id,
            username = %user.username,
            "Cashier added"
        );
        Ok(user)
    }

    /// Removes an account from the shop.
    ///
    /// Requires the owner role. Callers cannot remove themselves.
    pub async fn remove(&self, user_id: &str) -> DbResult<()> {
        self.scope.require_manager("removing staff")?;

        if user_id == self.scope.principal().user_id {
            return Err(CoreError::access_denied("cannot remove your own account").into());
        }

        let result = sqlx::query("DELETE FROM users WHERE id = ? AND shop_id = ?")
            .bind(user_id)
            .bind(self.scope.shop_id())
            .execute(self.scope.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("User", user_id));
        }

        info!(shop_id = %self.scope.shop_id(), user_id = %user_id, "Staff removed");
        Ok(())
    }
}

/// Validates input and hashes the password, producing an unsaved user.
pub(crate) fn prepare_user(
    input: &NewUser,
    role: Role,
    is_admin: bool,
    shop_id: Option<String>,
) -> DbResult<User> {
    let username = input.username.trim();
    validate_username(username)?;
    validate_password(&input.password)?;

    Ok(User {
        id: new_id(),
        username: username.to_string(),
        password_hash: hash_password(&input.password)?,
        role,
        is_admin,
        shop_id,
        created_at: Utc::now(),
    })
}

/// Inserts a prepared user inside the caller's transaction.
///
/// ## Errors
/// * `Validation(Duplicate)` - the username is taken (usernames are global)
pub(crate) async fn insert_user(conn: &mut SqliteConnection, user: &User) -> DbResult<()> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
        .bind(&user.username)
        .fetch_one(&mut *conn)
        .await?;

    if taken {
        return Err(ValidationError::Duplicate {
            field: "username".to_string(),
            value: user.username.clone(),
        }
        .into());
    }

    sqlx::query(
        r#"
        INSERT INTO users (id, username, password_hash, role, is_admin, shop_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(user.is_admin)
    .bind(&user.shop_id)
    .bind(user.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
