//! # Expense Repository
//!
//! Money the shop spends. Recording and deleting expenses requires the
//! owner role; anyone in the shop may read them.

use chrono::{DateTime, Utc};
use tracing::info;

use bazaar_core::validation::{validate_category, validate_description, validate_positive_amount};
use bazaar_core::{Expense, NewExpense, ValidationError};

use super::{clean, new_id};
use crate::error::{DbError, DbResult};
use crate::scope::ShopScope;

const EXPENSE_COLUMNS: &str = "id, shop_id, description, amount, category, spent_at";

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    scope: ShopScope,
}

impl ExpenseRepository {
    pub(crate) fn new(scope: ShopScope) -> Self {
        ExpenseRepository { scope }
    }

    /// Records an expense. `spent_at` defaults to now.
    pub async fn create(&self, input: &NewExpense) -> DbResult<Expense> {
        self.scope.require_manager("recording expenses")?;

        validate_description(&input.description)?;
        validate_positive_amount("amount", input.amount)?;
        validate_category(input.category.as_deref())?;

        let expense = Expense {
            id: new_id(),
            shop_id: self.scope.shop_id().to_string(),
            description: input.description.trim().to_string(),
            amount: input.amount,
            category: clean(&input.category),
            spent_at: input.spent_at.unwrap_or_else(Utc::now),
        };

        sqlx::query(
            r#"
            INSERT INTO expenses (id, shop_id, description, amount, category, spent_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.shop_id)
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(&expense.category)
        .bind(expense.spent_at)
        .execute(self.scope.pool())
        .await?;

        info!(
            shop_id = %expense.shop_id,
            expense_id = %expense.id,
            amount = %expense.amount,
            "Expense recorded"
        );
        Ok(expense)
    }

    /// Deletes an expense.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        self.scope.require_manager("deleting expenses")?;

        let result = sqlx::query("DELETE FROM expenses WHERE id = ? AND shop_id = ?")
            .bind(id)
            .bind(self.scope.shop_id())
            .execute(self.scope.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        info!(shop_id = %self.scope.shop_id(), expense_id = %id, "Expense deleted");
        Ok(())
    }

    /// Lists all expenses, most recent first.
    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE shop_id = ? ORDER BY spent_at DESC, id"
        );
        let expenses = sqlx::query_as::<_, Expense>(&sql)
            .bind(self.scope.shop_id())
            .fetch_all(self.scope.pool())
            .await?;

        Ok(expenses)
    }

    /// Expenses with `from <= spent_at < to`, most recent first.
    ///
    /// The range is compared on parsed timestamps, not stored text.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Expense>> {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: "start is after end".to_string(),
            }
            .into());
        }

        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|e| e.spent_at >= from && e.spent_at < to)
            .collect())
    }
}
