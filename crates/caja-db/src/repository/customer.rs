//! # Customer Repository
//!
//! Customer catalog and credit-account reads.
//!
//! Balance changes never go through this repository. They happen inside
//! engine transactions (checkout, cancellation, returns) so that every
//! peso of debt traces back to a sale. The only credit field editable
//! here is the limit itself.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use caja_core::{validation, Customer, ValidationError};

use crate::error::{DbError, DbResult, EngineResult};

/// Input for creating a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Maximum debt the store extends to this customer, in cents.
    pub credit_limit_cents: i64,
}

/// Repository for customer operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer with a zero opening balance.
    pub async fn create(&self, new_customer: NewCustomer) -> EngineResult<Customer> {
        validation::validate_customer_name(&new_customer.name)?;
        if new_customer.credit_limit_cents < 0 {
            return Err(ValidationError::MustBePositive {
                field: "credit_limit_cents".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: new_customer.name.trim().to_string(),
            email: new_customer.email,
            phone: new_customer.phone,
            credit_limit_cents: new_customer.credit_limit_cents,
            balance_cents: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, name = %customer.name, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, email, phone,
                credit_limit_cents, balance_cents, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.credit_limit_cents)
        .bind(customer.balance_cents)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone,
                   credit_limit_cents, balance_cents, is_active,
                   created_at, updated_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists active customers sorted by name.
    pub async fn list_active(&self, limit: u32, offset: u32) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone,
                   credit_limit_cents, balance_cents, is_active,
                   created_at, updated_at
            FROM customers
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Lists active customers carrying debt, highest balance first.
    pub async fn list_debtors(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone,
                   credit_limit_cents, balance_cents, is_active,
                   created_at, updated_at
            FROM customers
            WHERE is_active = 1 AND balance_cents > 0
            ORDER BY balance_cents DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Raises or lowers a customer's credit limit.
    ///
    /// Lowering below the current balance is allowed: the existing debt
    /// stands, the customer just cannot add to it until they pay down.
    pub async fn update_credit_limit(&self, id: &str, credit_limit_cents: i64) -> EngineResult<()> {
        if credit_limit_cents < 0 {
            return Err(ValidationError::MustBePositive {
                field: "credit_limit_cents".to_string(),
            }
            .into());
        }

        debug!(id = %id, limit = credit_limit_cents, "Updating credit limit");

        let result = sqlx::query(
            r#"
            UPDATE customers SET credit_limit_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(credit_limit_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id).into());
        }

        Ok(())
    }

    /// Records a direct payment against a customer's balance.
    ///
    /// This is the counter operation ("abono"): the customer hands over
    /// cash to pay down debt outside of any sale. The balance may not
    /// go below zero; overpayment is rejected rather than stored as a
    /// store-owes-customer credit.
    pub async fn record_payment(&self, id: &str, amount_cents: i64) -> EngineResult<i64> {
        if amount_cents <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "amount_cents".to_string(),
            }
            .into());
        }

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET balance_cents = balance_cents - ?2, updated_at = ?3
            WHERE id = ?1 AND balance_cents >= ?2
            "#,
        )
        .bind(id)
        .bind(amount_cents)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT balance_cents FROM customers WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(DbError::from)?;
            return match exists {
                None => Err(DbError::not_found("Customer", id).into()),
                Some(balance) => Err(ValidationError::OutOfRange {
                    field: "amount_cents".to_string(),
                    min: 1,
                    max: balance,
                }
                .into()),
            };
        }

        let balance: i64 = sqlx::query_scalar("SELECT balance_cents FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(id = %id, paid = amount_cents, balance = balance, "Recorded customer payment");

        Ok(balance)
    }

    /// Deactivates a customer (soft delete).
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }

    /// Counts all customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
