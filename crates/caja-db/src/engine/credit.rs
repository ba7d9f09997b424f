//! # Credit Guard
//!
//! One primitive, used by checkout (new debt), cancellation and
//! returns (reversals). New debt must clear the customer's limit;
//! the check and the write are a single statement so two racing
//! credit sales cannot both squeeze under it. Reversals always go
//! through, even past a limit that was lowered in the meantime, and
//! may push the balance negative: that is store credit, money the
//! store owes the customer.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use caja_core::CoreError;

use crate::error::{DbError, EngineResult};

/// Applies a signed delta to a customer's balance.
///
/// Positive deltas are guarded by `balance + delta <= limit`.
/// Zero and negative deltas are unconditional.
pub(crate) async fn apply_credit_delta(
    conn: &mut SqliteConnection,
    customer_id: &str,
    delta_cents: i64,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    if delta_cents > 0 {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET balance_cents = balance_cents + ?2, updated_at = ?3
            WHERE id = ?1 AND balance_cents + ?2 <= credit_limit_cents
            "#,
        )
        .bind(customer_id)
        .bind(delta_cents)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            // Lost the guard. Re-read to say why.
            let row: Option<(String, i64, i64)> = sqlx::query_as(
                "SELECT name, credit_limit_cents, balance_cents FROM customers WHERE id = ?1",
            )
            .bind(customer_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?;
            return match row {
                None => Err(CoreError::CustomerNotFound(customer_id.to_string()).into()),
                Some((name, limit_cents, balance_cents)) => {
                    Err(CoreError::CreditLimitExceeded {
                        customer: name,
                        limit_cents,
                        balance_cents,
                        requested_cents: delta_cents,
                    }
                    .into())
                }
            };
        }
    } else {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET balance_cents = balance_cents + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(customer_id)
        .bind(delta_cents)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CustomerNotFound(customer_id.to_string()).into());
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
