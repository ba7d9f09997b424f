//! # Stock Workflows
//!
//! Manual adjustments, the journal audit, and the two primitives every
//! other workflow moves stock through.
//!
//! ## The Guard
//! Stock is never pre-read and then written. The decrement carries its
//! own check:
//!
//! ```sql
//! UPDATE products SET stock = stock - ?2
//! WHERE id = ?1 AND stock >= ?2
//! ```
//!
//! `rows_affected == 0` means the units are not there (or the product
//! is not), and the transaction rolls back untouched. Two registers
//! selling the last unit at once cannot both win this statement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use caja_core::{validation, CoreError, InventoryMovement, MovementType, ValidationError};

use crate::error::{DbError, EngineResult};
use crate::repository::inventory;

use super::Engine;

/// Reference recorded on manual adjustment movements.
const MANUAL_ADJUST_REFERENCE: &str = "Ajuste manual";

// =============================================================================
// Input / Output Types
// =============================================================================

/// Input for a manual stock adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: String,
    /// Entrada and salida move `quantity` units in or out. Ajuste sets
    /// the counted level: `quantity` is the new absolute stock.
    pub movement_type: MovementType,
    pub quantity: i64,
    pub notes: Option<String>,
    pub operator_id: String,
}

/// Result of checking a product's cached stock against its journal.
#[derive(Debug, Clone, Serialize)]
pub struct StockAudit {
    pub product_id: String,
    pub cached_stock: i64,
    pub movement_total: i64,
}

impl StockAudit {
    /// True when the cached counter matches the journal sum.
    pub fn is_consistent(&self) -> bool {
        self.cached_stock == self.movement_total
    }
}

// =============================================================================
// Engine Workflows
// =============================================================================

impl Engine {
    /// Manually adjusts a product's stock, journaling the movement.
    ///
    /// ## Semantics Per Movement Type
    /// * `Entrada` - receive `quantity` units (restock delivery)
    /// * `Salida` - remove `quantity` units (breakage, theft, expiry)
    /// * `Ajuste` - physical count came back different; `quantity` is
    ///   the new absolute level and the journal records the difference
    ///
    /// Returns the stock level after the adjustment. An ajuste that
    /// matches the current level changes nothing and journals nothing.
    pub async fn adjust_stock(&self, request: AdjustStock) -> EngineResult<i64> {
        match request.movement_type {
            MovementType::Ajuste => {
                if request.quantity < 0 {
                    return Err(ValidationError::MustBePositive {
                        field: "quantity".to_string(),
                    }
                    .into());
                }
            }
            _ => validation::validate_quantity(request.quantity)?,
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let delta = match request.movement_type {
            MovementType::Entrada => {
                restock(&mut tx, &request.product_id, request.quantity, now).await?;
                request.quantity
            }
            MovementType::Salida => {
                consume_stock(&mut tx, &request.product_id, request.quantity, now).await?;
                -request.quantity
            }
            MovementType::Ajuste => {
                let current: Option<i64> =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                        .bind(&request.product_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(DbError::from)?;
                let Some(current) = current else {
                    return Err(CoreError::ProductNotFound(request.product_id).into());
                };

                let delta = request.quantity - current;
                if delta == 0 {
                    debug!(product_id = %request.product_id, "Adjustment matches current stock, nothing to do");
                    return Ok(current);
                }

                sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
                    .bind(&request.product_id)
                    .bind(request.quantity)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::from)?;
                delta
            }
        };

        let movement = InventoryMovement {
            id: Uuid::new_v4().to_string(),
            product_id: request.product_id.clone(),
            quantity: delta,
            movement_type: request.movement_type,
            reference: MANUAL_ADJUST_REFERENCE.to_string(),
            notes: request.notes,
            operator_id: request.operator_id,
            created_at: now,
        };
        inventory::insert_movement(&mut tx, &movement).await?;

        let new_stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(&request.product_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product_id = %request.product_id,
            delta,
            stock = new_stock,
            "Stock adjusted"
        );

        Ok(new_stock)
    }

    /// Checks one product's cached stock against its movement journal.
    ///
    /// Counter and journal sum come from a single statement, so a
    /// concurrent sale cannot produce a false mismatch between the two
    /// reads.
    pub async fn verify_stock(&self, product_id: &str) -> EngineResult<StockAudit> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.stock,
                   COALESCE((
                       SELECT SUM(m.quantity)
                       FROM inventory_movements m
                       WHERE m.product_id = p.id
                   ), 0)
            FROM products p
            WHERE p.id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        let Some((cached_stock, movement_total)) = row else {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        };

        Ok(StockAudit {
            product_id: product_id.to_string(),
            cached_stock,
            movement_total,
        })
    }

    /// Audits every product. Returns one entry per product; callers
    /// usually filter on [`StockAudit::is_consistent`].
    pub async fn verify_all_stock(&self) -> EngineResult<Vec<StockAudit>> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.id,
                   p.stock,
                   COALESCE((
                       SELECT SUM(m.quantity)
                       FROM inventory_movements m
                       WHERE m.product_id = p.id
                   ), 0)
            FROM products p
            ORDER BY p.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|(product_id, cached_stock, movement_total)| StockAudit {
                product_id,
                cached_stock,
                movement_total,
            })
            .collect())
    }
}

// =============================================================================
// Transaction Primitives
// =============================================================================

/// Takes `quantity` units out of stock, or fails the transaction.
///
/// Callers journal the matching salida movement themselves; the
/// reference string belongs to the workflow, not to this primitive.
pub(crate) async fn consume_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    if result.rows_affected() == 0 {
        // Lost the guard. Re-read to say why.
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&mut *conn)
                .await
                .map_err(DbError::from)?;
        return match row {
            None => Err(CoreError::ProductNotFound(product_id.to_string()).into()),
            Some((name, available)) => Err(CoreError::InsufficientStock {
                product: name,
                available,
                requested: quantity,
            }
            .into()),
        };
    }

    Ok(())
}

/// Puts `quantity` units back into stock.
pub(crate) async fn restock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(DbError::from)?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
