//! # Inventory Repository
//!
//! Reads over the movement journal, plus the shared insert helper that
//! every transaction writing stock uses.
//!
//! ## The Journal
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  inventory_movements is append-only. Rows are never updated or         │
//! │  deleted; corrections are new rows. The signed quantity column makes   │
//! │  reconciliation a single SUM:                                          │
//! │                                                                        │
//! │      products.stock == SUM(movements.quantity) per product             │
//! │                                                                        │
//! │  entrada → positive    salida → negative    ajuste → either sign       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};

use caja_core::InventoryMovement;

use crate::error::DbResult;

/// Repository for inventory movement history.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Lists movements for one product, newest first.
    pub async fn movements_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, product_id, quantity, movement_type,
                   reference, notes, operator_id, created_at
            FROM inventory_movements
            WHERE product_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Lists the most recent movements across all products.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, product_id, quantity, movement_type,
                   reference, notes, operator_id, created_at
            FROM inventory_movements
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Sums the signed quantities of every movement for a product.
    ///
    /// For a consistent journal this equals the product's cached stock.
    pub async fn movement_total(&self, product_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)
            FROM inventory_movements
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Appends a movement row inside a caller-owned transaction.
pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    movement: &InventoryMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (
            id, product_id, quantity, movement_type,
            reference, notes, operator_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.quantity)
    .bind(movement.movement_type)
    .bind(&movement.reference)
    .bind(&movement.notes)
    .bind(&movement.operator_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
