//! # Product Repository
//!
//! Catalog operations for products.
//!
//! ## Stock Is Not Editable Here
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock only changes together with an inventory movement,      │
//! │  inside an engine transaction:                                          │
//! │                                                                         │
//! │    create_sale      → salida movements                                  │
//! │    cancel / return  → entrada movements                                 │
//! │    adjust_stock     → entrada / salida / ajuste movements               │
//! │                                                                         │
//! │  The one exception lives in THIS file: creating a product with an      │
//! │  opening stock writes the product row AND an opening entrada movement  │
//! │  in a single transaction, so the reconciliation invariant              │
//! │  (stock == Σ movements) holds from the very first row.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use caja_core::{validation, InventoryMovement, MovementType, Product};

use crate::error::{DbError, DbResult, EngineResult};
use crate::repository::inventory;

/// Reference string recorded on opening-stock movements.
const OPENING_STOCK_REFERENCE: &str = "Inventario inicial";

// =============================================================================
// Input Types
// =============================================================================

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub tax_rate_bps: u32,
    /// Opening stock. If positive, an opening entrada movement is
    /// recorded in the same transaction.
    pub stock: i64,
    pub min_stock: i64,
    pub max_stock: i64,
    /// Who is creating the product (recorded on the opening movement).
    pub operator_id: String,
}

/// Editable product fields. Stock is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub tax_rate_bps: u32,
    pub min_stock: i64,
    pub max_stock: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// If `new_product.stock` is positive, an opening entrada movement
    /// is written in the same transaction so the movement journal
    /// accounts for every unit from day one.
    pub async fn create(&self, new_product: NewProduct) -> EngineResult<Product> {
        validation::validate_product_name(&new_product.name)?;
        validation::validate_price_cents(new_product.price_cents)?;
        validation::validate_price_cents(new_product.cost_cents)?;
        validation::validate_tax_rate_bps(new_product.tax_rate_bps)?;
        if let Some(barcode) = &new_product.barcode {
            validation::validate_barcode(barcode)?;
        }
        if new_product.stock < 0 {
            return Err(caja_core::ValidationError::MustBePositive {
                field: "stock".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            barcode: new_product.barcode,
            name: new_product.name.trim().to_string(),
            description: new_product.description,
            price_cents: new_product.price_cents,
            cost_cents: new_product.cost_cents,
            tax_rate_bps: new_product.tax_rate_bps,
            stock: new_product.stock,
            min_stock: new_product.min_stock,
            max_stock: new_product.max_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Creating product");

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, barcode, name, description,
                price_cents, cost_cents, tax_rate_bps,
                stock, min_stock, max_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.tax_rate_bps)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.max_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        if product.stock > 0 {
            let movement = InventoryMovement {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                quantity: product.stock,
                movement_type: MovementType::Entrada,
                reference: OPENING_STOCK_REFERENCE.to_string(),
                notes: None,
                operator_id: new_product.operator_id,
                created_at: now,
            };
            inventory::insert_movement(&mut tx, &movement).await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, barcode, name, description,
                   price_cents, cost_cents, tax_rate_bps,
                   stock, min_stock, max_stock, is_active,
                   created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by barcode (scanner lookup).
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, barcode, name, description,
                   price_cents, cost_cents, tax_rate_bps,
                   stock, min_stock, max_stock, is_active,
                   created_at, updated_at
            FROM products
            WHERE barcode = ?1
            "#,
        )
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, barcode, name, description,
                   price_cents, cost_cents, tax_rate_bps,
                   stock, min_stock, max_stock, is_active,
                   created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists active products at or below their reorder threshold.
    ///
    /// ## Usage
    /// Drives the low-stock report; ordered worst-first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, barcode, name, description,
                   price_cents, cost_cents, tax_rate_bps,
                   stock, min_stock, max_stock, is_active,
                   created_at, updated_at
            FROM products
            WHERE is_active = 1 AND stock <= min_stock
            ORDER BY stock ASC, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's editable fields. Stock is untouched.
    pub async fn update_details(&self, id: &str, changes: UpdateProduct) -> EngineResult<()> {
        validation::validate_product_name(&changes.name)?;
        validation::validate_price_cents(changes.price_cents)?;
        validation::validate_price_cents(changes.cost_cents)?;
        validation::validate_tax_rate_bps(changes.tax_rate_bps)?;
        if let Some(barcode) = &changes.barcode {
            validation::validate_barcode(barcode)?;
        }

        debug!(id = %id, "Updating product details");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                barcode = ?2,
                name = ?3,
                description = ?4,
                price_cents = ?5,
                cost_cents = ?6,
                tax_rate_bps = ?7,
                min_stock = ?8,
                max_stock = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&changes.barcode)
        .bind(changes.name.trim())
        .bind(&changes.description)
        .bind(changes.price_cents)
        .bind(changes.cost_cents)
        .bind(changes.tax_rate_bps)
        .bind(changes.min_stock)
        .bind(changes.max_stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id).into());
        }

        Ok(())
    }

    /// Deactivates a product (soft delete).
    ///
    /// Sales history keeps pointing at the row; the product simply
    /// stops being sellable.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = 0, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts all products (active and inactive).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_product(name: &str, stock: i64) -> NewProduct {
        NewProduct {
            barcode: None,
            name: name.to_string(),
            description: None,
            price_cents: 2500,
            cost_cents: 1500,
            tax_rate_bps: 1600,
            stock,
            min_stock: 5,
            max_stock: 100,
            operator_id: "op-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let created = db.products().create(new_product("Agua 1L", 10)).await.unwrap();

        let fetched = db.products().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Agua 1L");
        assert_eq!(fetched.stock, 10);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn test_opening_stock_writes_movement() {
        let db = test_db().await;
        let product = db.products().create(new_product("Café 500g", 25)).await.unwrap();

        let movements = db
            .inventory()
            .movements_for_product(&product.id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity, 25);
        assert_eq!(movements[0].movement_type, MovementType::Entrada);
        assert_eq!(movements[0].reference, "Inventario inicial");

        let total = db.inventory().movement_total(&product.id).await.unwrap();
        assert_eq!(total, product.stock);
    }

    #[tokio::test]
    async fn test_zero_opening_stock_writes_no_movement() {
        let db = test_db().await;
        let product = db.products().create(new_product("Bolsa", 0)).await.unwrap();

        let movements = db
            .inventory()
            .movements_for_product(&product.id, 10)
            .await
            .unwrap();
        assert!(movements.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let db = test_db().await;

        let mut p = new_product("", 0);
        assert!(db.products().create(p).await.is_err());

        p = new_product("Ok", 0);
        p.price_cents = -1;
        assert!(db.products().create(p).await.is_err());

        p = new_product("Ok", -5);
        assert!(db.products().create(p).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = test_db().await;

        let mut first = new_product("Refresco", 0);
        first.barcode = Some("7501055300846".to_string());
        db.products().create(first).await.unwrap();

        let mut second = new_product("Otro refresco", 0);
        second.barcode = Some("7501055300846".to_string());
        let err = db.products().create(second).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Db(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_by_barcode() {
        let db = test_db().await;
        let mut p = new_product("Leche 1L", 3);
        p.barcode = Some("7501000000001".to_string());
        db.products().create(p).await.unwrap();

        let found = db
            .products()
            .get_by_barcode("7501000000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Leche 1L");

        let missing = db.products().get_by_barcode("0000").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_low_stock() {
        let db = test_db().await;
        let mut low = new_product("Casi agotado", 2);
        low.min_stock = 5;
        db.products().create(low).await.unwrap();

        let mut fine = new_product("Bien surtido", 50);
        fine.min_stock = 5;
        db.products().create(fine).await.unwrap();

        let report = db.products().list_low_stock().await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].name, "Casi agotado");
        assert!(report[0].is_low_stock());
    }

    #[tokio::test]
    async fn test_update_details_and_deactivate() {
        let db = test_db().await;
        let product = db.products().create(new_product("Pan", 8)).await.unwrap();

        db.products()
            .update_details(
                &product.id,
                UpdateProduct {
                    barcode: None,
                    name: "Pan integral".to_string(),
                    description: Some("500g".to_string()),
                    price_cents: 3200,
                    cost_cents: 1900,
                    tax_rate_bps: 0,
                    min_stock: 3,
                    max_stock: 40,
                },
            )
            .await
            .unwrap();

        let updated = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Pan integral");
        assert_eq!(updated.price_cents, 3200);
        // Stock is untouched by detail updates
        assert_eq!(updated.stock, 8);

        db.products().deactivate(&product.id).await.unwrap();
        let deactivated = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert!(!deactivated.is_active);
    }
}
