//! # Checkout
//!
//! `create_sale` takes a basket and either persists the whole sale or
//! leaves no trace. See the module docs on [`super`] for the
//! transaction layout.
//!
//! The request carries everything the engine needs; nothing is staged
//! server-side between calls. Price and tax overrides ride on the
//! lines, so a negotiated price or an exempt customer never mutates
//! the catalog.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use caja_core::{
    price_line, price_sale, validation, CoreError, InventoryMovement, Money, MovementType,
    Payment, PaymentMethod, Sale, SaleItem, SaleLine, SaleStatus, SaleTotals, TaxRate,
    ValidationError,
};

use crate::error::{DbError, EngineError, EngineResult};
use crate::repository::customer::CustomerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::{inventory, sale as sale_repo};

use super::{credit, stock, Engine};

/// How many fresh ticket numbers to try before giving up.
const MAX_TICKET_ATTEMPTS: u32 = 5;

// =============================================================================
// Input / Output Types
// =============================================================================

/// One line of a checkout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    /// Charges this price instead of the catalog price.
    pub unit_price_cents: Option<i64>,
    /// Applies this rate instead of the catalog rate.
    pub tax_rate_bps: Option<u32>,
    /// Line discount in basis points, applied before tax.
    pub discount_bps: u32,
}

/// A checkout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub items: Vec<NewSaleItem>,
    /// Required for credit sales, optional otherwise.
    pub customer_id: Option<String>,
    pub operator_id: String,
    pub payment_method: PaymentMethod,
    /// Flat order discount in cents, applied after tax.
    pub order_discount_cents: i64,
    /// For cash: what the customer handed over. Change is computed.
    pub tendered_cents: Option<i64>,
    /// Card auth code or similar.
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
}

/// What a successful checkout hands back.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payment: Payment,
}

/// A request line resolved against the catalog and priced. Everything
/// the transaction writes for this line is frozen here.
#[derive(Debug, Clone)]
struct PricedLine {
    product_id: String,
    name_snapshot: String,
    unit_price_cents: i64,
    quantity: i64,
    tax_rate_bps: u32,
    discount_bps: u32,
    line_total_cents: i64,
    tax_cents: i64,
}

// =============================================================================
// Checkout Workflow
// =============================================================================

impl Engine {
    /// Creates a sale: validates, resolves, prices, then commits
    /// everything in one transaction.
    ///
    /// ## What One Successful Call Persists
    /// * the `paid` sale row with a unique ticket number
    /// * one sale item per request line (product data frozen)
    /// * one salida movement per line, stock decremented under guard
    /// * the payment row (cash change computed from `tendered_cents`)
    /// * on credit sales, the customer's balance raised under the
    ///   credit-limit guard
    ///
    /// ## Errors
    /// Validation and resolution errors surface before anything is
    /// written. Guard losses (`InsufficientStock`,
    /// `CreditLimitExceeded`) roll the whole transaction back. A
    /// ticket collision rolls back and retries with a fresh number, up
    /// to `MAX_TICKET_ATTEMPTS` times, then fails as `TicketCollision`.
    pub async fn create_sale(&self, request: NewSale) -> EngineResult<SaleReceipt> {
        self.create_sale_with_tickets(request, generate_ticket_number)
            .await
    }

    /// Checkout with the ticket source as a parameter, so the
    /// collision path can be driven with fixed candidates.
    async fn create_sale_with_tickets(
        &self,
        request: NewSale,
        mut next_ticket: impl FnMut() -> String,
    ) -> EngineResult<SaleReceipt> {
        // Shape checks, nothing touched yet
        validation::validate_sale_items(request.items.len())?;
        for item in &request.items {
            validation::validate_quantity(item.quantity)?;
            if let Some(price) = item.unit_price_cents {
                validation::validate_price_cents(price)?;
            }
            if let Some(bps) = item.tax_rate_bps {
                validation::validate_tax_rate_bps(bps)?;
            }
            validation::validate_discount_bps(item.discount_bps)?;
        }
        if let Some(tendered) = request.tendered_cents {
            if tendered < 0 {
                return Err(ValidationError::MustBePositive {
                    field: "tendered_cents".to_string(),
                }
                .into());
            }
        }
        if request.payment_method == PaymentMethod::Credit && request.customer_id.is_none() {
            return Err(ValidationError::Required {
                field: "customer_id".to_string(),
            }
            .into());
        }

        // Resolve lines against the catalog, overrides applied.
        // Sorted by product id so the same basket always fails on the
        // same line.
        let mut sorted_items = request.items.clone();
        sorted_items.sort_by(|a, b| a.product_id.cmp(&b.product_id));

        let products = ProductRepository::new(self.pool.clone());
        let mut priced = Vec::with_capacity(sorted_items.len());
        let mut sale_lines = Vec::with_capacity(sorted_items.len());
        for item in &sorted_items {
            let product = products
                .get_by_id(&item.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;
            if !product.is_active {
                return Err(CoreError::InactiveProduct(product.name).into());
            }

            let line = SaleLine {
                unit_price: Money::from_cents(
                    item.unit_price_cents.unwrap_or(product.price_cents),
                ),
                quantity: item.quantity,
                tax_rate: TaxRate::from_bps(item.tax_rate_bps.unwrap_or(product.tax_rate_bps)),
                discount_bps: item.discount_bps,
            };
            let line_totals = price_line(&line);
            priced.push(PricedLine {
                product_id: product.id,
                name_snapshot: product.name,
                unit_price_cents: line.unit_price.cents(),
                quantity: item.quantity,
                tax_rate_bps: line.tax_rate.bps(),
                discount_bps: item.discount_bps,
                line_total_cents: line_totals.subtotal.cents(),
                tax_cents: line_totals.tax.cents(),
            });
            sale_lines.push(line);
        }

        if let Some(customer_id) = &request.customer_id {
            match CustomerRepository::new(self.pool.clone())
                .get_by_id(customer_id)
                .await?
            {
                Some(customer) if customer.is_active => {}
                _ => return Err(CoreError::CustomerNotFound(customer_id.clone()).into()),
            }
        }

        // Price the whole sale, pure
        let totals = price_sale(&sale_lines, Money::from_cents(request.order_discount_cents))?;

        if request.payment_method == PaymentMethod::Cash {
            if let Some(tendered) = request.tendered_cents {
                if tendered < totals.total.cents() {
                    return Err(CoreError::InvalidPaymentAmount {
                        reason: format!(
                            "tendered {} is less than total {}",
                            Money::from_cents(tendered),
                            totals.total
                        ),
                    }
                    .into());
                }
            }
        }

        // Commit, retrying only on ticket collisions
        let mut attempts = 0;
        loop {
            attempts += 1;
            let ticket = next_ticket();

            match self.try_commit(&request, &priced, &totals, &ticket).await {
                Ok(receipt) => {
                    info!(
                        ticket = %receipt.sale.ticket_number,
                        total_cents = receipt.sale.total_cents,
                        items = receipt.items.len(),
                        method = ?receipt.sale.payment_method,
                        "Sale created"
                    );
                    return Ok(receipt);
                }
                Err(err) if is_ticket_collision(&err) => {
                    if attempts >= MAX_TICKET_ATTEMPTS {
                        return Err(CoreError::TicketCollision { attempts }.into());
                    }
                    warn!(ticket = %ticket, attempts, "Ticket number collided, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One transactional attempt at persisting the sale.
    async fn try_commit(
        &self,
        request: &NewSale,
        lines: &[PricedLine],
        totals: &SaleTotals,
        ticket: &str,
    ) -> EngineResult<SaleReceipt> {
        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            ticket_number: ticket.to_string(),
            customer_id: request.customer_id.clone(),
            operator_id: request.operator_id.clone(),
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            payment_method: request.payment_method,
            status: SaleStatus::Paid,
            notes: request.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // First write: takes the write lock and trips the unique
        // ticket index before any stock moves
        sale_repo::insert_sale(&mut tx, &sale).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            stock::consume_stock(&mut tx, &line.product_id, line.quantity, now).await?;

            inventory::insert_movement(
                &mut tx,
                &InventoryMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: line.product_id.clone(),
                    quantity: -line.quantity,
                    movement_type: MovementType::Salida,
                    reference: format!("Venta {ticket}"),
                    notes: None,
                    operator_id: request.operator_id.clone(),
                    created_at: now,
                },
            )
            .await?;

            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: line.product_id.clone(),
                name_snapshot: line.name_snapshot.clone(),
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                tax_rate_bps: line.tax_rate_bps,
                discount_bps: line.discount_bps,
                line_total_cents: line.line_total_cents,
                tax_cents: line.tax_cents,
                created_at: now,
            };
            sale_repo::insert_sale_item(&mut tx, &item).await?;
            items.push(item);
        }

        let (tendered_cents, change_cents) = match (request.payment_method, request.tendered_cents)
        {
            (PaymentMethod::Cash, Some(tendered)) => {
                (Some(tendered), Some(tendered - sale.total_cents))
            }
            _ => (None, None),
        };
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            method: request.payment_method,
            amount_cents: sale.total_cents,
            tendered_cents,
            change_cents,
            reference: request.payment_reference.clone(),
            created_at: now,
        };
        sale_repo::insert_payment(&mut tx, &payment).await?;

        if request.payment_method == PaymentMethod::Credit {
            if let Some(customer_id) = &request.customer_id {
                credit::apply_credit_delta(&mut tx, customer_id, sale.total_cents, now).await?;
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        Ok(SaleReceipt {
            sale,
            items,
            payment,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Generates a ticket number: `T`, the UTC date, six random digits.
///
/// ## Example
/// `T20260823481037`
///
/// Uniqueness is enforced by the database index, not here. A collision
/// rolls the attempt back and checkout tries a fresh number.
fn generate_ticket_number() -> String {
    let digits = Uuid::new_v4().as_u128() % 1_000_000;
    format!("T{}{:06}", Utc::now().format("%Y%m%d"), digits)
}

/// True for the one error checkout retries: the unique index on
/// `sales.ticket_number` rejecting the insert.
fn is_ticket_collision(err: &EngineError) -> bool {
    matches!(
        err,
        EngineError::Db(DbError::UniqueViolation { field, .. }) if field.contains("ticket_number")
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::customer::NewCustomer;
    use crate::repository::product::NewProduct;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> String {
        db.products()
            .create(NewProduct {
                barcode: None,
                name: name.to_string(),
                description: None,
                price_cents,
                cost_cents: price_cents / 2,
                tax_rate_bps: 1600,
                stock,
                min_stock: 2,
                max_stock: 100,
                operator_id: "op-1".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_customer(db: &Database, limit: i64) -> String {
        db.customers()
            .create(NewCustomer {
                name: "Cliente".to_string(),
                email: None,
                phone: None,
                credit_limit_cents: limit,
            })
            .await
            .unwrap()
            .id
    }

    fn cash_sale(product_id: &str, quantity: i64) -> NewSale {
        NewSale {
            items: vec![NewSaleItem {
                product_id: product_id.to_string(),
                quantity,
                unit_price_cents: None,
                tax_rate_bps: None,
                discount_bps: 0,
            }],
            customer_id: None,
            operator_id: "op-1".to_string(),
            payment_method: PaymentMethod::Cash,
            order_discount_cents: 0,
            tendered_cents: None,
            payment_reference: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_prices_and_decrements() {
        let db = test_db().await;
        // $100.00 at 16%, 10 in stock
        let product_id = seed_product(&db, "Tequila", 10000, 10).await;

        let receipt = db
            .engine()
            .create_sale(cash_sale(&product_id, 3))
            .await
            .unwrap();

        assert_eq!(receipt.sale.subtotal_cents, 30000);
        assert_eq!(receipt.sale.tax_cents, 4800);
        assert_eq!(receipt.sale.total_cents, 34800);
        assert_eq!(receipt.sale.status, SaleStatus::Paid);
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].name_snapshot, "Tequila");
        assert_eq!(receipt.payment.amount_cents, 34800);

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);

        // Journal has the salida tied to the ticket
        let movements = db
            .inventory()
            .movements_for_product(&product_id, 10)
            .await
            .unwrap();
        assert_eq!(movements[0].quantity, -3);
        assert_eq!(movements[0].movement_type, MovementType::Salida);
        assert_eq!(
            movements[0].reference,
            format!("Venta {}", receipt.sale.ticket_number)
        );

        let audit = db.engine().verify_stock(&product_id).await.unwrap();
        assert!(audit.is_consistent());
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_no_trace() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Vino", 20000, 2).await;

        let err = db
            .engine()
            .create_sale(cash_sale(&product_id, 3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientStock {
                available: 2,
                requested: 3,
                ..
            })
        ));

        // Rolled back: no sale, no payment, stock and journal untouched
        assert_eq!(db.sales().count().await.unwrap(), 0);
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
        let movements = db
            .inventory()
            .movements_for_product(&product_id, 10)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1); // only the opening entrada
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_db().await;
        let err = db
            .engine()
            .create_sale(cash_sale("no-such-product", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_product_rejected() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Descontinuado", 5000, 10).await;
        db.products().deactivate(&product_id).await.unwrap();

        let err = db
            .engine()
            .create_sale(cash_sale(&product_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InactiveProduct(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_basket_rejected() {
        let db = test_db().await;
        let mut request = cash_sale("whatever", 1);
        request.items.clear();

        let err = db.engine().create_sale(request).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[tokio::test]
    async fn test_price_and_tax_overrides() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Mezcal", 10000, 10).await;

        let mut request = cash_sale(&product_id, 2);
        request.items[0].unit_price_cents = Some(8000); // negotiated down
        request.items[0].tax_rate_bps = Some(0); // exempt buyer

        let receipt = db.engine().create_sale(request).await.unwrap();
        assert_eq!(receipt.sale.subtotal_cents, 16000);
        assert_eq!(receipt.sale.tax_cents, 0);
        assert_eq!(receipt.sale.total_cents, 16000);

        // The catalog price is untouched
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.price_cents, 10000);

        // The item froze the overridden values
        assert_eq!(receipt.items[0].unit_price_cents, 8000);
        assert_eq!(receipt.items[0].tax_rate_bps, 0);
    }

    #[tokio::test]
    async fn test_line_and_order_discounts() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Ron", 10000, 10).await;

        let mut request = cash_sale(&product_id, 1);
        request.items[0].discount_bps = 1000; // 10% off, before tax
        request.order_discount_cents = 500; // $5.00 flat, after tax

        let receipt = db.engine().create_sale(request).await.unwrap();
        // gross 10000, line discount 1000, subtotal 9000, tax 1440
        assert_eq!(receipt.sale.subtotal_cents, 9000);
        assert_eq!(receipt.sale.tax_cents, 1440);
        assert_eq!(receipt.sale.discount_cents, 500);
        assert_eq!(receipt.sale.total_cents, 9940);
    }

    #[tokio::test]
    async fn test_cash_change() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Cerveza", 10000, 10).await;

        let mut request = cash_sale(&product_id, 3);
        request.tendered_cents = Some(40000);

        let receipt = db.engine().create_sale(request).await.unwrap();
        assert_eq!(receipt.payment.tendered_cents, Some(40000));
        assert_eq!(receipt.payment.change_cents, Some(5200));
    }

    #[tokio::test]
    async fn test_cash_short_tendered_rejected() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Whisky", 10000, 10).await;

        let mut request = cash_sale(&product_id, 3);
        request.tendered_cents = Some(30000); // total is 34800

        let err = db.engine().create_sale(request).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InvalidPaymentAmount { .. })
        ));
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_credit_sale_raises_balance() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Despensa", 10000, 10).await;
        let customer_id = seed_customer(&db, 100_000).await;

        let mut request = cash_sale(&product_id, 3);
        request.payment_method = PaymentMethod::Credit;
        request.customer_id = Some(customer_id.clone());

        let receipt = db.engine().create_sale(request).await.unwrap();
        assert_eq!(receipt.sale.total_cents, 34800);

        let customer = db
            .customers()
            .get_by_id(&customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.balance_cents, 34800);
    }

    #[tokio::test]
    async fn test_credit_over_limit_rolls_everything_back() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Abarrotes", 15000, 10).await;
        let customer_id = seed_customer(&db, 100_000).await;

        // Pre-existing debt of $900.00 against a $1000.00 limit
        sqlx::query("UPDATE customers SET balance_cents = 90000 WHERE id = ?1")
            .bind(&customer_id)
            .execute(db.pool())
            .await
            .unwrap();

        // $150.00 sale would land at $1050.00
        let mut request = cash_sale(&product_id, 1);
        request.items[0].tax_rate_bps = Some(0);
        request.payment_method = PaymentMethod::Credit;
        request.customer_id = Some(customer_id.clone());

        let err = db.engine().create_sale(request).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::CreditLimitExceeded { .. })
        ));

        // The guard fired last, but the rollback undid the earlier writes
        assert_eq!(db.sales().count().await.unwrap(), 0);
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        let audit = db.engine().verify_stock(&product_id).await.unwrap();
        assert!(audit.is_consistent());
        let customer = db
            .customers()
            .get_by_id(&customer_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.balance_cents, 90000);
    }

    #[tokio::test]
    async fn test_credit_requires_customer() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Pan dulce", 500, 10).await;

        let mut request = cash_sale(&product_id, 1);
        request.payment_method = PaymentMethod::Credit;

        let err = db.engine().create_sale(request).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Queso", 4000, 10).await;

        let mut request = cash_sale(&product_id, 1);
        request.customer_id = Some("ghost".to_string());

        let err = db.engine().create_sale(request).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::CustomerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_multi_line_basket() {
        let db = test_db().await;
        let a = seed_product(&db, "Uno", 10000, 5).await;
        let b = seed_product(&db, "Dos", 550, 5).await;

        let mut request = cash_sale(&a, 3);
        request.items.push(NewSaleItem {
            product_id: b.clone(),
            quantity: 2,
            unit_price_cents: None,
            tax_rate_bps: Some(0),
            discount_bps: 0,
        });

        let receipt = db.engine().create_sale(request).await.unwrap();
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.sale.subtotal_cents, 30000 + 1100);
        assert_eq!(receipt.sale.tax_cents, 4800);

        let pa = db.products().get_by_id(&a).await.unwrap().unwrap();
        let pb = db.products().get_by_id(&b).await.unwrap().unwrap();
        assert_eq!(pa.stock, 2);
        assert_eq!(pb.stock, 3);
    }

    #[tokio::test]
    async fn test_repeated_product_lines_both_persist() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Jamón", 10000, 10).await;

        // Same product twice: 2 at full price, 1 negotiated
        let mut request = cash_sale(&product_id, 2);
        request.items.push(NewSaleItem {
            product_id: product_id.clone(),
            quantity: 1,
            unit_price_cents: Some(9000),
            tax_rate_bps: None,
            discount_bps: 0,
        });

        let receipt = db.engine().create_sale(request).await.unwrap();
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.sale.subtotal_cents, 20000 + 9000);

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);
        let audit = db.engine().verify_stock(&product_id).await.unwrap();
        assert!(audit.is_consistent());
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_never_oversell() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Último", 1000, 5).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = db.engine();
            let pid = product_id.clone();
            handles.push(tokio::spawn(async move {
                engine.create_sale(cash_sale(&pid, 1)).await
            }));
        }

        let mut sold = 0;
        let mut out_of_stock = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(EngineError::Core(CoreError::InsufficientStock { .. })) => out_of_stock += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(sold, 5);
        assert_eq!(out_of_stock, 3);

        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 0);
        let audit = db.engine().verify_stock(&product_id).await.unwrap();
        assert!(audit.is_consistent());
    }

    #[tokio::test]
    async fn test_ticket_collision_retries_with_fresh_number() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Pulque", 1000, 10).await;
        let first = db
            .engine()
            .create_sale(cash_sale(&product_id, 1))
            .await
            .unwrap();

        // First candidate is already taken, second is free. A third
        // draw would panic the iterator.
        let mut candidates =
            vec![first.sale.ticket_number.clone(), "T20990101000042".to_string()].into_iter();
        let receipt = db
            .engine()
            .create_sale_with_tickets(cash_sale(&product_id, 2), move || {
                candidates.next().unwrap()
            })
            .await
            .unwrap();

        assert_eq!(receipt.sale.ticket_number, "T20990101000042");
        assert_eq!(db.sales().count().await.unwrap(), 2);

        // The collided attempt left nothing behind
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);
        let audit = db.engine().verify_stock(&product_id).await.unwrap();
        assert!(audit.is_consistent());
    }

    #[tokio::test]
    async fn test_ticket_collision_exhausts_after_five_attempts() {
        let db = test_db().await;
        let product_id = seed_product(&db, "Pozole", 1000, 10).await;
        let first = db
            .engine()
            .create_sale(cash_sale(&product_id, 1))
            .await
            .unwrap();

        // Every candidate is the taken number
        let taken = first.sale.ticket_number.clone();
        let err = db
            .engine()
            .create_sale_with_tickets(cash_sale(&product_id, 2), move || taken.clone())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::TicketCollision {
                attempts: MAX_TICKET_ATTEMPTS
            })
        ));

        // All five attempts rolled back
        assert_eq!(db.sales().count().await.unwrap(), 1);
        let product = db.products().get_by_id(&product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 9);
    }

    #[test]
    fn test_ticket_number_format() {
        let ticket = generate_ticket_number();
        assert_eq!(ticket.len(), 15);
        assert!(ticket.starts_with('T'));
        assert!(ticket[1..].chars().all(|c| c.is_ascii_digit()));
        assert!(ticket[1..9].starts_with("20"));
    }

    #[test]
    fn test_collision_classifier_only_matches_ticket_index() {
        let ticket = EngineError::Db(DbError::UniqueViolation {
            field: "sales.ticket_number".to_string(),
            value: "T20260823000001".to_string(),
        });
        assert!(is_ticket_collision(&ticket));

        let barcode = EngineError::Db(DbError::UniqueViolation {
            field: "products.barcode".to_string(),
            value: "750".to_string(),
        });
        assert!(!is_ticket_collision(&barcode));

        let core = EngineError::Core(CoreError::TicketCollision { attempts: 5 });
        assert!(!is_ticket_collision(&core));
    }
}
