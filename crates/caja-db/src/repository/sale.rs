//! # Sale Repository
//!
//! Reads over sales, items, payments and returns, plus the transaction
//! helpers the engine composes into atomic checkout and return flows.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sale Lifecycle                                  │
//! │                                                                         │
//! │   Engine::create_sale ──────► Sale { status: Paid }                     │
//! │                                   │                                     │
//! │                ┌──────────────────┴──────────────────┐                  │
//! │                ▼                                     ▼                  │
//! │   Engine::cancel_sale                 Engine::create_return (100%)      │
//! │   Sale { status: Cancelled }          Sale { status: Refunded }         │
//! │                                                                         │
//! │   Both end states are final. Partial returns leave the sale Paid.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes never happen through `&self` methods here. The engine opens
//! the transaction and calls the `pub(crate)` helpers at the bottom of
//! this file, so a sale and its side effects (stock, credit, payments)
//! commit or roll back together.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};

use caja_core::{Payment, Return, ReturnItem, Sale, SaleItem, SaleStatus};

use crate::error::DbResult;

// =============================================================================
// Read Models
// =============================================================================

/// A sale with everything hanging off it, for receipt display.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<Payment>,
    pub returns: Vec<Return>,
}

/// One day of register activity.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Sales recorded that day, cancelled ones excluded.
    pub sales_count: i64,
    pub cancelled_count: i64,
    /// Sum of sale totals, cancelled ones excluded.
    pub total_cents: i64,
    pub tax_cents: i64,
    /// Tender taken that day split by method, cancelled sales excluded.
    pub cash_cents: i64,
    pub card_cents: i64,
    pub credit_cents: i64,
    /// Sum of refunds given that day.
    pub refunded_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale reads.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, ticket_number, customer_id, operator_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   payment_method, status, notes, created_at, updated_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale by its ticket number.
    pub async fn get_by_ticket(&self, ticket_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, ticket_number, customer_id, operator_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   payment_method, status, notes, created_at, updated_at
            FROM sales
            WHERE ticket_number = ?1
            "#,
        )
        .bind(ticket_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale with its items, payments and returns.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let items = self.items_for_sale(id).await?;
        let payments = self.payments_for_sale(id).await?;
        let returns = self.returns_for_sale(id).await?;

        Ok(Some(SaleDetail {
            sale,
            items,
            payments,
            returns,
        }))
    }

    /// Gets all items for a sale.
    pub async fn items_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, name_snapshot,
                   unit_price_cents, quantity, tax_rate_bps, discount_bps,
                   line_total_cents, tax_cents, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all payments for a sale.
    pub async fn payments_for_sale(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, sale_id, method, amount_cents,
                   tendered_cents, change_cents, reference, created_at
            FROM payments
            WHERE sale_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Gets all returns recorded against a sale, oldest first.
    pub async fn returns_for_sale(&self, sale_id: &str) -> DbResult<Vec<Return>> {
        let returns = sqlx::query_as::<_, Return>(
            r#"
            SELECT id, sale_id, operator_id, reason,
                   refund_cents, refund_method, status, created_at
            FROM returns
            WHERE sale_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(returns)
    }

    /// Gets the lines of one return.
    pub async fn return_items(&self, return_id: &str) -> DbResult<Vec<ReturnItem>> {
        let items = sqlx::query_as::<_, ReturnItem>(
            r#"
            SELECT id, return_id, sale_item_id, quantity, refund_cents
            FROM return_items
            WHERE return_id = ?1
            ORDER BY id
            "#,
        )
        .bind(return_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists sales newest first.
    pub async fn list_recent(&self, limit: u32, offset: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, ticket_number, customer_id, operator_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   payment_method, status, notes, created_at, updated_at
            FROM sales
            ORDER BY created_at DESC, id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales in one status, newest first.
    pub async fn list_by_status(
        &self,
        status: SaleStatus,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, ticket_number, customer_id, operator_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   payment_method, status, notes, created_at, updated_at
            FROM sales
            WHERE status = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists sales created in `[from, to)`, newest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, ticket_number, customer_id, operator_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   payment_method, status, notes, created_at, updated_at
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Lists a customer's sales, newest first.
    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, ticket_number, customer_id, operator_id,
                   subtotal_cents, tax_cents, discount_cents, total_cents,
                   payment_method, status, notes, created_at, updated_at
            FROM sales
            WHERE customer_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Counts all sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Gets total amount paid for a sale.
    pub async fn total_paid(&self, sale_id: &str) -> DbResult<i64> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT SUM(amount_cents) FROM payments WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total.unwrap_or(0))
    }

    /// Builds the end-of-day summary for one calendar date (UTC).
    pub async fn daily_summary(&self, date: NaiveDate) -> DbResult<DailySummary> {
        let from = date.and_time(NaiveTime::MIN).and_utc();
        let to = from + Duration::days(1);

        let (sales_count, cancelled_count, total_cents, tax_cents) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(CASE WHEN status != 'cancelled' THEN 1 END),
                    COUNT(CASE WHEN status = 'cancelled' THEN 1 END),
                    COALESCE(SUM(CASE WHEN status != 'cancelled' THEN total_cents ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status != 'cancelled' THEN tax_cents ELSE 0 END), 0)
                FROM sales
                WHERE created_at >= ?1 AND created_at < ?2
                "#,
            )
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await?;

        // Joined to sales so a cancelled sale's payment drops out of
        // the split the same way the sale drops out of the totals
        let (cash_cents, card_cents, credit_cents) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN p.method = 'cash' THEN p.amount_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN p.method = 'card' THEN p.amount_cents ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN p.method = 'credit' THEN p.amount_cents ELSE 0 END), 0)
            FROM payments p
            JOIN sales s ON s.id = p.sale_id
            WHERE p.created_at >= ?1 AND p.created_at < ?2
              AND s.status != 'cancelled'
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let refunded_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(refund_cents), 0)
            FROM returns
            WHERE created_at >= ?1 AND created_at < ?2
              AND status = 'processed'
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailySummary {
            date,
            sales_count,
            cancelled_count,
            total_cents,
            tax_cents,
            cash_cents,
            card_cents,
            credit_cents,
            refunded_cents,
        })
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================
//
// Everything below runs on a caller-owned connection, inside the
// engine's transaction.

/// Inserts a sale row.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, ticket_number, customer_id, operator_id,
            subtotal_cents, tax_cents, discount_cents, total_cents,
            payment_method, status, notes,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.ticket_number)
    .bind(&sale.customer_id)
    .bind(&sale.operator_id)
    .bind(sale.subtotal_cents)
    .bind(sale.tax_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.status)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a sale item row.
pub(crate) async fn insert_sale_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, name_snapshot,
            unit_price_cents, quantity, tax_rate_bps, discount_bps,
            line_total_cents, tax_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.tax_rate_bps)
    .bind(item.discount_bps)
    .bind(item.line_total_cents)
    .bind(item.tax_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a payment row.
pub(crate) async fn insert_payment(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, sale_id, method, amount_cents,
            tendered_cents, change_cents, reference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.method)
    .bind(payment.amount_cents)
    .bind(payment.tendered_cents)
    .bind(payment.change_cents)
    .bind(&payment.reference)
    .bind(payment.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a return header row.
pub(crate) async fn insert_return(conn: &mut SqliteConnection, ret: &Return) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO returns (
            id, sale_id, operator_id, reason,
            refund_cents, refund_method, status, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&ret.id)
    .bind(&ret.sale_id)
    .bind(&ret.operator_id)
    .bind(&ret.reason)
    .bind(ret.refund_cents)
    .bind(ret.refund_method)
    .bind(ret.status)
    .bind(ret.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Inserts a return line row.
pub(crate) async fn insert_return_item(
    conn: &mut SqliteConnection,
    item: &ReturnItem,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO return_items (
            id, return_id, sale_item_id, quantity, refund_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&item.id)
    .bind(&item.return_id)
    .bind(&item.sale_item_id)
    .bind(item.quantity)
    .bind(item.refund_cents)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Gets a sale row inside a transaction.
pub(crate) async fn get_sale_tx(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, ticket_number, customer_id, operator_id,
               subtotal_cents, tax_cents, discount_cents, total_cents,
               payment_method, status, notes, created_at, updated_at
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(sale_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(sale)
}

/// Gets a sale's items inside a transaction.
pub(crate) async fn items_for_sale_tx(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT id, sale_id, product_id, name_snapshot,
               unit_price_cents, quantity, tax_rate_bps, discount_bps,
               line_total_cents, tax_cents, created_at
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY created_at, id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Gets a sale's current status inside a transaction.
pub(crate) async fn sale_status_tx(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Option<SaleStatus>> {
    let status = sqlx::query_scalar::<_, SaleStatus>("SELECT status FROM sales WHERE id = ?1")
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(status)
}

/// Moves a sale from one status to another.
///
/// The status check and the update are one statement, so two racing
/// transitions cannot both win. Returns `false` when the sale is
/// missing or no longer in `from`.
pub(crate) async fn transition_status(
    conn: &mut SqliteConnection,
    sale_id: &str,
    from: SaleStatus,
    to: SaleStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sales SET status = ?3, updated_at = ?4
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(sale_id)
    .bind(from)
    .bind(to)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Bumps `updated_at` if the sale is in the given status.
///
/// Used as the opening write of return transactions: it takes the
/// write lock and verifies the status in one statement.
pub(crate) async fn touch_sale_in_status(
    conn: &mut SqliteConnection,
    sale_id: &str,
    status: SaleStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sales SET updated_at = ?3
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(sale_id)
    .bind(status)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Units of one sale item already returned across all prior returns.
pub(crate) async fn returned_quantity(
    conn: &mut SqliteConnection,
    sale_item_id: &str,
) -> DbResult<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(quantity), 0)
        FROM return_items
        WHERE sale_item_id = ?1
        "#,
    )
    .bind(sale_item_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Counts sale items that still have unreturned units.
///
/// Zero means every unit of every line has come back, which is what
/// flips the sale to refunded.
pub(crate) async fn unreturned_item_count(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM sale_items si
        WHERE si.sale_id = ?1
          AND si.quantity > (
              SELECT COALESCE(SUM(ri.quantity), 0)
              FROM return_items ri
              WHERE ri.sale_item_id = si.id
          )
        "#,
    )
    .bind(sale_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

/// Whether any return has been recorded against a sale.
pub(crate) async fn sale_has_returns(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM returns WHERE sale_id = ?1")
        .bind(sale_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok(count > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use caja_core::{PaymentMethod, ReturnStatus};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_sale(ticket: &str, status: SaleStatus, total_cents: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: Uuid::new_v4().to_string(),
            ticket_number: ticket.to_string(),
            customer_id: None,
            operator_id: "op-1".to_string(),
            subtotal_cents: total_cents - 1600,
            tax_cents: 1600,
            discount_cents: 0,
            total_cents,
            payment_method: PaymentMethod::Cash,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_payment(sale: &Sale, method: PaymentMethod) -> Payment {
        Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            method,
            amount_cents: sale.total_cents,
            tendered_cents: None,
            change_cents: None,
            reference: None,
            created_at: sale.created_at,
        }
    }

    async fn seed_sale(db: &Database, sale: &Sale) {
        let mut tx = db.pool().begin().await.unwrap();
        insert_sale(&mut tx, sale).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_by_id_and_ticket() {
        let db = test_db().await;
        let sale = sample_sale("T20260823000001", SaleStatus::Paid, 11600);
        seed_sale(&db, &sale).await;

        let by_id = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(by_id.ticket_number, "T20260823000001");

        let by_ticket = db
            .sales()
            .get_by_ticket("T20260823000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_ticket.id, sale.id);

        assert!(db.sales().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_ticket_rejected() {
        let db = test_db().await;
        let first = sample_sale("T20260823000002", SaleStatus::Paid, 5000);
        seed_sale(&db, &first).await;

        let dup = sample_sale("T20260823000002", SaleStatus::Paid, 7000);
        let mut tx = db.pool().begin().await.unwrap();
        let err = insert_sale(&mut tx, &dup).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::DbError::UniqueViolation { ref field, .. } if field.contains("ticket_number")
        ));
    }

    #[tokio::test]
    async fn test_list_by_status_filters() {
        let db = test_db().await;
        seed_sale(&db, &sample_sale("T1", SaleStatus::Paid, 1000)).await;
        seed_sale(&db, &sample_sale("T2", SaleStatus::Paid, 2000)).await;
        seed_sale(&db, &sample_sale("T3", SaleStatus::Cancelled, 3000)).await;

        let paid = db
            .sales()
            .list_by_status(SaleStatus::Paid, 10, 0)
            .await
            .unwrap();
        assert_eq!(paid.len(), 2);

        let cancelled = db
            .sales()
            .list_by_status(SaleStatus::Cancelled, 10, 0)
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].ticket_number, "T3");

        assert_eq!(db.sales().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_transition_status_single_winner() {
        let db = test_db().await;
        let sale = sample_sale("T4", SaleStatus::Paid, 1000);
        seed_sale(&db, &sale).await;

        let mut tx = db.pool().begin().await.unwrap();
        let first = transition_status(
            &mut tx,
            &sale.id,
            SaleStatus::Paid,
            SaleStatus::Cancelled,
            Utc::now(),
        )
        .await
        .unwrap();
        let second = transition_status(
            &mut tx,
            &sale.id,
            SaleStatus::Paid,
            SaleStatus::Cancelled,
            Utc::now(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(first);
        assert!(!second);

        let status = db.sales().get_by_id(&sale.id).await.unwrap().unwrap().status;
        assert_eq!(status, SaleStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_total_paid_sums_payments() {
        let db = test_db().await;
        let sale = sample_sale("T5", SaleStatus::Paid, 10000);
        let mut tx = db.pool().begin().await.unwrap();
        insert_sale(&mut tx, &sale).await.unwrap();
        insert_payment(&mut tx, &sample_payment(&sale, PaymentMethod::Cash))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(db.sales().total_paid(&sale.id).await.unwrap(), 10000);
        assert_eq!(db.sales().total_paid("missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_returned_quantity_and_unreturned_count() {
        let db = test_db().await;
        let sale = sample_sale("T6", SaleStatus::Paid, 30000);
        let item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            product_id: "p-1".to_string(),
            name_snapshot: "Caja de prueba".to_string(),
            unit_price_cents: 10000,
            quantity: 3,
            tax_rate_bps: 0,
            discount_bps: 0,
            line_total_cents: 30000,
            tax_cents: 0,
            created_at: sale.created_at,
        };

        let mut tx = db.pool().begin().await.unwrap();
        insert_sale(&mut tx, &sale).await.unwrap();
        insert_sale_item(&mut tx, &item).await.unwrap();
        assert_eq!(returned_quantity(&mut tx, &item.id).await.unwrap(), 0);
        assert_eq!(unreturned_item_count(&mut tx, &sale.id).await.unwrap(), 1);
        assert!(!sale_has_returns(&mut tx, &sale.id).await.unwrap());

        let ret = Return {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            operator_id: "op-1".to_string(),
            reason: "Producto dañado".to_string(),
            refund_cents: 10000,
            refund_method: PaymentMethod::Cash,
            status: ReturnStatus::Processed,
            created_at: Utc::now(),
        };
        insert_return(&mut tx, &ret).await.unwrap();
        insert_return_item(
            &mut tx,
            &ReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: ret.id.clone(),
                sale_item_id: item.id.clone(),
                quantity: 1,
                refund_cents: 10000,
            },
        )
        .await
        .unwrap();

        assert_eq!(returned_quantity(&mut tx, &item.id).await.unwrap(), 1);
        assert_eq!(unreturned_item_count(&mut tx, &sale.id).await.unwrap(), 1);
        assert!(sale_has_returns(&mut tx, &sale.id).await.unwrap());

        insert_return_item(
            &mut tx,
            &ReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: ret.id.clone(),
                sale_item_id: item.id.clone(),
                quantity: 2,
                refund_cents: 20000,
            },
        )
        .await
        .unwrap();
        assert_eq!(unreturned_item_count(&mut tx, &sale.id).await.unwrap(), 0);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_daily_summary() {
        let db = test_db().await;

        let paid_a = sample_sale("T7", SaleStatus::Paid, 11600);
        let paid_b = sample_sale("T8", SaleStatus::Paid, 11600);
        let gone = sample_sale("T9", SaleStatus::Cancelled, 5000);

        let mut tx = db.pool().begin().await.unwrap();
        insert_sale(&mut tx, &paid_a).await.unwrap();
        insert_sale(&mut tx, &paid_b).await.unwrap();
        insert_sale(&mut tx, &gone).await.unwrap();
        insert_payment(&mut tx, &sample_payment(&paid_a, PaymentMethod::Cash))
            .await
            .unwrap();
        insert_payment(&mut tx, &sample_payment(&paid_b, PaymentMethod::Card))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let summary = db
            .sales()
            .daily_summary(Utc::now().date_naive())
            .await
            .unwrap();

        assert_eq!(summary.sales_count, 2);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.total_cents, 23200);
        assert_eq!(summary.tax_cents, 3200);
        assert_eq!(summary.cash_cents, 11600);
        assert_eq!(summary.card_cents, 11600);
        assert_eq!(summary.credit_cents, 0);
        assert_eq!(summary.refunded_cents, 0);
    }

    #[tokio::test]
    async fn test_daily_summary_split_drops_cancelled_payments() {
        let db = test_db().await;

        // A cancelled sale keeps its payment row; the tender split
        // must leave it out just like the totals do
        let kept = sample_sale("T11", SaleStatus::Paid, 11600);
        let gone = sample_sale("T12", SaleStatus::Cancelled, 10000);

        let mut tx = db.pool().begin().await.unwrap();
        insert_sale(&mut tx, &kept).await.unwrap();
        insert_sale(&mut tx, &gone).await.unwrap();
        insert_payment(&mut tx, &sample_payment(&kept, PaymentMethod::Cash))
            .await
            .unwrap();
        insert_payment(&mut tx, &sample_payment(&gone, PaymentMethod::Cash))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let summary = db
            .sales()
            .daily_summary(Utc::now().date_naive())
            .await
            .unwrap();

        assert_eq!(summary.total_cents, 11600);
        assert_eq!(summary.cash_cents, 11600);
        assert_eq!(summary.card_cents, 0);
        assert_eq!(summary.credit_cents, 0);
        assert_eq!(
            summary.cash_cents + summary.card_cents + summary.credit_cents,
            summary.total_cents
        );
    }

    #[tokio::test]
    async fn test_get_detail_assembles_everything() {
        let db = test_db().await;
        let sale = sample_sale("T10", SaleStatus::Paid, 11600);
        let item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            product_id: "p-1".to_string(),
            name_snapshot: "Agua".to_string(),
            unit_price_cents: 10000,
            quantity: 1,
            tax_rate_bps: 1600,
            discount_bps: 0,
            line_total_cents: 10000,
            tax_cents: 1600,
            created_at: sale.created_at,
        };

        let mut tx = db.pool().begin().await.unwrap();
        insert_sale(&mut tx, &sale).await.unwrap();
        insert_sale_item(&mut tx, &item).await.unwrap();
        insert_payment(&mut tx, &sample_payment(&sale, PaymentMethod::Cash))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let detail = db.sales().get_detail(&sale.id).await.unwrap().unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.payments.len(), 1);
        assert!(detail.returns.is_empty());
        assert_eq!(detail.items[0].name_snapshot, "Agua");
    }
}
