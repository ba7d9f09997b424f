//! # Cancellation and Returns
//!
//! Two ways sold goods come back:
//!
//! * `cancel_sale` - the whole sale was a mistake. Every unit returns
//!   to stock and credit debt is reversed in full; the sale ends
//!   `cancelled`. Only an untouched `paid` sale can be cancelled; once
//!   any return exists, the per-item path below is the only way.
//! * `create_return` - some units come back. Each line is capped by
//!   what was sold minus what already came back, the refund is the
//!   sold price prorated over the returned units, and the sale flips
//!   to `refunded` only when every unit of every line is back.
//!
//! ## Refund Slicing
//! A line's refund base is what the customer paid for it: discounted
//! subtotal plus tax. Slices are differences of prefix prorations
//! (`prorated(k, n) - prorated(k-1, n)`), so however a line is
//! returned, one unit at a time or all at once, the slices add up to
//! exactly the base. The flat order discount was never attached to a
//! line and is never refunded.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use caja_core::{
    validation, CoreError, InventoryMovement, Money, MovementType, PaymentMethod, Return,
    ReturnItem, ReturnStatus, Sale, SaleItem, SaleStatus,
};

use crate::error::{DbError, EngineResult};
use crate::repository::{inventory, sale as sale_repo};

use super::{credit, stock, Engine};

// =============================================================================
// Input / Output Types
// =============================================================================

/// One line of a return request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReturnItem {
    pub sale_item_id: String,
    pub quantity: i64,
}

/// A return request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReturn {
    pub sale_id: String,
    pub items: Vec<NewReturnItem>,
    pub reason: String,
    pub operator_id: String,
}

/// What a processed return hands back.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnReceipt {
    pub refund: Return,
    pub items: Vec<ReturnItem>,
    /// Sale status after this return: `Refunded` once everything is
    /// back, `Paid` otherwise.
    pub sale_status: SaleStatus,
}

// =============================================================================
// Cancellation
// =============================================================================

impl Engine {
    /// Cancels a paid sale: restocks every unit and reverses credit.
    ///
    /// ## Errors
    /// * `SaleNotFound` - no such sale
    /// * `InvalidSaleState` - already cancelled or refunded, or it has
    ///   returns against it (cancelling on top would restock returned
    ///   units twice)
    pub async fn cancel_sale(&self, sale_id: &str, operator_id: &str) -> EngineResult<Sale> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // First write: the status guard. Two racing cancels, or a
        // cancel racing a return, leave exactly one winner.
        let won = sale_repo::transition_status(
            &mut tx,
            sale_id,
            SaleStatus::Paid,
            SaleStatus::Cancelled,
            now,
        )
        .await?;
        if !won {
            let status = sale_repo::sale_status_tx(&mut tx, sale_id).await?;
            return match status {
                None => Err(CoreError::SaleNotFound(sale_id.to_string()).into()),
                Some(status) => Err(CoreError::InvalidSaleState {
                    sale_id: sale_id.to_string(),
                    current_status: status.as_str().to_string(),
                }
                .into()),
            };
        }

        if sale_repo::sale_has_returns(&mut tx, sale_id).await? {
            // Rolls back the transition above
            return Err(CoreError::InvalidSaleState {
                sale_id: sale_id.to_string(),
                current_status: "partially_returned".to_string(),
            }
            .into());
        }

        let Some(sale) = sale_repo::get_sale_tx(&mut tx, sale_id).await? else {
            return Err(DbError::not_found("Sale", sale_id).into());
        };
        let items = sale_repo::items_for_sale_tx(&mut tx, sale_id).await?;

        for item in &items {
            stock::restock(&mut tx, &item.product_id, item.quantity, now).await?;
            inventory::insert_movement(
                &mut tx,
                &InventoryMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                    movement_type: MovementType::Entrada,
                    reference: format!("Cancelación venta {}", sale.ticket_number),
                    notes: None,
                    operator_id: operator_id.to_string(),
                    created_at: now,
                },
            )
            .await?;
        }

        if sale.payment_method == PaymentMethod::Credit {
            if let Some(customer_id) = &sale.customer_id {
                credit::apply_credit_delta(&mut tx, customer_id, -sale.total_cents, now).await?;
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            ticket = %sale.ticket_number,
            total_cents = sale.total_cents,
            "Sale cancelled"
        );

        Ok(Sale {
            status: SaleStatus::Cancelled,
            updated_at: now,
            ..sale
        })
    }
}

// =============================================================================
// Returns
// =============================================================================

impl Engine {
    /// Processes a return against a paid sale.
    ///
    /// Duplicate request lines for the same sale item are merged
    /// before checking the cap, so splitting a quantity across lines
    /// cannot smuggle units past it.
    ///
    /// ## Errors
    /// * `SaleNotFound` / `InvalidSaleState` - wrong sale or not paid
    /// * `SaleItemNotFound` - a line references an item of another sale
    /// * `ReturnExceedsQuantity` - cumulative returns would pass what
    ///   was sold
    pub async fn create_return(&self, request: NewReturn) -> EngineResult<ReturnReceipt> {
        validation::validate_reason(&request.reason)?;
        validation::validate_sale_items(request.items.len())?;

        let mut requested: BTreeMap<String, i64> = BTreeMap::new();
        for item in &request.items {
            validation::validate_quantity(item.quantity)?;
            *requested.entry(item.sale_item_id.clone()).or_insert(0) += item.quantity;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        // First write: lock and status guard in one statement
        let paid =
            sale_repo::touch_sale_in_status(&mut tx, &request.sale_id, SaleStatus::Paid, now)
                .await?;
        if !paid {
            let status = sale_repo::sale_status_tx(&mut tx, &request.sale_id).await?;
            return match status {
                None => Err(CoreError::SaleNotFound(request.sale_id.clone()).into()),
                Some(status) => Err(CoreError::InvalidSaleState {
                    sale_id: request.sale_id.clone(),
                    current_status: status.as_str().to_string(),
                }
                .into()),
            };
        }

        let Some(sale) = sale_repo::get_sale_tx(&mut tx, &request.sale_id).await? else {
            return Err(DbError::not_found("Sale", &request.sale_id).into());
        };
        let sale_items = sale_repo::items_for_sale_tx(&mut tx, &request.sale_id).await?;
        let by_id: HashMap<&str, &SaleItem> =
            sale_items.iter().map(|i| (i.id.as_str(), i)).collect();

        // Check every cap and slice every refund before writing a row
        let mut lines = Vec::with_capacity(requested.len());
        let mut refund_total = Money::zero();
        for (sale_item_id, quantity) in &requested {
            let Some(item) = by_id.get(sale_item_id.as_str()) else {
                return Err(CoreError::SaleItemNotFound(sale_item_id.clone()).into());
            };

            let already = sale_repo::returned_quantity(&mut tx, sale_item_id).await?;
            if already + quantity > item.quantity {
                return Err(CoreError::ReturnExceedsQuantity {
                    sale_item_id: sale_item_id.clone(),
                    sold: item.quantity,
                    already_returned: already,
                    requested: *quantity,
                }
                .into());
            }

            let base = item.refund_base();
            let refund = base.prorated(already + quantity, item.quantity)
                - base.prorated(already, item.quantity);
            refund_total += refund;
            lines.push((sale_item_id.clone(), *quantity, refund, item.product_id.clone()));
        }

        let refund = Return {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            operator_id: request.operator_id.clone(),
            reason: request.reason.trim().to_string(),
            refund_cents: refund_total.cents(),
            refund_method: sale.payment_method,
            status: ReturnStatus::Processed,
            created_at: now,
        };
        sale_repo::insert_return(&mut tx, &refund).await?;

        let mut items = Vec::with_capacity(lines.len());
        for (sale_item_id, quantity, line_refund, product_id) in &lines {
            let item = ReturnItem {
                id: Uuid::new_v4().to_string(),
                return_id: refund.id.clone(),
                sale_item_id: sale_item_id.clone(),
                quantity: *quantity,
                refund_cents: line_refund.cents(),
            };
            sale_repo::insert_return_item(&mut tx, &item).await?;

            stock::restock(&mut tx, product_id, *quantity, now).await?;
            inventory::insert_movement(
                &mut tx,
                &InventoryMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: product_id.clone(),
                    quantity: *quantity,
                    movement_type: MovementType::Entrada,
                    reference: format!("Devolución venta {}", sale.ticket_number),
                    notes: None,
                    operator_id: request.operator_id.clone(),
                    created_at: now,
                },
            )
            .await?;
            items.push(item);
        }

        // Everything back? The sale is done.
        let mut sale_status = SaleStatus::Paid;
        if sale_repo::unreturned_item_count(&mut tx, &sale.id).await? == 0 {
            sale_repo::transition_status(
                &mut tx,
                &sale.id,
                SaleStatus::Paid,
                SaleStatus::Refunded,
                now,
            )
            .await?;
            sale_status = SaleStatus::Refunded;
        }

        if sale.payment_method == PaymentMethod::Credit && refund_total.is_positive() {
            if let Some(customer_id) = &sale.customer_id {
                credit::apply_credit_delta(&mut tx, customer_id, -refund_total.cents(), now)
                    .await?;
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            ticket = %sale.ticket_number,
            refund_cents = refund.refund_cents,
            lines = items.len(),
            fully_returned = sale_status == SaleStatus::Refunded,
            "Return processed"
        );

        Ok(ReturnReceipt {
            refund,
            items,
            sale_status,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
