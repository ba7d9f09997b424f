//! # Sale Engine
//!
//! Multi-table workflows, each executed as one SQLite transaction.
//!
//! ## One Workflow, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Engine::create_sale (checkout)                       │
//! │                                                                         │
//! │  OUTSIDE THE TRANSACTION (pure, no locks held)                          │
//! │    1. Validate the request                                              │
//! │    2. Load products and customer                                        │
//! │    3. Price the sale (caja-core, integer cents)                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SINGLE TRANSACTION                          │    │
//! │  │                                                                 │    │
//! │  │  1. INSERT sale (paid) ── unique ticket, write lock taken here  │    │
//! │  │  2. Per item, ascending product id:                             │    │
//! │  │       UPDATE products SET stock = stock - qty                   │    │
//! │  │         WHERE id = ? AND stock >= qty    ← guard, no pre-read   │    │
//! │  │       INSERT inventory_movement (salida, -qty)                  │    │
//! │  │       INSERT sale_item (frozen snapshot)                        │    │
//! │  │  3. INSERT payment (cash change computed here)                  │    │
//! │  │  4. Credit sale? UPDATE customer balance                        │    │
//! │  │       WHERE balance + total <= limit     ← guard, no pre-read   │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← everything lands, or nothing does                             │
//! │                                                                         │
//! │  Ticket collision on step 1? Roll back, new ticket, retry (max 5).      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation, returns and stock adjustments follow the same shape:
//! guards are single conditional UPDATEs whose `rows_affected` tells
//! the engine whether it won, so two registers racing over the last
//! unit (or the last peso of credit) cannot both succeed.
//!
//! ## Module Layout
//! The engine is one struct with its impl split by workflow:
//! - `checkout` - create_sale
//! - `returns` - cancel_sale, create_return
//! - `stock` - adjust_stock, verify_stock
//! - `credit` - shared balance guard used by the other three

mod checkout;
mod credit;
mod returns;
mod stock;

pub use checkout::{NewSale, NewSaleItem, SaleReceipt};
pub use returns::{NewReturn, NewReturnItem, ReturnReceipt};
pub use stock::{AdjustStock, StockAudit};

use sqlx::SqlitePool;

/// Executes sale, return and stock workflows atomically.
///
/// Cheap to clone; hand one to each caller that needs to write.
#[derive(Debug, Clone)]
pub struct Engine {
    pool: SqlitePool,
}

impl Engine {
    /// Creates a new Engine on the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Engine { pool }
    }
}
