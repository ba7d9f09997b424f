//! # caja-db: Storage and Engine for Caja POS
//!
//! SQLite persistence plus the transactional engine that keeps sales,
//! stock and customer credit consistent with each other.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Caja POS Data Flow                              │
//! │                                                                         │
//! │  Caller (register UI, back office, seed tool)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                      caja-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐   │    │
//! │  │   │   Database   │   │  Repositories │   │      Engine      │   │    │
//! │  │   │  (pool.rs)   │   │  (catalog +   │   │  (one workflow,  │   │    │
//! │  │   │              │◄──│   reads)      │   │  one transaction)│   │    │
//! │  │   │  SqlitePool  │   │               │◄──│                  │   │    │
//! │  │   │  WAL mode    │   │  products     │   │  create_sale     │   │    │
//! │  │   │  migrations  │   │  customers    │   │  cancel_sale     │   │    │
//! │  │   │              │   │  sales        │   │  create_return   │   │    │
//! │  │   │              │   │  inventory    │   │  adjust_stock    │   │    │
//! │  │   └──────────────┘   └───────────────┘   └──────────────────┘   │    │
//! │  │                                                                 │    │
//! │  │   Pricing and domain types come from caja-core (pure, no I/O)   │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (single file, WAL)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and engine error types
//! - [`repository`] - Catalog writes and all reads
//! - [`engine`] - Checkout, cancellation, returns, stock adjustment
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_db::{Database, DbConfig};
//! use caja_db::engine::{NewSale, NewSaleItem};
//!
//! let db = Database::new(DbConfig::new("path/to/caja.db")).await?;
//!
//! let receipt = db.engine().create_sale(NewSale { /* basket */ }).await?;
//! println!("ticket {}", receipt.sale.ticket_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, EngineError};
pub use pool::{Database, DbConfig};

pub use engine::Engine;
pub use repository::customer::CustomerRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
