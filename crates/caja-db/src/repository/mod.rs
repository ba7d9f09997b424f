//! # Repository Module
//!
//! Database repository implementations for Caja POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Repositories own the SQL for one entity family and expose a clean     │
//! │  typed API over the pool.                                              │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │                                                                 │
//! │       │  db.products().get_by_barcode("7501...")                       │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── create(&self, new_product)                                        │
//! │  ├── get_by_id(&self, id)                                              │
//! │  └── list_low_stock(&self)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Multi-table mutations (sales, returns, adjustments) do NOT live       │
//! │  here: they are engine transactions. Repositories additionally         │
//! │  export pub(crate) insert helpers that the engine calls with its       │
//! │  open transaction, so each table's SQL still lives in one file.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD and stock queries
//! - [`customer::CustomerRepository`] - Customers and credit limits
//! - [`sale::SaleRepository`] - Sale reads, filtering and pagination
//! - [`inventory::InventoryRepository`] - Movement journal reads

pub mod customer;
pub mod inventory;
pub mod product;
pub mod sale;
