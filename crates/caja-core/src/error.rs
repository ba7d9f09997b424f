//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError or DbError, unified for callers      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, amounts, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist in database
    /// - Product was deleted between lookup and transaction
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but has been deactivated.
    ///
    /// Deactivated products stay in the catalog so historical sales keep
    /// their foreign keys, but they can no longer be sold.
    #[error("Product is no longer for sale: {0}")]
    InactiveProduct(String),

    /// Customer cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// A return line references a sale item that does not belong to the sale.
    #[error("Sale item not found: {0}")]
    SaleItemNotFound(String),

    /// Insufficient stock to complete the operation.
    ///
    /// ## When This Occurs
    /// - Trying to sell more than available stock
    /// - Manual outbound adjustment larger than current stock
    ///
    /// Always reflects the stock level observed inside the failing
    /// transaction, not the possibly stale pre-check.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Charging a credit sale would push the customer past their limit.
    ///
    /// ## When This Occurs
    /// Only when new debt is added. Balance reductions (cancellations,
    /// refunds) are never blocked by the limit.
    #[error(
        "Credit limit exceeded for {customer}: limit {limit_cents}, \
         balance {balance_cents}, requested {requested_cents}"
    )]
    CreditLimitExceeded {
        customer: String,
        limit_cents: i64,
        balance_cents: i64,
        requested_cents: i64,
    },

    /// Could not produce a unique ticket number.
    ///
    /// Each attempt runs the whole sale transaction again with a fresh
    /// number, so hitting this means several consecutive collisions.
    #[error("Could not generate a unique ticket number after {attempts} attempts")]
    TicketCollision { attempts: u32 },

    /// Sale is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Cancelling an already cancelled or refunded sale
    /// - Returning items on a cancelled or refunded sale
    /// - Cancelling a sale that already has returns against it
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleState {
        sale_id: String,
        current_status: String,
    },

    /// Cumulative returned quantity would exceed the quantity sold.
    #[error(
        "Return exceeds quantity for sale item {sale_item_id}: \
         sold {sold}, already returned {already_returned}, requested {requested}"
    )]
    ReturnExceedsQuantity {
        sale_item_id: String,
        sold: i64,
        already_returned: i64,
        requested: i64,
    },

    /// Discount is negative, above 100%, or larger than the amount it
    /// applies to.
    #[error("Invalid discount: {reason}")]
    InvalidDiscount { reason: String },

    /// Payment amount is invalid (e.g. cash tendered below the total).
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric barcode characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
