//! # Domain Types
//!
//! Core domain types used throughout Caja POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  barcode        │   │  ticket_number  │   │  credit_limit   │       │
//! │  │  price_cents    │   │  status         │   │  balance_cents  │       │
//! │  │  stock          │   │  total_cents    │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   SaleStatus    │   │  MovementType   │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Pending        │   │  Entrada (+)    │   │  Cash           │       │
//! │  │  Paid           │   │  Salida  (−)    │   │  Card           │       │
//! │  │  Cancelled      │   │  Ajuste  (±)    │   │  Credit         │       │
//! │  │  Refunded       │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (barcode, ticket_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1600 bps = 16% (e.g., Mexican IVA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `stock` is a cached counter. The source of truth is the sum of
/// inventory movements, and the two are kept equal by writing every
/// stock change and its movement in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown on tickets and reports.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Sale price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Cost in cents (for margin reports).
    pub cost_cents: i64,

    /// Tax rate in basis points (1600 = 16%).
    pub tax_rate_bps: u32,

    /// Current stock level. Never negative.
    pub stock: i64,

    /// Reorder threshold for low-stock reporting.
    pub min_stock: i64,

    /// Target stock level when restocking.
    pub max_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Checks whether stock has fallen to or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer with an optional store-credit line.
///
/// `balance_cents` is the outstanding debt. New credit sales may only
/// push it up to `credit_limit_cents`; reversals may push it down
/// without restriction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Maximum outstanding debt allowed, in cents.
    pub credit_limit_cents: i64,
    /// Current outstanding debt, in cents.
    pub balance_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the credit limit as Money.
    #[inline]
    pub fn credit_limit(&self) -> Money {
        Money::from_cents(self.credit_limit_cents)
    }

    /// Returns the outstanding balance as Money.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Returns how much credit is still available.
    ///
    /// Never negative: a balance past a since-lowered limit reads as
    /// zero available, and store credit (negative balance) widens it.
    #[inline]
    pub fn available_credit(&self) -> Money {
        Money::from_cents((self.credit_limit_cents - self.balance_cents).max(0))
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The lifecycle state of a sale.
///
/// ```text
/// pending ──► paid ──► refunded   (all items returned)
///    │          │
///    └──────────┴────► cancelled  (manual cancellation)
/// ```
///
/// `cancelled` and `refunded` are terminal: no further state changes,
/// cancellations or returns are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale created but not yet paid (reserved for future flows).
    Pending,
    /// Sale has been paid and finalized.
    Paid,
    /// Sale was cancelled; stock and credit fully restored.
    Cancelled,
    /// Every item was returned.
    Refunded,
}

impl SaleStatus {
    /// Database/string encoding of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Paid => "paid",
            SaleStatus::Cancelled => "cancelled",
            SaleStatus::Refunded => "refunded",
        }
    }

    /// Terminal states accept no further operation.
    pub fn is_final(&self) -> bool {
        matches!(self, SaleStatus::Cancelled | SaleStatus::Refunded)
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Store credit: adds to the customer's outstanding balance.
    Credit,
}

// =============================================================================
// Movement Type
// =============================================================================

/// The kind of inventory movement.
///
/// Naming follows the back-office convention: entrada (goods in),
/// salida (goods out), ajuste (count correction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock received: purchases, restocks, returns, cancellations.
    Entrada,
    /// Stock consumed: sales, shrinkage write-offs.
    Salida,
    /// Absolute count correction after a physical recount.
    Ajuste,
}

// =============================================================================
// Return Status
// =============================================================================

/// The lifecycle state of a return.
///
/// Returns restock and refund in one transaction, so the engine always
/// writes `processed`. `pending` and `rejected` exist for
/// manager-approval flows layered on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    /// Stock and refund applied.
    Processed,
    /// Awaiting approval; nothing has moved yet.
    Pending,
    /// Declined; nothing was restocked or refunded.
    Rejected,
}

impl Default for ReturnStatus {
    fn default() -> Self {
        ReturnStatus::Processed
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale transaction.
///
/// Totals are frozen at checkout time; later price or tax changes on
/// the catalog never affect recorded sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    /// Human-readable ticket number, unique across all sales.
    pub ticket_number: String,
    /// Optional registered customer. Required for balance tracking on
    /// credit sales, optional otherwise.
    pub customer_id: Option<String>,
    /// Cashier or back-office user who recorded the sale.
    pub operator_id: String,
    /// Sum of discounted line subtotals, before tax.
    pub subtotal_cents: i64,
    /// Sum of per-line tax amounts.
    pub tax_cents: i64,
    /// Flat order-level discount applied after tax.
    pub discount_cents: i64,
    /// subtotal + tax − discount.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of sale (frozen, override included).
    pub unit_price_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// Tax rate applied to this line (frozen, override included).
    pub tax_rate_bps: u32,
    /// Line discount in basis points, applied before tax.
    pub discount_bps: u32,
    /// Discounted line subtotal, before tax.
    pub line_total_cents: i64,
    /// Tax for this line.
    pub tax_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the discounted pre-tax line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// What the customer actually paid for this line: discounted
    /// subtotal plus tax. Proportional refunds are computed against
    /// this amount.
    #[inline]
    pub fn refund_base(&self) -> Money {
        Money::from_cents(self.line_total_cents + self.tax_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    /// Amount paid in cents.
    pub amount_cents: i64,
    /// For cash: amount customer gave (to calculate change).
    pub tendered_cents: Option<i64>,
    /// For cash: change returned to customer.
    pub change_cents: Option<i64>,
    /// External reference (card auth code, etc.).
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// An append-only record of a stock change.
///
/// `quantity` is signed: positive for entradas, negative for salidas,
/// either sign for ajustes. The running sum per product must always
/// equal the product's cached `stock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    /// Signed stock delta.
    pub quantity: i64,
    pub movement_type: MovementType,
    /// What caused the movement, e.g. "Venta T20260823000123".
    pub reference: String,
    pub notes: Option<String>,
    pub operator_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Return
// =============================================================================

/// A processed return against a sale.
///
/// A return row only exists once fully processed; partially-validated
/// returns never reach the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Return {
    pub id: String,
    pub sale_id: String,
    pub operator_id: String,
    /// Why the items came back. Required.
    pub reason: String,
    /// Total refunded for this return, in cents.
    pub refund_cents: i64,
    /// How the refund was given back.
    pub refund_method: PaymentMethod,
    pub status: ReturnStatus,
    pub created_at: DateTime<Utc>,
}

/// A returned line, tied to the original sale item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReturnItem {
    pub id: String,
    pub return_id: String,
    pub sale_item_id: String,
    /// Units returned in this return (cumulative cap: quantity sold).
    pub quantity: i64,
    /// Refund for these units, in cents.
    pub refund_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
