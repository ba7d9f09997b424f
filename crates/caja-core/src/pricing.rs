//! # Pricing Module
//!
//! Pure sale pricing: line totals, taxes and discounts.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      How a Sale is Priced                               │
//! │                                                                         │
//! │  Per line:                                                              │
//! │    gross     = unit_price × quantity                                    │
//! │    discount  = gross × discount_bps        (round half-up)             │
//! │    subtotal  = gross − discount            ← BEFORE tax                 │
//! │    tax       = subtotal × tax_rate_bps     (round half-up)             │
//! │                                                                         │
//! │  Per sale:                                                              │
//! │    subtotal  = Σ line subtotals                                         │
//! │    tax       = Σ line taxes                                             │
//! │    total     = subtotal + tax − order_discount   ← flat, AFTER tax     │
//! │                                                                         │
//! │  Line discounts shrink the tax base; the order discount does not.      │
//! │  Each line rounds at most twice (discount step, tax step), and sale    │
//! │  totals are plain sums of line values, so recomputing from recorded    │
//! │  inputs always reproduces the recorded totals exactly.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! Everything here is a pure function over [`Money`] and [`TaxRate`].
//! The checkout engine resolves products and applies caller overrides
//! first, then hands the frozen values to this module.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TaxRate;

// =============================================================================
// Input / Output Types
// =============================================================================

/// One line of a sale, already resolved: overrides applied, product
/// data frozen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaleLine {
    /// Unit price actually charged (catalog price or caller override).
    pub unit_price: Money,
    /// Units sold. Must be positive.
    pub quantity: i64,
    /// Tax rate actually applied (catalog rate or caller override).
    pub tax_rate: TaxRate,
    /// Line discount in basis points (0..=10000), applied before tax.
    pub discount_bps: u32,
}

/// Priced amounts for a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    /// Discounted line amount, before tax.
    pub subtotal: Money,
    /// Amount taken off by the line discount.
    pub discount: Money,
    /// Tax on the discounted subtotal.
    pub tax: Money,
    /// subtotal + tax: what the customer pays for this line.
    pub total: Money,
}

/// Priced amounts for a whole sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    /// Sum of discounted line subtotals, before tax.
    pub subtotal: Money,
    /// Sum of per-line taxes.
    pub tax: Money,
    /// Flat order-level discount, applied after tax.
    pub discount: Money,
    /// subtotal + tax − discount. Never negative.
    pub total: Money,
}

// =============================================================================
// Pricing Functions
// =============================================================================

/// Prices a single line: discount before tax, tax on the discounted
/// subtotal.
///
/// ## Example
/// ```rust
/// use caja_core::money::Money;
/// use caja_core::pricing::{price_line, SaleLine};
/// use caja_core::types::TaxRate;
///
/// let line = SaleLine {
///     unit_price: Money::from_cents(10000), // $100.00
///     quantity: 3,
///     tax_rate: TaxRate::from_bps(1600), // 16%
///     discount_bps: 0,
/// };
/// let totals = price_line(&line);
/// assert_eq!(totals.subtotal.cents(), 30000);
/// assert_eq!(totals.tax.cents(), 4800);
/// assert_eq!(totals.total.cents(), 34800);
/// ```
pub fn price_line(line: &SaleLine) -> LineTotals {
    let gross = line.unit_price.multiply_quantity(line.quantity);
    let discount = gross.percentage(line.discount_bps);
    let subtotal = gross - discount;
    let tax = subtotal.calculate_tax(line.tax_rate);

    LineTotals {
        subtotal,
        discount,
        tax,
        total: subtotal + tax,
    }
}

/// Prices a whole sale: per-line totals accumulated, then the flat
/// order discount taken off after tax.
///
/// ## Errors
/// - [`CoreError::InvalidDiscount`] if the order discount is negative,
///   a line discount is above 100%, or the order discount is larger
///   than subtotal + tax (the total would go negative).
pub fn price_sale(lines: &[SaleLine], order_discount: Money) -> CoreResult<SaleTotals> {
    if order_discount.is_negative() {
        return Err(CoreError::InvalidDiscount {
            reason: format!("order discount {} is negative", order_discount),
        });
    }

    let mut subtotal = Money::zero();
    let mut tax = Money::zero();

    for line in lines {
        if line.discount_bps > 10000 {
            return Err(CoreError::InvalidDiscount {
                reason: format!("line discount {} bps is above 100%", line.discount_bps),
            });
        }
        let totals = price_line(line);
        subtotal += totals.subtotal;
        tax += totals.tax;
    }

    let total = subtotal + tax - order_discount;
    if total.is_negative() {
        return Err(CoreError::InvalidDiscount {
            reason: format!(
                "order discount {} exceeds sale amount {}",
                order_discount,
                subtotal + tax
            ),
        });
    }

    Ok(SaleTotals {
        subtotal,
        tax,
        discount: order_discount,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price_cents: i64, qty: i64, tax_bps: u32, discount_bps: u32) -> SaleLine {
        SaleLine {
            unit_price: Money::from_cents(price_cents),
            quantity: qty,
            tax_rate: TaxRate::from_bps(tax_bps),
            discount_bps,
        }
    }

    #[test]
    fn test_three_units_at_sixteen_percent() {
        // $100.00 × 3 at 16%: subtotal $300.00, tax $48.00, total $348.00
        let totals = price_sale(&[line(10000, 3, 1600, 0)], Money::zero()).unwrap();

        assert_eq!(totals.subtotal.cents(), 30000);
        assert_eq!(totals.tax.cents(), 4800);
        assert_eq!(totals.discount.cents(), 0);
        assert_eq!(totals.total.cents(), 34800);
    }

    #[test]
    fn test_line_discount_shrinks_tax_base() {
        // $100.00 with 10% line discount at 16% tax:
        // subtotal $90.00, tax $14.40 (on the discounted amount)
        let totals = price_line(&line(10000, 1, 1600, 1000));

        assert_eq!(totals.discount.cents(), 1000);
        assert_eq!(totals.subtotal.cents(), 9000);
        assert_eq!(totals.tax.cents(), 1440);
        assert_eq!(totals.total.cents(), 10440);
    }

    #[test]
    fn test_order_discount_after_tax() {
        // $100.00 at 16% with a flat $10.00 order discount:
        // the tax base stays $100.00; only the total drops.
        let totals = price_sale(&[line(10000, 1, 1600, 0)], Money::from_cents(1000)).unwrap();

        assert_eq!(totals.subtotal.cents(), 10000);
        assert_eq!(totals.tax.cents(), 1600);
        assert_eq!(totals.discount.cents(), 1000);
        assert_eq!(totals.total.cents(), 10600);
    }

    #[test]
    fn test_zero_rate_line() {
        let totals = price_line(&line(550, 2, 0, 0));
        assert_eq!(totals.subtotal.cents(), 1100);
        assert_eq!(totals.tax.cents(), 0);
        assert_eq!(totals.total.cents(), 1100);
    }

    #[test]
    fn test_tax_rounds_half_up_per_line() {
        // $0.99 at 8.25% = 8.1675 cents → 8 cents
        let totals = price_line(&line(99, 1, 825, 0));
        assert_eq!(totals.tax.cents(), 8);

        // $1.03 at 8.25% = 8.4975 → 8; at quantity 2: $2.06 → 16.995 → 17
        let totals = price_line(&line(103, 2, 825, 0));
        assert_eq!(totals.tax.cents(), 17);
    }

    #[test]
    fn test_multi_line_accumulation() {
        let lines = [
            line(10000, 3, 1600, 0),
            line(550, 2, 0, 0),
            line(2599, 1, 1600, 2000), // 20% off
        ];
        let totals = price_sale(&lines, Money::zero()).unwrap();

        // Line 3: gross 2599, discount 520 (half-up), subtotal 2079, tax 333
        assert_eq!(totals.subtotal.cents(), 30000 + 1100 + 2079);
        assert_eq!(totals.tax.cents(), 4800 + 0 + 333);
        assert_eq!(
            totals.total.cents(),
            totals.subtotal.cents() + totals.tax.cents()
        );
    }

    #[test]
    fn test_negative_order_discount_rejected() {
        let err = price_sale(&[line(10000, 1, 1600, 0)], Money::from_cents(-1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscount { .. }));
    }

    #[test]
    fn test_order_discount_larger_than_sale_rejected() {
        let err = price_sale(&[line(1000, 1, 0, 0)], Money::from_cents(1001)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscount { .. }));
    }

    #[test]
    fn test_order_discount_equal_to_sale_allowed() {
        // A 100% comp brings the total to exactly zero.
        let totals = price_sale(&[line(1000, 1, 0, 0)], Money::from_cents(1000)).unwrap();
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_line_discount_above_hundred_percent_rejected() {
        let err = price_sale(&[line(1000, 1, 0, 10001)], Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscount { .. }));
    }

    #[test]
    fn test_empty_sale_prices_to_zero() {
        // The engine rejects empty baskets before pricing; the pure
        // function itself just returns zeros.
        let totals = price_sale(&[], Money::zero()).unwrap();
        assert_eq!(totals.total.cents(), 0);
    }
}
