//! Statutory copayment calculator.
//!
//! Pure, deterministic computation of copayment and refund amounts. No side
//! effects; the same inputs always yield the same outputs, so callers may
//! invoke this as often as they like.
//!
//! The statutory formula is fixed by law: 10 currency units flat plus 10% of
//! the total treatment cost. All arithmetic runs at full `Decimal` precision;
//! [`round_currency`] is applied only where an amount crosses a display or
//! serialization boundary, never on intermediate sub-totals.

use crate::error::CalculatorAnomaly;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Flat statutory base fee per prescription.
pub const BASE_FEE: Decimal = dec!(10);

/// Statutory share of the total treatment cost.
pub const COST_SHARE_RATE: Decimal = dec!(0.10);

/// The statutory copayment for a course of `treatment_count` sessions at
/// `per_treatment` cost each, at full precision.
pub fn statutory_copayment(treatment_count: u32, per_treatment: Decimal) -> Decimal {
    BASE_FEE + COST_SHARE_RATE * Decimal::from(treatment_count) * per_treatment
}

/// Rounds a monetary amount to two decimal places, midpoint away from zero
/// (commercial rounding as mandated for statutory amounts).
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Copayment amounts for an interrupted course, at full precision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundBreakdown {
    /// Copayment computed from the prescribed treatment count (invoice time).
    pub original: Decimal,
    /// Copayment actually owed, computed from the completed count.
    pub actual: Decimal,
    /// `original − actual`; never negative for valid inputs.
    pub refund: Decimal,
}

/// Computes the original and actual copayment plus the pro-rated refund for
/// a course that ended after `completed` of `prescribed` treatments.
///
/// `completed = 0` is not special-cased here; refund eligibility is the
/// settlement composer's gate, not a calculator concern.
///
/// # Errors
///
/// Returns [`CalculatorAnomaly::NegativeRefund`] if `completed > prescribed`,
/// which would otherwise produce a negative refund from broken upstream data.
pub fn refund_breakdown(
    prescribed: u32,
    completed: u32,
    per_treatment: Decimal,
) -> Result<RefundBreakdown, CalculatorAnomaly> {
    if completed > prescribed {
        return Err(CalculatorAnomaly::NegativeRefund {
            prescribed,
            completed,
        });
    }

    let original = statutory_copayment(prescribed, per_treatment);
    let actual = statutory_copayment(completed, per_treatment);

    Ok(RefundBreakdown {
        original,
        actual,
        refund: original - actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_the_statutory_formula() {
        // 10 + 0.10 * (8 * 25.00) = 30.00
        let amount = statutory_copayment(8, dec!(25.00));
        assert_eq!(round_currency(amount), dec!(30.00));
    }

    #[test]
    fn computes_the_pro_rated_refund() {
        let breakdown = refund_breakdown(8, 3, dec!(25.00)).expect("valid counts");
        assert_eq!(round_currency(breakdown.original), dec!(30.00));
        assert_eq!(round_currency(breakdown.actual), dec!(17.50));
        assert_eq!(round_currency(breakdown.refund), dec!(12.50));
    }

    #[test]
    fn keeps_full_precision_until_rounding() {
        // 10 + 0.10 * (3 * 0.333) = 10.0999; rounding intermediates first
        // would lose the final cent.
        let amount = statutory_copayment(3, dec!(0.333));
        assert_eq!(amount, dec!(10.0999));
        assert_eq!(round_currency(amount), dec!(10.10));
    }

    #[test]
    fn refund_is_deterministic_across_calls() {
        let first = refund_breakdown(10, 4, dec!(19.90)).expect("valid counts");
        let second = refund_breakdown(10, 4, dec!(19.90)).expect("valid counts");
        assert_eq!(first, second);
    }

    #[test]
    fn surfaces_negative_refund_as_named_anomaly() {
        let err = refund_breakdown(5, 7, dec!(25.00)).expect_err("completed beyond prescribed");
        assert_eq!(
            err,
            CalculatorAnomaly::NegativeRefund {
                prescribed: 5,
                completed: 7,
            }
        );
    }

    #[test]
    fn zero_completed_is_plain_arithmetic_not_an_error() {
        // Eligibility gating lives in the composer; the calculator just
        // computes.
        let breakdown = refund_breakdown(8, 0, dec!(25.00)).expect("valid counts");
        assert_eq!(round_currency(breakdown.actual), dec!(10.00));
        assert_eq!(round_currency(breakdown.refund), dec!(20.00));
    }
}
