use super::money::checked_sum;
use rust_decimal::Decimal;

/// Largest difference (exclusive) tolerated between a declared total and the
/// sum of its line item subtotals.
pub const CONSISTENCY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// True when the declared total agrees with the subtotals within the tolerance.
/// Subtotals whose sum cannot be represented never agree with a total.
pub fn is_consistent<I>(declared_total: Decimal, subtotals: I) -> bool
where
    I: IntoIterator<Item = Decimal>,
{
    checked_sum(subtotals)
        .and_then(|calculated| calculated.checked_sub(declared_total))
        .is_some_and(|difference| difference.abs() < CONSISTENCY_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn within_tolerance_is_consistent() {
        assert!(is_consistent(dec!(100.00), [dec!(40.00), dec!(60.005)]));
        assert!(is_consistent(dec!(150.00), [dec!(50.00), dec!(100.00)]));
    }

    #[test]
    fn tolerance_boundary_is_exclusive() {
        assert!(!is_consistent(dec!(100.00), [dec!(40.00), dec!(59.98)]));
        assert!(!is_consistent(dec!(100.00), [dec!(40.00), dec!(59.99)]));
        assert!(!is_consistent(dec!(100.00), [dec!(40.00), dec!(60.01)]));
    }

    #[test]
    fn overflowing_subtotals_are_inconsistent() {
        assert!(!is_consistent(Decimal::MAX, [Decimal::MAX, Decimal::ONE]));
        assert!(!is_consistent(Decimal::MIN, [Decimal::MAX]));
    }

    #[test]
    fn empty_line_items_sum_to_zero() {
        assert!(is_consistent(dec!(0.00), []));
        assert!(is_consistent(dec!(0.009), []));
        assert!(!is_consistent(dec!(10.00), []));
    }
}
