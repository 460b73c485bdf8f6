use crate::error::InvoiceError;
use rust_decimal::Decimal;

/// Fraction digits kept for stored amounts.
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude a stored `NUMERIC(18,2)` amount can hold.
pub const MAX_MONEY: Decimal = Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, 2);

/// Round an amount to the stored scale so every backend renders it the same way.
pub fn to_money(value: Decimal) -> Decimal {
    let mut amount = value;
    amount.rescale(MONEY_SCALE);
    amount
}

/// Round `value` and reject it when it does not fit the stored range.
pub fn checked_money(field: &str, value: Decimal) -> Result<Decimal, InvoiceError> {
    let amount = to_money(value);
    if amount.abs() > MAX_MONEY {
        return Err(InvoiceError::validation(format!(
            "{field} {value} is outside the supported range"
        )));
    }
    Ok(amount)
}

/// Sum of `values`, or `None` when it overflows.
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
}
