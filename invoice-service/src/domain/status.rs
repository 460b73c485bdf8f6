use crate::models::{InvoiceStatus, PaymentStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Invoice status from the cumulative credit note amount.
pub fn derive_invoice_status(total_credit_notes: Decimal, invoice_total: Decimal) -> InvoiceStatus {
    if total_credit_notes.is_zero() {
        InvoiceStatus::Issued
    } else if total_credit_notes >= invoice_total {
        InvoiceStatus::Canceled
    } else {
        InvoiceStatus::Partial
    }
}

/// Payment status from payment presence and the due date. An invoice becomes
/// overdue the calendar day after its due date.
pub fn derive_payment_status(
    has_payment: bool,
    due_date: NaiveDate,
    now: DateTime<Utc>,
) -> PaymentStatus {
    if has_payment {
        PaymentStatus::Paid
    } else if now.date_naive() > due_date {
        PaymentStatus::Overdue
    } else {
        PaymentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn invoice_status_thresholds() {
        assert_eq!(derive_invoice_status(dec!(0), dec!(100)), InvoiceStatus::Issued);
        assert_eq!(derive_invoice_status(dec!(0.01), dec!(100)), InvoiceStatus::Partial);
        assert_eq!(derive_invoice_status(dec!(100), dec!(100)), InvoiceStatus::Canceled);
        assert_eq!(derive_invoice_status(dec!(120), dec!(100)), InvoiceStatus::Canceled);
    }

    #[test]
    fn payment_wins_over_due_date() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            derive_payment_status(true, date(2020, 1, 1), now),
            PaymentStatus::Paid
        );
    }

    #[test]
    fn due_today_is_still_pending() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();
        assert_eq!(
            derive_payment_status(false, date(2025, 6, 1), now),
            PaymentStatus::Pending
        );
        assert_eq!(
            derive_payment_status(false, date(2025, 5, 31), now),
            PaymentStatus::Overdue
        );
    }

    fn rank(status: InvoiceStatus) -> u8 {
        match status {
            InvoiceStatus::Issued => 0,
            InvoiceStatus::Partial => 1,
            InvoiceStatus::Canceled => 2,
        }
    }

    proptest! {
        #[test]
        fn invoice_status_never_moves_backwards(
            total_cents in 1i64..10_000_000,
            lower_cents in 0i64..10_000_000,
            delta_cents in 0i64..10_000_000,
        ) {
            let total = Decimal::new(total_cents, 2);
            let lower = Decimal::new(lower_cents, 2);
            let higher = Decimal::new(lower_cents + delta_cents, 2);

            prop_assert!(
                rank(derive_invoice_status(lower, total)) <= rank(derive_invoice_status(higher, total))
            );
        }
    }
}
