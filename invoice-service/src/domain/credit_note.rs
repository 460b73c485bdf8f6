use super::status::derive_invoice_status;
use crate::error::InvoiceError;
use crate::models::{Invoice, InvoiceStatus};
use rust_decimal::Decimal;

/// Result of validating a credit note against its invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditNotePlan {
    pub invoice_status: InvoiceStatus,
    pub pending_amount: Decimal,
}

pub fn pending_balance(invoice_total: Decimal, total_credit_notes: Decimal) -> Decimal {
    invoice_total - total_credit_notes
}

/// Checks the rules for adding `amount` to an invoice that already carries
/// `existing_total` in credit notes and returns the resulting status and balance.
pub fn plan_credit_note(
    invoice: &Invoice,
    existing_total: Decimal,
    amount: Decimal,
) -> Result<CreditNotePlan, InvoiceError> {
    if amount <= Decimal::ZERO {
        return Err(InvoiceError::validation(
            "Credit note amount must be greater than zero",
        ));
    }

    if !invoice.is_consistent {
        return Err(InvoiceError::InconsistentInvoice {
            invoice_number: invoice.invoice_number,
        });
    }

    let pending = pending_balance(invoice.total_amount, existing_total);
    if amount > pending {
        return Err(InvoiceError::ExceedsPendingBalance {
            pending_amount: pending,
            requested_amount: amount,
        });
    }

    let new_total = existing_total + amount;
    Ok(CreditNotePlan {
        invoice_status: derive_invoice_status(new_total, invoice.total_amount),
        pending_amount: pending_balance(invoice.total_amount, new_total),
    })
}

/// Invoice status once a credit note is gone. Only the `issued` and `partial`
/// transitions are re-derived; any other case keeps `current`.
pub fn status_after_removal(
    remaining_total: Decimal,
    invoice_total: Decimal,
    current: InvoiceStatus,
) -> InvoiceStatus {
    if remaining_total.is_zero() {
        InvoiceStatus::Issued
    } else if remaining_total < invoice_total {
        InvoiceStatus::Partial
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentStatus;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn invoice(total: Decimal, is_consistent: bool) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number: 42,
            invoice_date: date,
            total_amount: total,
            days_to_due: 30,
            payment_due_date: date,
            invoice_status: InvoiceStatus::Issued,
            payment_status: PaymentStatus::Pending,
            is_consistent,
            customer_id: Uuid::new_v4(),
            created_utc: Utc::now(),
        }
    }

    #[test]
    fn rejects_amount_above_pending_balance() {
        let err = plan_credit_note(&invoice(dec!(100.00), true), dec!(80.00), dec!(25.00))
            .unwrap_err();
        match err {
            InvoiceError::ExceedsPendingBalance {
                pending_amount,
                requested_amount,
            } => {
                assert_eq!(pending_amount, dec!(20.00));
                assert_eq!(requested_amount, dec!(25.00));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn exact_pending_balance_cancels_invoice() {
        let plan = plan_credit_note(&invoice(dec!(100.00), true), dec!(80.00), dec!(20.00))
            .unwrap();
        assert_eq!(plan.invoice_status, InvoiceStatus::Canceled);
        assert_eq!(plan.pending_amount, dec!(0.00));
    }

    #[test]
    fn first_partial_credit_note_moves_to_partial() {
        let plan = plan_credit_note(&invoice(dec!(100.00), true), dec!(0), dec!(10.00)).unwrap();
        assert_eq!(plan.invoice_status, InvoiceStatus::Partial);
        assert_eq!(plan.pending_amount, dec!(90.00));
    }

    #[test]
    fn rejects_non_positive_amount_and_inconsistent_invoice() {
        assert!(matches!(
            plan_credit_note(&invoice(dec!(100.00), true), dec!(0), dec!(0)),
            Err(InvoiceError::Validation(_))
        ));
        assert!(matches!(
            plan_credit_note(&invoice(dec!(100.00), true), dec!(0), dec!(-5)),
            Err(InvoiceError::Validation(_))
        ));
        assert!(matches!(
            plan_credit_note(&invoice(dec!(100.00), false), dec!(0), dec!(5)),
            Err(InvoiceError::InconsistentInvoice { invoice_number: 42 })
        ));
    }

    #[test]
    fn removal_transitions() {
        assert_eq!(
            status_after_removal(dec!(0), dec!(100), InvoiceStatus::Canceled),
            InvoiceStatus::Issued
        );
        assert_eq!(
            status_after_removal(dec!(40), dec!(100), InvoiceStatus::Canceled),
            InvoiceStatus::Partial
        );
        assert_eq!(
            status_after_removal(dec!(100), dec!(100), InvoiceStatus::Canceled),
            InvoiceStatus::Canceled
        );
    }
}
