//! Credit note lifecycle.

use super::metrics::{CREDIT_NOTES_TOTAL, ERRORS_TOTAL};
use super::store::InvoiceStore;
use crate::domain::checked_money;
use crate::error::InvoiceError;
use crate::models::{CreateCreditNote, CreditNoteApplied, CreditNoteRemoved};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct CreditNoteService {
    store: Arc<dyn InvoiceStore>,
}

impl CreditNoteService {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self { store }
    }

    /// Issue a credit note of `amount` against an invoice, stamped with `now`.
    #[instrument(skip(self, now), fields(invoice_id = %invoice_id, amount = %amount))]
    pub async fn add(
        &self,
        invoice_id: Uuid,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<CreditNoteApplied, InvoiceError> {
        if amount <= Decimal::ZERO {
            ERRORS_TOTAL.with_label_values(&["validation"]).inc();
            return Err(InvoiceError::validation(
                "Credit note amount must be greater than zero",
            ));
        }

        let amount = match checked_money("credit_note_amount", amount) {
            Ok(amount) => amount,
            Err(e) => {
                ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
                return Err(e);
            }
        };

        let result = self
            .store
            .add_credit_note(CreateCreditNote {
                invoice_id,
                amount,
                issued_at: now,
            })
            .await;

        match &result {
            Ok(applied) => {
                CREDIT_NOTES_TOTAL.with_label_values(&["created"]).inc();
                info!(
                    credit_note_number = applied.credit_note.credit_note_number,
                    invoice_status = %applied.invoice_status,
                    pending_amount = %applied.pending_amount,
                    "Credit note applied"
                );
            }
            Err(e) => {
                ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
                warn!(error = %e, "Credit note rejected");
            }
        }

        result
    }

    #[instrument(skip(self), fields(credit_note_id = %credit_note_id))]
    pub async fn remove(&self, credit_note_id: Uuid) -> Result<CreditNoteRemoved, InvoiceError> {
        let result = self.store.remove_credit_note(credit_note_id).await;

        match &result {
            Ok(removed) => {
                CREDIT_NOTES_TOTAL.with_label_values(&["removed"]).inc();
                info!(
                    credit_note_number = removed.credit_note_number,
                    invoice_status = %removed.invoice_status,
                    "Credit note removed"
                );
            }
            Err(e) => {
                ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
                warn!(error = %e, "Credit note removal failed");
            }
        }

        result
    }
}
