use crate::models::{CreditNote, CreditNoteApplied, CreditNoteListing, CreditNoteRemoved, InvoiceStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateCreditNoteRequest {
    pub invoice_id: Uuid,
    pub credit_note_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CreditNoteListResponse {
    pub data: Vec<CreditNoteListing>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct InvoiceCreditNotesResponse {
    pub invoice_id: Uuid,
    pub invoice_number: i64,
    pub invoice_total_amount: Decimal,
    pub total_credit_notes: Decimal,
    pub pending_amount: Decimal,
    pub credit_notes: Vec<CreditNote>,
}

#[derive(Debug, Serialize)]
pub struct CreditNoteCreatedResponse {
    pub message: String,
    #[serde(flatten)]
    pub credit_note: CreditNote,
    pub invoice_number: i64,
    pub new_invoice_status: InvoiceStatus,
    pub pending_amount: Decimal,
}

impl From<CreditNoteApplied> for CreditNoteCreatedResponse {
    fn from(applied: CreditNoteApplied) -> Self {
        Self {
            message: format!(
                "Credit note {} created",
                applied.credit_note.credit_note_number
            ),
            credit_note: applied.credit_note,
            invoice_number: applied.invoice_number,
            new_invoice_status: applied.invoice_status,
            pending_amount: applied.pending_amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreditNoteRemovedResponse {
    pub message: String,
    pub credit_note_id: Uuid,
    pub credit_note_number: i64,
    pub invoice_id: Uuid,
    pub new_invoice_status: InvoiceStatus,
}

impl From<CreditNoteRemoved> for CreditNoteRemovedResponse {
    fn from(removed: CreditNoteRemoved) -> Self {
        Self {
            message: format!("Credit note {} deleted", removed.credit_note_number),
            credit_note_id: removed.credit_note_id,
            credit_note_number: removed.credit_note_number,
            invoice_id: removed.invoice_id,
            new_invoice_status: removed.invoice_status,
        }
    }
}
