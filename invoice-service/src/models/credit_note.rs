//! Credit note model for invoice-service.

use super::InvoiceStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Credit note issued against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CreditNote {
    pub credit_note_id: Uuid,
    pub invoice_id: Uuid,
    pub credit_note_number: i64,
    pub credit_note_date: DateTime<Utc>,
    pub credit_note_amount: Decimal,
}

/// Credit note carried by an import record; keeps its source number.
#[derive(Debug, Clone)]
pub struct NewCreditNote {
    pub credit_note_number: i64,
    pub credit_note_date: DateTime<Utc>,
    pub credit_note_amount: Decimal,
}

/// Input for issuing a credit note through the lifecycle.
#[derive(Debug, Clone)]
pub struct CreateCreditNote {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub issued_at: DateTime<Utc>,
}

/// Outcome of a successful credit note creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreditNoteApplied {
    pub credit_note: CreditNote,
    pub invoice_number: i64,
    pub invoice_status: InvoiceStatus,
    pub pending_amount: Decimal,
}

/// Outcome of a credit note removal.
#[derive(Debug, Clone, Serialize)]
pub struct CreditNoteRemoved {
    pub credit_note_id: Uuid,
    pub credit_note_number: i64,
    pub invoice_id: Uuid,
    pub invoice_status: InvoiceStatus,
}

/// Credit note with a summary of its invoice and customer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CreditNoteListing {
    #[sqlx(flatten)]
    pub credit_note: CreditNote,
    pub invoice_number: i64,
    pub invoice_total: Decimal,
    pub customer_name: String,
    pub customer_run: String,
}
