//! Domain error taxonomy for invoice-service.

use rust_decimal::Decimal;
use serde_json::json;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Malformed input: amounts, identifiers, dates, import documents.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Invoice {0} already exists")]
    DuplicateInvoice(i64),

    #[error("Invoice {invoice_number} is inconsistent; credit notes cannot be added")]
    InconsistentInvoice { invoice_number: i64 },

    #[error(
        "Credit note amount {requested_amount} exceeds the pending balance {pending_amount}"
    )]
    ExceedsPendingBalance {
        pending_amount: Decimal,
        requested_amount: Decimal,
    },

    #[error("Persistence failure: {0}")]
    Persistence(anyhow::Error),
}

impl InvoiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        InvoiceError::Validation(message.into())
    }

    pub fn invoice_not_found(id: impl ToString) -> Self {
        InvoiceError::NotFound {
            entity: "Invoice",
            id: id.to_string(),
        }
    }

    pub fn credit_note_not_found(id: impl ToString) -> Self {
        InvoiceError::NotFound {
            entity: "Credit note",
            id: id.to_string(),
        }
    }

    /// Short label used for metrics and ingestion reports.
    pub fn kind(&self) -> &'static str {
        match self {
            InvoiceError::Validation(_) => "validation",
            InvoiceError::NotFound { .. } => "not_found",
            InvoiceError::DuplicateInvoice(_) => "duplicate",
            InvoiceError::InconsistentInvoice { .. } => "inconsistent_invoice",
            InvoiceError::ExceedsPendingBalance { .. } => "exceeds_pending_balance",
            InvoiceError::Persistence(_) => "persistence",
        }
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::Validation(message) => AppError::BadRequest(anyhow::anyhow!(message)),
            err @ InvoiceError::NotFound { .. } => AppError::NotFound(anyhow::anyhow!(err)),
            err @ InvoiceError::DuplicateInvoice(_) => AppError::Conflict(anyhow::anyhow!(err)),
            err @ InvoiceError::InconsistentInvoice { invoice_number } => AppError::RuleViolation {
                message: err.to_string(),
                context: Some(json!({ "invoice_number": invoice_number })),
            },
            err @ InvoiceError::ExceedsPendingBalance {
                pending_amount,
                requested_amount,
            } => AppError::RuleViolation {
                message: err.to_string(),
                context: Some(json!({
                    "pending_amount": pending_amount,
                    "requested_amount": requested_amount,
                })),
            },
            InvoiceError::Persistence(cause) => AppError::DatabaseError(cause),
        }
    }
}
