use crate::error::InvoiceError;
use crate::models::{
    CreditNote, Customer, Invoice, InvoiceDetails, InvoiceStatus, LineItem, ListInvoicesFilter,
    Payment, PaymentStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListParams {
    pub invoice_number: Option<i64>,
    pub invoice_status: Option<String>,
    pub payment_status: Option<String>,
    pub consistent_only: Option<bool>,
}

impl TryFrom<InvoiceListParams> for ListInvoicesFilter {
    type Error = InvoiceError;

    fn try_from(params: InvoiceListParams) -> Result<Self, Self::Error> {
        let invoice_status = params
            .invoice_status
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<InvoiceStatus>())
            .transpose()
            .map_err(|e| InvoiceError::validation(e.to_string()))?;
        let payment_status = params
            .payment_status
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<PaymentStatus>())
            .transpose()
            .map_err(|e| InvoiceError::validation(e.to_string()))?;

        Ok(ListInvoicesFilter {
            invoice_number: params.invoice_number,
            invoice_status,
            payment_status,
            consistent_only: params.consistent_only.unwrap_or(true),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub customer: Customer,
    pub line_items: Vec<LineItem>,
    pub credit_notes: Vec<CreditNote>,
    pub payment: Option<Payment>,
    pub total_credit_notes: Decimal,
    pub pending_amount: Decimal,
}

impl From<InvoiceDetails> for InvoiceResponse {
    fn from(details: InvoiceDetails) -> Self {
        let total_credit_notes = details.total_credit_notes();
        let pending_amount = details.pending_amount();
        Self {
            invoice: details.invoice,
            customer: details.customer,
            line_items: details.line_items,
            credit_notes: details.credit_notes,
            payment: details.payment,
            total_credit_notes,
            pending_amount,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub data: Vec<InvoiceResponse>,
    pub count: usize,
}
