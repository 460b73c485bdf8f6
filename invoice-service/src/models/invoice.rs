//! Invoice model for invoice-service.

use super::{CreateLineItem, CreatePayment, CreditNote, Customer, LineItem, NewCreditNote, Payment};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Raised when a stored or requested status string is not recognised.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

/// Invoice status, derived from the cumulative credit note amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Issued,
    Partial,
    Canceled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 3] = [
        InvoiceStatus::Issued,
        InvoiceStatus::Partial,
        InvoiceStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus {
                kind: "invoice status",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for InvoiceStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Payment status. Wire spelling is capitalised (`Pending`, `Overdue`, `Paid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Overdue,
    Paid,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Overdue,
        PaymentStatus::Paid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Overdue => "Overdue",
            PaymentStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus {
                kind: "payment status",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Invoice header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub invoice_number: i64,
    pub invoice_date: NaiveDate,
    pub total_amount: Decimal,
    pub days_to_due: i32,
    pub payment_due_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub invoice_status: InvoiceStatus,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,
    pub is_consistent: bool,
    pub customer_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

/// Invoice together with every record it owns.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub customer: Customer,
    pub line_items: Vec<LineItem>,
    pub credit_notes: Vec<CreditNote>,
    pub payment: Option<Payment>,
}

impl InvoiceDetails {
    pub fn total_credit_notes(&self) -> Decimal {
        self.credit_notes
            .iter()
            .map(|note| note.credit_note_amount)
            .sum()
    }

    pub fn pending_amount(&self) -> Decimal {
        self.invoice.total_amount - self.total_credit_notes()
    }

    /// Sum of the line item subtotals.
    pub fn calculated_total(&self) -> Decimal {
        self.line_items.iter().map(|item| item.subtotal).sum()
    }
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub invoice_number: Option<i64>,
    pub invoice_status: Option<InvoiceStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub consistent_only: bool,
}

impl ListInvoicesFilter {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        self.invoice_number
            .map_or(true, |number| invoice.invoice_number == number)
            && self
                .invoice_status
                .map_or(true, |status| invoice.invoice_status == status)
            && self
                .payment_status
                .map_or(true, |status| invoice.payment_status == status)
            && (!self.consistent_only || invoice.is_consistent)
    }
}

/// Fully prepared invoice graph, written in one unit.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub invoice_number: i64,
    pub invoice_date: NaiveDate,
    pub total_amount: Decimal,
    pub days_to_due: i32,
    pub payment_due_date: NaiveDate,
    pub invoice_status: InvoiceStatus,
    pub payment_status: PaymentStatus,
    pub is_consistent: bool,
    pub customer_id: Uuid,
    pub line_items: Vec<CreateLineItem>,
    pub payment: Option<CreatePayment>,
    pub credit_notes: Vec<NewCreditNote>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!("PARTIAL".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Partial);
        assert_eq!("overdue".parse::<PaymentStatus>().unwrap(), PaymentStatus::Overdue);
        assert!("void".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn wire_spellings_are_preserved() {
        assert_eq!(
            serde_json::to_value(InvoiceStatus::Canceled).unwrap(),
            "canceled"
        );
        assert_eq!(serde_json::to_value(PaymentStatus::Paid).unwrap(), "Paid");
    }
}
