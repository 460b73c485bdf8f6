use crate::domain::{
    checked_money, checked_sum, derive_invoice_status, derive_payment_status, is_consistent,
};
use crate::error::InvoiceError;
use crate::models::{
    CreateCustomer, CreateInvoice, CreateLineItem, CreatePayment, InvoiceStatus, NewCreditNote,
    PaymentStatus,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Invoice record as it appears in an import document. The status fields of
/// the source are ignored; statuses are always derived.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRecord {
    pub invoice_number: i64,
    pub invoice_date: String,
    pub total_amount: Decimal,
    #[serde(default)]
    pub days_to_due: i32,
    #[serde(default)]
    pub payment_due_date: Option<String>,
    #[serde(default)]
    pub invoice_detail: Vec<ImportLineItem>,
    #[serde(default)]
    pub invoice_payment: Option<ImportPayment>,
    #[serde(default)]
    pub invoice_credit_note: Vec<ImportCreditNote>,
    pub customer: ImportCustomer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportLineItem {
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportPayment {
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportCreditNote {
    pub credit_note_number: i64,
    pub credit_note_date: String,
    pub credit_note_amount: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportCustomer {
    pub customer_run: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
}

/// A validated record whose statuses have been derived, waiting only for its
/// customer to be resolved.
#[derive(Debug, Clone)]
pub struct PreparedInvoice {
    pub customer: CreateCustomer,
    pub invoice_number: i64,
    pub invoice_date: NaiveDate,
    pub total_amount: Decimal,
    pub days_to_due: i32,
    pub payment_due_date: NaiveDate,
    pub invoice_status: InvoiceStatus,
    pub payment_status: PaymentStatus,
    pub is_consistent: bool,
    pub line_items: Vec<CreateLineItem>,
    pub payment: Option<CreatePayment>,
    pub credit_notes: Vec<NewCreditNote>,
}

impl PreparedInvoice {
    pub fn into_create(self, customer_id: Uuid) -> CreateInvoice {
        CreateInvoice {
            invoice_number: self.invoice_number,
            invoice_date: self.invoice_date,
            total_amount: self.total_amount,
            days_to_due: self.days_to_due,
            payment_due_date: self.payment_due_date,
            invoice_status: self.invoice_status,
            payment_status: self.payment_status,
            is_consistent: self.is_consistent,
            customer_id,
            line_items: self.line_items,
            payment: self.payment,
            credit_notes: self.credit_notes,
        }
    }
}

impl ImportRecord {
    /// Validate the record and derive its statuses against `now`.
    pub fn prepare(&self, now: DateTime<Utc>) -> Result<PreparedInvoice, InvoiceError> {
        let customer_run = self.customer.customer_run.trim();
        if customer_run.is_empty() {
            return Err(InvoiceError::validation("customer_run is required"));
        }

        let invoice_date = parse_import_date(&self.invoice_date)
            .map_err(|e| field_error("invoice_date", e))?;
        let payment_due_date = match self.payment_due_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                parse_import_date(raw).map_err(|e| field_error("payment_due_date", e))?
            }
            _ => invoice_date
                .checked_add_signed(Duration::days(i64::from(self.days_to_due)))
                .ok_or_else(|| InvoiceError::validation("days_to_due is out of range"))?,
        };

        let total_amount = checked_money("total_amount", self.total_amount)?;

        let credit_notes = self
            .invoice_credit_note
            .iter()
            .map(|note| {
                if note.credit_note_amount <= Decimal::ZERO {
                    return Err(InvoiceError::validation(format!(
                        "Credit note {} amount must be greater than zero",
                        note.credit_note_number
                    )));
                }
                let date = parse_import_date(&note.credit_note_date)
                    .map_err(|e| field_error("credit_note_date", e))?;
                Ok(NewCreditNote {
                    credit_note_number: note.credit_note_number,
                    credit_note_date: date.and_time(NaiveTime::MIN).and_utc(),
                    credit_note_amount: checked_money(
                        "credit_note_amount",
                        note.credit_note_amount,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Over-credited records are rejected instead of being imported as canceled.
        let total_credit_notes =
            checked_sum(credit_notes.iter().map(|note| note.credit_note_amount))
                .filter(|sum| *sum <= total_amount)
                .ok_or_else(|| {
                    InvoiceError::validation(format!(
                        "Credit notes exceed invoice total {}",
                        total_amount
                    ))
                })?;

        let payment = match &self.invoice_payment {
            Some(ImportPayment {
                payment_method: Some(method),
                payment_date,
            }) if !method.trim().is_empty() => Some(CreatePayment {
                payment_method: method.trim().to_string(),
                payment_date: match payment_date.as_deref().map(str::trim) {
                    Some(raw) if !raw.is_empty() => Some(
                        parse_import_date(raw).map_err(|e| field_error("payment_date", e))?,
                    ),
                    _ => None,
                },
            }),
            _ => None,
        };

        // Consistency is judged on the amounts as supplied, before rounding.
        let consistent = is_consistent(
            self.total_amount,
            self.invoice_detail.iter().map(|item| item.subtotal),
        );
        let line_items = self
            .invoice_detail
            .iter()
            .map(|item| {
                Ok(CreateLineItem {
                    product_name: item.product_name.clone(),
                    unit_price: checked_money("unit_price", item.unit_price)?,
                    quantity: item.quantity,
                    subtotal: checked_money("subtotal", item.subtotal)?,
                })
            })
            .collect::<Result<Vec<_>, InvoiceError>>()?;

        Ok(PreparedInvoice {
            customer: CreateCustomer {
                customer_run: customer_run.to_string(),
                customer_name: self.customer.customer_name.trim().to_string(),
                customer_email: self.customer.customer_email.trim().to_string(),
            },
            invoice_number: self.invoice_number,
            invoice_date,
            total_amount,
            days_to_due: self.days_to_due,
            payment_due_date,
            invoice_status: derive_invoice_status(total_credit_notes, total_amount),
            payment_status: derive_payment_status(payment.is_some(), payment_due_date, now),
            is_consistent: consistent,
            line_items,
            payment,
            credit_notes,
        })
    }
}

fn field_error(field: &str, raw: &str) -> InvoiceError {
    InvoiceError::validation(format!("Invalid {field} '{raw}'"))
}

/// Parse a calendar date from `YYYY-MM-DD`, a naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// timestamp or an RFC 3339 timestamp. Only the date part is kept. On failure
/// the offending input is returned.
pub fn parse_import_date(raw: &str) -> Result<NaiveDate, &str> {
    let value = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(datetime.date());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.date_naive());
    }

    Err(raw)
}
