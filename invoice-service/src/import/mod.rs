//! JSON import format: document parsing and per-record preparation.

mod record;

pub use record::{
    ImportCreditNote, ImportCustomer, ImportLineItem, ImportPayment, ImportRecord,
    PreparedInvoice, parse_import_date,
};

use crate::error::InvoiceError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ImportDocument {
    #[serde(default)]
    invoices: Vec<Value>,
}

/// One entry of an import document: either a typed record or the reason it
/// could not be read, with the invoice number when it was recoverable.
#[derive(Debug)]
pub enum RawRecord {
    Parsed(Box<ImportRecord>),
    Malformed {
        invoice_number: Option<i64>,
        reason: String,
    },
}

/// Parse an import document. A document that is not JSON, or holds no
/// invoices, is rejected as a whole; individual records that fail to
/// deserialize are returned as `RawRecord::Malformed`.
pub fn parse_document(json_content: &str) -> Result<Vec<RawRecord>, InvoiceError> {
    let document: ImportDocument = serde_json::from_str(json_content)
        .map_err(|e| InvoiceError::validation(format!("Invalid import document: {e}")))?;

    if document.invoices.is_empty() {
        return Err(InvoiceError::validation(
            "Import document contains no invoices",
        ));
    }

    Ok(document.invoices.into_iter().map(parse_record).collect())
}

fn parse_record(value: Value) -> RawRecord {
    let invoice_number = value.get("invoice_number").and_then(Value::as_i64);

    match serde_json::from_value::<ImportRecord>(value) {
        Ok(record) => RawRecord::Parsed(Box::new(record)),
        Err(e) => RawRecord::Malformed {
            invoice_number,
            reason: format!("Malformed invoice record: {e}"),
        },
    }
}
