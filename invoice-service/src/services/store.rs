//! Storage seam shared by the PostgreSQL and in-memory backends.

use crate::error::InvoiceError;
use crate::models::{
    CreateCreditNote, CreateCustomer, CreateInvoice, CreditNoteApplied, CreditNoteListing,
    CreditNoteRemoved, Customer, InvoiceDetails, ListInvoicesFilter,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence operations for invoices and their credit notes.
///
/// Every mutating method is atomic: an invoice is written together with all
/// of its children, and a credit note change is written together with the
/// owning invoice's status.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn health_check(&self) -> Result<(), InvoiceError>;

    async fn invoice_number_exists(&self, invoice_number: i64) -> Result<bool, InvoiceError>;

    /// Return the customer with `input.customer_run`, creating it when absent.
    /// The first writer's name and email are kept.
    async fn find_or_create_customer(&self, input: &CreateCustomer)
        -> Result<Customer, InvoiceError>;

    /// Persist an invoice graph. Fails with `DuplicateInvoice` when the number
    /// is already taken.
    async fn create_invoice(&self, input: CreateInvoice) -> Result<InvoiceDetails, InvoiceError>;

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<InvoiceDetails>, InvoiceError>;

    /// Invoices matching `filter`, ordered by invoice number.
    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceDetails>, InvoiceError>;

    /// All credit notes, newest number first.
    async fn list_credit_notes(&self) -> Result<Vec<CreditNoteListing>, InvoiceError>;

    /// Validate and add a credit note, numbering it from the global sequence
    /// and updating the invoice status in the same unit of work.
    async fn add_credit_note(
        &self,
        input: CreateCreditNote,
    ) -> Result<CreditNoteApplied, InvoiceError>;

    /// Delete a credit note and re-derive the owning invoice's status.
    async fn remove_credit_note(
        &self,
        credit_note_id: Uuid,
    ) -> Result<CreditNoteRemoved, InvoiceError>;
}
