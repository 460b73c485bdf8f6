//! Domain models for invoice-service.

mod credit_note;
mod customer;
mod invoice;
mod line_item;
mod payment;

pub use credit_note::{
    CreateCreditNote, CreditNote, CreditNoteApplied, CreditNoteListing, CreditNoteRemoved,
    NewCreditNote,
};
pub use customer::{CreateCustomer, Customer};
pub use invoice::{
    CreateInvoice, Invoice, InvoiceDetails, InvoiceStatus, ListInvoicesFilter, PaymentStatus,
    UnknownStatus,
};
pub use line_item::{CreateLineItem, LineItem};
pub use payment::{CreatePayment, Payment};
