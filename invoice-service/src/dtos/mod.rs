pub mod credit_notes;
pub mod data;
pub mod invoices;

pub use credit_notes::{
    CreateCreditNoteRequest, CreditNoteCreatedResponse, CreditNoteListResponse,
    CreditNoteRemovedResponse, InvoiceCreditNotesResponse,
};
pub use data::{LoadFromFileRequest, LoadFromJsonRequest};
pub use invoices::{InvoiceListParams, InvoiceListResponse, InvoiceResponse};
