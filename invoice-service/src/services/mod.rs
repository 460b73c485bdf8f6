//! Services for invoice-service.

pub mod credit_notes;
pub mod database;
pub mod ingestion;
pub mod memory;
pub mod metrics;
pub mod reporting;
pub mod store;

pub use credit_notes::CreditNoteService;
pub use database::Database;
pub use ingestion::{IngestResult, IngestionService, RecordError, SkippedRecord};
pub use memory::InMemoryStore;
pub use store::InvoiceStore;
