pub mod credit_notes;
pub mod data;
pub mod health;
pub mod invoices;
pub mod reports;

pub use credit_notes::{
    create_credit_note, delete_credit_note, list_credit_notes, list_invoice_credit_notes,
};
pub use data::{load_from_file, load_from_json};
pub use health::{health_check, metrics_handler, readiness_check};
pub use invoices::{get_invoice, get_statistics, list_invoices};
pub use reports::{
    executive_dashboard, inconsistent_invoices, overdue_invoices, payment_status_summary,
};
