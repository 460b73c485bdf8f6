//! Pure business rules shared by every store backend.

pub mod consistency;
pub mod credit_note;
pub mod money;
pub mod status;

pub use consistency::{CONSISTENCY_TOLERANCE, is_consistent};
pub use credit_note::{CreditNotePlan, pending_balance, plan_credit_note, status_after_removal};
pub use money::{MAX_MONEY, MONEY_SCALE, checked_money, checked_sum, to_money};
pub use status::{derive_invoice_status, derive_payment_status};
