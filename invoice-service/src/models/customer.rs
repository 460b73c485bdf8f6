//! Customer model for invoice-service.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Customer, identified by its business `customer_run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub customer_id: Uuid,
    pub customer_run: String,
    pub customer_name: String,
    pub customer_email: String,
}

/// Input for resolving or creating a customer.
#[derive(Debug, Clone)]
pub struct CreateCustomer {
    pub customer_run: String,
    pub customer_name: String,
    pub customer_email: String,
}
