pub mod config;
pub mod domain;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod import;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

pub use error::InvoiceError;
