use crate::models::{InvoiceDetails, ListInvoicesFilter};
use crate::services::reporting;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use service_core::error::AppError;

async fn all_invoices(state: &AppState) -> Result<Vec<InvoiceDetails>, AppError> {
    Ok(state
        .store
        .list_invoices(&ListInvoicesFilter::default())
        .await?)
}

pub async fn overdue_invoices(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let invoices = all_invoices(&state).await?;
    Ok(Json(reporting::overdue_invoices(&invoices, Utc::now())))
}

pub async fn payment_status_summary(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = all_invoices(&state).await?;
    Ok(Json(reporting::payment_status_summary(&invoices, Utc::now())))
}

pub async fn inconsistent_invoices(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = all_invoices(&state).await?;
    Ok(Json(reporting::inconsistent_invoices(&invoices, Utc::now())))
}

pub async fn executive_dashboard(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let invoices = all_invoices(&state).await?;
    Ok(Json(reporting::executive_dashboard(&invoices, Utc::now())))
}
