use crate::dtos::{InvoiceListParams, InvoiceListResponse, InvoiceResponse};
use crate::error::InvoiceError;
use crate::models::ListInvoicesFilter;
use crate::services::reporting;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<InvoiceListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ListInvoicesFilter::try_from(params)?;

    let data: Vec<InvoiceResponse> = state
        .store
        .list_invoices(&filter)
        .await?
        .into_iter()
        .map(InvoiceResponse::from)
        .collect();

    Ok(Json(InvoiceListResponse {
        count: data.len(),
        data,
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let details = state
        .store
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| InvoiceError::invoice_not_found(invoice_id))?;

    Ok(Json(InvoiceResponse::from(details)))
}

pub async fn get_statistics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let invoices = state.store.list_invoices(&ListInvoicesFilter::default()).await?;
    Ok(Json(reporting::statistics(&invoices)))
}
