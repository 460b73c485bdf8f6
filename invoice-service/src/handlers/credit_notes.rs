use crate::dtos::{
    CreateCreditNoteRequest, CreditNoteCreatedResponse, CreditNoteListResponse,
    CreditNoteRemovedResponse, InvoiceCreditNotesResponse,
};
use crate::error::InvoiceError;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

pub async fn list_credit_notes(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let data = state.store.list_credit_notes().await?;

    Ok(Json(CreditNoteListResponse {
        count: data.len(),
        data,
    }))
}

pub async fn list_invoice_credit_notes(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let details = state
        .store
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| InvoiceError::invoice_not_found(invoice_id))?;

    Ok(Json(InvoiceCreditNotesResponse {
        invoice_id,
        invoice_number: details.invoice.invoice_number,
        invoice_total_amount: details.invoice.total_amount,
        total_credit_notes: details.total_credit_notes(),
        pending_amount: details.pending_amount(),
        credit_notes: details.credit_notes,
    }))
}

pub async fn create_credit_note(
    State(state): State<AppState>,
    Json(req): Json<CreateCreditNoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let applied = state
        .credit_notes
        .add(req.invoice_id, req.credit_note_amount, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreditNoteCreatedResponse::from(applied)),
    ))
}

pub async fn delete_credit_note(
    State(state): State<AppState>,
    Path(credit_note_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state.credit_notes.remove(credit_note_id).await?;
    Ok(Json(CreditNoteRemovedResponse::from(removed)))
}
