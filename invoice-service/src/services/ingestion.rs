//! Import pipeline: turns import documents into persisted invoices.

use super::metrics::{ERRORS_TOTAL, INGESTED_RECORDS_TOTAL};
use super::store::InvoiceStore;
use crate::error::InvoiceError;
use crate::import::{self, ImportRecord, RawRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of an import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestResult {
    pub processed: usize,
    pub skipped: Vec<SkippedRecord>,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub invoice_number: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub invoice_number: Option<i64>,
    pub reason: String,
}

enum RecordOutcome {
    Processed,
    Duplicate,
}

#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn InvoiceStore>,
    import_base_dir: Option<PathBuf>,
}

impl IngestionService {
    pub fn new(store: Arc<dyn InvoiceStore>, import_base_dir: Option<PathBuf>) -> Self {
        Self {
            store,
            import_base_dir,
        }
    }

    /// Ingest records one at a time. A failing record is reported and never
    /// aborts the batch.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn ingest(&self, records: Vec<RawRecord>, now: DateTime<Utc>) -> IngestResult {
        let mut result = IngestResult::default();

        for raw in records {
            let record = match raw {
                RawRecord::Parsed(record) => record,
                RawRecord::Malformed {
                    invoice_number,
                    reason,
                } => {
                    warn!(?invoice_number, %reason, "Skipping malformed import record");
                    INGESTED_RECORDS_TOTAL.with_label_values(&["error"]).inc();
                    result.errors.push(RecordError {
                        invoice_number,
                        reason,
                    });
                    continue;
                }
            };

            let invoice_number = record.invoice_number;
            match self.ingest_record(&record, now).await {
                Ok(RecordOutcome::Processed) => {
                    INGESTED_RECORDS_TOTAL.with_label_values(&["processed"]).inc();
                    result.processed += 1;
                }
                Ok(RecordOutcome::Duplicate) => {
                    warn!(invoice_number, "Invoice already exists, skipping");
                    INGESTED_RECORDS_TOTAL.with_label_values(&["skipped"]).inc();
                    result.skipped.push(SkippedRecord {
                        invoice_number,
                        reason: "duplicate".to_string(),
                    });
                }
                Err(e) => {
                    warn!(invoice_number, error = %e, "Failed to ingest invoice");
                    INGESTED_RECORDS_TOTAL.with_label_values(&["error"]).inc();
                    ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
                    result.errors.push(RecordError {
                        invoice_number: Some(invoice_number),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = result.processed,
            skipped = result.skipped.len(),
            errors = result.errors.len(),
            "Import batch finished"
        );

        result
    }

    async fn ingest_record(
        &self,
        record: &ImportRecord,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, InvoiceError> {
        if self.store.invoice_number_exists(record.invoice_number).await? {
            return Ok(RecordOutcome::Duplicate);
        }

        let prepared = record.prepare(now)?;
        let customer = self.store.find_or_create_customer(&prepared.customer).await?;

        match self
            .store
            .create_invoice(prepared.into_create(customer.customer_id))
            .await
        {
            Ok(_) => Ok(RecordOutcome::Processed),
            // Lost a race with a concurrent import of the same number.
            Err(InvoiceError::DuplicateInvoice(_)) => Ok(RecordOutcome::Duplicate),
            Err(e) => Err(e),
        }
    }

    /// Parse and ingest an inline JSON document.
    pub async fn ingest_json(
        &self,
        json_content: &str,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, InvoiceError> {
        let records = import::parse_document(json_content)?;
        Ok(self.ingest(records, now).await)
    }

    /// Read an import document from disk and ingest it. When an import base
    /// directory is configured the file must resolve inside it.
    #[instrument(skip(self, now))]
    pub async fn ingest_file(
        &self,
        file_path: &str,
        now: DateTime<Utc>,
    ) -> Result<IngestResult, InvoiceError> {
        let path = self.resolve_import_path(Path::new(file_path)).await?;

        let json_content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            InvoiceError::validation(format!("Unable to read import file {}: {}", file_path, e))
        })?;

        self.ingest_json(&json_content, now).await
    }

    async fn resolve_import_path(&self, requested: &Path) -> Result<PathBuf, InvoiceError> {
        let Some(base_dir) = &self.import_base_dir else {
            return Ok(requested.to_path_buf());
        };

        let candidate = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            base_dir.join(requested)
        };
        let not_found = || {
            InvoiceError::validation(format!(
                "Import file {} does not exist",
                requested.display()
            ))
        };

        let base_dir = tokio::fs::canonicalize(base_dir)
            .await
            .map_err(|e| InvoiceError::Persistence(anyhow::anyhow!("Invalid import directory: {e}")))?;
        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| not_found())?;

        if !resolved.starts_with(&base_dir) {
            return Err(InvoiceError::validation(format!(
                "Import file {} is outside the import directory",
                requested.display()
            )));
        }

        Ok(resolved)
    }
}
