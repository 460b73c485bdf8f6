//! PostgreSQL `InvoiceStore` for invoice-service.

use super::store::InvoiceStore;
use crate::domain::{plan_credit_note, status_after_removal};
use crate::error::InvoiceError;
use crate::models::{
    CreateCreditNote, CreateCustomer, CreateInvoice, CreditNote, CreditNoteApplied,
    CreditNoteListing, CreditNoteRemoved, Customer, Invoice, InvoiceDetails, LineItem,
    ListInvoicesFilter, Payment,
};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str = "invoice_id, invoice_number, invoice_date, total_amount, days_to_due, \
     payment_due_date, invoice_status, payment_status, is_consistent, customer_id, created_utc";

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> InvoiceError {
    move |e| InvoiceError::Persistence(anyhow::Error::new(e).context(context))
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoice-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Load customers, line items, credit notes and payments for `invoices`.
    async fn hydrate(&self, invoices: Vec<Invoice>) -> Result<Vec<InvoiceDetails>, InvoiceError> {
        if invoices.is_empty() {
            return Ok(Vec::new());
        }

        let invoice_ids: Vec<Uuid> = invoices.iter().map(|i| i.invoice_id).collect();
        let customer_ids: Vec<Uuid> = invoices.iter().map(|i| i.customer_id).collect();

        let customers: HashMap<Uuid, Customer> = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, customer_run, customer_name, customer_email
            FROM customers
            WHERE customer_id = ANY($1)
            "#,
        )
        .bind(&customer_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load customers"))?
        .into_iter()
        .map(|c| (c.customer_id, c))
        .collect();

        let mut line_items: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for item in sqlx::query_as::<_, LineItem>(
            r#"
            SELECT line_item_id, invoice_id, product_name, unit_price, quantity, subtotal
            FROM line_items
            WHERE invoice_id = ANY($1)
            ORDER BY line_number
            "#,
        )
        .bind(&invoice_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load line items"))?
        {
            line_items.entry(item.invoice_id).or_default().push(item);
        }

        let mut credit_notes: HashMap<Uuid, Vec<CreditNote>> = HashMap::new();
        for note in sqlx::query_as::<_, CreditNote>(
            r#"
            SELECT credit_note_id, invoice_id, credit_note_number, credit_note_date, credit_note_amount
            FROM credit_notes
            WHERE invoice_id = ANY($1)
            ORDER BY credit_note_number
            "#,
        )
        .bind(&invoice_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load credit notes"))?
        {
            credit_notes.entry(note.invoice_id).or_default().push(note);
        }

        let mut payments: HashMap<Uuid, Payment> = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, invoice_id, payment_method, payment_date
            FROM payments
            WHERE invoice_id = ANY($1)
            "#,
        )
        .bind(&invoice_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to load payments"))?
        .into_iter()
        .map(|p| (p.invoice_id, p))
        .collect();

        invoices
            .into_iter()
            .map(|invoice| {
                let customer = customers.get(&invoice.customer_id).cloned().ok_or_else(|| {
                    InvoiceError::Persistence(anyhow::anyhow!(
                        "Customer {} of invoice {} is missing",
                        invoice.customer_id,
                        invoice.invoice_number
                    ))
                })?;
                Ok(InvoiceDetails {
                    line_items: line_items.remove(&invoice.invoice_id).unwrap_or_default(),
                    credit_notes: credit_notes.remove(&invoice.invoice_id).unwrap_or_default(),
                    payment: payments.remove(&invoice.invoice_id),
                    customer,
                    invoice,
                })
            })
            .collect()
    }

    async fn lock_invoice(
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> Result<Option<Invoice>, InvoiceError> {
        sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE"
        ))
        .bind(invoice_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_error("Failed to lock invoice"))
    }

    async fn credit_total(
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> Result<Decimal, InvoiceError> {
        sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(credit_note_amount), 0) FROM credit_notes WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("Failed to sum credit notes"))
    }
}

#[async_trait]
impl InvoiceStore for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), InvoiceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("Health check failed"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invoice_number_exists(&self, invoice_number: i64) -> Result<bool, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["invoice_number_exists"])
            .start_timer();

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM invoices WHERE invoice_number = $1)",
        )
        .bind(invoice_number)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check invoice number"))?;

        timer.observe_duration();
        Ok(exists)
    }

    #[instrument(skip(self, input), fields(customer_run = %input.customer_run))]
    async fn find_or_create_customer(
        &self,
        input: &CreateCustomer,
    ) -> Result<Customer, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_or_create_customer"])
            .start_timer();

        let inserted = sqlx::query(
            r#"
            INSERT INTO customers (customer_id, customer_run, customer_name, customer_email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (customer_run) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.customer_run)
        .bind(&input.customer_name)
        .bind(&input.customer_email)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert customer"))?
        .rows_affected();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, customer_run, customer_name, customer_email
            FROM customers
            WHERE customer_run = $1
            "#,
        )
        .bind(&input.customer_run)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to load customer"))?;

        timer.observe_duration();

        if inserted > 0 {
            info!(customer_id = %customer.customer_id, "Customer created");
        }

        Ok(customer)
    }

    #[instrument(skip(self, input), fields(invoice_number = input.invoice_number))]
    async fn create_invoice(&self, input: CreateInvoice) -> Result<InvoiceDetails, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (invoice_id, invoice_number, invoice_date, total_amount, days_to_due,
                                  payment_due_date, invoice_status, payment_status, is_consistent, customer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.invoice_number)
        .bind(input.invoice_date)
        .bind(input.total_amount)
        .bind(input.days_to_due)
        .bind(input.payment_due_date)
        .bind(input.invoice_status.as_str())
        .bind(input.payment_status.as_str())
        .bind(input.is_consistent)
        .bind(input.customer_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                InvoiceError::DuplicateInvoice(input.invoice_number)
            }
            e => db_error("Failed to insert invoice")(e),
        })?;

        let mut line_items = Vec::with_capacity(input.line_items.len());
        for (line_number, item) in input.line_items.iter().enumerate() {
            let line_item = sqlx::query_as::<_, LineItem>(
                r#"
                INSERT INTO line_items (line_item_id, invoice_id, line_number, product_name, unit_price, quantity, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING line_item_id, invoice_id, product_name, unit_price, quantity, subtotal
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice.invoice_id)
            .bind(line_number as i32)
            .bind(&item.product_name)
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.subtotal)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to insert line item"))?;
            line_items.push(line_item);
        }

        let payment = match &input.payment {
            Some(payment) => Some(
                sqlx::query_as::<_, Payment>(
                    r#"
                    INSERT INTO payments (payment_id, invoice_id, payment_method, payment_date)
                    VALUES ($1, $2, $3, $4)
                    RETURNING payment_id, invoice_id, payment_method, payment_date
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(invoice.invoice_id)
                .bind(&payment.payment_method)
                .bind(payment.payment_date)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error("Failed to insert payment"))?,
            ),
            None => None,
        };

        let mut credit_notes = Vec::with_capacity(input.credit_notes.len());
        for note in &input.credit_notes {
            let credit_note = sqlx::query_as::<_, CreditNote>(
                r#"
                INSERT INTO credit_notes (credit_note_id, invoice_id, credit_note_number, credit_note_date, credit_note_amount)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING credit_note_id, invoice_id, credit_note_number, credit_note_date, credit_note_amount
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(invoice.invoice_id)
            .bind(note.credit_note_number)
            .bind(note.credit_note_date)
            .bind(note.credit_note_amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to insert credit note"))?;
            credit_notes.push(credit_note);
        }

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT customer_id, customer_run, customer_name, customer_email
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(invoice.customer_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to load customer"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();

        info!(
            invoice_id = %invoice.invoice_id,
            line_items = line_items.len(),
            credit_notes = credit_notes.len(),
            "Invoice created"
        );

        Ok(InvoiceDetails {
            invoice,
            customer,
            line_items,
            credit_notes,
            payment,
        })
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<InvoiceDetails>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to get invoice"))?;

        let details = match invoice {
            Some(invoice) => self.hydrate(vec![invoice]).await?.pop(),
            None => None,
        };

        timer.observe_duration();
        Ok(details)
    }

    #[instrument(skip(self, filter))]
    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceDetails>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::BIGINT IS NULL OR invoice_number = $1)
              AND ($2::TEXT IS NULL OR invoice_status = $2)
              AND ($3::TEXT IS NULL OR payment_status = $3)
              AND (NOT $4 OR is_consistent)
            ORDER BY invoice_number
            "#
        ))
        .bind(filter.invoice_number)
        .bind(filter.invoice_status.map(|s| s.as_str()))
        .bind(filter.payment_status.map(|s| s.as_str()))
        .bind(filter.consistent_only)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list invoices"))?;

        let details = self.hydrate(invoices).await?;

        timer.observe_duration();
        Ok(details)
    }

    #[instrument(skip(self))]
    async fn list_credit_notes(&self) -> Result<Vec<CreditNoteListing>, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_credit_notes"])
            .start_timer();

        let listings = sqlx::query_as::<_, CreditNoteListing>(
            r#"
            SELECT cn.credit_note_id, cn.invoice_id, cn.credit_note_number, cn.credit_note_date,
                   cn.credit_note_amount, i.invoice_number, i.total_amount AS invoice_total,
                   c.customer_name, c.customer_run
            FROM credit_notes cn
            JOIN invoices i ON i.invoice_id = cn.invoice_id
            JOIN customers c ON c.customer_id = i.customer_id
            ORDER BY cn.credit_note_number DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list credit notes"))?;

        timer.observe_duration();
        Ok(listings)
    }

    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id, amount = %input.amount))]
    async fn add_credit_note(
        &self,
        input: CreateCreditNote,
    ) -> Result<CreditNoteApplied, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["add_credit_note"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let invoice = Self::lock_invoice(&mut tx, input.invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::invoice_not_found(input.invoice_id))?;
        let existing_total = Self::credit_total(&mut tx, invoice.invoice_id).await?;
        let plan = plan_credit_note(&invoice, existing_total, input.amount)?;

        // Seeded from the current maximum so imported numbers are never reused.
        let credit_note_number = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE credit_note_sequence
            SET last_number = GREATEST(
                    last_number,
                    (SELECT COALESCE(MAX(credit_note_number), 0) FROM credit_notes)
                ) + 1
            RETURNING last_number
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to allocate credit note number"))?;

        let credit_note = sqlx::query_as::<_, CreditNote>(
            r#"
            INSERT INTO credit_notes (credit_note_id, invoice_id, credit_note_number, credit_note_date, credit_note_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING credit_note_id, invoice_id, credit_note_number, credit_note_date, credit_note_amount
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice.invoice_id)
        .bind(credit_note_number)
        .bind(input.issued_at)
        .bind(input.amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to insert credit note"))?;

        sqlx::query("UPDATE invoices SET invoice_status = $2 WHERE invoice_id = $1")
            .bind(invoice.invoice_id)
            .bind(plan.invoice_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update invoice status"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();

        info!(
            credit_note_number = credit_note_number,
            invoice_number = invoice.invoice_number,
            invoice_status = %plan.invoice_status,
            "Credit note created"
        );

        Ok(CreditNoteApplied {
            credit_note,
            invoice_number: invoice.invoice_number,
            invoice_status: plan.invoice_status,
            pending_amount: plan.pending_amount,
        })
    }

    #[instrument(skip(self), fields(credit_note_id = %credit_note_id))]
    async fn remove_credit_note(
        &self,
        credit_note_id: Uuid,
    ) -> Result<CreditNoteRemoved, InvoiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove_credit_note"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let invoice_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT invoice_id FROM credit_notes WHERE credit_note_id = $1",
        )
        .bind(credit_note_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to get credit note"))?
        .ok_or_else(|| InvoiceError::credit_note_not_found(credit_note_id))?;

        let invoice = Self::lock_invoice(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| InvoiceError::invoice_not_found(invoice_id))?;

        // A concurrent removal may have won between the lookup and the lock.
        let credit_note_number = sqlx::query_scalar::<_, i64>(
            "DELETE FROM credit_notes WHERE credit_note_id = $1 RETURNING credit_note_number",
        )
        .bind(credit_note_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("Failed to delete credit note"))?
        .ok_or_else(|| InvoiceError::credit_note_not_found(credit_note_id))?;

        let remaining = Self::credit_total(&mut tx, invoice_id).await?;
        let invoice_status =
            status_after_removal(remaining, invoice.total_amount, invoice.invoice_status);

        sqlx::query("UPDATE invoices SET invoice_status = $2 WHERE invoice_id = $1")
            .bind(invoice_id)
            .bind(invoice_status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to update invoice status"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;

        timer.observe_duration();

        info!(
            credit_note_number = credit_note_number,
            invoice_number = invoice.invoice_number,
            invoice_status = %invoice_status,
            "Credit note removed"
        );

        Ok(CreditNoteRemoved {
            credit_note_id,
            credit_note_number,
            invoice_id,
            invoice_status,
        })
    }
}
