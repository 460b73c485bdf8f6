//! In-memory `InvoiceStore` for development and tests.

use super::store::InvoiceStore;
use crate::domain::{plan_credit_note, status_after_removal};
use crate::error::InvoiceError;
use crate::models::{
    CreateCreditNote, CreateCustomer, CreateInvoice, CreditNote, CreditNoteApplied,
    CreditNoteListing, CreditNoteRemoved, Customer, Invoice, InvoiceDetails, LineItem,
    ListInvoicesFilter, Payment,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Default)]
struct State {
    customers: HashMap<Uuid, Customer>,
    customer_ids_by_run: HashMap<String, Uuid>,
    invoices: HashMap<Uuid, Invoice>,
    invoice_ids_by_number: HashMap<i64, Uuid>,
    line_items: Vec<LineItem>,
    credit_notes: Vec<CreditNote>,
    payments: HashMap<Uuid, Payment>,
    last_credit_note_number: i64,
}

impl State {
    fn details(&self, invoice: &Invoice) -> Result<InvoiceDetails, InvoiceError> {
        let customer = self
            .customers
            .get(&invoice.customer_id)
            .cloned()
            .ok_or_else(|| {
                InvoiceError::Persistence(anyhow::anyhow!(
                    "Customer {} of invoice {} is missing",
                    invoice.customer_id,
                    invoice.invoice_number
                ))
            })?;

        let mut credit_notes: Vec<CreditNote> = self
            .credit_notes
            .iter()
            .filter(|note| note.invoice_id == invoice.invoice_id)
            .cloned()
            .collect();
        credit_notes.sort_by_key(|note| note.credit_note_number);

        Ok(InvoiceDetails {
            invoice: invoice.clone(),
            customer,
            line_items: self
                .line_items
                .iter()
                .filter(|item| item.invoice_id == invoice.invoice_id)
                .cloned()
                .collect(),
            credit_notes,
            payment: self.payments.get(&invoice.invoice_id).cloned(),
        })
    }

    fn credit_total(&self, invoice_id: Uuid) -> Decimal {
        self.credit_notes
            .iter()
            .filter(|note| note.invoice_id == invoice_id)
            .map(|note| note.credit_note_amount)
            .sum()
    }

    fn next_credit_note_number(&mut self) -> i64 {
        let current_max = self
            .credit_notes
            .iter()
            .map(|note| note.credit_note_number)
            .max()
            .unwrap_or(0);
        self.last_credit_note_number = self.last_credit_note_number.max(current_max) + 1;
        self.last_credit_note_number
    }
}

/// Process-local store. All access is serialized behind one async mutex.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), InvoiceError> {
        Ok(())
    }

    async fn invoice_number_exists(&self, invoice_number: i64) -> Result<bool, InvoiceError> {
        let state = self.state.lock().await;
        Ok(state.invoice_ids_by_number.contains_key(&invoice_number))
    }

    #[instrument(skip(self, input), fields(customer_run = %input.customer_run))]
    async fn find_or_create_customer(
        &self,
        input: &CreateCustomer,
    ) -> Result<Customer, InvoiceError> {
        let mut state = self.state.lock().await;

        if let Some(customer) = state
            .customer_ids_by_run
            .get(&input.customer_run)
            .and_then(|id| state.customers.get(id))
        {
            return Ok(customer.clone());
        }

        let customer = Customer {
            customer_id: Uuid::new_v4(),
            customer_run: input.customer_run.clone(),
            customer_name: input.customer_name.clone(),
            customer_email: input.customer_email.clone(),
        };
        state
            .customer_ids_by_run
            .insert(customer.customer_run.clone(), customer.customer_id);
        state.customers.insert(customer.customer_id, customer.clone());

        info!(customer_id = %customer.customer_id, "Customer created");
        Ok(customer)
    }

    #[instrument(skip(self, input), fields(invoice_number = input.invoice_number))]
    async fn create_invoice(&self, input: CreateInvoice) -> Result<InvoiceDetails, InvoiceError> {
        let mut state = self.state.lock().await;

        if state.invoice_ids_by_number.contains_key(&input.invoice_number) {
            return Err(InvoiceError::DuplicateInvoice(input.invoice_number));
        }
        if !state.customers.contains_key(&input.customer_id) {
            return Err(InvoiceError::Persistence(anyhow::anyhow!(
                "Customer {} does not exist",
                input.customer_id
            )));
        }

        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            invoice_number: input.invoice_number,
            invoice_date: input.invoice_date,
            total_amount: input.total_amount,
            days_to_due: input.days_to_due,
            payment_due_date: input.payment_due_date,
            invoice_status: input.invoice_status,
            payment_status: input.payment_status,
            is_consistent: input.is_consistent,
            customer_id: input.customer_id,
            created_utc: Utc::now(),
        };
        let invoice_id = invoice.invoice_id;

        state
            .line_items
            .extend(input.line_items.into_iter().map(|item| LineItem {
                line_item_id: Uuid::new_v4(),
                invoice_id,
                product_name: item.product_name,
                unit_price: item.unit_price,
                quantity: item.quantity,
                subtotal: item.subtotal,
            }));

        if let Some(payment) = input.payment {
            state.payments.insert(
                invoice_id,
                Payment {
                    payment_id: Uuid::new_v4(),
                    invoice_id,
                    payment_method: payment.payment_method,
                    payment_date: payment.payment_date,
                },
            );
        }

        for note in input.credit_notes {
            state.last_credit_note_number =
                state.last_credit_note_number.max(note.credit_note_number);
            state.credit_notes.push(CreditNote {
                credit_note_id: Uuid::new_v4(),
                invoice_id,
                credit_note_number: note.credit_note_number,
                credit_note_date: note.credit_note_date,
                credit_note_amount: note.credit_note_amount,
            });
        }

        state
            .invoice_ids_by_number
            .insert(invoice.invoice_number, invoice_id);
        state.invoices.insert(invoice_id, invoice.clone());

        info!(invoice_id = %invoice_id, "Invoice created");
        state.details(&invoice)
    }

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<InvoiceDetails>, InvoiceError> {
        let state = self.state.lock().await;
        state
            .invoices
            .get(&invoice_id)
            .map(|invoice| state.details(invoice))
            .transpose()
    }

    async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<InvoiceDetails>, InvoiceError> {
        let state = self.state.lock().await;
        let mut invoices: Vec<&Invoice> = state
            .invoices
            .values()
            .filter(|invoice| filter.matches(invoice))
            .collect();
        invoices.sort_by_key(|invoice| invoice.invoice_number);

        invoices
            .into_iter()
            .map(|invoice| state.details(invoice))
            .collect()
    }

    async fn list_credit_notes(&self) -> Result<Vec<CreditNoteListing>, InvoiceError> {
        let state = self.state.lock().await;
        let mut listings = state
            .credit_notes
            .iter()
            .map(|note| {
                let details = state
                    .invoices
                    .get(&note.invoice_id)
                    .ok_or_else(|| InvoiceError::invoice_not_found(note.invoice_id))
                    .and_then(|invoice| state.details(invoice))?;
                Ok(CreditNoteListing {
                    credit_note: note.clone(),
                    invoice_number: details.invoice.invoice_number,
                    invoice_total: details.invoice.total_amount,
                    customer_name: details.customer.customer_name,
                    customer_run: details.customer.customer_run,
                })
            })
            .collect::<Result<Vec<_>, InvoiceError>>()?;
        listings.sort_by(|a, b| {
            b.credit_note
                .credit_note_number
                .cmp(&a.credit_note.credit_note_number)
        });
        Ok(listings)
    }

    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id, amount = %input.amount))]
    async fn add_credit_note(
        &self,
        input: CreateCreditNote,
    ) -> Result<CreditNoteApplied, InvoiceError> {
        let mut state = self.state.lock().await;

        let invoice = state
            .invoices
            .get(&input.invoice_id)
            .cloned()
            .ok_or_else(|| InvoiceError::invoice_not_found(input.invoice_id))?;
        let plan = plan_credit_note(&invoice, state.credit_total(invoice.invoice_id), input.amount)?;

        let credit_note = CreditNote {
            credit_note_id: Uuid::new_v4(),
            invoice_id: invoice.invoice_id,
            credit_note_number: state.next_credit_note_number(),
            credit_note_date: input.issued_at,
            credit_note_amount: input.amount,
        };
        state.credit_notes.push(credit_note.clone());
        if let Some(stored) = state.invoices.get_mut(&invoice.invoice_id) {
            stored.invoice_status = plan.invoice_status;
        }

        info!(
            credit_note_number = credit_note.credit_note_number,
            invoice_number = invoice.invoice_number,
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
        let mut state = self.state.lock().await;

        let position = state
            .credit_notes
            .iter()
            .position(|note| note.credit_note_id == credit_note_id)
            .ok_or_else(|| InvoiceError::credit_note_not_found(credit_note_id))?;
        let removed = state.credit_notes.remove(position);

        let remaining = state.credit_total(removed.invoice_id);
        let invoice = state.invoices.get_mut(&removed.invoice_id).ok_or_else(|| {
            InvoiceError::Persistence(anyhow::anyhow!(
                "Invoice {} of credit note {} is missing",
                removed.invoice_id,
                removed.credit_note_number
            ))
        })?;
        invoice.invoice_status =
            status_after_removal(remaining, invoice.total_amount, invoice.invoice_status);

        info!(
            credit_note_number = removed.credit_note_number,
            invoice_status = %invoice.invoice_status,
            "Credit note removed"
        );

        Ok(CreditNoteRemoved {
            credit_note_id,
            credit_note_number: removed.credit_note_number,
            invoice_id: removed.invoice_id,
            invoice_status: invoice.invoice_status,
        })
    }
}
