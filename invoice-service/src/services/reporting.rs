//! Aggregate reports over invoice snapshots.
//!
//! Every report is a pure function of the invoices it is given and the
//! reference time `now`.

use crate::models::{InvoiceDetails, InvoiceStatus, PaymentStatus};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Days past due after which an unpaid invoice is reported as overdue.
pub const OVERDUE_THRESHOLD_DAYS: i64 = 30;
/// Window, in days, for invoices reported as coming due.
pub const UPCOMING_DUE_DAYS: i64 = 7;
const TOP_CUSTOMERS: usize = 5;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn percentage(part: usize, whole: usize, places: i32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, places)
}

fn amount_percentage(part: Decimal, whole: Decimal) -> f64 {
    if whole <= Decimal::ZERO {
        return 0.0;
    }
    let share = (part / whole * Decimal::ONE_HUNDRED).round_dp(2);
    share.to_f64().unwrap_or(0.0)
}

fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(count)).round_dp(2)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_run: String,
}

impl CustomerSummary {
    fn of(details: &InvoiceDetails) -> Self {
        Self {
            customer_name: details.customer.customer_name.clone(),
            customer_email: details.customer.customer_email.clone(),
            customer_run: details.customer.customer_run.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceStatistics {
    pub summary: StatisticsSummary,
    pub payment_status_breakdown: Vec<StatusBucket<PaymentStatus>>,
    pub invoice_status_breakdown: Vec<StatusBucket<InvoiceStatus>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsSummary {
    pub total_invoices: usize,
    pub consistent_invoices: usize,
    pub inconsistent_invoices: usize,
    pub consistency_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusBucket<S> {
    pub status: S,
    pub count: usize,
    pub total_amount: Decimal,
}

fn buckets<S, F>(invoices: &[&InvoiceDetails], order: [S; 3], key: F) -> Vec<StatusBucket<S>>
where
    S: Copy + PartialEq,
    F: Fn(&InvoiceDetails) -> S,
{
    order
        .into_iter()
        .filter_map(|status| {
            let matching: Vec<&InvoiceDetails> = invoices
                .iter()
                .copied()
                .filter(|d| key(*d) == status)
                .collect();
            (!matching.is_empty()).then(|| StatusBucket {
                status,
                count: matching.len(),
                total_amount: matching.iter().map(|d| d.invoice.total_amount).sum(),
            })
        })
        .collect()
}

/// Counts and consistency percentage over all invoices; status breakdowns
/// over consistent invoices only.
pub fn statistics(invoices: &[InvoiceDetails]) -> InvoiceStatistics {
    let consistent: Vec<&InvoiceDetails> =
        invoices.iter().filter(|d| d.invoice.is_consistent).collect();

    InvoiceStatistics {
        summary: StatisticsSummary {
            total_invoices: invoices.len(),
            consistent_invoices: consistent.len(),
            inconsistent_invoices: invoices.len() - consistent.len(),
            consistency_percentage: percentage(consistent.len(), invoices.len(), 2),
        },
        payment_status_breakdown: buckets(&consistent, PaymentStatus::ALL, |d| {
            d.invoice.payment_status
        }),
        invoice_status_breakdown: buckets(&consistent, InvoiceStatus::ALL, |d| {
            d.invoice.invoice_status
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueReport {
    pub generated_at: DateTime<Utc>,
    pub criteria: &'static str,
    pub summary: OverdueSummary,
    pub invoices: Vec<OverdueInvoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueSummary {
    pub total_invoices: usize,
    pub total_amount: Decimal,
    pub average_days_overdue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueInvoice {
    pub invoice_id: Uuid,
    pub invoice_number: i64,
    pub invoice_date: NaiveDate,
    pub payment_due_date: NaiveDate,
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub days_overdue: i64,
    pub customer: CustomerSummary,
}

fn is_critical(details: &InvoiceDetails, cutoff: NaiveDate) -> bool {
    details.invoice.is_consistent
        && details.invoice.payment_due_date < cutoff
        && details.invoice.payment_status != PaymentStatus::Paid
        && details.credit_notes.is_empty()
}

/// Consistent, unpaid invoices without credit notes whose due date is more
/// than 30 days before `now`, most overdue first.
pub fn overdue_invoices(invoices: &[InvoiceDetails], now: DateTime<Utc>) -> OverdueReport {
    let today = now.date_naive();
    let cutoff = today - Duration::days(OVERDUE_THRESHOLD_DAYS);

    let mut overdue: Vec<OverdueInvoice> = invoices
        .iter()
        .filter(|d| is_critical(d, cutoff))
        .map(|d| OverdueInvoice {
            invoice_id: d.invoice.invoice_id,
            invoice_number: d.invoice.invoice_number,
            invoice_date: d.invoice.invoice_date,
            payment_due_date: d.invoice.payment_due_date,
            total_amount: d.invoice.total_amount,
            payment_status: d.invoice.payment_status,
            days_overdue: (today - d.invoice.payment_due_date).num_days(),
            customer: CustomerSummary::of(d),
        })
        .collect();
    overdue.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));

    let average_days_overdue = if overdue.is_empty() {
        0.0
    } else {
        let total_days: i64 = overdue.iter().map(|i| i.days_overdue).sum();
        round_to(total_days as f64 / overdue.len() as f64, 1)
    };

    OverdueReport {
        generated_at: now,
        criteria: "Consistent invoices more than 30 days past due without payment or credit notes",
        summary: OverdueSummary {
            total_invoices: overdue.len(),
            total_amount: overdue.iter().map(|i| i.total_amount).sum(),
            average_days_overdue,
        },
        invoices: overdue,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusSummary {
    pub generated_at: DateTime<Utc>,
    pub summary: PaymentTotals,
    pub payment_status_breakdown: Vec<PaymentStatusShare>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentTotals {
    pub total_consistent_invoices: usize,
    pub grand_total_amount: Decimal,
    pub upcoming_due_invoices: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusShare {
    pub payment_status: PaymentStatus,
    pub count: usize,
    pub total_amount: Decimal,
    pub average_amount: Decimal,
    pub percentage: f64,
    pub amount_percentage: f64,
}

/// Share of consistent invoices per payment status, largest group first, plus
/// the number of pending invoices due within the next 7 days.
pub fn payment_status_summary(
    invoices: &[InvoiceDetails],
    now: DateTime<Utc>,
) -> PaymentStatusSummary {
    let consistent: Vec<&InvoiceDetails> =
        invoices.iter().filter(|d| d.invoice.is_consistent).collect();
    let grand_total: Decimal = consistent.iter().map(|d| d.invoice.total_amount).sum();

    let mut breakdown: Vec<PaymentStatusShare> =
        buckets(&consistent, PaymentStatus::ALL, |d| d.invoice.payment_status)
            .into_iter()
            .map(|bucket| PaymentStatusShare {
                payment_status: bucket.status,
                count: bucket.count,
                total_amount: bucket.total_amount,
                average_amount: average(bucket.total_amount, bucket.count),
                percentage: percentage(bucket.count, consistent.len(), 2),
                amount_percentage: amount_percentage(bucket.total_amount, grand_total),
            })
            .collect();
    breakdown.sort_by(|a, b| b.count.cmp(&a.count));

    let today = now.date_naive();
    let horizon = today + Duration::days(UPCOMING_DUE_DAYS);
    let upcoming_due_invoices = consistent
        .iter()
        .filter(|d| {
            d.invoice.payment_status == PaymentStatus::Pending
                && d.invoice.payment_due_date >= today
                && d.invoice.payment_due_date <= horizon
        })
        .count();

    PaymentStatusSummary {
        generated_at: now,
        summary: PaymentTotals {
            total_consistent_invoices: consistent.len(),
            grand_total_amount: grand_total,
            upcoming_due_invoices,
        },
        payment_status_breakdown: breakdown,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InconsistentReport {
    pub generated_at: DateTime<Utc>,
    pub criteria: &'static str,
    pub summary: InconsistentSummary,
    pub invoices: Vec<InconsistentInvoice>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InconsistentSummary {
    pub total_inconsistent_invoices: usize,
    pub total_absolute_difference: Decimal,
    pub average_absolute_difference: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InconsistentInvoice {
    pub invoice_id: Uuid,
    pub invoice_number: i64,
    pub invoice_date: NaiveDate,
    pub total_amount: Decimal,
    pub calculated_total: Decimal,
    pub difference: Decimal,
    pub product_count: usize,
    pub customer: CustomerSummary,
}

/// Invoices whose declared total disagrees with their line items, largest
/// absolute difference first.
pub fn inconsistent_invoices(invoices: &[InvoiceDetails], now: DateTime<Utc>) -> InconsistentReport {
    let mut inconsistent: Vec<InconsistentInvoice> = invoices
        .iter()
        .filter(|d| !d.invoice.is_consistent)
        .map(|d| {
            let calculated_total = d.calculated_total();
            InconsistentInvoice {
                invoice_id: d.invoice.invoice_id,
                invoice_number: d.invoice.invoice_number,
                invoice_date: d.invoice.invoice_date,
                total_amount: d.invoice.total_amount,
                calculated_total,
                difference: d.invoice.total_amount - calculated_total,
                product_count: d.line_items.len(),
                customer: CustomerSummary::of(d),
            }
        })
        .collect();
    inconsistent.sort_by(|a, b| b.difference.abs().cmp(&a.difference.abs()));

    let total_absolute_difference: Decimal =
        inconsistent.iter().map(|i| i.difference.abs()).sum();

    InconsistentReport {
        generated_at: now,
        criteria: "Invoices whose declared total does not match the sum of their line items",
        summary: InconsistentSummary {
            total_inconsistent_invoices: inconsistent.len(),
            total_absolute_difference,
            average_absolute_difference: average(total_absolute_difference, inconsistent.len()),
        },
        invoices: inconsistent,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutiveDashboard {
    pub generated_at: DateTime<Utc>,
    pub overview: DashboardOverview,
    pub financials: DashboardFinancials,
    pub payment_status: DashboardPaymentStatus,
    pub alerts: DashboardAlerts,
    pub top_customers: Vec<TopCustomer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardOverview {
    pub total_invoices: usize,
    pub consistent_invoices: usize,
    pub inconsistent_invoices: usize,
    pub consistency_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardFinancials {
    pub total_amount: Decimal,
    pub total_credit_notes: Decimal,
    pub net_amount: Decimal,
    pub average_invoice_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusShare {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardPaymentStatus {
    pub paid: StatusShare,
    pub pending: StatusShare,
    pub overdue: StatusShare,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardAlerts {
    pub critical_overdue_invoices: usize,
    pub inconsistent_invoices: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopCustomer {
    pub customer_name: String,
    pub customer_run: String,
    pub total_amount: Decimal,
    pub invoice_count: usize,
}

pub fn executive_dashboard(invoices: &[InvoiceDetails], now: DateTime<Utc>) -> ExecutiveDashboard {
    let consistent: Vec<&InvoiceDetails> =
        invoices.iter().filter(|d| d.invoice.is_consistent).collect();
    let inconsistent_count = invoices.len() - consistent.len();

    let total_amount: Decimal = consistent.iter().map(|d| d.invoice.total_amount).sum();
    // Credit notes of every invoice, consistent or not.
    let total_credit_notes: Decimal = invoices.iter().map(|d| d.total_credit_notes()).sum();

    let share = |status: PaymentStatus| {
        let count = consistent
            .iter()
            .filter(|d| d.invoice.payment_status == status)
            .count();
        StatusShare {
            count,
            percentage: percentage(count, consistent.len(), 1),
        }
    };

    let cutoff = now.date_naive() - Duration::days(OVERDUE_THRESHOLD_DAYS);
    let critical_overdue_invoices = invoices.iter().filter(|d| is_critical(d, cutoff)).count();

    let mut by_customer: HashMap<&str, TopCustomer> = HashMap::new();
    for details in &consistent {
        let entry = by_customer
            .entry(details.customer.customer_run.as_str())
            .or_insert_with(|| TopCustomer {
                customer_name: details.customer.customer_name.clone(),
                customer_run: details.customer.customer_run.clone(),
                total_amount: Decimal::ZERO,
                invoice_count: 0,
            });
        entry.total_amount += details.invoice.total_amount;
        entry.invoice_count += 1;
    }
    let mut top_customers: Vec<TopCustomer> = by_customer.into_values().collect();
    top_customers.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.customer_run.cmp(&b.customer_run))
    });
    top_customers.truncate(TOP_CUSTOMERS);

    ExecutiveDashboard {
        generated_at: now,
        overview: DashboardOverview {
            total_invoices: invoices.len(),
            consistent_invoices: consistent.len(),
            inconsistent_invoices: inconsistent_count,
            consistency_rate: percentage(consistent.len(), invoices.len(), 1),
        },
        financials: DashboardFinancials {
            total_amount,
            total_credit_notes,
            net_amount: total_amount - total_credit_notes,
            average_invoice_amount: average(total_amount, consistent.len()),
        },
        payment_status: DashboardPaymentStatus {
            paid: share(PaymentStatus::Paid),
            pending: share(PaymentStatus::Pending),
            overdue: share(PaymentStatus::Overdue),
        },
        alerts: DashboardAlerts {
            critical_overdue_invoices,
            inconsistent_invoices: inconsistent_count,
        },
        top_customers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreditNote, Customer, Invoice, LineItem};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 9, 0, 0).unwrap()
    }

    fn details(
        number: i64,
        total: Decimal,
        subtotals: &[Decimal],
        due: NaiveDate,
        payment_status: PaymentStatus,
        customer_run: &str,
    ) -> InvoiceDetails {
        let invoice_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();
        InvoiceDetails {
            invoice: Invoice {
                invoice_id,
                invoice_number: number,
                invoice_date: due - Duration::days(30),
                total_amount: total,
                days_to_due: 30,
                payment_due_date: due,
                invoice_status: InvoiceStatus::Issued,
                payment_status,
                is_consistent: crate::domain::is_consistent(total, subtotals.iter().copied()),
                customer_id,
                created_utc: now(),
            },
            customer: Customer {
                customer_id,
                customer_run: customer_run.to_string(),
                customer_name: format!("Customer {customer_run}"),
                customer_email: format!("{customer_run}@example.test"),
            },
            line_items: subtotals
                .iter()
                .map(|subtotal| LineItem {
                    line_item_id: Uuid::new_v4(),
                    invoice_id,
                    product_name: "Item".to_string(),
                    unit_price: *subtotal,
                    quantity: 1,
                    subtotal: *subtotal,
                })
                .collect(),
            credit_notes: Vec::new(),
            payment: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn credit(details: &mut InvoiceDetails, amount: Decimal) {
        details.credit_notes.push(CreditNote {
            credit_note_id: Uuid::new_v4(),
            invoice_id: details.invoice.invoice_id,
            credit_note_number: 1,
            credit_note_date: now(),
            credit_note_amount: amount,
        });
    }

    #[test]
    fn overdue_report_applies_every_criterion() {
        let mut with_credit = details(3, dec!(50), &[dec!(50)], date(2025, 1, 1), PaymentStatus::Overdue, "c");
        credit(&mut with_credit, dec!(10));

        let invoices = vec![
            details(1, dec!(100), &[dec!(100)], date(2025, 4, 1), PaymentStatus::Overdue, "a"),
            details(2, dec!(200), &[dec!(200)], date(2025, 5, 1), PaymentStatus::Overdue, "b"),
            with_credit,
            // Inconsistent.
            details(4, dec!(70), &[dec!(10)], date(2025, 1, 1), PaymentStatus::Overdue, "d"),
            // Paid.
            details(5, dec!(70), &[dec!(70)], date(2025, 1, 1), PaymentStatus::Paid, "e"),
            // Only 20 days overdue.
            details(6, dec!(70), &[dec!(70)], date(2025, 6, 10), PaymentStatus::Overdue, "f"),
        ];

        let report = overdue_invoices(&invoices, now());
        let numbers: Vec<i64> = report.invoices.iter().map(|i| i.invoice_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(report.invoices[0].days_overdue, 90);
        assert_eq!(report.invoices[1].days_overdue, 60);
        assert_eq!(report.summary.total_amount, dec!(300));
        assert_eq!(report.summary.average_days_overdue, 75.0);
    }

    #[test]
    fn payment_summary_shares_and_upcoming() {
        let invoices = vec![
            details(1, dec!(100), &[dec!(100)], date(2025, 7, 3), PaymentStatus::Pending, "a"),
            details(2, dec!(100), &[dec!(100)], date(2025, 7, 20), PaymentStatus::Pending, "a"),
            details(3, dec!(200), &[dec!(200)], date(2025, 1, 1), PaymentStatus::Paid, "b"),
            details(4, dec!(999), &[dec!(1)], date(2025, 7, 1), PaymentStatus::Pending, "c"),
        ];

        let report = payment_status_summary(&invoices, now());
        assert_eq!(report.summary.total_consistent_invoices, 3);
        assert_eq!(report.summary.grand_total_amount, dec!(400));
        assert_eq!(report.summary.upcoming_due_invoices, 1);

        let pending = &report.payment_status_breakdown[0];
        assert_eq!(pending.payment_status, PaymentStatus::Pending);
        assert_eq!(pending.count, 2);
        assert_eq!(pending.average_amount, dec!(100));
        assert_eq!(pending.percentage, 66.67);
        assert_eq!(pending.amount_percentage, 50.0);
    }

    #[test]
    fn inconsistent_report_orders_by_absolute_difference() {
        let invoices = vec![
            details(1, dec!(100), &[dec!(90)], date(2025, 7, 1), PaymentStatus::Pending, "a"),
            details(2, dec!(100), &[dec!(150)], date(2025, 7, 1), PaymentStatus::Pending, "a"),
            details(3, dec!(100), &[dec!(100)], date(2025, 7, 1), PaymentStatus::Pending, "a"),
        ];

        let report = inconsistent_invoices(&invoices, now());
        assert_eq!(report.invoices.len(), 2);
        assert_eq!(report.invoices[0].invoice_number, 2);
        assert_eq!(report.invoices[0].difference, dec!(-50));
        assert_eq!(report.summary.total_absolute_difference, dec!(60));
        assert_eq!(report.summary.average_absolute_difference, dec!(30));
    }

    #[test]
    fn dashboard_totals_and_top_customers() {
        let mut credited = details(1, dec!(100), &[dec!(100)], date(2025, 7, 1), PaymentStatus::Pending, "a");
        credit(&mut credited, dec!(25));

        let mut invoices = vec![credited];
        for (i, run) in ["b", "c", "d", "e", "f", "g"].iter().enumerate() {
            let amount = Decimal::from(10 * (i as i64 + 1));
            invoices.push(details(
                10 + i as i64,
                amount,
                &[amount],
                date(2025, 1, 1),
                PaymentStatus::Paid,
                run,
            ));
        }
        invoices.push(details(99, dec!(5), &[dec!(1)], date(2025, 1, 1), PaymentStatus::Overdue, "z"));

        let dashboard = executive_dashboard(&invoices, now());
        assert_eq!(dashboard.overview.total_invoices, 8);
        assert_eq!(dashboard.overview.consistent_invoices, 7);
        assert_eq!(dashboard.overview.consistency_rate, 87.5);
        assert_eq!(dashboard.financials.total_amount, dec!(310));
        assert_eq!(dashboard.financials.total_credit_notes, dec!(25));
        assert_eq!(dashboard.financials.net_amount, dec!(285));
        assert_eq!(dashboard.payment_status.paid.count, 6);
        assert_eq!(dashboard.payment_status.paid.percentage, 85.7);
        assert_eq!(dashboard.alerts.inconsistent_invoices, 1);
        assert_eq!(dashboard.top_customers.len(), 5);
        assert_eq!(dashboard.top_customers[0].customer_run, "a");
        assert_eq!(dashboard.top_customers[0].total_amount, dec!(100));
    }

    #[test]
    fn statistics_on_empty_store() {
        let stats = statistics(&[]);
        assert_eq!(stats.summary.total_invoices, 0);
        assert_eq!(stats.summary.consistency_percentage, 0.0);
        assert!(stats.payment_status_breakdown.is_empty());
    }
}
