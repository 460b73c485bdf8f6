//! Credit note lifecycle integration tests.

mod common;

use common::{InvoiceFixture, TestApp};
use serde_json::Value;

async fn invoice_id(app: &TestApp, invoice_number: i64) -> String {
    app.invoice_by_number(invoice_number).await["invoice_id"]
        .as_str()
        .expect("invoice_id")
        .to_string()
}

#[tokio::test]
async fn full_credit_note_cancels_and_removal_reissues() {
    let app = TestApp::spawn().await;
    app.import(vec![InvoiceFixture::new(100, 150.0, &[50.0, 100.0]).to_json()])
        .await;

    let invoice = app.invoice_by_number(100).await;
    assert_eq!(invoice["is_consistent"], true);
    assert_eq!(invoice["invoice_status"], "issued");
    assert_eq!(invoice["payment_status"], "Overdue");
    let id = invoice["invoice_id"].as_str().unwrap().to_string();

    let response = app.add_credit_note(&id, "150.00").await;
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["new_invoice_status"], "canceled");
    assert_eq!(created["pending_amount"], "0.00");
    assert_eq!(created["credit_note_amount"], "150.00");
    assert_eq!(created["invoice_number"], 100);

    let listed: Value = app
        .get(&format!("/api/credit-notes/invoice/{}", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed["credit_notes"].as_array().unwrap().len(), 1);
    assert_eq!(listed["pending_amount"], "0.00");

    let credit_note_id = created["credit_note_id"].as_str().unwrap();
    let response = app
        .delete(&format!("/api/credit-notes/{}", credit_note_id))
        .await;
    assert_eq!(response.status(), 200);
    let removed: Value = response.json().await.unwrap();
    assert_eq!(removed["new_invoice_status"], "issued");
    assert_eq!(removed["invoice_id"], id.as_str());

    let invoice = app.invoice_by_number(100).await;
    assert_eq!(invoice["invoice_status"], "issued");
    assert_eq!(invoice["credit_notes"].as_array().unwrap().len(), 0);
    assert_eq!(invoice["payment_status"], "Overdue");
}

#[tokio::test]
async fn credit_notes_cannot_exceed_pending_balance() {
    let app = TestApp::spawn().await;
    app.import(vec![InvoiceFixture::new(200, 100.0, &[100.0]).to_json()])
        .await;
    let id = invoice_id(&app, 200).await;

    let response = app.add_credit_note(&id, "80").await;
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["new_invoice_status"], "partial");
    assert_eq!(created["pending_amount"], "20.00");

    let response = app.add_credit_note(&id, "25").await;
    assert_eq!(response.status(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["context"]["pending_amount"], "20.00");
    assert_eq!(error["context"]["requested_amount"], "25.00");

    let response = app.add_credit_note(&id, "20").await;
    assert_eq!(response.status(), 201);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["new_invoice_status"], "canceled");
    assert_eq!(created["pending_amount"], "0.00");
}

#[tokio::test]
async fn concurrent_credit_notes_cannot_overdraw_the_balance() {
    let app = TestApp::spawn().await;
    app.import(vec![InvoiceFixture::new(250, 100.0, &[100.0]).to_json()])
        .await;
    let id = invoice_id(&app, 250).await;

    let (first, second) = tokio::join!(
        app.add_credit_note(&id, "60"),
        app.add_credit_note(&id, "60")
    );
    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![201, 400]);

    let invoice = app.invoice_by_number(250).await;
    assert_eq!(invoice["invoice_status"], "partial");
    assert_eq!(invoice["pending_amount"], "40.00");
}

#[tokio::test]
async fn removing_one_of_two_credit_notes_leaves_invoice_partial() {
    let app = TestApp::spawn().await;
    app.import(vec![InvoiceFixture::new(300, 100.0, &[100.0]).to_json()])
        .await;
    let id = invoice_id(&app, 300).await;

    let first: Value = app.add_credit_note(&id, "60").await.json().await.unwrap();
    let second: Value = app.add_credit_note(&id, "40").await.json().await.unwrap();
    assert_eq!(second["new_invoice_status"], "canceled");

    let removed: Value = app
        .delete(&format!(
            "/api/credit-notes/{}",
            first["credit_note_id"].as_str().unwrap()
        ))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(removed["new_invoice_status"], "partial");

    let invoice = app.invoice_by_number(300).await;
    assert_eq!(invoice["pending_amount"], "60.00");
}

#[tokio::test]
async fn credit_note_numbers_increase_across_invoices() {
    let app = TestApp::spawn().await;
    app.import(vec![
        InvoiceFixture::new(400, 100.0, &[100.0])
            .due("2099-12-31")
            .credit_note(10.0)
            .credit_note(10.0)
            .to_json(),
        InvoiceFixture::new(401, 100.0, &[100.0]).to_json(),
    ])
    .await;
    let a = invoice_id(&app, 400).await;
    let b = invoice_id(&app, 401).await;

    let mut numbers = Vec::new();
    for id in [&a, &b, &a, &b] {
        let created: Value = app.add_credit_note(id, "5").await.json().await.unwrap();
        numbers.push(created["credit_note_number"].as_i64().unwrap());
    }

    assert!(numbers[0] > 2, "imported numbers must not be reused");
    assert!(numbers.windows(2).all(|w| w[0] < w[1]), "{:?}", numbers);

    let listing: Value = app.get("/api/credit-notes").await.json().await.unwrap();
    assert_eq!(listing["count"], 6);
    let listed: Vec<i64> = listing["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["credit_note_number"].as_i64().unwrap())
        .collect();
    assert!(listed.windows(2).all(|w| w[0] >= w[1]), "{:?}", listed);
    assert_eq!(listing["data"][0]["invoice_number"], 401);
}

#[tokio::test]
async fn inconsistent_invoices_reject_credit_notes() {
    let app = TestApp::spawn().await;
    app.import(vec![InvoiceFixture::new(500, 100.0, &[40.0, 50.0]).to_json()])
        .await;
    let id = invoice_id(&app, 500).await;

    let response = app.add_credit_note(&id, "10").await;
    assert_eq!(response.status(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["context"]["invoice_number"], 500);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let app = TestApp::spawn().await;
    app.import(vec![InvoiceFixture::new(600, 100.0, &[100.0]).to_json()])
        .await;
    let id = invoice_id(&app, 600).await;

    assert_eq!(app.add_credit_note(&id, "0").await.status(), 400);
    assert_eq!(app.add_credit_note(&id, "-5").await.status(), 400);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = TestApp::spawn().await;
    let missing = uuid::Uuid::new_v4().to_string();

    assert_eq!(app.add_credit_note(&missing, "10").await.status(), 404);
    assert_eq!(
        app.delete(&format!("/api/credit-notes/{}", missing))
            .await
            .status(),
        404
    );
    assert_eq!(
        app.get(&format!("/api/credit-notes/invoice/{}", missing))
            .await
            .status(),
        404
    );
}
