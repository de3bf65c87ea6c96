#![allow(clippy::unwrap_used)]
// Payment submission against a mocked gateway.

mod common;

use chrono::{Duration, Utc};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::*;
use conference_checkout::config::{CatalogConfig, PlanSeed};
use conference_checkout::entities::{
    ReservationState, payment_record_entity as records, promo_reservation_entity as reservations,
};
use conference_checkout::error::AppError;
use conference_checkout::models::{RegisterPaymentRequest, STATUS_PENDING};
use conference_checkout::utils::SessionIdentity;

async fn record_count(app: &TestApp) -> u64 {
    records::Entity::find().count(&app.pool).await.unwrap()
}

async fn record(app: &TestApp, order_number: &str) -> records::Model {
    records::Entity::find_by_id(order_number.to_string())
        .one(&app.pool)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_first_installment_with_promo_is_registered_once() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .and(body_string_contains("orderNumber=ORD-1"))
        .and(body_string_contains("amount=36000"))
        .and(body_string_contains("currency=840"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": "md-1",
            "formUrl": "https://pay.example.com/form?mdOrder=md-1"
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let request = RegisterPaymentRequest {
        reservation_id: Some(held.reservation_id.clone()),
        promo_code: Some("EARLY10".to_string()),
        // Client-computed values are advisory only
        amount: Some(72_000),
        installments: Some(4),
        ..registration(3, STANDARD, "ORD-1")
    };
    let identity = attendee("u1");

    let response = app.checkout.submit(&identity, request.clone()).await.unwrap();
    assert_eq!(response.bank_response.order_id, "md-1");
    assert_eq!(response.amount, 36_000);
    assert_eq!(response.payment_number, 1);
    assert_eq!(response.installments, 3);
    assert!(!response.replayed);

    let stored = record(&app, "ORD-1").await;
    assert_eq!(stored.status, STATUS_PENDING);
    assert_eq!(stored.md_order.as_deref(), Some("md-1"));
    assert_eq!(stored.email, "u1@example.com");
    assert_eq!(stored.full_name, "Ana Lopez");
    assert_eq!(stored.discount_bp, 1000);
    assert_eq!(stored.room_price_cents, 120_000);
    assert_eq!(stored.promo_code.as_deref(), Some("EARLY10"));

    // Resubmitting the same order number answers from the ledger
    let replayed = app.checkout.submit(&identity, request).await.unwrap();
    assert!(replayed.replayed);
    assert_eq!(replayed.bank_response, response.bank_response);
    assert_eq!(record_count(&app).await, 1);

    // Nothing is consumed or decremented until the payment settles
    let reservation = reservations::Entity::find_by_id(held.reservation_id)
        .one(&app.pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reservation.state, ReservationState::Active);
    assert_eq!(app.rooms.room(STANDARD).await.unwrap().available, 5);
}

#[tokio::test]
async fn test_reservation_discounts_one_open_order_at_a_time() {
    let app = spawn_app().await;
    let identity = attendee("u1");
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();
    let with_promo = |order_number: &str| RegisterPaymentRequest {
        reservation_id: Some(held.reservation_id.clone()),
        ..registration(3, STANDARD, order_number)
    };

    mock_register_order(&app.server, "ORD-A", "md-ORD-A").await;
    let first = app.checkout.submit(&identity, with_promo("ORD-A")).await.unwrap();
    assert_eq!(first.amount, 36_000);

    let second = app.checkout.submit(&identity, with_promo("ORD-B")).await;
    assert!(matches!(second, Err(AppError::ReservationConflict(_))));
    assert_eq!(record_count(&app).await, 1);

    // Once the open order is declined the reservation can back a new one
    mock_order_status(&app.server, "md-ORD-A", "ORD-A", 6).await;
    app.reconcile.handle_callback("md-ORD-A").await.unwrap();

    mock_register_order(&app.server, "ORD-C", "md-ORD-C").await;
    let retried = app.checkout.submit(&identity, with_promo("ORD-C")).await.unwrap();
    assert_eq!(retried.amount, 36_000);
}

#[tokio::test]
async fn test_promo_code_without_reservation_is_ignored() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .and(body_string_contains("amount=40000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": "md-2",
            "formUrl": "https://pay.example.com/form?mdOrder=md-2"
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let request = RegisterPaymentRequest {
        promo_code: Some("EARLY10".to_string()),
        ..registration(3, STANDARD, "ORD-2")
    };
    let response = app.checkout.submit(&attendee("u1"), request).await.unwrap();

    assert_eq!(response.amount, 40_000);
    let stored = record(&app, "ORD-2").await;
    assert_eq!(stored.discount_bp, 0);
    assert_eq!(stored.promo_code, None);
}

#[tokio::test]
async fn test_generated_order_number_when_missing() {
    let app = spawn_app().await;
    mock_register_ok(&app.server, "md-3").await;

    let request = RegisterPaymentRequest {
        order_number: None,
        ..registration(1, SUITE, "unused")
    };
    let response = app.checkout.submit(&attendee("u1"), request).await.unwrap();

    assert!(!response.order_number.is_empty());
    assert_ne!(response.order_number, "unused");
    assert_eq!(response.amount, 250_000);
}

#[tokio::test]
async fn test_sold_out_room_creates_no_record() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;

    let result = app
        .checkout
        .submit(&attendee("u1"), registration(1, SOLD_OUT, "ORD-4"))
        .await;

    assert!(matches!(result, Err(AppError::RoomUnavailable(SOLD_OUT))));
    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn test_unknown_room_and_closed_plan_are_rejected() {
    let app = spawn_app().await;
    app.catalog
        .seed(&CatalogConfig {
            plans: vec![PlanSeed {
                id: 9,
                installments: 2,
                schedule: "Early bird split".to_string(),
                cutoff_at: Some(Utc::now() - Duration::days(1)),
                popular: false,
                savings: None,
            }],
            ..CatalogConfig::default()
        })
        .await
        .unwrap();

    let unknown_room = app
        .checkout
        .submit(&attendee("u1"), registration(1, 42, "ORD-5"))
        .await;
    assert!(matches!(unknown_room, Err(AppError::NotFound(_))));

    let closed_plan = app
        .checkout
        .submit(&attendee("u1"), registration(9, STANDARD, "ORD-6"))
        .await;
    assert!(matches!(closed_plan, Err(AppError::PlanClosed(9))));
    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn test_elapsed_reservation_is_rejected_before_any_timer_fires() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();
    backdate_reservation(&app.pool, &held.reservation_id).await;

    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;

    let request = RegisterPaymentRequest {
        reservation_id: Some(held.reservation_id),
        ..registration(3, STANDARD, "ORD-7")
    };
    let result = app.checkout.submit(&attendee("u1"), request).await;

    assert!(matches!(result, Err(AppError::ExpiredReservation)));
    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn test_reservation_of_another_attendee_is_refused() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    let request = RegisterPaymentRequest {
        reservation_id: Some(held.reservation_id),
        ..registration(3, STANDARD, "ORD-8")
    };
    let result = app.checkout.submit(&attendee("u2"), request).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_session_must_carry_email_and_name() {
    let app = spawn_app().await;

    let no_email = SessionIdentity {
        email: None,
        ..attendee("u1")
    };
    let result = app
        .checkout
        .submit(&no_email, registration(1, STANDARD, "ORD-9"))
        .await;
    assert!(matches!(result, Err(AppError::MissingSessionData)));

    let no_name = SessionIdentity {
        first_name: Some("  ".to_string()),
        ..attendee("u1")
    };
    let result = app
        .checkout
        .submit(&no_name, registration(1, STANDARD, "ORD-9"))
        .await;
    assert!(matches!(result, Err(AppError::MissingSessionData)));

    let mismatch = RegisterPaymentRequest {
        email: Some("someone@example.com".to_string()),
        ..registration(1, STANDARD, "ORD-9")
    };
    let result = app.checkout.submit(&attendee("u1"), mismatch).await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    assert_eq!(record_count(&app).await, 0);
}

#[tokio::test]
async fn test_order_number_of_another_attendee_is_refused() {
    let app = spawn_app().await;
    mock_register_ok(&app.server, "md-10").await;

    app.checkout
        .submit(&attendee("u1"), registration(1, STANDARD, "ORD-10"))
        .await
        .unwrap();
    let result = app
        .checkout
        .submit(&attendee("u2"), registration(1, STANDARD, "ORD-10"))
        .await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
    assert_eq!(record(&app, "ORD-10").await.client_id, "u1");
}

#[tokio::test]
async fn test_gateway_refusal_is_stored_and_surfaced() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": "1",
            "errorMessage": "Order with this number was processed already"
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let identity = attendee("u1");
    let first = app
        .checkout
        .submit(&identity, registration(2, STANDARD, "ORD-11"))
        .await;
    match first {
        Err(AppError::GatewayError { code, message }) => {
            assert_eq!(code, "1");
            assert_eq!(message, "Order with this number was processed already");
        }
        other => panic!("expected gateway error, got {other:?}"),
    }

    let stored = record(&app, "ORD-11").await;
    assert_eq!(stored.status, STATUS_PENDING);
    assert_eq!(stored.error_code.as_deref(), Some("1"));
    assert_eq!(stored.md_order, None);

    // The stored refusal is returned without asking the gateway again
    let again = app
        .checkout
        .submit(&identity, registration(2, STANDARD, "ORD-11"))
        .await;
    assert!(matches!(again, Err(AppError::GatewayError { ref code, .. }) if code == "1"));
}

#[tokio::test]
async fn test_unreachable_gateway_is_retryable_with_same_order_number() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&app.server)
        .await;

    let identity = attendee("u1");
    let failed = app
        .checkout
        .submit(&identity, registration(2, STANDARD, "ORD-12"))
        .await;
    let err = failed.unwrap_err();
    assert!(err.is_retryable(), "unexpected error: {err:?}");

    let stored = record(&app, "ORD-12").await;
    assert_eq!(stored.amount, 60_000);
    assert_eq!(stored.md_order, None);
    assert_eq!(stored.error_code, None);

    app.server.reset().await;
    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .and(body_string_contains("amount=60000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": "md-12",
            "formUrl": "https://pay.example.com/form?mdOrder=md-12"
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let retried = app
        .checkout
        .submit(&identity, registration(2, STANDARD, "ORD-12"))
        .await
        .unwrap();
    assert_eq!(retried.bank_response.order_id, "md-12");
    assert_eq!(record_count(&app).await, 1);
}
