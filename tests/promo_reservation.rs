#![allow(clippy::unwrap_used)]
// Promo reservation lifecycle against an in-memory ledger.

mod common;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

use common::*;
use conference_checkout::entities::{ReservationState, promo_reservation_entity as reservations};
use conference_checkout::error::{AppError, PromoRejection};
use conference_checkout::services::PromoService;
use conference_checkout::tasks;

async fn state_of(app: &TestApp, reservation_id: &str) -> ReservationState {
    reservations::Entity::find_by_id(reservation_id.to_string())
        .one(&app.pool)
        .await
        .unwrap()
        .unwrap()
        .state
}

#[tokio::test]
async fn test_reserve_returns_discount_and_deadline() {
    let app = spawn_app().await;

    let reserved = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    assert_eq!(reserved.promo.discount, dec!(0.10));
    assert!(reserved.promo.expires_at > Utc::now() + Duration::minutes(14));
    assert!(app.watchdog.is_armed(&reserved.reservation_id));

    let status = app
        .promo
        .reservation_status(&reserved.reservation_id, "u1")
        .await
        .unwrap();
    assert_eq!(status.state, ReservationState::Active);
    assert_eq!(status.code, "EARLY10");
    assert!(status.remaining_seconds > 0);
}

#[tokio::test]
async fn test_concurrent_claims_yield_one_holder() {
    let app = spawn_app().await;

    let (first, second) = tokio::join!(
        app.promo.reserve("SUITE20", "u1", SUITE),
        app.promo.reserve("SUITE20", "u2", SUITE),
    );

    let results = [first, second];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "results: {results:?}");
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::ReservationConflict(_))))
    );

    let active = PromoService::active_reservations(&app.pool).await.unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_held_code_returns_after_release() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    let refused = app.promo.reserve("EARLY10", "u2", STANDARD).await;
    assert!(matches!(refused, Err(AppError::ReservationConflict(_))));

    assert!(app.promo.release(&held.reservation_id, "u1").await.unwrap());
    assert!(!app.watchdog.is_armed(&held.reservation_id));
    assert_eq!(
        state_of(&app, &held.reservation_id).await,
        ReservationState::Released
    );

    app.promo.reserve("EARLY10", "u2", STANDARD).await.unwrap();
}

#[tokio::test]
async fn test_release_requires_the_owner() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    let result = app.promo.release(&held.reservation_id, "u2").await;
    assert!(matches!(result, Err(AppError::Forbidden)));
    assert_eq!(
        state_of(&app, &held.reservation_id).await,
        ReservationState::Active
    );
}

#[tokio::test]
async fn test_reapplying_replaces_the_previous_reservation() {
    let app = spawn_app().await;

    let first = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();
    let second = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    assert_ne!(first.reservation_id, second.reservation_id);
    assert_eq!(
        state_of(&app, &first.reservation_id).await,
        ReservationState::Released
    );
    assert_eq!(
        state_of(&app, &second.reservation_id).await,
        ReservationState::Active
    );
    assert!(!app.watchdog.is_armed(&first.reservation_id));
    assert!(app.watchdog.is_armed(&second.reservation_id));
}

#[tokio::test]
async fn test_switching_codes_releases_the_old_one() {
    let app = spawn_app().await;

    let first = app.promo.reserve("EARLY10", "u1", SUITE).await.unwrap();
    app.promo.reserve("SUITE20", "u1", SUITE).await.unwrap();

    assert_eq!(
        state_of(&app, &first.reservation_id).await,
        ReservationState::Released
    );
    app.promo.reserve("EARLY10", "u2", STANDARD).await.unwrap();
}

#[tokio::test]
async fn test_validation_rejections() {
    let app = spawn_app().await;

    let reason = |result: Result<_, AppError>| match result {
        Err(AppError::PromoRejected(reason)) => Some(reason),
        _ => None,
    };

    assert_eq!(
        reason(app.promo.validate("NOPE", Some(STANDARD)).await),
        Some(PromoRejection::NotFound)
    );
    assert_eq!(
        reason(app.promo.validate("LATER", Some(STANDARD)).await),
        Some(PromoRejection::NotYetActive)
    );
    assert_eq!(
        reason(app.promo.validate("NOTHING", Some(STANDARD)).await),
        Some(PromoRejection::ZeroDiscount)
    );
    assert_eq!(
        reason(app.promo.validate("SUITE20", Some(STANDARD)).await),
        Some(PromoRejection::RoomTypeMismatch)
    );
    assert!(matches!(
        app.promo.validate("  ", None).await,
        Err(AppError::ValidationError(_))
    ));

    let valid = app.promo.validate(" SUITE20 ", Some(SUITE)).await.unwrap();
    assert_eq!(valid.discount, dec!(0.20));
    assert_eq!(valid.room_type, Some(SUITE));
}

#[tokio::test]
async fn test_rejected_reserve_leaves_no_row() {
    let app = spawn_app().await;

    let result = app.promo.reserve("SUITE20", "u1", STANDARD).await;
    assert!(matches!(
        result,
        Err(AppError::PromoRejected(PromoRejection::RoomTypeMismatch))
    ));
    assert!(
        PromoService::active_reservations(&app.pool)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_elapsed_reservation_frees_the_code() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();
    backdate_reservation(&app.pool, &held.reservation_id).await;

    // Another attendee can claim the code even before any timer fired
    app.promo.reserve("EARLY10", "u2", STANDARD).await.unwrap();

    let status = app
        .promo
        .reservation_status(&held.reservation_id, "u1")
        .await
        .unwrap();
    assert_eq!(status.state, ReservationState::Expired);
    assert_eq!(status.remaining_seconds, 0);
}

#[tokio::test]
async fn test_purchase_check_rejects_elapsed_reservation() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    let active =
        PromoService::require_active(&app.pool, &held.reservation_id, "u1", STANDARD, Utc::now())
            .await
            .unwrap();
    assert_eq!(active.code, "EARLY10");

    let later = held.promo.expires_at + Duration::seconds(1);
    let result =
        PromoService::require_active(&app.pool, &held.reservation_id, "u1", STANDARD, later).await;
    assert!(matches!(result, Err(AppError::ExpiredReservation)));
    assert_eq!(
        state_of(&app, &held.reservation_id).await,
        ReservationState::Expired
    );
}

#[tokio::test]
async fn test_purchase_check_enforces_owner_and_room() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    let other_user =
        PromoService::require_active(&app.pool, &held.reservation_id, "u2", STANDARD, Utc::now())
            .await;
    assert!(matches!(other_user, Err(AppError::Forbidden)));

    let other_room =
        PromoService::require_active(&app.pool, &held.reservation_id, "u1", SUITE, Utc::now())
            .await;
    assert!(matches!(other_room, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn test_consumed_code_cannot_be_reserved_again() {
    let app = spawn_app().await;
    let held = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();

    assert!(
        PromoService::consume(&app.pool, &held.reservation_id, Utc::now())
            .await
            .unwrap()
    );

    let again = app.promo.reserve("EARLY10", "u2", STANDARD).await;
    assert!(matches!(again, Err(AppError::ReservationConflict(_))));

    let reuse =
        PromoService::require_active(&app.pool, &held.reservation_id, "u1", STANDARD, Utc::now())
            .await;
    assert!(matches!(reuse, Err(AppError::ReservationConflict(_))));
}

#[tokio::test]
async fn test_watchdog_expires_reservation_on_time() {
    let app = spawn_app().await;
    let short_lived = PromoService::new(
        app.pool.clone(),
        Duration::milliseconds(300),
        app.watchdog.clone(),
    );

    let held = short_lived.reserve("EARLY10", "u1", STANDARD).await.unwrap();
    assert!(app.watchdog.is_armed(&held.reservation_id));

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    assert_eq!(
        state_of(&app, &held.reservation_id).await,
        ReservationState::Expired
    );
    assert!(!app.watchdog.is_armed(&held.reservation_id));
}

#[tokio::test]
async fn test_sweep_and_resume_after_restart() {
    let app = spawn_app().await;
    let stale = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();
    let live = app.promo.reserve("SUITE20", "u2", SUITE).await.unwrap();
    backdate_reservation(&app.pool, &stale.reservation_id).await;

    // Simulate a restart: timers are gone, rows remain
    app.watchdog.cancel(&stale.reservation_id);
    app.watchdog.cancel(&live.reservation_id);
    assert_eq!(app.watchdog.armed_count(), 0);

    assert_eq!(app.watchdog.sweep().await.unwrap(), 1);
    assert_eq!(app.watchdog.resume_active().await.unwrap(), 1);
    assert!(app.watchdog.is_armed(&live.reservation_id));
    assert_eq!(
        state_of(&app, &stale.reservation_id).await,
        ReservationState::Expired
    );
}

#[tokio::test]
async fn test_background_sweeper_runs_until_shutdown() {
    let app = spawn_app().await;
    let stale = app.promo.reserve("EARLY10", "u1", STANDARD).await.unwrap();
    app.watchdog.cancel(&stale.reservation_id);
    backdate_reservation(&app.pool, &stale.reservation_id).await;

    let sweeper = tasks::spawn_all(app.watchdog.clone(), std::time::Duration::from_millis(100));
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    assert_eq!(
        state_of(&app, &stale.reservation_id).await,
        ReservationState::Expired
    );

    app.watchdog.shutdown();
    let stopped = tokio::time::timeout(std::time::Duration::from_secs(2), sweeper).await;
    assert!(matches!(stopped, Ok(Ok(()))));
}
