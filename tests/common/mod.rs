#![allow(dead_code, clippy::unwrap_used)]
// Shared fixtures: an in-memory SQLite ledger, a seeded catalog and a mocked gateway.

use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use conference_checkout::config::{
    CatalogConfig, CheckoutConfig, DatabaseConfig, GatewayConfig, PromoSeed, RoomSeed,
};
use conference_checkout::database::{create_pool, run_migrations};
use conference_checkout::entities::promo_reservation_entity as reservations;
use conference_checkout::external::PaymentGateway;
use conference_checkout::models::RegisterPaymentRequest;
use conference_checkout::services::{
    CatalogService, CheckoutService, PromoService, ReconcileService, RoomService,
};
use conference_checkout::tasks::ExpirationWatchdog;
use conference_checkout::utils::{JwtService, SessionIdentity};

pub const STANDARD: i64 = 1;
pub const SUITE: i64 = 2;
pub const SOLD_OUT: i64 = 3;

pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub pool: DatabaseConnection,
    pub server: MockServer,
    pub watchdog: ExpirationWatchdog,
    pub rooms: RoomService,
    pub catalog: CatalogService,
    pub promo: PromoService,
    pub checkout: CheckoutService,
    pub reconcile: ReconcileService,
    pub jwt: JwtService,
}

pub fn catalog() -> CatalogConfig {
    let room = |id: i64, name: &str, guests: i32, price_cents: i64, available: i32| RoomSeed {
        id,
        name: name.to_string(),
        guests,
        price_cents,
        available,
    };
    let promo = |code: &str, discount_bp: i32, room_type_id: Option<i64>| PromoSeed {
        code: code.to_string(),
        discount_bp,
        room_type_id,
        active_from: None,
    };

    CatalogConfig {
        rooms: vec![
            room(STANDARD, "Standard", 2, 120_000, 5),
            room(SUITE, "Suite", 4, 250_000, 1),
            room(SOLD_OUT, "Penthouse", 6, 900_000, 0),
        ],
        promo_codes: vec![
            promo("EARLY10", 1000, None),
            promo("SUITE20", 2000, Some(SUITE)),
            promo("NOTHING", 0, None),
            PromoSeed {
                active_from: Some(Utc::now() + Duration::days(30)),
                ..promo("LATER", 1500, None)
            },
        ],
        ..CatalogConfig::default()
    }
}

pub async fn spawn_app() -> TestApp {
    let pool = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap();
    run_migrations(&pool).await.unwrap();

    let server = MockServer::start().await;
    let gateway = PaymentGateway::new(GatewayConfig {
        base_url: format!("{}/payment/rest", server.uri()),
        username: "merchant-api".to_string(),
        password: "merchant-pass".to_string(),
        currency: "840".to_string(),
        language: "en".to_string(),
        timeout_secs: 5,
    })
    .unwrap();

    let watchdog = ExpirationWatchdog::new(pool.clone(), std::time::Duration::from_millis(200));
    let rooms = RoomService::new(pool.clone(), std::time::Duration::from_secs(5));
    let catalog_service = CatalogService::new(pool.clone());
    catalog_service.seed(&catalog()).await.unwrap();

    let promo = PromoService::new(pool.clone(), Duration::minutes(15), watchdog.clone());
    let checkout = CheckoutService::new(
        pool.clone(),
        gateway.clone(),
        rooms.clone(),
        catalog_service.clone(),
        CheckoutConfig::default(),
    );
    let reconcile = ReconcileService::new(
        pool.clone(),
        gateway,
        rooms.clone(),
        catalog_service.clone(),
        watchdog.clone(),
        Duration::days(30),
    );

    TestApp {
        pool,
        server,
        watchdog,
        rooms,
        catalog: catalog_service,
        promo,
        checkout,
        reconcile,
        jwt: JwtService::new(JWT_SECRET, 3600),
    }
}

pub fn attendee(user_id: &str) -> SessionIdentity {
    SessionIdentity {
        user_id: user_id.to_string(),
        email: Some(format!("{user_id}@example.com")),
        first_name: Some("Ana".to_string()),
        last_name: Some("Lopez".to_string()),
    }
}

pub fn registration(plan_id: i64, room: i64, order_number: &str) -> RegisterPaymentRequest {
    RegisterPaymentRequest {
        plan_id,
        selected_room: room,
        order_number: Some(order_number.to_string()),
        ..RegisterPaymentRequest::default()
    }
}

/// Gateway accepts every order and hands out `md_order`.
pub async fn mock_register_ok(server: &MockServer, md_order: &str) {
    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": md_order,
            "formUrl": format!("https://pay.example.com/form?mdOrder={md_order}")
        })))
        .mount(server)
        .await;
}

/// Gateway accepts `order_number` as `md_order`.
pub async fn mock_register_order(server: &MockServer, order_number: &str, md_order: &str) {
    Mock::given(method("POST"))
        .and(path("/payment/rest/register.do"))
        .and(body_string_contains(format!("orderNumber={order_number}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": md_order,
            "formUrl": format!("https://pay.example.com/form?mdOrder={md_order}")
        })))
        .mount(server)
        .await;
}

/// Gateway reports `order_status` for `md_order`.
pub async fn mock_order_status(
    server: &MockServer,
    md_order: &str,
    order_number: &str,
    order_status: i64,
) {
    Mock::given(method("POST"))
        .and(path("/payment/rest/getOrderStatusExtended.do"))
        .and(body_string_contains(format!("orderId={md_order}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorCode": "0",
            "orderStatus": order_status,
            "orderNumber": order_number
        })))
        .mount(server)
        .await;
}

/// Moves a reservation's deadline into the past without touching its state.
pub async fn backdate_reservation(pool: &DatabaseConnection, reservation_id: &str) {
    reservations::Entity::update_many()
        .col_expr(
            reservations::Column::ExpiresAt,
            Expr::value(Utc::now() - Duration::seconds(5)),
        )
        .filter(reservations::Column::Id.eq(reservation_id))
        .exec(pool)
        .await
        .unwrap();
}
