use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::ReservationState;
use crate::handlers;
use crate::models::*;
use crate::utils::InstallmentBreakdown;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::rooms::get_rooms,
        handlers::plans::get_plans,
        handlers::plans::get_quote,
        handlers::promo::get_promo,
        handlers::promo::reserve_promo,
        handlers::promo::get_reservation,
        handlers::promo::release_reservation,
        handlers::register::register_payment,
        handlers::payment::get_payment,
        handlers::payment::get_user_payments,
        handlers::payment::get_next_due,
        handlers::payment::get_progress,
        handlers::payment::payment_callback,
    ),
    components(
        schemas(
            RoomAvailability,
            PaymentPlanResponse,
            PlanQuoteResponse,
            InstallmentBreakdown,
            PromoResponse,
            ReservePromoRequest,
            ReservePromoResponse,
            ReservedPromo,
            ReservationStatusResponse,
            ReservationState,
            RegisterPaymentRequest,
            RegisterPaymentResponse,
            BankRedirect,
            PaymentRecordResponse,
            PaymentOutcome,
            PlanProgress,
            UserPaymentsResponse,
            NextDueResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "inventory", description = "Room availability"),
        (name = "plans", description = "Payment plans and installment quotes"),
        (name = "promo", description = "Promo code validation and reservation"),
        (name = "checkout", description = "Payment submission"),
        (name = "payments", description = "Payment status and plan progress"),
    ),
    info(
        title = "Conference Checkout API",
        version = "1.0.0",
        description = "Room selection, promo reservation and installment payments for conference registration"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
