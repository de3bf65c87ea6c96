use crate::middlewares::current_identity;
use crate::models::*;
use crate::services::CheckoutService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "checkout",
    request_body = RegisterPaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Order registered, redirect to `bankResponse.formUrl`", body = RegisterPaymentResponse),
        (status = 400, description = "Missing session data or invalid request"),
        (status = 409, description = "Room sold out"),
        (status = 410, description = "Promo reservation expired"),
        (status = 502, description = "Gateway refused the order, see `bankResponse.errorCode`"),
        (status = 503, description = "Gateway unreachable, safe to retry with the same order number")
    )
)]
pub async fn register_payment(
    checkout_service: web::Data<CheckoutService>,
    req: HttpRequest,
    request: web::Json<RegisterPaymentRequest>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };

    match checkout_service.submit(&identity, request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "bankResponse": response.bank_response,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn register_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register_payment));
}
