use crate::error::AppError;
use crate::middlewares::current_identity;
use crate::models::*;
use crate::services::ReconcileService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/payment",
    tag = "payments",
    params(PaymentQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment record, or `data: null` when none exists yet", body = PaymentRecordResponse)
    )
)]
pub async fn get_payment(
    reconcile_service: web::Data<ReconcileService>,
    req: HttpRequest,
    query: web::Query<PaymentQuery>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };

    match reconcile_service
        .payment_status(&query.md_order, &identity.user_id)
        .await
    {
        Ok(Some(record)) => Ok(HttpResponse::Ok().json(ApiResponse::success(record))),
        Ok(None) => Ok(HttpResponse::Ok().json(ApiResponse::<PaymentRecordResponse>::empty(
            "No payment record found yet",
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/user-payment",
    tag = "payments",
    params(UserPaymentQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payments of the signed-in user", body = UserPaymentsResponse),
        (status = 403, description = "Email does not belong to the session")
    )
)]
pub async fn get_user_payments(
    reconcile_service: web::Data<ReconcileService>,
    req: HttpRequest,
    query: web::Query<UserPaymentQuery>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };

    match reconcile_service.user_payments(&identity, &query.email).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/payments/next-due/{userId}",
    tag = "payments",
    params(("userId" = String, Path, description = "User id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Next installment due", body = NextDueResponse),
        (status = 404, description = "No plan in progress")
    )
)]
pub async fn get_next_due(
    reconcile_service: web::Data<ReconcileService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };
    let user_id = path.into_inner();
    if user_id != identity.user_id {
        return Ok(AppError::Forbidden.error_response());
    }

    match reconcile_service.next_due(&user_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/payments/progress",
    tag = "payments",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Installments completed out of the plan total", body = PlanProgress)
    )
)]
pub async fn get_progress(
    reconcile_service: web::Data<ReconcileService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };

    match reconcile_service.plan_progress(&identity.user_id).await {
        Ok(progress) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": progress
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/payment/callback",
    tag = "payments",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Callback processed", body = PaymentRecordResponse),
        (status = 404, description = "Unknown gateway order")
    )
)]
pub async fn payment_callback(
    reconcile_service: web::Data<ReconcileService>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse> {
    log::info!(
        "Gateway callback for {} (order {:?}, operation {:?}, status {:?})",
        query.md_order,
        query.order_number,
        query.operation,
        query.status
    );

    match reconcile_service.handle_callback(&query.md_order).await {
        Ok(record) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": record
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/payment", web::get().to(get_payment))
        .route("/payment/callback", web::get().to(payment_callback))
        .route("/user-payment", web::get().to(get_user_payments))
        .route("/payments/progress", web::get().to(get_progress))
        .route("/payments/next-due/{user_id}", web::get().to(get_next_due));
}
