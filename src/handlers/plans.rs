use crate::error::AppResult;
use crate::models::*;
use crate::services::{CatalogService, PromoService, RoomService};
use crate::utils::calculate;
use actix_web::{HttpResponse, ResponseError, Result, web};
use rust_decimal::Decimal;
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/plans",
    tag = "plans",
    responses(
        (status = 200, description = "Payment plans", body = [PaymentPlanResponse])
    )
)]
pub async fn get_plans(catalog_service: web::Data<CatalogService>) -> Result<HttpResponse> {
    match catalog_service.list_plans().await {
        Ok(plans) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plans
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/plans/{id}/quote",
    tag = "plans",
    params(("id" = i64, Path, description = "Plan id"), QuoteQuery),
    responses(
        (status = 200, description = "Installment amounts", body = PlanQuoteResponse),
        (status = 404, description = "Unknown plan, room type or promo code")
    )
)]
pub async fn get_quote(
    catalog_service: web::Data<CatalogService>,
    room_service: web::Data<RoomService>,
    promo_service: web::Data<PromoService>,
    path: web::Path<i64>,
    query: web::Query<QuoteQuery>,
) -> Result<HttpResponse> {
    match quote(
        &catalog_service,
        &room_service,
        &promo_service,
        path.into_inner(),
        &query,
    )
    .await
    {
        Ok(quote) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": quote
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn quote(
    catalog_service: &CatalogService,
    room_service: &RoomService,
    promo_service: &PromoService,
    plan_id: i64,
    query: &QuoteQuery,
) -> AppResult<PlanQuoteResponse> {
    let plan = catalog_service.find_plan(plan_id).await?;
    let room = room_service.room(query.room_type).await?;

    let promo = match query.promo.as_deref().filter(|code| !code.trim().is_empty()) {
        Some(code) => Some(promo_service.validate(code, Some(room.id)).await?),
        None => None,
    };
    let discount = promo.as_ref().map(|p| p.discount).unwrap_or(Decimal::ZERO);

    let breakdown = calculate(room.price(), plan.installments.max(0) as u32, discount)?;
    let payments = (1..=breakdown.installments)
        .map(|k| breakdown.installment_amount(k))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlanQuoteResponse {
        plan_id: plan.id,
        room_type: room.id,
        promo_code: promo.map(|p| p.code),
        breakdown,
        payments,
    })
}

pub fn plans_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/plans", web::get().to(get_plans))
        .route("/plans/{id}/quote", web::get().to(get_quote));
}
