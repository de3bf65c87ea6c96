use crate::middlewares::current_identity;
use crate::models::*;
use crate::services::PromoService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/promo",
    tag = "promo",
    params(PromoQuery),
    responses(
        (status = 200, description = "Promo code is valid for the room type", body = PromoResponse),
        (status = 404, description = "Unknown promo code"),
        (status = 422, description = "Promo code not usable for this room type")
    )
)]
pub async fn get_promo(
    promo_service: web::Data<PromoService>,
    query: web::Query<PromoQuery>,
) -> Result<HttpResponse> {
    match promo_service.validate(&query.code, query.room_type).await {
        Ok(promo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/promo/reserve",
    tag = "promo",
    request_body = ReservePromoRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Promo code reserved", body = ReservePromoResponse),
        (status = 409, description = "Promo code is held by someone else or already redeemed"),
        (status = 404, description = "Unknown promo code"),
        (status = 422, description = "Promo code not usable for this room type")
    )
)]
pub async fn reserve_promo(
    promo_service: web::Data<PromoService>,
    req: HttpRequest,
    request: web::Json<ReservePromoRequest>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };
    if let Some(user_id) = request.user_id.as_deref()
        && user_id != identity.user_id
    {
        log::warn!(
            "Reserve request for user {user_id} sent by {}; using the session",
            identity.user_id
        );
    }

    match promo_service
        .reserve(&request.code, &identity.user_id, request.room_type)
        .await
    {
        Ok(reservation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": reservation
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/promo/reservations/{id}",
    tag = "promo",
    params(("id" = String, Path, description = "Reservation id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Reservation state and countdown", body = ReservationStatusResponse),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    promo_service: web::Data<PromoService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };

    match promo_service
        .reservation_status(&path.into_inner(), &identity.user_id)
        .await
    {
        Ok(status) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": status
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/promo/reservations/{id}",
    tag = "promo",
    params(("id" = String, Path, description = "Reservation id")),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Reservation released"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn release_reservation(
    promo_service: web::Data<PromoService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let identity = match current_identity(&req) {
        Ok(identity) => identity,
        Err(e) => return Ok(e.error_response()),
    };

    match promo_service
        .release(&path.into_inner(), &identity.user_id)
        .await
    {
        Ok(released) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "released": released }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn promo_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/promo")
            .route("", web::get().to(get_promo))
            .route("/reserve", web::post().to(reserve_promo))
            .route("/reservations/{id}", web::get().to(get_reservation))
            .route("/reservations/{id}", web::delete().to(release_reservation)),
    );
}
