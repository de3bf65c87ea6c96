use crate::models::*;
use crate::services::RoomService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/rooms",
    tag = "inventory",
    responses(
        (status = 200, description = "Room types with remaining availability", body = [RoomAvailability])
    )
)]
pub async fn get_rooms(room_service: web::Data<RoomService>) -> Result<HttpResponse> {
    match room_service.get_availability().await {
        Ok(rooms) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": rooms
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn rooms_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/rooms", web::get().to(get_rooms));
}
