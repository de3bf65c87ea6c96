use crate::entities::room_type_entity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Public availability row served by `GET /rooms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoomAvailability {
    pub id: i64,
    pub name: String,
    pub guests: i32,
    pub available: i32,
    /// Room total in whole currency units
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl From<room_type_entity::Model> for RoomAvailability {
    fn from(room: room_type_entity::Model) -> Self {
        Self {
            price: room.price(),
            id: room.id,
            name: room.name,
            guests: room.guests,
            available: room.available,
        }
    }
}
