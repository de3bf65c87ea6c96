use crate::entities::{ReservationState, promo_code_entity, promo_reservation_entity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PromoQuery {
    pub code: String,
    pub room_type: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoResponse {
    pub code: String,
    /// Fraction in [0, 1)
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub room_type: Option<i64>,
    pub active_from: DateTime<Utc>,
}

impl From<promo_code_entity::Model> for PromoResponse {
    fn from(promo: promo_code_entity::Model) -> Self {
        Self {
            discount: promo.discount(),
            code: promo.code,
            room_type: promo.room_type_id,
            active_from: promo.active_from,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservePromoRequest {
    pub code: String,
    /// Ignored when it differs from the session; kept for older clients
    pub user_id: Option<String>,
    pub room_type: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservedPromo {
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservePromoResponse {
    pub reservation_id: String,
    pub promo: ReservedPromo,
}

impl From<promo_reservation_entity::Model> for ReservePromoResponse {
    fn from(reservation: promo_reservation_entity::Model) -> Self {
        Self {
            promo: ReservedPromo {
                discount: reservation.discount(),
                expires_at: reservation.expires_at,
            },
            reservation_id: reservation.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationStatusResponse {
    pub reservation_id: String,
    pub code: String,
    pub room_type: i64,
    pub state: ReservationState,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub expires_at: DateTime<Utc>,
    /// Countdown for display only; purchase validity is checked server-side
    pub remaining_seconds: i64,
}

impl ReservationStatusResponse {
    pub fn from_model(reservation: promo_reservation_entity::Model, now: DateTime<Utc>) -> Self {
        let remaining_seconds = if reservation.state == ReservationState::Active {
            (reservation.expires_at - now).num_seconds().max(0)
        } else {
            0
        };
        Self {
            discount: reservation.discount(),
            reservation_id: reservation.id,
            code: reservation.code,
            room_type: reservation.room_type_id,
            state: reservation.state,
            expires_at: reservation.expires_at,
            remaining_seconds,
        }
    }
}
