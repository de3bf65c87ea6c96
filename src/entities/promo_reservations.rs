use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum ReservationState {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "consumed")]
    Consumed,
    #[sea_orm(string_value = "released")]
    Released,
}

impl std::fmt::Display for ReservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationState::Active => write!(f, "active"),
            ReservationState::Expired => write!(f, "expired"),
            ReservationState::Consumed => write!(f, "consumed"),
            ReservationState::Released => write!(f, "released"),
        }
    }
}

/// A time-bounded claim on a promo code.
///
/// `active_code` carries the code while the reservation is active and is NULL in
/// every other state; a unique index on it allows a single active holder per code.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "promo_reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub user_id: String,
    pub room_type_id: i64,
    /// Copied from the promo code when the reservation was made
    pub discount_bp: i32,
    pub state: ReservationState,
    pub active_code: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn discount(&self) -> Decimal {
        Decimal::new(i64::from(self.discount_bp), 4)
    }

    pub fn is_elapsed_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
