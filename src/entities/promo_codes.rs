use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// Promo code reference data.
/// - discount_bp: discount in basis points, 1% = 100bp (0 <= bp < 10000)
/// - room_type_id: NULL means valid for every room type
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "promo_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub discount_bp: i32,
    pub room_type_id: Option<i64>,
    pub active_from: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Discount as a fraction in [0, 1)
    pub fn discount(&self) -> Decimal {
        Decimal::new(i64::from(self.discount_bp), 4)
    }

    pub fn applies_to(&self, room_type_id: i64) -> bool {
        self.room_type_id.is_none_or(|scoped| scoped == room_type_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
