use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// The plan a user is paying off. Price and discount are locked at the first
/// successful installment so later installments charge the same amounts.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "plan_subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub email: String,
    pub plan_id: i64,
    pub installments: i32,
    pub room_type_id: i64,
    pub room_price_cents: i64,
    pub discount_bp: i32,
    pub completed_installments: i32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn room_price(&self) -> Decimal {
        Decimal::new(self.room_price_cents, 2)
    }

    pub fn discount(&self) -> Decimal {
        Decimal::new(i64::from(self.discount_bp), 4)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.completed_installments >= self.installments
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
