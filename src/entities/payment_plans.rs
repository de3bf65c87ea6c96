use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "payment_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub installments: i32,
    pub schedule: String,
    /// After this instant the plan can no longer be picked
    pub cutoff_at: Option<DateTime<Utc>>,
    pub popular: bool,
    pub savings: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn is_selectable_at(&self, now: DateTime<Utc>) -> bool {
        self.cutoff_at.is_none_or(|cutoff| now < cutoff)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
