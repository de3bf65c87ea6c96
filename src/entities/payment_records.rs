use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Payment ledger row, keyed by the client order number.
///
/// `status` holds the raw status code: `-1` until the gateway reports back, then
/// `DEPOSITED`/`1` on success, `DECLINED`/`0` on failure, or another gateway state.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "payment_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_number: String,
    /// Gateway-side order id
    pub md_order: Option<String>,
    pub client_id: String,
    pub email: String,
    pub full_name: String,
    pub plan_id: i64,
    pub payment_number: i32,
    pub installments: i32,
    /// Minor units
    pub amount: i64,
    /// Room total the amount was computed from, in minor units
    pub room_price_cents: i64,
    pub discount_bp: i32,
    pub status: String,
    pub room_type_id: i64,
    pub reservation_id: Option<String>,
    pub promo_code: Option<String>,
    pub locale: String,
    pub description: String,
    pub form_url: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
