use crate::entities::payment_plan_entity;
use crate::utils::InstallmentBreakdown;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlanResponse {
    pub id: i64,
    pub installments: i32,
    pub schedule: String,
    pub cutoff_at: Option<DateTime<Utc>>,
    pub popular: bool,
    pub savings: Option<String>,
    pub selectable: bool,
}

impl PaymentPlanResponse {
    pub fn from_model(plan: payment_plan_entity::Model, now: DateTime<Utc>) -> Self {
        Self {
            selectable: plan.is_selectable_at(now),
            id: plan.id,
            installments: plan.installments,
            schedule: plan.schedule,
            cutoff_at: plan.cutoff_at,
            popular: plan.popular,
            savings: plan.savings,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub room_type: i64,
    pub promo: Option<String>,
}

/// Installment amounts for a plan and room, before any reservation is made.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuoteResponse {
    pub plan_id: i64,
    pub room_type: i64,
    pub promo_code: Option<String>,
    pub breakdown: InstallmentBreakdown,
    /// Amount of each installment in order, whole currency units
    #[serde(serialize_with = "serialize_amounts")]
    pub payments: Vec<Decimal>,
}

fn serialize_amounts<S: Serializer>(amounts: &[Decimal], serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct Amount(#[serde(with = "rust_decimal::serde::float")] Decimal);

    serializer.collect_seq(amounts.iter().copied().map(Amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::calculate;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_quote_amounts_serialize_as_numbers() {
        let quote = PlanQuoteResponse {
            plan_id: 3,
            room_type: 1,
            promo_code: Some("EARLY10".to_string()),
            breakdown: calculate(dec!(1200), 3, dec!(0.1)).unwrap(),
            payments: vec![dec!(360), dec!(360), dec!(360.25)],
        };
        let value = serde_json::to_value(&quote).unwrap();
        assert_eq!(value["payments"], json!([360.0, 360.0, 360.25]));
        assert_eq!(value["breakdown"]["firstPayment"], json!(360.0));
    }
}
