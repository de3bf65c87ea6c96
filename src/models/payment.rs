use crate::entities::payment_record_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Status written when a record is created, before the gateway reports back.
pub const STATUS_PENDING: &str = "-1";
/// Status written when the gateway settled the payment.
pub const STATUS_DEPOSITED: &str = "DEPOSITED";
/// Status written when the gateway refused the payment.
pub const STATUS_DECLINED: &str = "DECLINED";

/// What a raw ledger status means for the payer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Failed,
    Pending,
}

impl PaymentOutcome {
    pub fn from_status(status: &str) -> Self {
        match status {
            "1" | "DEPOSITED" => PaymentOutcome::Success,
            "0" | "DECLINED" => PaymentOutcome::Failed,
            _ => PaymentOutcome::Pending,
        }
    }
}

/// Payment submission body as sent by the registration frontend.
///
/// Only `planId` and `selectedRoom` are required. Amount, installments and
/// payment number are recomputed on the server; the client values are
/// compared and logged but never charged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPaymentRequest {
    /// Client-computed amount in minor units
    pub amount: Option<i64>,
    pub description: Option<String>,
    pub return_url: Option<String>,
    pub order_number: Option<String>,
    pub client_id: Option<String>,
    pub email: Option<String>,
    pub plan_id: i64,
    pub status: Option<String>,
    pub payment_number: Option<i32>,
    pub full_name: Option<String>,
    pub dynamic_callback_url: Option<String>,
    pub installments: Option<i32>,
    pub reservation_id: Option<String>,
    pub promo_code: Option<String>,
    pub selected_room: i64,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BankRedirect {
    pub form_url: String,
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPaymentResponse {
    pub bank_response: BankRedirect,
    pub order_number: String,
    /// Charged amount in minor units
    pub amount: i64,
    pub payment_number: i32,
    pub installments: i32,
    /// True when the order number was already registered and the stored
    /// redirect is returned unchanged
    pub replayed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecordResponse {
    pub order_number: String,
    pub md_order: Option<String>,
    pub client_id: String,
    pub email: String,
    pub full_name: String,
    pub plan_id: i64,
    pub payment_number: i32,
    pub installments: i32,
    pub amount: i64,
    pub status: String,
    pub outcome: PaymentOutcome,
    pub room_type: i64,
    pub reservation_id: Option<String>,
    pub promo_code: Option<String>,
    pub locale: String,
    pub form_url: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payment_record_entity::Model> for PaymentRecordResponse {
    fn from(record: payment_record_entity::Model) -> Self {
        Self {
            outcome: PaymentOutcome::from_status(&record.status),
            order_number: record.order_number,
            md_order: record.md_order,
            client_id: record.client_id,
            email: record.email,
            full_name: record.full_name,
            plan_id: record.plan_id,
            payment_number: record.payment_number,
            installments: record.installments,
            amount: record.amount,
            status: record.status,
            room_type: record.room_type_id,
            reservation_id: record.reservation_id,
            promo_code: record.promo_code,
            locale: record.locale,
            form_url: record.form_url,
            error_code: record.error_code,
            error_message: record.error_message,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanProgress {
    pub plan_id: i64,
    pub completed: u32,
    pub total: u32,
}

impl PlanProgress {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPaymentsResponse {
    pub payments: Vec<PaymentRecordResponse>,
    pub progress: Option<PlanProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NextDueResponse {
    /// `None` once the plan is paid off
    pub next_due_date: Option<DateTime<Utc>>,
    pub installment_number: Option<i32>,
    pub total_installments: i32,
    /// Installments still to pay
    pub remaining: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub md_order: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserPaymentQuery {
    pub email: String,
}

/// Gateway dynamic callback parameters. Only `mdOrder` is used; the status is
/// always re-read from the gateway.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CallbackQuery {
    pub md_order: String,
    pub order_number: Option<String>,
    pub operation: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PaymentOutcome::from_status("1"), PaymentOutcome::Success);
        assert_eq!(PaymentOutcome::from_status("DEPOSITED"), PaymentOutcome::Success);
        assert_eq!(PaymentOutcome::from_status("0"), PaymentOutcome::Failed);
        assert_eq!(PaymentOutcome::from_status("DECLINED"), PaymentOutcome::Failed);
        assert_eq!(PaymentOutcome::from_status("-1"), PaymentOutcome::Pending);
        assert_eq!(PaymentOutcome::from_status("APPROVED"), PaymentOutcome::Pending);
        assert_eq!(PaymentOutcome::from_status(""), PaymentOutcome::Pending);
    }

    #[test]
    fn test_register_request_accepts_frontend_body() {
        let body = serde_json::json!({
            "amount": 36000,
            "description": "Registration",
            "returnUrl": "https://example.com/return",
            "orderNumber": "order-1",
            "clientId": "user-1",
            "email": "ana@example.com",
            "planId": 3,
            "status": "-1",
            "paymentNumber": 1,
            "fullName": "Ana Petrova",
            "dynamicCallbackUrl": "https://example.com/cb",
            "installments": 3,
            "reservationId": null,
            "promoCode": null,
            "selectedRoom": 2,
            "locale": "en"
        });
        let request: RegisterPaymentRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.plan_id, 3);
        assert_eq!(request.selected_room, 2);
        assert_eq!(request.order_number.as_deref(), Some("order-1"));
        assert!(request.reservation_id.is_none());
    }
}
