use crate::utils::InstallmentError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Why a promo code was refused during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromoRejection {
    NotFound,
    NotYetActive,
    ZeroDiscount,
    RoomTypeMismatch,
}

impl std::fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromoRejection::NotFound => write!(f, "Promo code not found"),
            PromoRejection::NotYetActive => write!(f, "Promo code is not active yet"),
            PromoRejection::ZeroDiscount => write!(f, "Promo code carries no discount"),
            PromoRejection::RoomTypeMismatch => {
                write!(f, "Promo code is not valid for the selected room")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Missing user session data")]
    MissingSessionData,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Promo code rejected: {0}")]
    PromoRejected(PromoRejection),

    #[error("Reservation conflict: {0}")]
    ReservationConflict(String),

    #[error("Promo reservation has expired")]
    ExpiredReservation,

    #[error("Room type {0} is sold out")]
    RoomUnavailable(i64),

    #[error("Payment plan {0} is no longer offered")]
    PlanClosed(i64),

    #[error("Installment error: {0}")]
    Installment(#[from] InstallmentError),

    #[error("Gateway error {code}: {message}")]
    GatewayError { code: String, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Stable machine-readable code used in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::MissingSessionData => "MISSING_SESSION_DATA",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden => "FORBIDDEN",
            AppError::PromoRejected(PromoRejection::NotFound) => "PROMO_NOT_FOUND",
            AppError::PromoRejected(_) => "PROMO_INVALID",
            AppError::ReservationConflict(_) => "RESERVATION_CONFLICT",
            AppError::ExpiredReservation => "RESERVATION_EXPIRED",
            AppError::RoomUnavailable(_) => "ROOM_UNAVAILABLE",
            AppError::PlanClosed(_) => "PLAN_CLOSED",
            AppError::Installment(_) => "INSTALLMENT_ERROR",
            AppError::GatewayError { .. } => "GATEWAY_ERROR",
            AppError::NetworkError(_) => "NETWORK_ERROR",
            AppError::ExternalApiError(_) => "EXTERNAL_API_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::NetworkError(_))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::MissingSessionData => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::PromoRejected(PromoRejection::NotFound) => {
                StatusCode::NOT_FOUND
            }
            AppError::PromoRejected(_) | AppError::PlanClosed(_) | AppError::Installment(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::ReservationConflict(_) | AppError::RoomUnavailable(_) => StatusCode::CONFLICT,
            AppError::ExpiredReservation => StatusCode::GONE,
            AppError::GatewayError { .. } | AppError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            AppError::NetworkError(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg)
            | AppError::ReservationConflict(msg) => {
                log::warn!("{self}");
                msg.clone()
            }
            AppError::MissingSessionData
            | AppError::Forbidden
            | AppError::PromoRejected(_)
            | AppError::ExpiredReservation
            | AppError::RoomUnavailable(_)
            | AppError::PlanClosed(_)
            | AppError::Installment(_) => {
                log::warn!("{self}");
                self.to_string()
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                "Invalid access token".to_string()
            }
            AppError::GatewayError { code, message } => {
                log::error!("Gateway rejected request: {code} {message}");
                return HttpResponse::build(self.status_code()).json(json!({
                    "success": false,
                    "bankResponse": {
                        "errorCode": code,
                        "errorMessage": message
                    },
                    "error": {
                        "code": self.code(),
                        "message": message
                    }
                }));
            }
            AppError::NetworkError(msg) => {
                log::error!("Network error: {msg}");
                "Payment service unreachable, please try again".to_string()
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                msg.clone()
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
            _ => {
                log::error!("Internal error: {self}");
                "Internal server error".to_string()
            }
        };

        let mut body = json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        });
        if let AppError::PromoRejected(reason) = self {
            body["error"]["reason"] = json!(reason);
        }
        if self.is_retryable() {
            body["error"]["retryable"] = json!(true);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}
