use crate::config::GatewayConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Order registration sent to `register.do`.
#[derive(Debug, Clone)]
pub struct RegisterOrder<'a> {
    pub order_number: &'a str,
    /// Minor units
    pub amount: i64,
    pub return_url: &'a str,
    pub callback_url: &'a str,
    pub description: &'a str,
    pub language: &'a str,
    pub json_params: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredOrder {
    /// Gateway order id (`mdOrder`)
    pub order_id: String,
    pub form_url: String,
}

/// Gateway order state as reported by `getOrderStatusExtended.do`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOrderState {
    Created,
    Approved,
    Deposited,
    Reversed,
    Refunded,
    PendingAuth,
    Declined,
}

impl GatewayOrderState {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Created),
            1 => Some(Self::Approved),
            2 => Some(Self::Deposited),
            3 => Some(Self::Reversed),
            4 => Some(Self::Refunded),
            5 => Some(Self::PendingAuth),
            6 => Some(Self::Declined),
            _ => None,
        }
    }

    /// Value stored in the ledger `status` column
    pub fn as_status(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Approved => "APPROVED",
            Self::Deposited => "DEPOSITED",
            Self::Reversed => "REVERSED",
            Self::Refunded => "REFUNDED",
            Self::PendingAuth => "PENDING_AUTH",
            Self::Declined => "DECLINED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrderStatus {
    pub state: GatewayOrderState,
    pub order_number: Option<String>,
    pub amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterDoResponse {
    order_id: Option<String>,
    form_url: Option<String>,
    error_code: Option<Value>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStatusResponse {
    order_status: Option<i64>,
    order_number: Option<String>,
    amount: Option<i64>,
    error_code: Option<Value>,
    error_message: Option<String>,
}

/// `errorCode` arrives either as a string or a number; "0" means no error.
fn gateway_error(code: Option<&Value>, message: Option<&str>) -> Option<AppError> {
    let code = match code? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    if code.is_empty() || code == "0" {
        return None;
    }
    Some(AppError::GatewayError {
        code,
        message: message.unwrap_or("Unknown gateway error").to_string(),
    })
}

#[derive(Clone)]
pub struct PaymentGateway {
    client: Client,
    config: GatewayConfig,
}

impl PaymentGateway {
    pub fn new(config: GatewayConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Registers an order and returns the hosted payment page.
    ///
    /// A structured gateway refusal is returned as `GatewayError`; failing to
    /// reach the gateway at all is a retryable `NetworkError`.
    pub async fn register_order(&self, order: &RegisterOrder<'_>) -> AppResult<RegisteredOrder> {
        let amount = order.amount.to_string();
        let json_params = order.json_params.to_string();
        let params = [
            ("userName", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
            ("orderNumber", order.order_number),
            ("amount", amount.as_str()),
            ("currency", self.config.currency.as_str()),
            ("returnUrl", order.return_url),
            ("description", order.description),
            ("language", order.language),
            ("dynamicCallbackUrl", order.callback_url),
            ("jsonParams", json_params.as_str()),
        ];

        let result: RegisterDoResponse = self.post_form("register.do", &params).await?;

        if let Some(err) = gateway_error(result.error_code.as_ref(), result.error_message.as_deref())
        {
            return Err(err);
        }

        match (result.order_id, result.form_url) {
            (Some(order_id), Some(form_url)) => {
                log::info!(
                    "Gateway registered order {} as {order_id}",
                    order.order_number
                );
                Ok(RegisteredOrder { order_id, form_url })
            }
            _ => Err(AppError::ExternalApiError(
                "Gateway response is missing orderId or formUrl".to_string(),
            )),
        }
    }

    pub async fn order_status(&self, md_order: &str) -> AppResult<GatewayOrderStatus> {
        let params = [
            ("userName", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
            ("orderId", md_order),
            ("language", self.config.language.as_str()),
        ];

        let result: OrderStatusResponse =
            self.post_form("getOrderStatusExtended.do", &params).await?;

        if let Some(err) = gateway_error(result.error_code.as_ref(), result.error_message.as_deref())
        {
            return Err(err);
        }

        let state = result
            .order_status
            .and_then(GatewayOrderState::from_code)
            .ok_or_else(|| {
                AppError::ExternalApiError(format!(
                    "Gateway returned unknown order status {:?} for {md_order}",
                    result.order_status
                ))
            })?;

        Ok(GatewayOrderStatus {
            state,
            order_number: result.order_number,
            amount: result.amount,
        })
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::NetworkError(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::NetworkError(format!(
                "{endpoint}: gateway answered {status}"
            )));
        }
        if !status.is_success() {
            return Err(AppError::ExternalApiError(format!(
                "{endpoint}: gateway answered {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("{endpoint}: invalid response: {e}")))
    }
}
