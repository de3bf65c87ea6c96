use crate::config::CheckoutConfig;
use crate::database::is_unique_violation;
use crate::entities::{payment_record_entity as records, plan_subscription_entity as subscriptions};
use crate::error::{AppError, AppResult};
use crate::external::{PaymentGateway, RegisterOrder};
use crate::models::{
    BankRedirect, RegisterPaymentRequest, RegisterPaymentResponse, STATUS_DECLINED, STATUS_PENDING,
};
use crate::services::{CatalogService, PromoService, RoomService};
use crate::utils::{
    SessionIdentity, calculate, generate_order_number, to_minor_units, validate_email,
    validate_order_number,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use serde_json::json;

/// Statuses after which an order can no longer settle.
const FAILED_STATUSES: [&str; 2] = ["0", STATUS_DECLINED];

/// Everything needed to charge one installment, computed on the server.
#[derive(Debug, Clone, PartialEq)]
struct ChargePlan {
    plan_id: i64,
    installments: i32,
    payment_number: i32,
    room_type_id: i64,
    room_name: Option<String>,
    room_price_cents: i64,
    discount_bp: i32,
    reservation_id: Option<String>,
    promo_code: Option<String>,
    amount: Decimal,
}

/// Builds payment intents and hands them to the gateway.
///
/// The client order number is the ledger primary key, so submitting the same
/// order twice never creates a second record or a second gateway order.
#[derive(Clone)]
pub struct CheckoutService {
    pool: DatabaseConnection,
    gateway: PaymentGateway,
    room_service: RoomService,
    catalog_service: CatalogService,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: PaymentGateway,
        room_service: RoomService,
        catalog_service: CatalogService,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            pool,
            gateway,
            room_service,
            catalog_service,
            config,
        }
    }

    pub async fn submit(
        &self,
        identity: &SessionIdentity,
        request: RegisterPaymentRequest,
    ) -> AppResult<RegisterPaymentResponse> {
        let email = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(AppError::MissingSessionData)?
            .to_lowercase();
        let full_name = identity.full_name().ok_or(AppError::MissingSessionData)?;
        validate_email(&email)?;

        if let Some(sent) = request.email.as_deref()
            && !sent.trim().eq_ignore_ascii_case(&email)
        {
            return Err(AppError::Forbidden);
        }

        let order_number = match request.order_number.as_deref().map(str::trim) {
            Some(order_number) if !order_number.is_empty() => order_number.to_string(),
            _ => generate_order_number(),
        };
        validate_order_number(&order_number)?;

        if let Some(existing) = records::Entity::find_by_id(order_number.clone())
            .one(&self.pool)
            .await?
        {
            return self.replay(identity, existing).await;
        }

        let charge = self.charge_plan(identity, &request).await?;
        let amount = to_minor_units(charge.amount)?;
        self.warn_on_client_mismatch(&order_number, &request, &charge, amount);

        let now = Utc::now();
        let locale = request
            .locale
            .as_deref()
            .map(str::trim)
            .filter(|locale| !locale.is_empty())
            .unwrap_or(self.config.default_locale.as_str())
            .chars()
            .take(8)
            .collect::<String>();
        let description = self.describe(&charge);

        let inserted = records::ActiveModel {
            order_number: Set(order_number.clone()),
            md_order: Set(None),
            client_id: Set(identity.user_id.clone()),
            email: Set(email),
            full_name: Set(full_name),
            plan_id: Set(charge.plan_id),
            payment_number: Set(charge.payment_number),
            installments: Set(charge.installments),
            amount: Set(amount),
            room_price_cents: Set(charge.room_price_cents),
            discount_bp: Set(charge.discount_bp),
            status: Set(STATUS_PENDING.to_string()),
            room_type_id: Set(charge.room_type_id),
            reservation_id: Set(charge.reservation_id.clone()),
            promo_code: Set(charge.promo_code.clone()),
            locale: Set(locale),
            description: Set(description),
            form_url: Set(None),
            error_code: Set(None),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await;

        let record = match inserted {
            Ok(record) => record,
            // Same order number submitted concurrently: answer like a resubmission
            Err(e) if is_unique_violation(&e) => {
                let existing = records::Entity::find_by_id(order_number.clone())
                    .one(&self.pool)
                    .await?
                    .ok_or(AppError::DatabaseError(e))?;
                return self.replay(identity, existing).await;
            }
            Err(e) => return Err(e.into()),
        };

        log::info!(
            "Payment record {} created: plan {} payment {}/{} amount {}",
            record.order_number,
            record.plan_id,
            record.payment_number,
            record.installments,
            record.amount
        );

        self.register_with_gateway(record, false).await
    }

    /// Answers a resubmitted order number from the ledger.
    async fn replay(
        &self,
        identity: &SessionIdentity,
        existing: records::Model,
    ) -> AppResult<RegisterPaymentResponse> {
        if existing.client_id != identity.user_id {
            return Err(AppError::ValidationError(
                "Order number is already in use".to_string(),
            ));
        }

        if let (Some(form_url), Some(md_order)) = (&existing.form_url, &existing.md_order) {
            log::info!("Order {} resubmitted, returning stored redirect", existing.order_number);
            return Ok(RegisterPaymentResponse {
                bank_response: BankRedirect {
                    form_url: form_url.clone(),
                    order_id: md_order.clone(),
                },
                order_number: existing.order_number,
                amount: existing.amount,
                payment_number: existing.payment_number,
                installments: existing.installments,
                replayed: true,
            });
        }

        if let Some(code) = &existing.error_code {
            return Err(AppError::GatewayError {
                code: code.clone(),
                message: existing
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Gateway refused the order".to_string()),
            });
        }

        // The earlier attempt never reached the gateway: retry with the stored amount
        log::info!("Retrying gateway registration of order {}", existing.order_number);
        self.register_with_gateway(existing, true).await
    }

    async fn charge_plan(
        &self,
        identity: &SessionIdentity,
        request: &RegisterPaymentRequest,
    ) -> AppResult<ChargePlan> {
        let subscription = subscriptions::Entity::find_by_id(identity.user_id.clone())
            .one(&self.pool)
            .await?;

        match subscription {
            Some(subscription) if subscription.is_fully_paid() => Err(AppError::ValidationError(
                "Payment plan is already fully paid".to_string(),
            )),
            Some(subscription) => {
                if subscription.plan_id != request.plan_id {
                    return Err(AppError::ValidationError(format!(
                        "Plan {} is already in progress",
                        subscription.plan_id
                    )));
                }
                let payment_number = subscription.completed_installments + 1;
                let breakdown = calculate(
                    subscription.room_price(),
                    installment_count(subscription.installments)?,
                    subscription.discount(),
                )?;
                let amount = breakdown.installment_amount(payment_number as u32)?;

                Ok(ChargePlan {
                    plan_id: subscription.plan_id,
                    installments: subscription.installments,
                    payment_number,
                    room_type_id: subscription.room_type_id,
                    room_name: None,
                    room_price_cents: subscription.room_price_cents,
                    discount_bp: subscription.discount_bp,
                    reservation_id: None,
                    promo_code: None,
                    amount,
                })
            }
            None => self.first_payment(identity, request).await,
        }
    }

    async fn first_payment(
        &self,
        identity: &SessionIdentity,
        request: &RegisterPaymentRequest,
    ) -> AppResult<ChargePlan> {
        let now = Utc::now();
        let plan = self
            .catalog_service
            .selectable_plan(request.plan_id, now)
            .await?;
        let room = self.room_service.selectable_room(request.selected_room).await?;

        let reservation = match request
            .reservation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            Some(reservation_id) => Some(
                PromoService::require_active(
                    &self.pool,
                    reservation_id,
                    &identity.user_id,
                    room.id,
                    now,
                )
                .await?,
            ),
            None => None,
        };
        if let Some(reservation) = &reservation {
            self.ensure_reservation_unattached(&reservation.id).await?;
        }

        if let Some(code) = request.promo_code.as_deref().filter(|c| !c.trim().is_empty())
            && reservation.as_ref().is_none_or(|r| r.code != code.trim())
        {
            log::warn!(
                "Promo code {code} sent without a matching reservation by {}; ignored",
                identity.user_id
            );
        }

        let discount = reservation
            .as_ref()
            .map(|r| r.discount())
            .unwrap_or(Decimal::ZERO);
        let breakdown = calculate(room.price(), installment_count(plan.installments)?, discount)?;

        Ok(ChargePlan {
            plan_id: plan.id,
            installments: plan.installments,
            payment_number: 1,
            room_type_id: room.id,
            room_price_cents: room.price_cents,
            room_name: Some(room.name),
            discount_bp: reservation.as_ref().map(|r| r.discount_bp).unwrap_or(0),
            reservation_id: reservation.as_ref().map(|r| r.id.clone()),
            promo_code: reservation.map(|r| r.code),
            amount: breakdown.installment_amount(1)?,
        })
    }

    /// A reservation discounts one first payment. While an earlier order using
    /// it can still settle, a new order number may not take it again.
    async fn ensure_reservation_unattached(&self, reservation_id: &str) -> AppResult<()> {
        let attached = records::Entity::find()
            .filter(records::Column::ReservationId.eq(reservation_id))
            .filter(records::Column::ErrorCode.is_null())
            .filter(records::Column::Status.is_not_in(FAILED_STATUSES))
            .one(&self.pool)
            .await?;

        match attached {
            Some(order) => {
                log::warn!(
                    "Reservation {reservation_id} is already attached to order {}",
                    order.order_number
                );
                Err(AppError::ReservationConflict(format!(
                    "Promo reservation is already used by order {}",
                    order.order_number
                )))
            }
            None => Ok(()),
        }
    }

    /// Registers the order with the gateway and stores the outcome on the record.
    ///
    /// Neither a refusal nor a transport failure touches reservations or plan
    /// progress; only the ledger row is annotated.
    async fn register_with_gateway(
        &self,
        record: records::Model,
        replayed: bool,
    ) -> AppResult<RegisterPaymentResponse> {
        let json_params = json!({
            "email": record.email,
            "planId": record.plan_id.to_string(),
            "paymentNumber": record.payment_number.to_string(),
            "installments": record.installments.to_string(),
            "roomType": record.room_type_id.to_string(),
        });
        let order = RegisterOrder {
            order_number: &record.order_number,
            amount: record.amount,
            return_url: &self.config.return_url,
            callback_url: &self.config.callback_url,
            description: &record.description,
            language: &record.locale,
            json_params,
        };

        match self.gateway.register_order(&order).await {
            Ok(registered) => {
                let mut active = record.clone().into_active_model();
                active.md_order = Set(Some(registered.order_id.clone()));
                active.form_url = Set(Some(registered.form_url.clone()));
                active.updated_at = Set(Utc::now());
                let record = active.update(&self.pool).await?;

                Ok(RegisterPaymentResponse {
                    bank_response: BankRedirect {
                        form_url: registered.form_url,
                        order_id: registered.order_id,
                    },
                    order_number: record.order_number,
                    amount: record.amount,
                    payment_number: record.payment_number,
                    installments: record.installments,
                    replayed,
                })
            }
            Err(AppError::GatewayError { code, message }) => {
                let mut active = record.clone().into_active_model();
                active.error_code = Set(Some(code.clone()));
                active.error_message = Set(Some(message.clone()));
                active.updated_at = Set(Utc::now());
                active.update(&self.pool).await?;
                Err(AppError::GatewayError { code, message })
            }
            Err(e) => {
                log::warn!(
                    "Gateway registration of order {} did not complete: {e}",
                    record.order_number
                );
                Err(e)
            }
        }
    }

    fn describe(&self, charge: &ChargePlan) -> String {
        let room = charge
            .room_name
            .clone()
            .unwrap_or_else(|| format!("room type {}", charge.room_type_id));
        let mut description = format!(
            "{} - {room} - payment {}/{}",
            self.config.description_prefix, charge.payment_number, charge.installments
        );
        if let Some(code) = &charge.promo_code {
            description.push_str(&format!(" - promo {code}"));
        }
        description.chars().take(512).collect()
    }

    fn warn_on_client_mismatch(
        &self,
        order_number: &str,
        request: &RegisterPaymentRequest,
        charge: &ChargePlan,
        amount: i64,
    ) {
        if let Some(sent) = request.amount
            && sent != amount
        {
            log::warn!("Order {order_number}: client amount {sent} differs from computed {amount}");
        }
        if let Some(sent) = request.payment_number
            && sent != charge.payment_number
        {
            log::warn!(
                "Order {order_number}: client payment number {sent} differs from {}",
                charge.payment_number
            );
        }
        if let Some(sent) = request.installments
            && sent != charge.installments
        {
            log::warn!(
                "Order {order_number}: client installments {sent} differ from plan {}",
                charge.installments
            );
        }
    }
}

fn installment_count(installments: i32) -> AppResult<u32> {
    u32::try_from(installments)
        .map_err(|_| AppError::ValidationError(format!("Invalid installment count {installments}")))
}
