use crate::entities::{payment_record_entity as records, plan_subscription_entity as subscriptions};
use crate::error::{AppError, AppResult};
use crate::external::{GatewayOrderState, PaymentGateway};
use crate::models::{
    NextDueResponse, PaymentOutcome, PaymentRecordResponse, PlanProgress, STATUS_DECLINED,
    STATUS_DEPOSITED, UserPaymentsResponse,
};
use crate::services::{CatalogService, PromoService, RoomService};
use crate::tasks::ExpirationWatchdog;
use crate::utils::SessionIdentity;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

/// Statuses that are never overwritten once written.
const FINAL_STATUSES: [&str; 4] = ["1", STATUS_DEPOSITED, "0", STATUS_DECLINED];

/// Plan progress derived from ledger rows alone.
///
/// The first successful row fixes the plan (and thus the required installment
/// count); each installment number settled under that plan counts once.
pub fn derive_plan_progress(
    records: &[records::Model],
    installments_for: impl Fn(i64) -> Option<i32>,
) -> Option<PlanProgress> {
    let mut successful = records
        .iter()
        .filter(|r| PaymentOutcome::from_status(&r.status) == PaymentOutcome::Success);
    let first = successful.next()?;
    let mut paid: BTreeSet<i32> = successful
        .filter(|r| r.plan_id == first.plan_id)
        .map(|r| r.payment_number)
        .collect();
    paid.insert(first.payment_number);
    let completed = paid.len() as u32;
    let total = installments_for(first.plan_id).unwrap_or(first.installments);

    Some(PlanProgress {
        plan_id: first.plan_id,
        completed,
        total: total.max(0) as u32,
    })
}

/// Due date of the next installment, counted from the first payment.
pub fn compute_next_due(
    started_at: DateTime<Utc>,
    completed: i32,
    total: i32,
    interval: Duration,
) -> NextDueResponse {
    let remaining = (total - completed).max(0);
    if remaining == 0 {
        return NextDueResponse {
            next_due_date: None,
            installment_number: None,
            total_installments: total,
            remaining,
        };
    }
    NextDueResponse {
        next_due_date: Some(started_at + interval * completed),
        installment_number: Some(completed + 1),
        total_installments: total,
        remaining,
    }
}

#[derive(Clone)]
pub struct ReconcileService {
    pool: DatabaseConnection,
    gateway: PaymentGateway,
    room_service: RoomService,
    catalog_service: CatalogService,
    watchdog: ExpirationWatchdog,
    installment_interval: Duration,
}

impl ReconcileService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: PaymentGateway,
        room_service: RoomService,
        catalog_service: CatalogService,
        watchdog: ExpirationWatchdog,
        installment_interval: Duration,
    ) -> Self {
        Self {
            pool,
            gateway,
            room_service,
            catalog_service,
            watchdog,
            installment_interval,
        }
    }

    /// Ledger state of a gateway order. `None` means no record exists yet.
    ///
    /// Only the payer may look at a record. Pending records are then refreshed
    /// from the gateway on a best-effort basis.
    pub async fn payment_status(
        &self,
        md_order: &str,
        user_id: &str,
    ) -> AppResult<Option<PaymentRecordResponse>> {
        let Some(record) = self.find_by_md_order(md_order).await? else {
            return Ok(None);
        };
        if record.client_id != user_id {
            return Err(AppError::Forbidden);
        }

        let record = match self.refresh(record.clone()).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                log::warn!("Could not refresh payment {md_order} from the gateway: {e}");
                record
            }
        };
        Ok(Some(record.into()))
    }

    /// Gateway dynamic callback. The callback parameters are not trusted: the
    /// order status is always re-read from the gateway.
    pub async fn handle_callback(&self, md_order: &str) -> AppResult<PaymentRecordResponse> {
        let record = self
            .find_by_md_order(md_order)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No payment record for {md_order}")))?;
        let record = self.refresh(record).await?;
        Ok(record.into())
    }

    pub async fn user_payments(
        &self,
        identity: &SessionIdentity,
        email: &str,
    ) -> AppResult<UserPaymentsResponse> {
        let session_email = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(AppError::MissingSessionData)?;
        if !session_email.eq_ignore_ascii_case(email.trim()) {
            return Err(AppError::Forbidden);
        }

        let rows = records::Entity::find()
            .filter(records::Column::Email.eq(session_email.to_lowercase()))
            .order_by_asc(records::Column::CreatedAt)
            .all(&self.pool)
            .await?;

        let counts = self.catalog_service.installment_counts().await?;
        let progress = derive_plan_progress(&rows, |plan_id| counts.get(&plan_id).copied());

        Ok(UserPaymentsResponse {
            payments: rows.into_iter().map(Into::into).collect(),
            progress,
        })
    }

    /// Progress of the caller's plan: the subscription when one exists,
    /// otherwise the projection of their ledger rows.
    pub async fn plan_progress(&self, user_id: &str) -> AppResult<Option<PlanProgress>> {
        if let Some(subscription) = subscriptions::Entity::find_by_id(user_id.to_string())
            .one(&self.pool)
            .await?
        {
            return Ok(Some(PlanProgress {
                plan_id: subscription.plan_id,
                completed: subscription.completed_installments.max(0) as u32,
                total: subscription.installments.max(0) as u32,
            }));
        }

        let rows = self.records_of(user_id).await?;
        let counts = self.catalog_service.installment_counts().await?;
        Ok(derive_plan_progress(&rows, |plan_id| counts.get(&plan_id).copied()))
    }

    pub async fn next_due(&self, user_id: &str) -> AppResult<NextDueResponse> {
        if let Some(subscription) = subscriptions::Entity::find_by_id(user_id.to_string())
            .one(&self.pool)
            .await?
        {
            return Ok(compute_next_due(
                subscription.started_at,
                subscription.completed_installments,
                subscription.installments,
                self.installment_interval,
            ));
        }

        let rows = self.records_of(user_id).await?;
        let counts = self.catalog_service.installment_counts().await?;
        let progress = derive_plan_progress(&rows, |plan_id| counts.get(&plan_id).copied())
            .ok_or_else(|| AppError::NotFound("No payment plan in progress".to_string()))?;
        let started_at = rows
            .iter()
            .find(|r| PaymentOutcome::from_status(&r.status) == PaymentOutcome::Success)
            .map(|r| r.created_at)
            .unwrap_or_else(Utc::now);

        Ok(compute_next_due(
            started_at,
            progress.completed as i32,
            progress.total as i32,
            self.installment_interval,
        ))
    }

    async fn find_by_md_order(&self, md_order: &str) -> AppResult<Option<records::Model>> {
        Ok(records::Entity::find()
            .filter(records::Column::MdOrder.eq(md_order))
            .one(&self.pool)
            .await?)
    }

    async fn records_of(&self, user_id: &str) -> AppResult<Vec<records::Model>> {
        Ok(records::Entity::find()
            .filter(records::Column::ClientId.eq(user_id))
            .order_by_asc(records::Column::CreatedAt)
            .all(&self.pool)
            .await?)
    }

    /// Pulls the gateway state of a pending record into the ledger.
    async fn refresh(&self, record: records::Model) -> AppResult<records::Model> {
        if PaymentOutcome::from_status(&record.status) != PaymentOutcome::Pending {
            return Ok(record);
        }
        let Some(md_order) = record.md_order.clone() else {
            return Ok(record);
        };

        let status = self.gateway.order_status(&md_order).await?;
        if let Some(order_number) = &status.order_number
            && order_number != &record.order_number
        {
            return Err(AppError::ExternalApiError(format!(
                "Gateway order {md_order} belongs to {order_number}, not {}",
                record.order_number
            )));
        }

        match status.state {
            GatewayOrderState::Deposited => {
                if let Some(amount) = status.amount
                    && amount != record.amount
                {
                    log::error!(
                        "Gateway order {md_order} deposited {amount} but order {} was registered for {}",
                        record.order_number,
                        record.amount
                    );
                }
                self.finalize_success(record).await
            }
            state => {
                let new_status = match state {
                    GatewayOrderState::Declined => STATUS_DECLINED,
                    other => other.as_status(),
                };
                if new_status != record.status
                    && set_status(&self.pool, &record.order_number, new_status, Utc::now()).await?
                {
                    log::info!("Payment {} is now {new_status}", record.order_number);
                }
                self.reload(&record.order_number).await
            }
        }
    }

    /// Applies a settled payment: the record, the promo reservation, room
    /// stock and plan progress change together or not at all. Repeated
    /// callbacks for the same order are no-ops.
    async fn finalize_success(&self, record: records::Model) -> AppResult<records::Model> {
        let now = Utc::now();
        let txn = self.pool.begin().await?;

        if !set_status(&txn, &record.order_number, STATUS_DEPOSITED, now).await? {
            txn.rollback().await?;
            return self.reload(&record.order_number).await;
        }

        if let Some(reservation_id) = &record.reservation_id
            && !PromoService::consume(&txn, reservation_id, now).await?
        {
            log::warn!(
                "Reservation {reservation_id} of paid order {} was no longer claimable",
                record.order_number
            );
        }

        let progress = advance_subscription(&txn, &record, now).await?;
        if progress == Advance::Started {
            RoomService::decrement_available(&txn, record.room_type_id).await?;
        }

        txn.commit().await?;

        if let Some(reservation_id) = &record.reservation_id {
            self.watchdog.cancel(reservation_id);
        }
        if progress == Advance::Started {
            self.room_service.invalidate().await;
        }

        log::info!(
            "Payment {} deposited: {} paid installment {}/{}",
            record.order_number,
            record.client_id,
            record.payment_number,
            record.installments
        );
        self.reload(&record.order_number).await
    }

    async fn reload(&self, order_number: &str) -> AppResult<records::Model> {
        records::Entity::find_by_id(order_number.to_string())
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment record {order_number} not found")))
    }
}

/// Conditional status write: only records that are not yet final move.
async fn set_status<C: ConnectionTrait>(
    db: &C,
    order_number: &str,
    status: &str,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let result = records::Entity::update_many()
        .col_expr(records::Column::Status, Expr::value(status))
        .col_expr(records::Column::UpdatedAt, Expr::value(now))
        .filter(records::Column::OrderNumber.eq(order_number))
        .filter(records::Column::Status.is_not_in(FINAL_STATUSES))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// What a settled payment did to the payer's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    /// First installment: the plan and the room are now held by the payer
    Started,
    Advanced,
    /// Settled payment that matches no open installment
    Unmatched,
}

async fn advance_subscription<C: ConnectionTrait>(
    db: &C,
    record: &records::Model,
    now: DateTime<Utc>,
) -> AppResult<Advance> {
    let existing = subscriptions::Entity::find_by_id(record.client_id.clone())
        .one(db)
        .await?;

    match existing {
        None if record.payment_number == 1 => {
            subscriptions::ActiveModel {
                user_id: Set(record.client_id.clone()),
                email: Set(record.email.clone()),
                plan_id: Set(record.plan_id),
                installments: Set(record.installments),
                room_type_id: Set(record.room_type_id),
                room_price_cents: Set(record.room_price_cents),
                discount_bp: Set(record.discount_bp),
                completed_installments: Set(1),
                started_at: Set(now),
                updated_at: Set(now),
            }
            .insert(db)
            .await?;
            Ok(Advance::Started)
        }
        None => {
            log::warn!(
                "Payment {} is installment {} but {} has no plan subscription",
                record.order_number,
                record.payment_number,
                record.client_id
            );
            Ok(Advance::Unmatched)
        }
        Some(subscription) => {
            let result = subscriptions::Entity::update_many()
                .col_expr(
                    subscriptions::Column::CompletedInstallments,
                    Expr::col(subscriptions::Column::CompletedInstallments).add(1),
                )
                .col_expr(subscriptions::Column::UpdatedAt, Expr::value(now))
                .filter(subscriptions::Column::UserId.eq(record.client_id.as_str()))
                .filter(
                    subscriptions::Column::CompletedInstallments.eq(record.payment_number - 1),
                )
                .filter(
                    subscriptions::Column::CompletedInstallments.lt(subscription.installments),
                )
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                log::warn!(
                    "Duplicate settlement: payment {} (installment {}) did not advance the plan of {}",
                    record.order_number,
                    record.payment_number,
                    record.client_id
                );
                return Ok(Advance::Unmatched);
            }
            Ok(Advance::Advanced)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(order_number: &str, plan_id: i64, status: &str) -> records::Model {
        let now = Utc::now();
        records::Model {
            order_number: order_number.to_string(),
            md_order: None,
            client_id: "user-1".to_string(),
            email: "ana@example.com".to_string(),
            full_name: "Ana".to_string(),
            plan_id,
            payment_number: 1,
            installments: 1,
            amount: 0,
            room_price_cents: 0,
            discount_bp: 0,
            status: status.to_string(),
            room_type_id: 1,
            reservation_id: None,
            promo_code: None,
            locale: "en".to_string(),
            description: String::new(),
            form_url: None,
            error_code: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_progress_from_two_successful_rows() {
        let mut second = record("b", 3, "1");
        second.payment_number = 2;
        let rows = vec![record("a", 3, "1"), second];
        let progress = derive_plan_progress(&rows, |id| (id == 3).then_some(3)).unwrap();
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.total, 3);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_progress_ignores_failed_and_pending_rows() {
        let rows = vec![
            record("a", 2, "-1"),
            record("b", 4, "DECLINED"),
            record("c", 2, "DEPOSITED"),
            record("d", 2, "0"),
        ];
        let progress = derive_plan_progress(&rows, |id| Some(id as i32)).unwrap();
        assert_eq!(progress.plan_id, 2);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.total, 2);
    }

    #[test]
    fn test_progress_counts_each_installment_once() {
        let rows = vec![record("a", 3, "DEPOSITED"), record("b", 3, "DEPOSITED")];
        let progress = derive_plan_progress(&rows, |_| Some(3)).unwrap();
        assert_eq!(progress.completed, 1);
    }

    #[test]
    fn test_progress_requires_a_successful_row() {
        assert!(derive_plan_progress(&[record("a", 1, "-1")], |_| Some(1)).is_none());
        assert!(derive_plan_progress(&[], |_| Some(1)).is_none());
    }

    #[test]
    fn test_progress_falls_back_to_record_installments() {
        let mut row = record("a", 9, "1");
        row.installments = 4;
        let progress = derive_plan_progress(&[row], |_| None).unwrap();
        assert_eq!(progress.total, 4);
    }

    #[test]
    fn test_next_due_after_first_of_three() {
        let started = Utc::now();
        let due = compute_next_due(started, 1, 3, Duration::days(30));
        assert_eq!(due.next_due_date, Some(started + Duration::days(30)));
        assert_eq!(due.installment_number, Some(2));
        assert_eq!(due.total_installments, 3);
        assert_eq!(due.remaining, 2);
    }

    #[test]
    fn test_next_due_when_paid_off() {
        let due = compute_next_due(Utc::now(), 2, 2, Duration::days(30));
        assert_eq!(due.next_due_date, None);
        assert_eq!(due.installment_number, None);
        assert_eq!(due.remaining, 0);
    }
}
