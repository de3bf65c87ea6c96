use crate::database::is_unique_violation;
use crate::entities::{
    ReservationState, promo_code_entity as promos, promo_reservation_entity as reservations,
};
use crate::error::{AppError, AppResult, PromoRejection};
use crate::models::{PromoResponse, ReservationStatusResponse, ReservePromoResponse};
use crate::tasks::ExpirationWatchdog;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct PromoService {
    pool: DatabaseConnection,
    reservation_ttl: Duration,
    watchdog: ExpirationWatchdog,
}

impl PromoService {
    pub fn new(
        pool: DatabaseConnection,
        reservation_ttl: Duration,
        watchdog: ExpirationWatchdog,
    ) -> Self {
        Self {
            pool,
            reservation_ttl,
            watchdog,
        }
    }

    pub async fn validate(&self, code: &str, room_type_id: Option<i64>) -> AppResult<PromoResponse> {
        let promo = Self::validate_at(&self.pool, code, room_type_id, Utc::now()).await?;
        Ok(promo.into())
    }

    /// Reserves a promo code for one attendee.
    ///
    /// Runs in a single transaction:
    /// 1. validate the code against the room type
    /// 2. refuse codes that were already redeemed by a paid order
    /// 3. expire elapsed holders of the code
    /// 4. release the caller's own active reservations (reapplying always issues a new one)
    /// 5. insert the new claim; the unique `active_code` index turns a concurrent
    ///    claim on the same code into `ReservationConflict`
    pub async fn reserve(
        &self,
        code: &str,
        user_id: &str,
        room_type_id: i64,
    ) -> AppResult<ReservePromoResponse> {
        if user_id.trim().is_empty() {
            return Err(AppError::MissingSessionData);
        }

        let now = Utc::now();
        let txn = self.pool.begin().await?;

        let promo = Self::validate_at(&txn, code, Some(room_type_id), now).await?;

        let redeemed = reservations::Entity::find()
            .filter(reservations::Column::Code.eq(promo.code.as_str()))
            .filter(reservations::Column::State.eq(ReservationState::Consumed))
            .count(&txn)
            .await?;
        if redeemed > 0 {
            return Err(AppError::ReservationConflict(format!(
                "Promo code {} has already been redeemed",
                promo.code
            )));
        }

        let expired = expire_where(
            &txn,
            Condition::all()
                .add(reservations::Column::Code.eq(promo.code.as_str()))
                .add(reservations::Column::ExpiresAt.lte(now)),
            ReservationState::Expired,
            now,
        )
        .await?;
        if expired > 0 {
            log::info!("Expired {expired} stale reservation(s) of promo code {}", promo.code);
        }

        let released: Vec<String> = reservations::Entity::find()
            .select_only()
            .column(reservations::Column::Id)
            .filter(reservations::Column::UserId.eq(user_id))
            .filter(reservations::Column::State.eq(ReservationState::Active))
            .into_tuple()
            .all(&txn)
            .await?;
        if !released.is_empty() {
            expire_where(
                &txn,
                Condition::all().add(reservations::Column::Id.is_in(released.clone())),
                ReservationState::Released,
                now,
            )
            .await?;
        }

        let reservation = reservations::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            code: Set(promo.code.clone()),
            user_id: Set(user_id.to_string()),
            room_type_id: Set(room_type_id),
            discount_bp: Set(promo.discount_bp),
            state: Set(ReservationState::Active),
            active_code: Set(Some(promo.code.clone())),
            expires_at: Set(now + self.reservation_ttl),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::ReservationConflict(format!(
                    "Promo code {} is reserved by another attendee",
                    promo.code
                ))
            } else {
                AppError::DatabaseError(e)
            }
        })?;

        txn.commit().await?;

        for id in &released {
            self.watchdog.cancel(id);
        }
        self.watchdog
            .watch(reservation.id.clone(), reservation.expires_at);

        log::info!(
            "Promo code {} reserved by {user_id} until {} ({})",
            reservation.code,
            reservation.expires_at,
            reservation.id
        );
        Ok(reservation.into())
    }

    pub async fn reservation_status(
        &self,
        reservation_id: &str,
        user_id: &str,
    ) -> AppResult<ReservationStatusResponse> {
        let now = Utc::now();
        let mut reservation = Self::find_owned(&self.pool, reservation_id, user_id).await?;

        if reservation.state == ReservationState::Active
            && reservation.is_elapsed_at(now)
            && Self::expire_if_elapsed(&self.pool, reservation_id, now).await?
        {
            self.watchdog.cancel(reservation_id);
            reservation.state = ReservationState::Expired;
        }

        Ok(ReservationStatusResponse::from_model(reservation, now))
    }

    /// Gives the code back before the reservation runs out.
    pub async fn release(&self, reservation_id: &str, user_id: &str) -> AppResult<bool> {
        let now = Utc::now();
        Self::find_owned(&self.pool, reservation_id, user_id).await?;

        let released = expire_where(
            &self.pool,
            Condition::all().add(reservations::Column::Id.eq(reservation_id)),
            ReservationState::Released,
            now,
        )
        .await?;
        self.watchdog.cancel(reservation_id);

        if released > 0 {
            log::info!("Promo reservation {reservation_id} released by {user_id}");
        }
        Ok(released > 0)
    }

    /// Purchase-time check of a reservation.
    ///
    /// Fails with `ExpiredReservation` as soon as `expires_at` has passed, even
    /// if no timer has fired yet.
    pub async fn require_active<C: ConnectionTrait>(
        db: &C,
        reservation_id: &str,
        user_id: &str,
        room_type_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<reservations::Model> {
        let reservation = Self::find_owned(db, reservation_id, user_id).await?;

        match reservation.state {
            ReservationState::Active => {}
            ReservationState::Consumed => {
                return Err(AppError::ReservationConflict(
                    "Promo reservation was already used".to_string(),
                ));
            }
            ReservationState::Expired | ReservationState::Released => {
                return Err(AppError::ExpiredReservation);
            }
        }

        if reservation.is_elapsed_at(now) {
            Self::expire_if_elapsed(db, reservation_id, now).await?;
            return Err(AppError::ExpiredReservation);
        }

        if reservation.room_type_id != room_type_id {
            return Err(AppError::ValidationError(
                "Promo reservation was made for another room type".to_string(),
            ));
        }

        Ok(reservation)
    }

    /// Marks a reservation as redeemed by a paid order. A reservation that ran
    /// out while the payer was on the gateway page is still consumed: the
    /// payment already happened.
    pub async fn consume<C: ConnectionTrait>(
        db: &C,
        reservation_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = reservations::Entity::update_many()
            .col_expr(
                reservations::Column::State,
                Expr::value(ReservationState::Consumed.to_value()),
            )
            .col_expr(
                reservations::Column::ActiveCode,
                Expr::value(Option::<String>::None),
            )
            .col_expr(reservations::Column::UpdatedAt, Expr::value(now))
            .filter(reservations::Column::Id.eq(reservation_id))
            .filter(
                reservations::Column::State
                    .is_in([ReservationState::Active, ReservationState::Expired]),
            )
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn expire_if_elapsed<C: ConnectionTrait>(
        db: &C,
        reservation_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let expired = expire_where(
            db,
            Condition::all()
                .add(reservations::Column::Id.eq(reservation_id))
                .add(reservations::Column::ExpiresAt.lte(now)),
            ReservationState::Expired,
            now,
        )
        .await?;
        Ok(expired > 0)
    }

    pub async fn expire_stale<C: ConnectionTrait>(db: &C, now: DateTime<Utc>) -> AppResult<u64> {
        expire_where(
            db,
            Condition::all().add(reservations::Column::ExpiresAt.lte(now)),
            ReservationState::Expired,
            now,
        )
        .await
    }

    pub async fn active_reservations<C: ConnectionTrait>(
        db: &C,
    ) -> AppResult<Vec<reservations::Model>> {
        Ok(reservations::Entity::find()
            .filter(reservations::Column::State.eq(ReservationState::Active))
            .order_by_asc(reservations::Column::ExpiresAt)
            .all(db)
            .await?)
    }

    async fn validate_at<C: ConnectionTrait>(
        db: &C,
        code: &str,
        room_type_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<promos::Model> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::ValidationError("Promo code is required".to_string()));
        }

        let promo = promos::Entity::find_by_id(code.to_string())
            .one(db)
            .await?
            .ok_or(AppError::PromoRejected(PromoRejection::NotFound))?;

        if promo.active_from > now {
            return Err(AppError::PromoRejected(PromoRejection::NotYetActive));
        }
        if promo.discount_bp <= 0 {
            return Err(AppError::PromoRejected(PromoRejection::ZeroDiscount));
        }
        if let Some(room_type_id) = room_type_id
            && !promo.applies_to(room_type_id)
        {
            return Err(AppError::PromoRejected(PromoRejection::RoomTypeMismatch));
        }

        Ok(promo)
    }

    async fn find_owned<C: ConnectionTrait>(
        db: &C,
        reservation_id: &str,
        user_id: &str,
    ) -> AppResult<reservations::Model> {
        let reservation = reservations::Entity::find_by_id(reservation_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("Promo reservation not found".to_string()))?;

        if reservation.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        Ok(reservation)
    }
}

/// Moves active reservations matching `condition` to `state` and clears their
/// claim on the code.
async fn expire_where<C: ConnectionTrait>(
    db: &C,
    condition: Condition,
    state: ReservationState,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let result = reservations::Entity::update_many()
        .col_expr(reservations::Column::State, Expr::value(state.to_value()))
        .col_expr(
            reservations::Column::ActiveCode,
            Expr::value(Option::<String>::None),
        )
        .col_expr(reservations::Column::UpdatedAt, Expr::value(now))
        .filter(reservations::Column::State.eq(ReservationState::Active))
        .filter(condition)
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
