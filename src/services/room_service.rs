use crate::entities::room_type_entity as rooms;
use crate::error::{AppError, AppResult};
use crate::models::RoomAvailability;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct AvailabilitySnapshot {
    fetched_at: Instant,
    rooms: Vec<RoomAvailability>,
}

/// Room inventory reads.
///
/// Listing goes through a short-lived snapshot; every check that guards a
/// state change reads the table directly. Rooms are not held between
/// selection and payment, so two buyers may race for the last unit; the loser
/// is detected (and logged) when the decrement finds no stock.
#[derive(Clone)]
pub struct RoomService {
    pool: DatabaseConnection,
    cache: Arc<RwLock<Option<AvailabilitySnapshot>>>,
    cache_ttl: Duration,
}

impl RoomService {
    pub fn new(pool: DatabaseConnection, cache_ttl: Duration) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    pub async fn get_availability(&self) -> AppResult<Vec<RoomAvailability>> {
        {
            let cache = self.cache.read().await;
            if let Some(snapshot) = cache.as_ref()
                && snapshot.fetched_at.elapsed() < self.cache_ttl
            {
                return Ok(snapshot.rooms.clone());
            }
        }

        let list: Vec<RoomAvailability> = rooms::Entity::find()
            .order_by_asc(rooms::Column::Id)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        *self.cache.write().await = Some(AvailabilitySnapshot {
            fetched_at: Instant::now(),
            rooms: list.clone(),
        });
        Ok(list)
    }

    pub async fn room(&self, room_type_id: i64) -> AppResult<rooms::Model> {
        rooms::Entity::find_by_id(room_type_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Room type {room_type_id} not found")))
    }

    /// Fresh read of a room that is about to be bought.
    pub async fn selectable_room(&self, room_type_id: i64) -> AppResult<rooms::Model> {
        let room = self.room(room_type_id).await?;
        if !room.is_available() {
            return Err(AppError::RoomUnavailable(room_type_id));
        }
        Ok(room)
    }

    /// Takes one unit of stock. Returns `false` when the room was already sold out.
    pub async fn decrement_available<C: ConnectionTrait>(
        db: &C,
        room_type_id: i64,
    ) -> AppResult<bool> {
        let result = rooms::Entity::update_many()
            .col_expr(
                rooms::Column::Available,
                Expr::col(rooms::Column::Available).sub(1),
            )
            .col_expr(rooms::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(rooms::Column::Id.eq(room_type_id))
            .filter(rooms::Column::Available.gt(0))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            log::error!("Room type {room_type_id} sold out before a paid order could take it");
            return Ok(false);
        }
        Ok(true)
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}
