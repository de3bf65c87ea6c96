//! Per-reservation expiry timers.
//!
//! Each armed reservation gets a task that wakes at least every `interval` and
//! at `expires_at`, whichever comes first. When the reservation has elapsed it
//! is marked expired, which frees the promo code for the next attendee. The
//! timers only drive the visible countdown and early release of the code;
//! purchases re-check expiry in the database themselves.

use crate::entities::{ReservationState, promo_reservation_entity as reservations};
use crate::error::AppResult;
use crate::services::PromoService;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Armed {
    generation: u64,
    token: CancellationToken,
}

struct Inner {
    pool: DatabaseConnection,
    interval: Duration,
    armed: Mutex<HashMap<String, Armed>>,
    next_generation: AtomicU64,
    shutdown: CancellationToken,
}

impl Inner {
    fn armed(&self) -> MutexGuard<'_, HashMap<String, Armed>> {
        self.armed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn disarm(&self, reservation_id: &str, generation: u64) {
        let mut armed = self.armed();
        if armed
            .get(reservation_id)
            .is_some_and(|entry| entry.generation == generation)
        {
            armed.remove(reservation_id);
        }
    }
}

#[derive(Clone)]
pub struct ExpirationWatchdog {
    inner: Arc<Inner>,
}

impl ExpirationWatchdog {
    pub fn new(pool: DatabaseConnection, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                interval,
                armed: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Arms (or re-arms) the timer of a reservation.
    pub fn watch(&self, reservation_id: String, expires_at: DateTime<Utc>) {
        let token = self.inner.shutdown.child_token();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = self.inner.armed().insert(
            reservation_id.clone(),
            Armed {
                generation,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            if wait_for_expiry(&inner, &reservation_id, expires_at, &token).await {
                match PromoService::expire_if_elapsed(&inner.pool, &reservation_id, Utc::now())
                    .await
                {
                    Ok(true) => log::info!(
                        "Promo reservation {reservation_id} expired, its code is available again"
                    ),
                    Ok(false) => {}
                    Err(e) => {
                        log::error!("Failed to expire promo reservation {reservation_id}: {e:?}")
                    }
                }
            }
            inner.disarm(&reservation_id, generation);
        });
    }

    /// Stops the timer of a reservation that was consumed or released.
    pub fn cancel(&self, reservation_id: &str) {
        if let Some(entry) = self.inner.armed().remove(reservation_id) {
            entry.token.cancel();
        }
    }

    pub fn is_armed(&self, reservation_id: &str) -> bool {
        self.inner.armed().contains_key(reservation_id)
    }

    pub fn armed_count(&self) -> usize {
        self.inner.armed().len()
    }

    /// Expires every elapsed reservation, armed or not.
    pub async fn sweep(&self) -> AppResult<u64> {
        PromoService::expire_stale(&self.inner.pool, Utc::now()).await
    }

    /// Re-arms timers for reservations still active at startup.
    pub async fn resume_active(&self) -> AppResult<usize> {
        let active = PromoService::active_reservations(&self.inner.pool).await?;
        let count = active.len();
        for reservation in active {
            self.watch(reservation.id, reservation.expires_at);
        }
        Ok(count)
    }

    /// Token cancelled by [`ExpirationWatchdog::shutdown`], for loops that
    /// live as long as the watchdog.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }

    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.armed().clear();
    }
}

/// Sleeps until the reservation elapses. Returns `false` when the timer was
/// cancelled or the reservation left the active state on its own.
async fn wait_for_expiry(
    inner: &Inner,
    reservation_id: &str,
    expires_at: DateTime<Utc>,
    token: &CancellationToken,
) -> bool {
    loop {
        let until_expiry = (expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        if until_expiry.is_zero() {
            return true;
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => return false,
            _ = tokio::time::sleep(until_expiry.min(inner.interval)) => {}
        }

        match reservations::Entity::find_by_id(reservation_id.to_string())
            .one(&inner.pool)
            .await
        {
            Ok(Some(reservation)) if reservation.state == ReservationState::Active => {}
            Ok(_) => return false,
            Err(e) => log::warn!("Watchdog re-check of {reservation_id} failed: {e:?}"),
        }
    }
}
