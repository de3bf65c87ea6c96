//! Background tasks for the application.
//!
//! Call `spawn_all` once during startup to launch the recurring jobs.

pub mod expiration_watchdog;

pub use expiration_watchdog::ExpirationWatchdog;

use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn all background tasks.
///
/// Re-arms timers for reservations that were active before a restart, then
/// sweeps elapsed reservations every `sweep_interval` so codes come back even
/// when a timer was lost. The returned handle is the sweeper, which ends once
/// the watchdog is shut down.
pub fn spawn_all(watchdog: ExpirationWatchdog, sweep_interval: Duration) -> JoinHandle<()> {
    {
        let svc = watchdog.clone();
        tokio::spawn(async move {
            match svc.resume_active().await {
                Ok(n) if n > 0 => log::info!("Re-armed {n} promo reservation timer(s)"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to resume promo reservation timers: {e:?}"),
            }
        });
    }

    let svc = watchdog;
    let shutdown = svc.shutdown_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Promo reservation sweeper stopped");
                    return;
                }
                _ = tokio::time::sleep(sweep_interval) => {}
            }
            match svc.sweep().await {
                Ok(n) if n > 0 => log::info!("Expired promo reservations swept: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to sweep promo reservations: {e:?}"),
            }
        }
    })
}
