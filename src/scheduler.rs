//! Background housekeeping
//! Limiter cleanup, exchange-rate warm-up and expiry of abandoned orders.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::state::AppState;

const LIMITER_CLEANUP_EVERY: Duration = Duration::from_secs(60);
const PAYMENT_EXPIRY_EVERY: Duration = Duration::from_secs(600);

pub fn start_scheduler(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let currency_every = Duration::from_secs(state.config.currency_ttl_secs.max(1));
        info!(
            "Scheduler started (limiters {:?}, rates {:?}, orders {:?})",
            LIMITER_CLEANUP_EVERY, currency_every, PAYMENT_EXPIRY_EVERY
        );

        let mut limiters = time::interval(LIMITER_CLEANUP_EVERY);
        let mut rates = time::interval(currency_every);
        let mut orders = time::interval(PAYMENT_EXPIRY_EVERY);
        for interval in [&mut limiters, &mut rates, &mut orders] {
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }

        loop {
            tokio::select! {
                _ = limiters.tick() => cleanup_limiters(&state),
                _ = rates.tick() => {
                    let table = state.currency.refresh().await;
                    debug!("Rates warmed ({:?}, {} currencies)", table.source, table.rates.len());
                }
                _ = orders.tick() => {
                    if let Err(e) = state
                        .payments
                        .expire_stale(state.config.pending_payment_ttl_hours)
                        .await
                    {
                        warn!("Failed to expire stale orders: {}", e);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Scheduler stopped");
                        break;
                    }
                }
            }
        }
    })
}

fn cleanup_limiters(state: &AppState) {
    let removed: usize = state.limiters.all().iter().map(|l| l.cleanup()).sum();
    if removed > 0 {
        debug!("Rate limiter cleanup removed {} keys", removed);
    }
}
