// Background task scheduler for the booking engine
// Correctness never depends on these tasks: expired holds are already inert
// through lazy expiry. The sweeper only bounds hold-table growth.

use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{info, warn};

use crate::app::AppState;
use crate::app_config::CONFIG;

/// Holds are kept this long past expiry before the sweeper removes them,
/// which keeps very recent races observable in the table.
const SWEEP_GRACE_MINUTES: i64 = 60;

/// Background task manager for booking services
pub struct BackgroundTaskManager {
    state: AppState,
}

impl BackgroundTaskManager {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Start all background tasks
    pub async fn start_all_tasks(&self) {
        let Some(interval_secs) = CONFIG.booking.hold_sweep_interval_secs else {
            info!("Expired-hold sweeper disabled");
            return;
        };

        info!(
            "Starting expired-hold sweeper (every {}s)",
            interval_secs
        );

        let state = self.state.clone();
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = sweep_expired_holds(&state).await {
                    warn!("Expired-hold sweep failed: {}", e);
                }
            }
        });
    }
}

/// Delete holds that expired more than the grace period ago.
async fn sweep_expired_holds(state: &AppState) -> Result<(), String> {
    use crate::schema::booking_holds::dsl;

    let mut conn = state.diesel_pool.get().await.map_err(|e| e.to_string())?;
    let cutoff = Utc::now() - Duration::minutes(SWEEP_GRACE_MINUTES);

    let removed = diesel::delete(dsl::booking_holds.filter(dsl::expires_at.lt(cutoff)))
        .execute(&mut conn)
        .await
        .map_err(|e| e.to_string())?;

    if removed > 0 {
        info!("Swept {} expired hold(s)", removed);
    }
    Ok(())
}

/// Initialize background tasks (call this in main.rs)
pub async fn initialize_background_tasks(state: AppState) {
    let task_manager = BackgroundTaskManager::new(state);
    task_manager.start_all_tasks().await;
}
