//! Periodic purge of finished rooms past the retention threshold.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{event, Level};

use crate::hub::Hub;
use crate::models::RoomStatus;
use crate::storage::{Repositories, Result};

/// Spawns the housekeeping loop.
pub fn spawn(
    repos: Repositories,
    hub: Arc<Hub>,
    threshold_days: i64,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);

        // The first tick of an interval is immediate; skip it so the
        // server does not sweep while it is still starting up.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match sweep(&repos, Some(&hub), threshold_days, Utc::now()).await {
                Ok(0) => {}
                Ok(purged) => {
                    event!(Level::INFO, purged, "housekeeping purged old rooms");
                }
                Err(e) => {
                    event!(Level::WARN, error = %e, "housekeeping sweep failed");
                }
            }
        }
    })
}

/// Deletes finished rooms older than `threshold_days`, cascading to their
/// players and sessions. Returns the number of purged rooms.
pub async fn sweep(
    repos: &Repositories,
    hub: Option<&Arc<Hub>>,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> Result<usize> {
    let cutoff = now - ChronoDuration::days(threshold_days);
    let mut purged = 0;

    for room in repos.rooms.find_by_status(RoomStatus::Finished).await? {
        if room.created_at >= cutoff {
            continue;
        }

        if let Some(hub) = hub {
            hub.remove_room(&room.id);
        }

        let players = repos.players.delete_by_room(&room.id).await?;
        let sessions = repos.sessions.delete_by_room(&room.id).await?;
        repos.rooms.delete(&room.id).await?;

        event!(
            Level::DEBUG,
            room_id = %room.id,
            players,
            sessions,
            "room purged"
        );

        purged += 1;
    }

    Ok(purged)
}
