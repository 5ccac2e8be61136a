//! Periodic work that runs beside the gateway connection.

use super::Moderator;
use crate::platform::Platform;

use chrono::Utc;
use log::{info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

const SCHEDULER_TICK: Duration = Duration::from_secs(1);
const CACHE_SWEEP: Duration = Duration::from_secs(60);
const RETENTION_SWEEP: Duration = Duration::from_secs(60 * 60);

/// Starts the scheduler driver and both sweeps. Each due task runs on its own
/// tokio task so a slow lookup doesn't hold up the rest of the queue.
pub fn spawn_background_tasks<P>(moderator: Arc<Moderator<P>>) -> Vec<JoinHandle<()>>
where
    P: Platform + 'static,
{
    let scheduler = {
        let moderator = Arc::clone(&moderator);
        tokio::spawn(async move {
            let mut tick = interval(SCHEDULER_TICK);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                for task in moderator.scheduler().drain_due(Utc::now()) {
                    let moderator = Arc::clone(&moderator);
                    tokio::spawn(async move {
                        let id = task.id;
                        if let Err(why) = moderator.run_task(task).await {
                            warn!("scheduled task {id} failed: {why}");
                        }
                    });
                }
            }
        })
    };

    let caches = {
        let moderator = Arc::clone(&moderator);
        tokio::spawn(async move {
            let mut tick = interval(CACHE_SWEEP);
            loop {
                tick.tick().await;
                let evicted = moderator.sweep_caches(Utc::now());
                if evicted > 0 {
                    trace!("evicted {evicted} cache entries");
                }
            }
        })
    };

    let retention = tokio::spawn(async move {
        let mut tick = interval(RETENTION_SWEEP);
        loop {
            tick.tick().await;
            match moderator.sweep_retention(Utc::now()).await {
                Ok(0) => (),
                Ok(removed) => info!("retention sweep removed {removed} links"),
                Err(why) => warn!("retention sweep failed: {why}"),
            }
        }
    });

    vec![scheduler, caches, retention]
}
