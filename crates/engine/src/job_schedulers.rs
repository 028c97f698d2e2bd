use crate::Application;
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

/// Seconds until `secs_before_min` seconds before the next minute boundary
pub fn get_start_delay(now_ts: usize, secs_before_min: usize) -> usize {
    let secs_to_next_minute = 60 - (now_ts / 1000) % 60;
    if secs_to_next_minute > secs_before_min {
        secs_to_next_minute - secs_before_min
    } else {
        secs_to_next_minute + (60 - secs_before_min)
    }
}

/// Triggers a dispatch pass every `dispatch_interval`, starting at the next
/// minute boundary. Every pass runs in its own task so that a slow pass
/// cannot delay the trigger, overlap is handled by the pass lock.
pub fn start_dispatch_job(app: Application) {
    tokio::spawn(async move {
        let now = app.context().sys.get_timestamp_millis();
        let secs_to_next_run = get_start_delay(now as usize, 0);
        sleep_until(Instant::now() + Duration::from_secs(secs_to_next_run as u64)).await;

        let mut dispatch_interval = interval(app.context().config.dispatch_interval);
        dispatch_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            dispatch_interval.tick().await;
            let app = app.clone();
            tokio::spawn(async move {
                let _ = app.run_dispatch_pass().await;
            });
        }
    });
}

pub fn start_recurrence_job(app: Application) {
    tokio::spawn(async move {
        let mut recurrence_interval = interval(app.context().config.recurrence_interval);
        recurrence_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            recurrence_interval.tick().await;
            let app = app.clone();
            tokio::spawn(async move {
                let _ = app.run_recurrence_pass().await;
            });
        }
    });
}
