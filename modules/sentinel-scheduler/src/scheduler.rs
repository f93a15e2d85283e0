use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::dispatcher::{Dispatcher, Job};

/// Recurring timed dispatcher, per §4.6: three jobs at fixed UTC cadences.
/// On restart the schedule resumes at the next matching minute boundary —
/// it does not try to catch up on missed ticks.
pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    feed_adapter_names: Vec<String>,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, feed_adapter_names: Vec<String>) -> Self {
        Self {
            dispatcher,
            feed_adapter_names,
        }
    }

    /// Run the three recurring jobs concurrently until cancelled.
    pub async fn run(&self) {
        let feed_job = self.run_recurring(15, {
            let dispatcher = self.dispatcher.clone();
            let feeds = self.feed_adapter_names.clone();
            move || {
                for name in &feeds {
                    dispatcher.enqueue(Job::FetchAdapter(name.clone()));
                }
            }
        });

        let gdelt_job = self.run_recurring(15, {
            let dispatcher = self.dispatcher.clone();
            move || dispatcher.enqueue(Job::FetchAdapter("gdelt".to_string()))
        });

        let sweep_job = self.run_recurring(5, {
            let dispatcher = self.dispatcher.clone();
            move || dispatcher.enqueue(Job::ProcessingSweep)
        });

        tokio::join!(feed_job, gdelt_job, sweep_job);
    }

    async fn run_recurring<F: Fn() + Send + 'static>(&self, interval_minutes: i64, tick: F) {
        loop {
            let now = Utc::now();
            let target = next_boundary(now, interval_minutes);
            let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
            info!(interval_minutes, wait_secs = wait.as_secs(), "scheduler sleeping until next boundary");
            tokio::time::sleep_until(Instant::now() + wait).await;
            tick();
        }
    }
}

/// The next UTC instant whose minute-of-hour is a multiple of
/// `interval_minutes` (and seconds/subseconds are zero), strictly after `now`.
pub fn next_boundary(now: DateTime<Utc>, interval_minutes: i64) -> DateTime<Utc> {
    let minute = now.minute() as i64;
    let next_slot = ((minute / interval_minutes) + 1) * interval_minutes;
    let hours_to_add = next_slot / 60;
    let minute_in_hour = next_slot % 60;

    let base = now
        .with_minute(0)
        .unwrap()
        .with_second(0)
        .unwrap()
        .with_nanosecond(0)
        .unwrap();
    base + ChronoDuration::hours(hours_to_add) + ChronoDuration::minutes(minute_in_hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_boundary_rounds_up_to_15_minute_slot() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 7, 30).unwrap();
        let next = next_boundary(now, 15);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 10, 15, 0).unwrap());
    }

    #[test]
    fn next_boundary_crosses_hour_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 50, 0).unwrap();
        let next = next_boundary(now, 15);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn next_boundary_5_minute_cadence() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 3, 1).unwrap();
        let next = next_boundary(now, 5);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 1, 10, 5, 0).unwrap());
    }
}
