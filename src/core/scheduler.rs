//! Flush timing and bucket attribution.
//!
//! Rows are attributed to the (day, hour) bucket the scheduler currently
//! points at. The deadline is the earlier of the flush interval elapsing and
//! the next hour boundary; the bucket only rolls forward after the flush
//! that the boundary triggers, so events that slip in between boundary and
//! flush still land in the old bucket.

use chrono::{DateTime, Duration, Local, NaiveDate, Timelike};

/// The (day, hour) pair rows are attributed to. `day` is a local calendar
/// date, `hour` the local hour number 0-23.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub day: NaiveDate,
    pub hour: u32,
}

impl Bucket {
    pub fn of(instant: DateTime<Local>) -> Self {
        Self {
            day: instant.date_naive(),
            hour: instant.hour(),
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:02}h", self.day, self.hour)
    }
}

/// Decides when the buffer is flushed and which bucket the rows go to.
#[derive(Debug)]
pub struct FlushScheduler {
    interval: Duration,
    bucket_start: DateTime<Local>,
    deadline: DateTime<Local>,
}

impl FlushScheduler {
    pub fn new(now: DateTime<Local>, interval: Duration) -> Self {
        let bucket_start = truncate_to_hour(now);
        let mut scheduler = Self {
            interval,
            bucket_start,
            deadline: now,
        };
        scheduler.reschedule(now);
        scheduler
    }

    /// The bucket current events are attributed to.
    pub fn bucket(&self) -> Bucket {
        Bucket::of(self.bucket_start)
    }

    pub fn flush_due(&self, now: DateTime<Local>) -> bool {
        now >= self.deadline
    }

    /// Called after a flush completes: rolls the bucket forward if the hour
    /// has changed, then computes the next deadline.
    pub fn note_flushed(&mut self, now: DateTime<Local>) {
        let current_hour = truncate_to_hour(now);
        if current_hour != self.bucket_start {
            self.bucket_start = current_hour;
        }
        self.reschedule(now);
    }

    fn reschedule(&mut self, now: DateTime<Local>) {
        let boundary = self.bucket_start + Duration::hours(1);
        let until_boundary = boundary - now;
        self.deadline = now + std::cmp::min(until_boundary, self.interval);
    }
}

fn truncate_to_hour(instant: DateTime<Local>) -> DateTime<Local> {
    instant
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 12, h, m, s).unwrap()
    }

    #[test]
    fn test_bucket_is_truncated_to_the_hour() {
        let scheduler = FlushScheduler::new(local(14, 37, 12), Duration::seconds(300));
        let bucket = scheduler.bucket();
        assert_eq!(bucket.hour, 14);
        assert_eq!(bucket.day, local(14, 0, 0).date_naive());
    }

    #[test]
    fn test_interval_elapse_triggers_mid_hour() {
        let now = local(14, 30, 0);
        let scheduler = FlushScheduler::new(now, Duration::seconds(300));
        assert!(!scheduler.flush_due(local(14, 34, 59)));
        assert!(scheduler.flush_due(local(14, 35, 0)));
    }

    #[test]
    fn test_hour_boundary_wins_over_interval() {
        let now = local(14, 58, 0);
        let scheduler = FlushScheduler::new(now, Duration::seconds(300));
        assert!(!scheduler.flush_due(local(14, 59, 59)));
        assert!(scheduler.flush_due(local(15, 0, 0)));
    }

    #[test]
    fn test_bucket_rolls_only_after_flush() {
        let mut scheduler = FlushScheduler::new(local(14, 58, 0), Duration::seconds(300));

        // Past the boundary but before the flush: still the old bucket.
        assert!(scheduler.flush_due(local(15, 0, 30)));
        assert_eq!(scheduler.bucket().hour, 14);

        scheduler.note_flushed(local(15, 0, 30));
        assert_eq!(scheduler.bucket().hour, 15);
        assert!(!scheduler.flush_due(local(15, 5, 29)));
        assert!(scheduler.flush_due(local(15, 5, 30)));
    }

    #[test]
    fn test_mid_hour_flush_keeps_the_bucket() {
        let mut scheduler = FlushScheduler::new(local(14, 30, 0), Duration::seconds(300));
        scheduler.note_flushed(local(14, 35, 0));
        assert_eq!(scheduler.bucket().hour, 14);
        assert!(scheduler.flush_due(local(14, 40, 0)));
    }

    #[test]
    fn test_bucket_display() {
        let bucket = Bucket::of(local(9, 15, 0));
        assert_eq!(format!("{bucket}"), format!("{} 09h", bucket.day));
    }
}
