//! The live session. [Session] holds the counters and knows how to update them, [tracker]
//! drives it through its lifecycle.

use chrono::{DateTime, Duration, Utc};

use super::storage::entities::SessionRecord;

pub mod tracker;

/// Elapsed minutes averaged into one hourly entry.
pub const MINUTES_PER_HOUR: usize = 60;

/// Default time without actions after which seconds are counted as inactive.
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::seconds(30);

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum Lifecycle {
    Idle,
    Running,
    Paused,
}

/// Counters of the current (or the last finished) session.
///
/// Invariant: `is_paused` implies `is_running`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub is_running: bool,
    pub is_paused: bool,
    pub session_start: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
    pub events_in_current_minute: u64,
    pub total_actions: u64,
    pub current_apm: u64,
    pub average_apm: u64,
    pub highest_apm: u64,
    /// Seconds
    pub active_time: u64,
    /// Seconds
    pub inactive_time: u64,
    /// Seconds since `session_start`
    pub total_time: u64,
    pub apm_data: Vec<u64>,
    pub apm_timestamps: Vec<DateTime<Utc>>,
    pub hourly_average_data: Vec<u64>,
    pub hourly_average_timestamps: Vec<DateTime<Utc>>,
    pub last_action_time: Option<DateTime<Utc>>,
}

impl Session {
    /// A fresh running session.
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            is_running: true,
            session_start: Some(now),
            last_action_time: Some(now),
            ..Default::default()
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match (self.is_running, self.is_paused) {
            (false, _) => Lifecycle::Idle,
            (true, false) => Lifecycle::Running,
            (true, true) => Lifecycle::Paused,
        }
    }

    pub fn is_counting(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// Counts one input event. Events outside of a running, unpaused session are dropped.
    pub fn record_action(&mut self, now: DateTime<Utc>) {
        if !self.is_counting() {
            return;
        }
        self.events_in_current_minute += 1;
        self.total_actions += 1;
        self.last_action_time = Some(now);
    }

    /// Closes the current minute window.
    pub fn close_minute(&mut self, now: DateTime<Utc>) {
        self.current_apm = self.events_in_current_minute;
        self.apm_data.push(self.current_apm);
        self.apm_timestamps.push(now);

        self.highest_apm = self.highest_apm.max(self.current_apm);

        if self.apm_data.len() % MINUTES_PER_HOUR == 0 {
            let last_hour = &self.apm_data[self.apm_data.len() - MINUTES_PER_HOUR..];
            let hour_average = last_hour.iter().sum::<u64>() / MINUTES_PER_HOUR as u64;
            self.hourly_average_data.push(hour_average);
            self.hourly_average_timestamps.push(now);
        }

        self.events_in_current_minute = 0;
    }

    /// Accounts for one elapsed second.
    pub fn tick_second(&mut self, now: DateTime<Utc>, inactivity_threshold: Duration) {
        let Some(start) = self.session_start else {
            return;
        };
        self.total_time = (now - start).num_seconds().max(0) as u64;

        if let Some(last) = self.last_action_time {
            if now - last >= inactivity_threshold {
                self.inactive_time += 1;
            } else {
                self.active_time += 1;
            }
        }

        // Same as floor(total_actions / (total_time / 60)) without going through floats.
        self.average_apm = if self.total_time > 0 {
            self.total_actions * 60 / self.total_time
        } else {
            0
        };
    }

    /// Closes the trailing partial minute when the session stops. An empty partial minute is
    /// dropped so that the minute series always sums up to `total_actions`.
    pub fn flush_partial_minute(&mut self, now: DateTime<Utc>) {
        if self.events_in_current_minute > 0 {
            self.close_minute(now);
        }
    }

    /// Freezes the session into a record. Returns [None] for a session that never started.
    pub fn to_record(&self) -> Option<SessionRecord> {
        let session_start = self.session_start?;
        Some(SessionRecord {
            session_start,
            session_end: self.session_end.unwrap_or(session_start),
            total_actions: self.total_actions,
            apm_data: self.apm_data.clone(),
            average_apm: self.average_apm,
            highest_apm: self.highest_apm,
            active_time: self.active_time,
            inactive_time: self.inactive_time,
            total_time: self.total_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{Lifecycle, Session, DEFAULT_INACTIVITY_THRESHOLD};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_minute_window_counts_and_resets() {
        let mut session = Session::started(t0());
        for i in 0..17 {
            session.record_action(t0() + Duration::seconds(i));
        }

        session.close_minute(t0() + Duration::minutes(1));

        assert_eq!(session.current_apm, 17);
        assert_eq!(session.events_in_current_minute, 0);
        assert_eq!(session.apm_data, vec![17]);
        assert_eq!(session.apm_timestamps, vec![t0() + Duration::minutes(1)]);

        session.close_minute(t0() + Duration::minutes(2));
        assert_eq!(session.current_apm, 0);
        assert_eq!(session.apm_data, vec![17, 0]);
    }

    #[test]
    fn test_highest_apm_is_running_max() {
        let mut session = Session::started(t0());
        let mut highest_seen = vec![];
        for (minute, count) in [3u64, 9, 4, 9, 12, 1].into_iter().enumerate() {
            for _ in 0..count {
                session.record_action(t0());
            }
            session.close_minute(t0() + Duration::minutes(minute as i64 + 1));
            highest_seen.push(session.highest_apm);
        }

        assert_eq!(highest_seen, vec![3, 9, 9, 9, 12, 12]);
        assert_eq!(session.highest_apm, *session.apm_data.iter().max().unwrap());
    }

    #[test]
    fn test_hourly_average_is_truncated_mean() {
        let mut session = Session::started(t0());
        for minute in 1..=60 {
            let count = if minute == 60 { 70 } else { 10 };
            for _ in 0..count {
                session.record_action(t0());
            }
            session.close_minute(t0() + Duration::minutes(minute));
            if minute < 60 {
                assert!(session.hourly_average_data.is_empty());
            }
        }

        assert_eq!(session.hourly_average_data, vec![11]);
        assert_eq!(
            session.hourly_average_timestamps,
            vec![t0() + Duration::minutes(60)]
        );
    }

    #[test]
    fn test_every_second_is_classified_once() {
        let mut session = Session::started(t0());
        for second in 1..=200 {
            let now = t0() + Duration::seconds(second);
            if second % 45 == 0 {
                session.record_action(now);
            }
            session.tick_second(now, DEFAULT_INACTIVITY_THRESHOLD);
            assert_eq!(
                session.active_time + session.inactive_time,
                session.total_time
            );
        }
        assert_eq!(session.total_time, 200);
        assert!(session.inactive_time > 0);
        assert!(session.active_time > 0);
    }

    #[test]
    fn test_inactivity_threshold_is_inclusive() {
        let mut session = Session::started(t0());
        session.tick_second(t0() + Duration::seconds(29), DEFAULT_INACTIVITY_THRESHOLD);
        assert_eq!(session.active_time, 1);
        session.tick_second(t0() + Duration::seconds(30), DEFAULT_INACTIVITY_THRESHOLD);
        assert_eq!(session.inactive_time, 1);
    }

    #[test]
    fn test_average_apm() {
        let mut session = Session::started(t0());
        session.tick_second(t0(), DEFAULT_INACTIVITY_THRESHOLD);
        assert_eq!(session.average_apm, 0);

        for _ in 0..5 {
            session.record_action(t0());
        }
        session.tick_second(t0() + Duration::seconds(90), DEFAULT_INACTIVITY_THRESHOLD);
        // 5 actions over 1.5 minutes
        assert_eq!(session.average_apm, 3);
    }

    #[test]
    fn test_paused_and_idle_sessions_ignore_actions() {
        let mut idle = Session::default();
        idle.record_action(t0());
        assert_eq!(idle.total_actions, 0);

        let mut paused = Session::started(t0());
        paused.is_paused = true;
        assert_eq!(paused.lifecycle(), Lifecycle::Paused);
        paused.record_action(t0() + Duration::seconds(1));
        assert_eq!(paused.total_actions, 0);
        assert_eq!(paused.last_action_time, Some(t0()));
    }

    #[test]
    fn test_flush_drops_empty_partial_minute() {
        let mut session = Session::started(t0());
        session.record_action(t0());
        session.close_minute(t0() + Duration::minutes(1));

        session.flush_partial_minute(t0() + Duration::seconds(80));
        assert_eq!(session.apm_data, vec![1]);

        session.record_action(t0() + Duration::seconds(81));
        session.flush_partial_minute(t0() + Duration::seconds(82));
        assert_eq!(session.apm_data, vec![1, 1]);
        assert_eq!(
            session.apm_data.iter().sum::<u64>(),
            session.total_actions
        );
    }

    #[test]
    fn test_record_of_unstarted_session() {
        assert_eq!(Session::default().to_record(), None);
    }
}
