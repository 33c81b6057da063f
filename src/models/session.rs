use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TrackPoint;
use crate::sources::LocationFix;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "Running",
            SessionStatus::Paused => "Paused",
            SessionStatus::Completed => "Completed",
        }
    }
}

/// Where the rider is headed, if they told us.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One ride from creation to completion.
///
/// All mutators take an explicit timestamp so the arithmetic stays
/// deterministic under test. Elapsed time accrues incrementally: each
/// transition out of `Running` folds the open interval since
/// `last_resumed_at` into `elapsed_ms` and advances `last_resumed_at`,
/// so no interval is ever counted twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub destination: Option<Destination>,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub started_at: DateTime<Utc>,
    pub last_resumed_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub traveled_km: f64,
    pub average_speed_kmh: f64,
    pub top_speed_kmh: f64,
    pub status: SessionStatus,
    pub pending_segment_break: bool,
    pub track_points: Vec<TrackPoint>,
}

impl Session {
    /// Opens a new running session anchored at the first fix. The fix itself
    /// becomes the first track point and starts the first segment.
    pub fn begin(
        id: String,
        destination: Option<Destination>,
        fix: &LocationFix,
        now: DateTime<Utc>,
    ) -> Self {
        let mut session = Self {
            id,
            destination,
            start_latitude: fix.latitude,
            start_longitude: fix.longitude,
            started_at: now,
            last_resumed_at: now,
            ended_at: None,
            elapsed_ms: 0,
            traveled_km: 0.0,
            average_speed_kmh: 0.0,
            top_speed_kmh: 0.0,
            status: SessionStatus::Running,
            pending_segment_break: false,
            track_points: Vec::new(),
        };
        session.record_segment_start(fix);
        session
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, SessionStatus::Running | SessionStatus::Paused)
    }

    pub fn last_point(&self) -> Option<&TrackPoint> {
        self.track_points.last()
    }

    /// Elapsed riding time as of `now`, including the currently open
    /// interval when the session is running.
    pub fn elapsed_now(&self, now: DateTime<Utc>) -> u64 {
        match self.status {
            SessionStatus::Running => {
                self.elapsed_ms + Self::interval_ms(self.last_resumed_at, now)
            }
            _ => self.elapsed_ms,
        }
    }

    pub fn apply_pause(&mut self, now: DateTime<Utc>) {
        self.accrue_elapsed(now);
        self.update_average(self.elapsed_ms);
        self.status = SessionStatus::Paused;
    }

    pub fn apply_resume(&mut self, now: DateTime<Utc>) {
        self.last_resumed_at = now;
        self.status = SessionStatus::Running;
    }

    /// Completes the session. The final average is folded into the top speed
    /// so a steady ride never reports a top below its own average.
    pub fn apply_stop(&mut self, now: DateTime<Utc>) {
        if self.status == SessionStatus::Running {
            self.accrue_elapsed(now);
        }
        self.ended_at = Some(now);
        self.update_average(self.elapsed_ms);
        self.top_speed_kmh = self.top_speed_kmh.max(self.average_speed_kmh);
        self.status = SessionStatus::Completed;
    }

    /// Recovers a session that stayed running across a process restart: the
    /// resume clock is reanchored to `now` so the downtime is not counted as
    /// ride time, and the next accepted fix opens a new segment instead of
    /// bridging the gap. Accrued aggregates are left alone.
    pub fn apply_restart_recovery(&mut self, now: DateTime<Utc>) {
        self.last_resumed_at = now;
        self.pending_segment_break = true;
    }

    /// Folds an accepted fix into the session: appends the point, adds the
    /// leg distance, derives the instantaneous speed from the time since the
    /// previous point, and advances the elapsed clock and running average
    /// through the fix's timestamp.
    pub fn record_point(&mut self, fix: &LocationFix, distance_km: f64) {
        let delta_ms = self
            .last_point()
            .map(|p| Self::interval_ms(p.recorded_at, fix.recorded_at))
            .unwrap_or(0);
        let speed_kmh = if delta_ms > 0 {
            distance_km / delta_ms as f64 * 3_600_000.0
        } else {
            0.0
        };
        self.traveled_km += distance_km;
        if speed_kmh > self.top_speed_kmh {
            self.top_speed_kmh = speed_kmh;
        }
        self.track_points.push(TrackPoint::from_fix(fix, speed_kmh, false));
        self.accrue_through(fix.recorded_at);
        self.update_average(self.elapsed_ms);
    }

    /// Appends a fix as the opening point of a new segment. No distance is
    /// attributed to the gap it bridges and its speed is zero.
    pub fn record_segment_start(&mut self, fix: &LocationFix) {
        self.track_points.push(TrackPoint::from_fix(fix, 0.0, true));
        self.pending_segment_break = false;
        self.accrue_through(fix.recorded_at);
        self.update_average(self.elapsed_ms);
    }

    fn accrue_elapsed(&mut self, now: DateTime<Utc>) {
        self.elapsed_ms += Self::interval_ms(self.last_resumed_at, now);
        self.last_resumed_at = now;
    }

    /// Advances the elapsed counter through `at` unless the timestamp is out
    /// of order, so the resume clock never moves backwards.
    fn accrue_through(&mut self, at: DateTime<Utc>) {
        if at > self.last_resumed_at {
            self.accrue_elapsed(at);
        }
    }

    fn update_average(&mut self, elapsed_ms: u64) {
        self.average_speed_kmh = if elapsed_ms > 0 {
            self.traveled_km / elapsed_ms as f64 * 3_600_000.0
        } else {
            0.0
        };
    }

    fn interval_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
        (to - from).num_milliseconds().max(0) as u64
    }
}

/// Scalar view of a session for history listings, without the track points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub destination: Option<Destination>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub traveled_km: f64,
    pub average_speed_kmh: f64,
    pub top_speed_kmh: f64,
    pub status: SessionStatus,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            destination: session.destination.clone(),
            started_at: session.started_at,
            ended_at: session.ended_at,
            elapsed_ms: session.elapsed_ms,
            traveled_km: session.traveled_km,
            average_speed_kmh: session.average_speed_kmh,
            top_speed_kmh: session.top_speed_kmh,
            status: session.status,
        }
    }
}
