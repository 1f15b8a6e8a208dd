use chrono::{DateTime, Utc};

/// Scheduled high-impact events with a symmetric blackout around each.
#[derive(Debug, Clone, Default)]
pub struct MacroCalendar {
    events: Vec<DateTime<Utc>>,
    half_width_ms: i64,
}

impl MacroCalendar {
    /// `window_hours` is the distance on either side of each event, so an
    /// entry exactly `window_hours` before or after an event is still blocked.
    pub fn new(events: Vec<DateTime<Utc>>, window_hours: f64) -> Self {
        let half_width_ms = (window_hours.max(0.0) * 3_600_000.0).round() as i64;
        Self { events, half_width_ms }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The first configured event whose window covers `now`.
    pub fn active_event(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.events
            .iter()
            .copied()
            .find(|event| (now - *event).num_milliseconds().abs() <= self.half_width_ms)
    }
}
