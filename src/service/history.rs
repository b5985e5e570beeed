//! A short in-memory window of past archive records, used to fill in the daily
//! extremes and one-hour-ago values WNS asks for but a single record does not carry.

use crate::types::record::ObservationRecord;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::iter;

/// Records older than this, measured from the newest one, are dropped.
const RETENTION_SECS: i64 = 25 * 3600;
const HOUR_SECS: i64 = 3600;
/// How far from exactly one hour ago a record may be to stand in for it.
const HOUR_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Default)]
pub struct ArchiveHistory {
    // sorted by date_time, oldest first
    records: VecDeque<ObservationRecord>,
}

impl ArchiveHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remembers `record` and forgets everything older than the retention window.
    pub fn push(&mut self, record: ObservationRecord) {
        let position = self
            .records
            .partition_point(|r| r.date_time() <= record.date_time());
        self.records.insert(position, record);

        if let Some(newest) = self.records.back().map(ObservationRecord::date_time) {
            let cutoff = newest - TimeDelta::seconds(RETENTION_SECS);
            while self
                .records
                .front()
                .is_some_and(|r| r.date_time() < cutoff)
            {
                self.records.pop_front();
            }
        }
    }

    /// Returns a copy of `record` with the values it lacks filled in from the
    /// remembered records of the same unit system:
    ///
    /// * `outTempDayMin`, `outTempDayMax`, `windchillDayMin`, `UVDayMax` over the
    ///   records since UTC midnight (not for a record stamped exactly at midnight),
    /// * `outTemp1h`, `barometer1h` from the record closest to one hour ago,
    /// * `windchill1hMin` over the records since then.
    pub fn augment(&self, record: &ObservationRecord) -> ObservationRecord {
        let mut augmented = record.clone();
        let now = record.date_time();

        let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        if start_of_day < now {
            let today: Vec<_> = self.window(record, start_of_day).collect();
            fill(&mut augmented, "outTempDayMin", extreme(&today, "outTemp", f64::min));
            fill(&mut augmented, "outTempDayMax", extreme(&today, "outTemp", f64::max));
            fill(&mut augmented, "windchillDayMin", extreme(&today, "windchill", f64::min));
            fill(&mut augmented, "UVDayMax", extreme(&today, "UV", f64::max));
        }

        if let Some(hour_ago) = self.hour_ago(record) {
            fill(&mut augmented, "outTemp1h", hour_ago.get("outTemp"));
            fill(&mut augmented, "barometer1h", hour_ago.get("barometer"));
            let last_hour: Vec<_> = self.window(record, hour_ago.date_time()).collect();
            fill(
                &mut augmented,
                "windchill1hMin",
                extreme(&last_hour, "windchill", f64::min),
            );
        }

        augmented
    }

    /// Remembered records in `(start, record)`, followed by `record` itself.
    fn window<'a>(
        &'a self,
        record: &'a ObservationRecord,
        start: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a ObservationRecord> {
        let now = record.date_time();
        self.records
            .iter()
            .filter(move |r| {
                r.unit_system() == record.unit_system()
                    && r.date_time() > start
                    && r.date_time() < now
            })
            .chain(iter::once(record))
    }

    /// The earliest record in `[-60 min, -55 min]`, else the latest in `[-65 min, -60 min]`.
    fn hour_ago(&self, record: &ObservationRecord) -> Option<&ObservationRecord> {
        let now = record.date_time();
        let hour_ago = now - TimeDelta::seconds(HOUR_SECS);
        let tolerance = TimeDelta::seconds(HOUR_TOLERANCE_SECS);
        let comparable = |r: &&ObservationRecord| r.unit_system() == record.unit_system();

        self.records
            .iter()
            .filter(comparable)
            .find(|r| r.date_time() >= hour_ago && r.date_time() <= hour_ago + tolerance)
            .or_else(|| {
                self.records
                    .iter()
                    .rev()
                    .filter(comparable)
                    .find(|r| r.date_time() >= hour_ago - tolerance && r.date_time() <= hour_ago)
            })
    }
}

fn fill(record: &mut ObservationRecord, observation: &str, value: Option<f64>) {
    if record.contains(observation) {
        return;
    }
    if let Some(value) = value {
        record.insert(observation, value);
    }
}

fn extreme(
    records: &[&ObservationRecord],
    observation: &str,
    pick: fn(f64, f64) -> f64,
) -> Option<f64> {
    records
        .iter()
        .filter_map(|r| r.get(observation))
        .reduce(pick)
}
