use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_RECENT_DAYS: u32 = 14;
const STREAK_SCAN_DAYS: i64 = 365;

/// Number of items studied per calendar day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyHistory {
    days: BTreeMap<NaiveDate, u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub label: String,
    pub count: u32,
}

impl StudyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, date: NaiveDate, count: u32) {
        let entry = self.days.entry(date).or_default();
        *entry = entry.saturating_add(count);
    }

    pub fn count_on(&self, date: NaiveDate) -> u32 {
        self.days.get(&date).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &u32)> {
        self.days.iter()
    }

    /// Oldest first, ending on `today`.
    pub fn recent_days(&self, today: NaiveDate, days: u32) -> Vec<DayCount> {
        (0..i64::from(days))
            .rev()
            .map(|back| {
                let date = today - Duration::days(back);
                DayCount {
                    date,
                    label: format!("{}/{}", date.month(), date.day()),
                    count: self.count_on(date),
                }
            })
            .collect()
    }

    /// Consecutive study days ending today, or yesterday if nothing has
    /// been studied yet today.
    pub fn streak_days(&self, today: NaiveDate) -> u32 {
        let mut streak = 0;
        for back in 0..STREAK_SCAN_DAYS {
            let date = today - Duration::days(back);
            if self.count_on(date) > 0 {
                streak += 1;
            } else if back == 0 {
                continue;
            } else {
                break;
            }
        }
        streak
    }

    pub fn total_study_days(&self) -> usize {
        self.days.values().filter(|c| **c > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn record_accumulates() {
        let mut h = StudyHistory::new();
        h.record(d(2024, 5, 1), 3);
        h.record(d(2024, 5, 1), 4);
        assert_eq!(h.count_on(d(2024, 5, 1)), 7);
        assert_eq!(h.count_on(d(2024, 5, 2)), 0);
    }

    #[test]
    fn streak_skips_empty_today() {
        let mut h = StudyHistory::new();
        h.record(d(2024, 5, 8), 1);
        h.record(d(2024, 5, 9), 2);
        assert_eq!(h.streak_days(d(2024, 5, 10)), 2);
        h.record(d(2024, 5, 10), 1);
        assert_eq!(h.streak_days(d(2024, 5, 10)), 3);
    }

    #[test]
    fn streak_breaks_on_gap() {
        let mut h = StudyHistory::new();
        h.record(d(2024, 5, 6), 1);
        h.record(d(2024, 5, 8), 1);
        assert_eq!(h.streak_days(d(2024, 5, 8)), 1);
    }

    #[test]
    fn recent_days_oldest_first() {
        let mut h = StudyHistory::new();
        h.record(d(2024, 3, 1), 5);
        let v = h.recent_days(d(2024, 3, 2), 3);
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].date, d(2024, 2, 29));
        assert_eq!(v[1].label, "3/1");
        assert_eq!(v[1].count, 5);
        assert_eq!(v[2].count, 0);
    }

    #[test]
    fn serializes_as_date_keyed_object() {
        let mut h = StudyHistory::new();
        h.record(d(2024, 1, 2), 9);
        h.record(d(2024, 1, 3), 0);
        assert_eq!(
            serde_json::to_string(&h).unwrap(),
            r#"{"2024-01-02":9,"2024-01-03":0}"#
        );
        assert_eq!(h.total_study_days(), 1);
    }
}
