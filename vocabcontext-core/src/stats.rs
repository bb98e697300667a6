use crate::ReviewStates;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TodayStats {
    pub due_count: u32,
    pub reviewed_count: u32,
    pub correct_count: u32,
    pub incorrect_count: u32,
    /// Whole percent, 0 when nothing was answered.
    pub accuracy: u32,
}

/// Due items right now plus tallies for items last answered since
/// `day_start`.
pub fn today_review_stats(
    states: &ReviewStates,
    now: DateTime<Utc>,
    day_start: DateTime<Utc>,
) -> TodayStats {
    let mut out = TodayStats::default();
    let (mut correct, mut incorrect) = (0u64, 0u64);
    for s in states.values() {
        if s.next_review <= now {
            out.due_count = out.due_count.saturating_add(1);
        }
        if s.last_review >= day_start {
            out.reviewed_count = out.reviewed_count.saturating_add(1);
            correct += u64::from(s.correct_count);
            incorrect += u64::from(s.incorrect_count);
        }
    }
    out.correct_count = saturate(correct);
    out.incorrect_count = saturate(incorrect);
    let total = correct + incorrect;
    out.accuracy = if total > 0 {
        (correct as f64 / total as f64 * 100.0).round() as u32
    } else {
        0
    };
    out
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Local midnight of the day containing `now`.
pub fn local_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_timezone(&Local)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReviewState;
    use chrono::{Duration, TimeZone};

    #[test]
    fn accuracy_rounds_to_whole_percent() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let day_start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let mut a = ReviewState::new(now - Duration::hours(2));
        a.correct_count = 2;
        a.incorrect_count = 1;
        a.review_count = 3;
        a.next_review = now + Duration::hours(1);

        let mut old = ReviewState::new(day_start - Duration::days(3));
        old.correct_count = 10;
        old.review_count = 10;
        old.next_review = now + Duration::days(5);

        let states: ReviewStates = [("a".to_string(), a), ("old".to_string(), old)]
            .into_iter()
            .collect();
        let s = today_review_stats(&states, now, day_start);
        assert_eq!(s.due_count, 1);
        assert_eq!(s.reviewed_count, 1);
        assert_eq!(s.correct_count, 2);
        assert_eq!(s.incorrect_count, 1);
        assert_eq!(s.accuracy, 67);
    }

    #[test]
    fn large_tallies_do_not_overflow() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let day_start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let mut a = ReviewState::new(now);
        a.correct_count = 3_000_000_000;
        a.incorrect_count = 3_000_000_000;
        a.next_review = now + Duration::hours(1);
        let states: ReviewStates = [("a".to_string(), a), ("b".to_string(), a)]
            .into_iter()
            .collect();
        let s = today_review_stats(&states, now, day_start);
        assert_eq!(s.correct_count, u32::MAX);
        assert_eq!(s.incorrect_count, u32::MAX);
        assert_eq!(s.accuracy, 50);
    }

    #[test]
    fn empty_is_zero() {
        let now = Utc::now();
        assert_eq!(
            today_review_stats(&ReviewStates::new(), now, local_day_start(now)),
            TodayStats::default()
        );
    }

    #[test]
    fn day_start_not_after_now() {
        let now = Utc::now();
        let start = local_day_start(now);
        assert!(start <= now);
        assert!(now - start < Duration::hours(25));
    }
}
