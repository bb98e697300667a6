use crate::{
    ForgottenSet, ItemId, QueueEntry, QueueKind, ReviewState, ReviewStates, StudyIntensity,
    EF_DEFAULT, EF_MAX, EF_MIN, EF_PENALTY, EF_REWARD, FORGOTTEN_PRIORITY, MAX_INTERVAL_LEVEL,
    REVIEW_INTERVALS_MINUTES,
};
use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LadderStep {
    pub interval_level: u32,
    pub ease_factor: f64,
}

fn clamp_ef(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(EF_MIN, EF_MAX)
    } else {
        EF_DEFAULT
    }
}

fn clamp_level(level: i64) -> u32 {
    level.clamp(0, MAX_INTERVAL_LEVEL as i64) as u32
}

/// Time at which an item on `interval_level` becomes due again.
///
/// Levels past the end of the table stay on the last interval. Ease falls
/// back to 2.5 when unset and is kept inside `[1.3, 2.5]`.
pub fn compute_next_review_time(
    interval_level: i64,
    ease_factor: Option<f64>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let base = REVIEW_INTERVALS_MINUTES[clamp_level(interval_level) as usize];
    let ef = clamp_ef(ease_factor.unwrap_or(EF_DEFAULT));
    let millis = (base as f64 * ef * 60_000.0).round() as i64;
    now + Duration::milliseconds(millis)
}

/// Moves one rung on the ladder: up one on a correct answer, back to the
/// bottom on a miss.
pub fn step_ladder(interval_level: u32, ease_factor: f64, is_correct: bool) -> LadderStep {
    let level = interval_level.min(MAX_INTERVAL_LEVEL);
    let ef = clamp_ef(ease_factor);
    if is_correct {
        LadderStep {
            interval_level: (level + 1).min(MAX_INTERVAL_LEVEL),
            ease_factor: (ef + EF_REWARD).min(EF_MAX),
        }
    } else {
        LadderStep {
            interval_level: 0,
            ease_factor: (ef - EF_PENALTY).max(EF_MIN),
        }
    }
}

/// Records one answer and returns the resulting state. Counters, timestamps
/// and the next review time move together.
pub fn apply_answer(state: &ReviewState, is_correct: bool, now: DateTime<Utc>) -> ReviewState {
    let step = step_ladder(state.interval_level, state.ease_factor, is_correct);
    let mut next = *state;
    next.interval_level = step.interval_level;
    next.ease_factor = step.ease_factor;
    if is_correct {
        next.correct_count = next.correct_count.saturating_add(1);
    } else {
        next.incorrect_count = next.incorrect_count.saturating_add(1);
    }
    next.review_count = next.correct_count.saturating_add(next.incorrect_count);
    next.last_review = now;
    next.next_review =
        compute_next_review_time(i64::from(step.interval_level), Some(step.ease_factor), now);
    next
}

/// Absent state is never due.
pub fn is_due(state: Option<&ReviewState>, now: DateTime<Utc>) -> bool {
    state.map(|s| s.is_due(now)).unwrap_or(false)
}

/// Higher is more urgent. Absent state scores 0.
pub fn priority(state: Option<&ReviewState>, now: DateTime<Utc>) -> i64 {
    state.map(|s| s.priority(now)).unwrap_or(0)
}

pub fn due_count(states: &ReviewStates, now: DateTime<Utc>) -> usize {
    states.values().filter(|s| s.is_due(now)).count()
}

/// Ordered list of what to study next.
///
/// Forgotten items enter at a flat priority of 100 and come first among
/// equals; due items follow with their computed priority. Sorting is
/// stable and descending, then truncated to `limit`.
pub fn build_review_queue(
    states: &ReviewStates,
    forgotten: &ForgottenSet,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<QueueEntry> {
    let mut queue: Vec<QueueEntry> = forgotten
        .iter()
        .map(|id| QueueEntry {
            item_id: id.clone(),
            priority: FORGOTTEN_PRIORITY,
            kind: QueueKind::Forgotten,
        })
        .collect();

    queue.extend(
        states
            .iter()
            .filter(|(id, s)| s.is_due(now) && !forgotten.contains(id))
            .map(|(id, s)| QueueEntry {
                item_id: id.clone(),
                priority: s.priority(now),
                kind: QueueKind::Review,
            }),
    );

    queue.sort_by(|a, b| b.priority.cmp(&a.priority));
    queue.truncate(limit);
    queue
}

pub fn review_queue_ids(
    states: &ReviewStates,
    forgotten: &ForgottenSet,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<ItemId> {
    build_review_queue(states, forgotten, limit, now)
        .into_iter()
        .map(|e| e.item_id)
        .collect()
}

pub fn study_intensity(states: &ReviewStates, now: DateTime<Utc>) -> StudyIntensity {
    StudyIntensity::from_due_count(due_count(states, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn negative_level_clamps_to_first_rung() {
        let now = t0();
        assert_eq!(
            compute_next_review_time(-4, Some(2.0), now),
            now + Duration::minutes(10)
        );
    }

    #[test]
    fn level_past_table_stays_on_last_rung() {
        let now = t0();
        assert_eq!(
            compute_next_review_time(42, Some(1.5), now),
            now + Duration::minutes(45360)
        );
    }

    #[test]
    fn unset_or_bad_ease_falls_back() {
        let now = t0();
        let expected = now + Duration::seconds(750);
        assert_eq!(compute_next_review_time(0, None, now), now + Duration::seconds(750));
        assert_eq!(compute_next_review_time(0, Some(f64::NAN), now), expected);
        // clamped down to 2.5
        assert_eq!(compute_next_review_time(0, Some(9.0), now), expected);
    }

    #[test]
    fn apply_answer_leaves_input_untouched() {
        let s = ReviewState::new(t0());
        let copy = s;
        let _ = apply_answer(&s, false, t0());
        assert_eq!(s, copy);
    }

    #[test]
    fn malformed_state_self_corrects() {
        let mut s = ReviewState::new(t0());
        s.interval_level = 17;
        s.ease_factor = 0.2;
        let step = step_ladder(s.interval_level, s.ease_factor, true);
        assert_eq!(step.interval_level, MAX_INTERVAL_LEVEL);
        assert!((step.ease_factor - 1.4).abs() < 1e-9);
    }

    #[test]
    fn huge_counters_saturate() {
        let mut s = ReviewState::new(t0());
        s.correct_count = 3_000_000_000;
        s.incorrect_count = 2_000_000_000;
        let next = apply_answer(&s, true, t0());
        assert_eq!(next.correct_count, 3_000_000_001);
        assert_eq!(next.review_count, u32::MAX);

        s.incorrect_count = u32::MAX;
        let next = apply_answer(&s, false, t0());
        assert_eq!(next.incorrect_count, u32::MAX);
        assert_eq!(next.interval_level, 0);
    }

    #[test]
    fn absent_state_defaults() {
        assert!(!is_due(None, t0()));
        assert_eq!(priority(None, t0()), 0);
    }
}
