use chrono::{DateTime, Duration, TimeZone, Utc};
use vocabcontext_core::{
    apply_answer, compute_next_review_time, is_due, priority, step_ladder, study_intensity,
    ReviewState, ReviewStates, StudyIntensity, EF_MAX, EF_MIN,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 2, 8, 30, 0).unwrap()
}

#[test]
fn correct_from_fresh_moves_to_level_one() {
    let t = now();
    let step = step_ladder(0, 2.5, true);
    assert_eq!(step.interval_level, 1);
    assert_eq!(step.ease_factor, 2.5);
    assert_eq!(
        compute_next_review_time(1, Some(2.5), t),
        t + Duration::minutes(75)
    );

    let s = apply_answer(&ReviewState::new(t), true, t);
    assert_eq!(s.interval_level, 1);
    assert_eq!(s.next_review, t + Duration::minutes(75));
    assert_eq!(s.last_review, t);
    assert_eq!((s.review_count, s.correct_count, s.incorrect_count), (1, 1, 0));
}

#[test]
fn miss_resets_ladder_and_lowers_ease() {
    let t = now();
    let mut s = ReviewState::new(t);
    s.interval_level = 3;
    s.ease_factor = 2.0;

    let out = apply_answer(&s, false, t);
    assert_eq!(out.interval_level, 0);
    assert!((out.ease_factor - 1.8).abs() < 1e-9);
    assert_eq!(out.incorrect_count, 1);
    assert_eq!(out.review_count, 1);
    // 5 min * 1.8
    assert_eq!(out.next_review, t + Duration::minutes(9));
}

#[test]
fn ease_floors_and_caps() {
    let t = now();
    let mut s = ReviewState::new(t);
    for _ in 0..10 {
        s = apply_answer(&s, false, t);
    }
    assert_eq!(s.ease_factor, EF_MIN);
    for _ in 0..20 {
        s = apply_answer(&s, true, t);
    }
    assert!((s.ease_factor - EF_MAX).abs() < 1e-9);
    assert_eq!(s.interval_level, 5);
    assert_eq!(s.review_count, 30);
}

#[test]
fn fresh_state_is_due_immediately() {
    let t = now();
    let s = ReviewState::new(t);
    assert!(is_due(Some(&s), t));
    assert!(is_due(Some(&s), t + Duration::days(3)));
    assert!(!is_due(Some(&s), t - Duration::milliseconds(1)));
}

#[test]
fn priority_new_overdue_item() {
    let t = now();
    let s = ReviewState::new(t - Duration::minutes(45));
    assert_eq!(priority(Some(&s), t), 1045);
}

#[test]
fn priority_counts_mistakes_and_ignores_future() {
    let t = now();
    let mut s = ReviewState::new(t);
    s.review_count = 3;
    s.correct_count = 1;
    s.incorrect_count = 2;
    s.next_review = t + Duration::hours(2);
    assert_eq!(priority(Some(&s), t), 1000);

    // partial minutes are floored
    s.next_review = t - Duration::seconds(119);
    assert_eq!(priority(Some(&s), t), 1001);
}

fn due_states(n: usize, t: DateTime<Utc>) -> ReviewStates {
    (0..n)
        .map(|i| (format!("w{i}"), ReviewState::new(t - Duration::minutes(1))))
        .collect()
}

#[test]
fn intensity_thresholds() {
    let t = now();
    assert_eq!(study_intensity(&ReviewStates::new(), t), StudyIntensity::None);
    assert_eq!(study_intensity(&due_states(1, t), t), StudyIntensity::Light);
    assert_eq!(study_intensity(&due_states(10, t), t), StudyIntensity::Light);
    assert_eq!(study_intensity(&due_states(11, t), t), StudyIntensity::Moderate);
    assert_eq!(study_intensity(&due_states(30, t), t), StudyIntensity::Moderate);
    assert_eq!(study_intensity(&due_states(31, t), t), StudyIntensity::Heavy);
    assert_eq!(study_intensity(&due_states(50, t), t), StudyIntensity::Heavy);
    assert_eq!(study_intensity(&due_states(51, t), t), StudyIntensity::Intense);
}

#[test]
fn intensity_ignores_items_not_yet_due() {
    let t = now();
    let mut states = due_states(3, t);
    let mut later = ReviewState::new(t);
    later.next_review = t + Duration::days(1);
    states.insert("later".into(), later);
    assert_eq!(study_intensity(&states, t), StudyIntensity::Light);
}
