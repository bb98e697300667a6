//! Store-backed study flow shared by every front end.

use crate::{
    apply_answer, build_review_queue, local_day_start, newly_unlocked, today_review_stats,
    Achievement, AchievementInput, CoreError, ProgressStore, QueueEntry, ReviewState,
};
use chrono::{DateTime, Local, NaiveDate, Timelike, Utc};

/// Calendar day, in local time, that study at `now` is credited to.
pub fn study_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Applies one answer to `id` and persists the result.
///
/// An item with no stored state starts from a fresh one. Answering clears
/// the item's forgotten mark and counts toward today's study history.
pub async fn record_answer<S: ProgressStore + ?Sized>(
    store: &S,
    id: &str,
    is_correct: bool,
    now: DateTime<Utc>,
) -> Result<ReviewState, CoreError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CoreError::Invalid("empty item id"));
    }
    let current = store
        .get_state(id)
        .await?
        .unwrap_or_else(|| ReviewState::new(now));
    let next = apply_answer(&current, is_correct, now);
    store.commit_answer(id, &next, study_day(now)).await?;
    Ok(next)
}

/// Creates fresh states for ids not seen before. Returns how many were new.
pub async fn add_items<S, I>(store: &S, ids: I, now: DateTime<Utc>) -> Result<usize, CoreError>
where
    S: ProgressStore + ?Sized,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut states = store.load_states().await?;
    let mut added = 0;
    for id in ids {
        let id = id.as_ref().trim();
        if id.is_empty() || states.contains_key(id) {
            continue;
        }
        states.insert(id.to_string(), ReviewState::new(now));
        added += 1;
    }
    if added > 0 {
        store.save_states(&states).await?;
    }
    Ok(added)
}

pub async fn current_queue<S: ProgressStore + ?Sized>(
    store: &S,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<QueueEntry>, CoreError> {
    let states = store.load_states().await?;
    let forgotten = store.load_forgotten().await?;
    Ok(build_review_queue(&states, &forgotten, limit, now))
}

/// Learning totals for the achievement rules, as of `now`.
pub async fn achievement_input<S: ProgressStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<AchievementInput, CoreError> {
    let states = store.load_states().await?;
    let history = store.load_history().await?;
    let today = study_day(now);
    Ok(AchievementInput {
        total_learned: states.values().filter(|s| !s.is_new()).count(),
        streak_days: history.streak_days(today),
        session_answers: history.count_on(today),
        accuracy: today_review_stats(&states, now, local_day_start(now)).accuracy,
        hour: now.with_timezone(&Local).hour(),
    })
}

/// Unlocks and persists every achievement earned so far. Returns the ones
/// unlocked by this call.
pub async fn check_achievements<S: ProgressStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<Vec<&'static Achievement>, CoreError> {
    let input = achievement_input(store, now).await?;
    let unlocked = store.load_achievements().await?;
    let fresh = newly_unlocked(&input, &unlocked);
    if !fresh.is_empty() {
        let ids: Vec<String> = fresh.iter().map(|a| a.id.to_string()).collect();
        store.unlock_achievements(&ids).await?;
    }
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryStore, QueueKind};
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn answering_unknown_item_creates_it() {
        let store = MemoryStore::new();
        let t = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        let s = record_answer(&store, "neu", true, t).await.unwrap();
        assert_eq!(s.interval_level, 1);
        assert_eq!(store.get_state("neu").await.unwrap(), Some(s));
        assert_eq!(store.load_history().await.unwrap().count_on(study_day(t)), 1);
    }

    #[tokio::test]
    async fn answering_clears_forgotten_mark() {
        let store = MemoryStore::new();
        let t = Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap();
        store.mark_forgotten("w").await.unwrap();
        let q = current_queue(&store, 20, t).await.unwrap();
        assert_eq!(q[0].kind, QueueKind::Forgotten);

        record_answer(&store, "w", false, t).await.unwrap();
        assert!(store.load_forgotten().await.unwrap().is_empty());
        let q = current_queue(&store, 20, t + Duration::minutes(30)).await.unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q[0].kind, QueueKind::Review);
        // 30 - 5*2.3 = 18.5 minutes late, plus one miss
        assert_eq!(q[0].priority, 518);
    }

    #[tokio::test]
    async fn first_answer_unlocks_first_word_once() {
        let store = MemoryStore::new();
        // midday local time, clear of the hour-based rules
        let t = Local
            .with_ymd_and_hms(2024, 10, 1, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        add_items(&store, ["a", "b"], t).await.unwrap();
        assert!(check_achievements(&store, t).await.unwrap().is_empty());

        record_answer(&store, "a", true, t).await.unwrap();
        let input = achievement_input(&store, t).await.unwrap();
        assert_eq!(input.total_learned, 1);
        assert_eq!(input.session_answers, 1);
        assert_eq!(input.accuracy, 100);

        let got = check_achievements(&store, t).await.unwrap();
        assert_eq!(got.iter().map(|a| a.id).collect::<Vec<_>>(), vec!["first_word"]);
        assert!(store.load_achievements().await.unwrap().contains("first_word"));
        assert!(check_achievements(&store, t).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_items_skips_known_and_blank() {
        let store = MemoryStore::new();
        let t = Utc::now();
        record_answer(&store, "old", true, t).await.unwrap();
        let n = add_items(&store, ["old", "", "  ", "fresh", "fresh"], t)
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(store.get_state("old").await.unwrap().unwrap().review_count, 1);
        assert!(record_answer(&store, " ", true, t).await.is_err());
    }
}
