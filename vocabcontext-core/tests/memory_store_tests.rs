use chrono::{Duration, NaiveDate, TimeZone, Utc};
use vocabcontext_core::{
    apply_answer, memory::MemoryStore, review_queue_ids, CoreError, ProgressStore, ReviewState,
};

#[tokio::test]
async fn states_forgotten_and_history_round_trip() {
    let store = MemoryStore::new();
    let t = Utc.with_ymd_and_hms(2024, 2, 2, 12, 0, 0).unwrap();

    store.put_state("apple", &ReviewState::new(t)).await.unwrap();
    let answered = apply_answer(&ReviewState::new(t), false, t);
    store.put_state("pear", &answered).await.unwrap();
    assert!(store.mark_forgotten("kiwi").await.unwrap());
    assert!(!store.mark_forgotten("kiwi").await.unwrap());
    let day = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
    store.record_study(day, 2).await.unwrap();

    assert_eq!(store.get_state("pear").await.unwrap(), Some(answered));
    assert_eq!(store.get_state("nope").await.unwrap(), None);
    assert_eq!(store.load_history().await.unwrap().count_on(day), 2);

    let later = t + Duration::hours(1);
    let before = review_queue_ids(
        &store.load_states().await.unwrap(),
        &store.load_forgotten().await.unwrap(),
        20,
        later,
    );

    store
        .unlock_achievements(&["first_word".to_string()])
        .await
        .unwrap();
    let snap = store.snapshot(later).await.unwrap();
    assert_eq!(snap.exported_at, later);
    let other = MemoryStore::new();
    other.restore(snap).await.unwrap();
    let after = review_queue_ids(
        &other.load_states().await.unwrap(),
        &other.load_forgotten().await.unwrap(),
        20,
        later,
    );
    assert_eq!(before, after);
    assert_eq!(before, vec!["apple", "pear", "kiwi"]);
    assert!(other.load_achievements().await.unwrap().contains("first_word"));
}

#[tokio::test]
async fn remove_missing_state_is_not_found() {
    let store = MemoryStore::new();
    let err = store.remove_state("ghost").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    assert!(matches!(
        store.put_state(" ", &ReviewState::new(Utc::now())).await,
        Err(CoreError::Invalid(_))
    ));
}
