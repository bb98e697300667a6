use crate::{
    CoreError, ForgottenSet, ProgressSnapshot, ReviewState, ReviewStates, StudyHistory,
    UnlockedSet,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub mod memory;

/// Persistence for one learner's progress. Last write wins; there is no
/// versioning at this boundary.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    // Review states
    async fn load_states(&self) -> Result<ReviewStates, CoreError>;
    async fn get_state(&self, id: &str) -> Result<Option<ReviewState>, CoreError>;
    async fn put_state(&self, id: &str, state: &ReviewState) -> Result<(), CoreError>;
    async fn save_states(&self, states: &ReviewStates) -> Result<(), CoreError>;
    async fn remove_state(&self, id: &str) -> Result<(), CoreError>;

    // Forgotten set
    async fn load_forgotten(&self) -> Result<ForgottenSet, CoreError>;
    async fn mark_forgotten(&self, id: &str) -> Result<bool, CoreError>;
    async fn clear_forgotten(&self, id: &str) -> Result<bool, CoreError>;

    // Study history
    async fn load_history(&self) -> Result<StudyHistory, CoreError>;
    async fn record_study(&self, date: NaiveDate, count: u32) -> Result<(), CoreError>;

    // Achievements
    async fn load_achievements(&self) -> Result<UnlockedSet, CoreError>;
    async fn unlock_achievements(&self, ids: &[String]) -> Result<(), CoreError>;

    /// Stores one answered item: its new state, the cleared forgotten mark
    /// and one study credit on `day`. Backends that can should apply all
    /// three as a single write.
    async fn commit_answer(
        &self,
        id: &str,
        state: &ReviewState,
        day: NaiveDate,
    ) -> Result<(), CoreError> {
        self.put_state(id, state).await?;
        self.clear_forgotten(id).await?;
        self.record_study(day, 1).await
    }

    async fn snapshot(&self, exported_at: DateTime<Utc>) -> Result<ProgressSnapshot, CoreError> {
        let mut snap = ProgressSnapshot::new(
            exported_at,
            self.load_states().await?,
            self.load_forgotten().await?,
            self.load_history().await?,
        );
        snap.achievements = self.load_achievements().await?;
        Ok(snap)
    }

    /// Replaces everything with the contents of `snap`.
    async fn restore(&self, snap: ProgressSnapshot) -> Result<(), CoreError>;
}
