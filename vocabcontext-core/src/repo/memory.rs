use crate::{
    CoreError, ForgottenSet, ProgressSnapshot, ReviewState, ReviewStates, StudyHistory,
    UnlockedSet,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    states: RwLock<ReviewStates>,
    forgotten: RwLock<ForgottenSet>,
    history: RwLock<StudyHistory>,
    achievements: RwLock<UnlockedSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::repo::ProgressStore for MemoryStore {
    async fn load_states(&self) -> Result<ReviewStates, CoreError> {
        Ok(self.states.read().clone())
    }

    async fn get_state(&self, id: &str) -> Result<Option<ReviewState>, CoreError> {
        Ok(self.states.read().get(id).copied())
    }

    async fn put_state(&self, id: &str, state: &ReviewState) -> Result<(), CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("empty item id"));
        }
        self.states.write().insert(id.to_string(), *state);
        Ok(())
    }

    async fn save_states(&self, states: &ReviewStates) -> Result<(), CoreError> {
        *self.states.write() = states.clone();
        Ok(())
    }

    async fn remove_state(&self, id: &str) -> Result<(), CoreError> {
        self.states
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or(CoreError::NotFound("review state"))
    }

    async fn load_forgotten(&self) -> Result<ForgottenSet, CoreError> {
        Ok(self.forgotten.read().clone())
    }

    async fn mark_forgotten(&self, id: &str) -> Result<bool, CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("empty item id"));
        }
        Ok(self.forgotten.write().insert(id))
    }

    async fn clear_forgotten(&self, id: &str) -> Result<bool, CoreError> {
        Ok(self.forgotten.write().remove(id))
    }

    async fn load_history(&self) -> Result<StudyHistory, CoreError> {
        Ok(self.history.read().clone())
    }

    async fn record_study(&self, date: NaiveDate, count: u32) -> Result<(), CoreError> {
        self.history.write().record(date, count);
        Ok(())
    }

    async fn load_achievements(&self) -> Result<UnlockedSet, CoreError> {
        Ok(self.achievements.read().clone())
    }

    async fn unlock_achievements(&self, ids: &[String]) -> Result<(), CoreError> {
        self.achievements.write().extend(ids.iter().cloned());
        Ok(())
    }

    async fn commit_answer(
        &self,
        id: &str,
        state: &ReviewState,
        day: NaiveDate,
    ) -> Result<(), CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("empty item id"));
        }
        self.states.write().insert(id.to_string(), *state);
        self.forgotten.write().remove(id);
        self.history.write().record(day, 1);
        Ok(())
    }

    async fn restore(&self, snap: ProgressSnapshot) -> Result<(), CoreError> {
        *self.states.write() = snap.states;
        *self.forgotten.write() = snap.forgotten;
        *self.history.write() = snap.history;
        *self.achievements.write() = snap.achievements;
        Ok(())
    }
}
