use serde::{Deserialize, Serialize};
use vocabcontext_core::{AchievementStatus, AchievementSummary, StudyIntensity, TodayStats};

#[derive(Deserialize)]
pub struct AnswerIn {
    pub item_id: String,
    pub correct: bool,
}

#[derive(Deserialize)]
pub struct ForgottenIn {
    pub item_id: String,
}

#[derive(Deserialize)]
pub struct QueueQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct IntensityOut {
    pub intensity: StudyIntensity,
    pub due: usize,
}

#[derive(Serialize)]
pub struct StatsOut {
    pub today: TodayStats,
    pub streak_days: u32,
    pub total_study_days: usize,
    pub achievements: AchievementSummary,
    pub unlocked: Vec<AchievementStatus>,
}

#[derive(Serialize)]
pub struct ChangedOut {
    pub changed: bool,
}
