use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use vocabcontext_core::{
    achievement_list, achievement_summary, due_count, local_day_start,
    session::{check_achievements, current_queue, record_answer, study_day},
    study_intensity, today_review_stats, Clock, CoreError, ProgressStore, QueueEntry,
    ReviewState, DEFAULT_QUEUE_LIMIT,
};

use crate::api::dto::{AnswerIn, ChangedOut, ForgottenIn, IntensityOut, QueueQuery, StatsOut};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProgressStore>,
    pub clock: Arc<dyn Clock>,
}

pub fn status_for(e: &CoreError) -> StatusCode {
    match e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(e: CoreError) -> StatusCode {
    let status = status_for(&e);
    if status.is_server_error() {
        error!(error = %e, "request failed");
    }
    status
}

pub async fn get_queue(
    State(st): State<Arc<AppState>>,
    Query(q): Query<QueueQuery>,
) -> Result<Json<Vec<QueueEntry>>, StatusCode> {
    let limit = q.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    let queue = current_queue(&*st.store, limit, st.clock.now())
        .await
        .map_err(reject)?;
    Ok(Json(queue))
}

pub async fn post_answer(
    State(st): State<Arc<AppState>>,
    Json(body): Json<AnswerIn>,
) -> Result<Json<ReviewState>, StatusCode> {
    let now = st.clock.now();
    let s = record_answer(&*st.store, &body.item_id, body.correct, now)
        .await
        .map_err(reject)?;
    debug!(item = %body.item_id, correct = body.correct, level = s.interval_level, "answer applied");
    // the answer is already stored; a failed check must not fail the request
    match check_achievements(&*st.store, now).await {
        Ok(fresh) => {
            for a in fresh {
                info!(achievement = a.id, "achievement unlocked");
            }
        }
        Err(e) => warn!(error = %e, "achievement check failed"),
    }
    Ok(Json(s))
}

pub async fn get_intensity(
    State(st): State<Arc<AppState>>,
) -> Result<Json<IntensityOut>, StatusCode> {
    let states = st.store.load_states().await.map_err(reject)?;
    let now = st.clock.now();
    Ok(Json(IntensityOut {
        intensity: study_intensity(&states, now),
        due: due_count(&states, now),
    }))
}

pub async fn get_stats(State(st): State<Arc<AppState>>) -> Result<Json<StatsOut>, StatusCode> {
    let states = st.store.load_states().await.map_err(reject)?;
    let history = st.store.load_history().await.map_err(reject)?;
    let unlocked = st.store.load_achievements().await.map_err(reject)?;
    let now = st.clock.now();
    Ok(Json(StatsOut {
        today: today_review_stats(&states, now, local_day_start(now)),
        streak_days: history.streak_days(study_day(now)),
        total_study_days: history.total_study_days(),
        achievements: achievement_summary(&unlocked),
        unlocked: achievement_list(&unlocked)
            .into_iter()
            .filter(|a| a.unlocked)
            .collect(),
    }))
}

pub async fn post_forgotten(
    State(st): State<Arc<AppState>>,
    Json(body): Json<ForgottenIn>,
) -> Result<Json<ChangedOut>, StatusCode> {
    let changed = st
        .store
        .mark_forgotten(body.item_id.trim())
        .await
        .map_err(reject)?;
    Ok(Json(ChangedOut { changed }))
}

pub async fn delete_forgotten(
    State(st): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<Json<ChangedOut>, StatusCode> {
    let changed = st.store.clear_forgotten(&item_id).await.map_err(reject)?;
    Ok(Json(ChangedOut { changed }))
}
