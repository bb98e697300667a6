use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info, warn};
use vocabcontext_core::{
    repo::ProgressStore, CoreError, ForgottenSet, ProgressSnapshot, ReviewState, ReviewStates,
    StudyHistory, UnlockedSet,
};

pub mod paths;

const FILE_VERSION: u32 = 1;
pub const DEFAULT_MAX_BACKUPS: usize = 10;

#[derive(Clone, Serialize, Deserialize)]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    states: ReviewStates,
    #[serde(default)]
    forgotten: ForgottenSet,
    #[serde(default)]
    history: StudyHistory,
    #[serde(default)]
    achievements: UnlockedSet,
}

#[derive(Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    states: ReviewStates,
    forgotten: ForgottenSet,
    history: StudyHistory,
    achievements: UnlockedSet,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            states: ReviewStates::new(),
            forgotten: ForgottenSet::new(),
            history: StudyHistory::new(),
            achievements: UnlockedSet::new(),
        }
    }

    fn to_image(&self) -> FileImage {
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            states: self.states.clone(),
            forgotten: self.forgotten.clone(),
            history: self.history.clone(),
            achievements: self.achievements.clone(),
        }
    }

    fn from_image(img: FileImage) -> Self {
        Self {
            created_at: img.created_at,
            updated_at: img.updated_at,
            states: img.states,
            forgotten: img.forgotten,
            history: img.history,
            achievements: img.achievements,
        }
    }
}

/// Whole-file JSON store. Every mutation rewrites the file atomically and
/// drops a timestamped copy into the backups directory. The in-memory copy
/// only changes once the write has succeeded.
pub struct JsonStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
    write_gate: Mutex<()>,
    backup_seq: AtomicU64,
}

impl JsonStore {
    pub async fn open_default() -> Result<Self, CoreError> {
        let (file, backups) = paths::default_store_file();
        Self::open_with(file, backups, DEFAULT_MAX_BACKUPS).await
    }

    pub async fn open_in(root: &Path) -> Result<Self, CoreError> {
        let (file, backups) = paths::store_file_in(root);
        Self::open_with(file, backups, DEFAULT_MAX_BACKUPS).await
    }

    pub async fn open_with(
        path: PathBuf,
        backups_dir: PathBuf,
        max_backups: usize,
    ) -> Result<Self, CoreError> {
        ensure_parent_dirs(&path)?;
        ensure_dir(&backups_dir)?;
        let state = load_or_init(&path, &backups_dir).await?;
        info!(path = %path.display(), items = state.states.len(), "opened json store");
        Ok(Self {
            path,
            backups_dir,
            max_backups: max_backups.max(1),
            state: RwLock::new(state),
            write_gate: Mutex::new(()),
            backup_seq: AtomicU64::new(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `edit` to a copy of the current state and swaps the copy in
    /// once it is on disk. `edit` also reports whether anything changed;
    /// an unchanged copy is dropped without writing.
    async fn mutate<R, F>(&self, edit: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut State) -> (R, bool),
    {
        // Serialize writers so an older snapshot never lands after a newer one.
        let _gate = self.write_gate.lock().await;
        let mut next = self.state.read().clone();
        let (out, changed) = edit(&mut next);
        if !changed {
            return Ok(out);
        }
        next.updated_at = Utc::now();

        let image = next.to_image();
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;
        let seq = self.backup_seq.fetch_add(1, Ordering::Relaxed);

        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, seq, &image))
            .await
            .map_err(|e| CoreError::storage("join", e))?
            .map_err(|e| CoreError::storage("write", e))?;
        *self.state.write() = next;
        debug!(path = %self.path.display(), "saved json store");
        Ok(out)
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(path).map_err(|e| CoreError::storage("create dir", e))
}

async fn load_or_init(path: &Path, backups_dir: &Path) -> Result<State, CoreError> {
    if path.exists() {
        let p = path.to_path_buf();
        let img: FileImage = task::spawn_blocking(move || {
            let buf = fs::read_to_string(&p)?;
            let v = serde_json::from_str::<FileImage>(&buf)?;
            Ok::<FileImage, std::io::Error>(v)
        })
        .await
        .map_err(|e| CoreError::storage("join", e))?
        .map_err(|e| CoreError::storage("read", e))?;
        if img.version > FILE_VERSION {
            return Err(CoreError::Invalid("store file version is newer than supported"));
        }
        Ok(State::from_image(img))
    } else {
        let st = State::new_empty();
        write_with_backup(path, backups_dir, 1, 0, &st.to_image())
            .map_err(|e| CoreError::storage("init", e))?;
        Ok(st)
    }
}

fn write_with_backup(
    path: &Path,
    backups_dir: &Path,
    max_backups: usize,
    seq: u64,
    img: &FileImage,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(backups_dir)?;

    let json = serde_json::to_vec_pretty(img)?;
    let mut tmp = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    // The store file is already in place, so a failed backup only warns.
    if let Err(e) = write_backup(backups_dir, seq, &json)
        .and_then(|()| rotate_backups(backups_dir, max_backups))
    {
        warn!(dir = %backups_dir.display(), error = %e, "failed to write backup");
    }
    Ok(())
}

fn write_backup(backups_dir: &Path, seq: u64, json: &[u8]) -> Result<(), std::io::Error> {
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S-%3f");
    // seq keeps names distinct and ordered within one millisecond
    let backup_path = backups_dir.join(format!("vocabcontext-{ts}-{seq:06}.json"));
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(json)?;
    btmp.flush()?;
    btmp.persist(&backup_path).map_err(|e| e.error)?;
    Ok(())
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), std::io::Error> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    if entries.len() <= keep {
        return Ok(());
    }
    // Names embed the timestamp, so lexical order is age order.
    entries.sort();
    for old in &entries[..entries.len() - keep] {
        if let Err(e) = fs::remove_file(old) {
            warn!(path = %old.display(), error = %e, "failed to remove old backup");
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl ProgressStore for JsonStore {
    async fn load_states(&self) -> Result<ReviewStates, CoreError> {
        Ok(self.state.read().states.clone())
    }

    async fn get_state(&self, id: &str) -> Result<Option<ReviewState>, CoreError> {
        Ok(self.state.read().states.get(id).copied())
    }

    async fn put_state(&self, id: &str, state: &ReviewState) -> Result<(), CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("empty item id"));
        }
        self.mutate(|s| {
            s.states.insert(id.to_string(), *state);
            ((), true)
        })
        .await
    }

    async fn save_states(&self, states: &ReviewStates) -> Result<(), CoreError> {
        self.mutate(|s| {
            s.states = states.clone();
            ((), true)
        })
        .await
    }

    async fn remove_state(&self, id: &str) -> Result<(), CoreError> {
        let removed = self
            .mutate(|s| {
                let removed = s.states.remove(id).is_some();
                (removed, removed)
            })
            .await?;
        if !removed {
            return Err(CoreError::NotFound("review state"));
        }
        Ok(())
    }

    async fn load_forgotten(&self) -> Result<ForgottenSet, CoreError> {
        Ok(self.state.read().forgotten.clone())
    }

    async fn mark_forgotten(&self, id: &str) -> Result<bool, CoreError> {
        if id.trim().is_empty() {
            return Err(CoreError::Invalid("empty item id"));
        }
        self.mutate(|s| {
            let added = s.forgotten.insert(id);
            (added, added)
        })
        .await
    }

    async fn clear_forgotten(&self, id: &str) -> Result<bool, CoreError> {
        self.mutate(|s| {
            let removed = s.forgotten.remove(id);
            (removed, removed)
        })
        .await
    }

    async fn load_history(&self) -> Result<StudyHistory, CoreError> {
        Ok(self.state.read().history.clone())
    }

    async fn record_study(&self, date: NaiveDate, count: u32) -> Result<(), CoreError> {
        self.mutate(|s| {
            s.history.record(date, count);
            ((), true)
        })
        .await
    }

    async fn load_achievements(&self) -> Result<UnlockedSet, CoreError> {
        Ok(self.state.read().achievements.clone())
    }

    async fn unlock_achievements(&self, ids: &[String]) -> Result<(), CoreError> {
        self.mutate(|s| {
            let before = s.achievements.len();
            s.achievements.extend(ids.iter().cloned());
            ((), s.achievements.len() != before)
        })
        .await
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
        self.mutate(|s| {
            s.states.insert(id.to_string(), *state);
            s.forgotten.remove(id);
            s.history.record(day, 1);
            ((), true)
        })
        .await
    }

    async fn restore(&self, snap: ProgressSnapshot) -> Result<(), CoreError> {
        self.mutate(move |s| {
            s.states = snap.states;
            s.forgotten = snap.forgotten;
            s.history = snap.history;
            s.achievements = snap.achievements;
            ((), true)
        })
        .await
    }
}
