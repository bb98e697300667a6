use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ItemId = String;

/// Review states keyed by item id. Iteration order is the tie-break order
/// used when two queue entries share a priority.
pub type ReviewStates = BTreeMap<ItemId, ReviewState>;

/// Base review intervals in minutes: 5m, 30m, 12h, 2d, 7d, 21d.
pub const REVIEW_INTERVALS_MINUTES: [i64; 6] = [5, 30, 720, 2880, 10080, 30240];
pub const MAX_INTERVAL_LEVEL: u32 = (REVIEW_INTERVALS_MINUTES.len() - 1) as u32;

pub const EF_MIN: f64 = 1.3;
pub const EF_MAX: f64 = 2.5;
pub const EF_DEFAULT: f64 = 2.5;
pub const EF_REWARD: f64 = 0.1;
pub const EF_PENALTY: f64 = 0.2;

pub const NEW_ITEM_BONUS: i64 = 1000;
pub const INCORRECT_WEIGHT: i64 = 500;
pub const FORGOTTEN_PRIORITY: i64 = 100;
pub const DEFAULT_QUEUE_LIMIT: usize = 20;

fn default_ease() -> f64 {
    EF_DEFAULT
}

// Stored counters and levels may be negative, fractional or huge in files
// written by hand or by older builds. They are clamped on read.
fn clamp_stored(raw: f64, max: u32) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        0
    } else if raw >= f64::from(max) {
        max
    } else {
        raw.floor() as u32
    }
}

fn de_level<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(clamp_stored(f64::deserialize(d)?, MAX_INTERVAL_LEVEL))
}

fn de_count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(clamp_stored(f64::deserialize(d)?, u32::MAX))
}

/// Per learner, per item review state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    #[serde(default, deserialize_with = "de_level")]
    pub interval_level: u32,
    #[serde(default = "default_ease")]
    pub ease_factor: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub next_review: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_review: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_count")]
    pub review_count: u32,
    #[serde(default, deserialize_with = "de_count")]
    pub correct_count: u32,
    #[serde(default, deserialize_with = "de_count")]
    pub incorrect_count: u32,
}

impl ReviewState {
    /// A fresh state, due immediately.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            interval_level: 0,
            ease_factor: EF_DEFAULT,
            next_review: now,
            last_review: now,
            review_count: 0,
            correct_count: 0,
            incorrect_count: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.review_count == 0
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review
    }

    /// Whole minutes past `next_review`, never negative.
    pub fn overdue_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.next_review).num_minutes().max(0)
    }

    pub fn priority(&self, now: DateTime<Utc>) -> i64 {
        let mut score = self.overdue_minutes(now);
        if self.is_new() {
            score += NEW_ITEM_BONUS;
        }
        score + INCORRECT_WEIGHT * i64::from(self.incorrect_count)
    }
}

/// Items the learner explicitly marked as "don't know", kept in marking order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ItemId>", into = "Vec<ItemId>")]
pub struct ForgottenSet {
    ids: Vec<ItemId>,
}

impl ForgottenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the id was already present.
    pub fn insert(&mut self, id: impl Into<ItemId>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|x| x != id);
        self.ids.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|x| x == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl From<Vec<ItemId>> for ForgottenSet {
    fn from(v: Vec<ItemId>) -> Self {
        v.into_iter().collect()
    }
}

impl From<ForgottenSet> for Vec<ItemId> {
    fn from(s: ForgottenSet) -> Self {
        s.ids
    }
}

impl<S: Into<ItemId>> FromIterator<S> for ForgottenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ForgottenSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    Forgotten,
    Review,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntry {
    pub item_id: ItemId,
    pub priority: i64,
    pub kind: QueueKind,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StudyIntensity {
    None,
    Light,
    Moderate,
    Heavy,
    Intense,
}

impl StudyIntensity {
    pub fn from_due_count(due: usize) -> Self {
        match due {
            0 => StudyIntensity::None,
            1..=10 => StudyIntensity::Light,
            11..=30 => StudyIntensity::Moderate,
            31..=50 => StudyIntensity::Heavy,
            _ => StudyIntensity::Intense,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StudyIntensity::None => "none",
            StudyIntensity::Light => "light",
            StudyIntensity::Moderate => "moderate",
            StudyIntensity::Heavy => "heavy",
            StudyIntensity::Intense => "intense",
        }
    }
}

impl fmt::Display for StudyIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the app persists for one learner.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub states: ReviewStates,
    #[serde(default)]
    pub forgotten: ForgottenSet,
    #[serde(default)]
    pub history: crate::StudyHistory,
    #[serde(default)]
    pub achievements: crate::UnlockedSet,
}

impl ProgressSnapshot {
    pub fn new(
        exported_at: DateTime<Utc>,
        states: ReviewStates,
        forgotten: ForgottenSet,
        history: crate::StudyHistory,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at,
            states,
            forgotten,
            history,
            achievements: crate::UnlockedSet::new(),
        }
    }
}
