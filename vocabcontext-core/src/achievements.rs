use serde::Serialize;
use std::collections::BTreeSet;

/// Ids of achievements the learner has unlocked. Unlocks are permanent.
pub type UnlockedSet = BTreeSet<String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum AchievementRule {
    /// Distinct items answered at least once.
    Learned { threshold: usize },
    /// Answers given today.
    SessionAnswers { threshold: u32 },
    Streak { days: u32 },
    /// Today's accuracy, once at least `min_answers` were given.
    Accuracy { percent: u32, min_answers: u32 },
    /// Studied at or after this local hour.
    LateHour { from: u32 },
    /// Studied at or before this local hour.
    EarlyHour { until: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub rule: AchievementRule,
}

const fn def(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    rule: AchievementRule,
) -> Achievement {
    Achievement { id, name, description, rule }
}

use AchievementRule::*;

pub const ACHIEVEMENTS: &[Achievement] = &[
    def("first_word", "First Steps", "Learn your first word", Learned { threshold: 1 }),
    def("ten_words", "Word Novice", "Learn 10 words", Learned { threshold: 10 }),
    def("hundred_words", "Word Collector", "Learn 100 words", Learned { threshold: 100 }),
    def("five_hundred_words", "Word Expert", "Learn 500 words", Learned { threshold: 500 }),
    def("thousand_words", "Thousand Words", "Learn 1000 words", Learned { threshold: 1000 }),
    def("five_thousand_words", "Word Giant", "Learn 5000 words", Learned { threshold: 5000 }),
    def("ten_thousand_words", "Word Monarch", "Learn 10000 words", Learned { threshold: 10000 }),
    def("streak_3", "Persistent", "Study 3 days in a row", Streak { days: 3 }),
    def("streak_7", "Week Warrior", "Study 7 days in a row", Streak { days: 7 }),
    def("streak_14", "Fortnight Hero", "Study 14 days in a row", Streak { days: 14 }),
    def("streak_30", "Monthly Legend", "Study 30 days in a row", Streak { days: 30 }),
    def("streak_100", "Hundred Days", "Study 100 days in a row", Streak { days: 100 }),
    def(
        "accuracy_90",
        "Sharp Memory",
        "Reach 90% accuracy over at least 10 answers in a day",
        Accuracy { percent: 90, min_answers: 10 },
    ),
    def(
        "accuracy_95",
        "Photographic",
        "Reach 95% accuracy over at least 20 answers in a day",
        Accuracy { percent: 95, min_answers: 20 },
    ),
    def(
        "accuracy_perfect",
        "Flawless",
        "Answer at least 10 words in a day without a miss",
        Accuracy { percent: 100, min_answers: 10 },
    ),
    def(
        "perfect_review",
        "Review Expert",
        "Answer at least 50 words in a day without a miss",
        Accuracy { percent: 100, min_answers: 50 },
    ),
    def("marathon_session", "Marathon", "Answer 100 words in one day", SessionAnswers { threshold: 100 }),
    def("night_owl", "Night Owl", "Study after 10 pm", LateHour { from: 22 }),
    def("early_bird", "Early Bird", "Study before 6 am", EarlyHour { until: 6 }),
];

/// Figures the achievement rules are checked against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AchievementInput {
    pub total_learned: usize,
    pub streak_days: u32,
    pub session_answers: u32,
    /// Whole percent.
    pub accuracy: u32,
    /// Local hour of day, 0..=23.
    pub hour: u32,
}

impl AchievementRule {
    pub fn is_met(&self, input: &AchievementInput) -> bool {
        match *self {
            Learned { threshold } => input.total_learned >= threshold,
            SessionAnswers { threshold } => input.session_answers >= threshold,
            Streak { days } => input.streak_days >= days,
            Accuracy { percent, min_answers } => {
                input.session_answers >= min_answers && input.accuracy >= percent
            }
            LateHour { from } => input.hour >= from,
            EarlyHour { until } => input.hour <= until,
        }
    }
}

pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Achievements whose rule is met now and which are not unlocked yet, in
/// definition order.
pub fn newly_unlocked(
    input: &AchievementInput,
    unlocked: &UnlockedSet,
) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !unlocked.contains(a.id) && a.rule.is_met(input))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub unlocked: bool,
}

pub fn achievement_list(unlocked: &UnlockedSet) -> Vec<AchievementStatus> {
    ACHIEVEMENTS
        .iter()
        .map(|a| AchievementStatus {
            achievement: *a,
            unlocked: unlocked.contains(a.id),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AchievementSummary {
    pub unlocked: usize,
    pub total: usize,
    /// Whole percent of all achievements unlocked.
    pub percentage: u32,
}

/// Ids that are no longer defined are ignored.
pub fn achievement_summary(unlocked: &UnlockedSet) -> AchievementSummary {
    let total = ACHIEVEMENTS.len();
    let count = ACHIEVEMENTS.iter().filter(|a| unlocked.contains(a.id)).count();
    AchievementSummary {
        unlocked: count,
        total,
        percentage: (count as f64 / total as f64 * 100.0).round() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&Achievement]) -> Vec<&'static str> {
        v.iter().map(|a| a.id).collect()
    }

    #[test]
    fn ids_are_unique() {
        let set: BTreeSet<_> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(set.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn thresholds_are_inclusive() {
        let input = AchievementInput {
            total_learned: 10,
            streak_days: 3,
            hour: 12,
            ..Default::default()
        };
        let got = newly_unlocked(&input, &UnlockedSet::new());
        assert_eq!(ids(&got), vec!["first_word", "ten_words", "streak_3"]);
    }

    #[test]
    fn already_unlocked_are_skipped() {
        let input = AchievementInput { total_learned: 1, hour: 12, ..Default::default() };
        let unlocked: UnlockedSet = ["first_word".to_string()].into_iter().collect();
        assert!(newly_unlocked(&input, &unlocked).is_empty());
    }

    #[test]
    fn accuracy_needs_enough_answers() {
        let few = AchievementInput { session_answers: 9, accuracy: 100, hour: 12, ..Default::default() };
        assert!(newly_unlocked(&few, &UnlockedSet::new()).is_empty());

        let enough = AchievementInput { session_answers: 20, accuracy: 95, hour: 12, ..Default::default() };
        assert_eq!(
            ids(&newly_unlocked(&enough, &UnlockedSet::new())),
            vec!["accuracy_90", "accuracy_95"]
        );
    }

    #[test]
    fn hour_rules() {
        let late = AchievementInput { hour: 22, ..Default::default() };
        assert_eq!(ids(&newly_unlocked(&late, &UnlockedSet::new())), vec!["night_owl"]);
        let early = AchievementInput { hour: 6, ..Default::default() };
        assert_eq!(ids(&newly_unlocked(&early, &UnlockedSet::new())), vec!["early_bird"]);
    }

    #[test]
    fn summary_ignores_unknown_ids() {
        let unlocked: UnlockedSet = ["streak_3", "retired"].iter().map(|s| s.to_string()).collect();
        let s = achievement_summary(&unlocked);
        assert_eq!(s.unlocked, 1);
        assert_eq!(s.total, ACHIEVEMENTS.len());
        assert_eq!(s.percentage, 5);
        let list = achievement_list(&unlocked);
        assert_eq!(list.iter().filter(|a| a.unlocked).count(), 1);
        assert!(find_achievement("streak_3").is_some());
    }
}
