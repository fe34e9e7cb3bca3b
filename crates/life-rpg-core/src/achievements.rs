//! Achievements and their triggers.
//!
//! Each achievement carries a declarative trigger. Evaluation is a one-way
//! latch: a completed achievement is skipped on every later pass and never
//! revoked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::challenges::Challenge;
use crate::ledger::Ledger;
use crate::paths::Path;
use crate::skills::{SkillId, SkillSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Beginner,
    Medium,
    Hard,
    Elite,
    Grandmaster,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Beginner,
        Tier::Medium,
        Tier::Hard,
        Tier::Elite,
        Tier::Grandmaster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Beginner => "beginner",
            Tier::Medium => "medium",
            Tier::Hard => "hard",
            Tier::Elite => "elite",
            Tier::Grandmaster => "grandmaster",
        }
    }
}

/// Condition attached to an achievement. `None` targets mean "any".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Trigger {
    #[serde(rename_all = "camelCase")]
    SkillLevel {
        #[serde(default)]
        skill: Option<SkillId>,
        level: u8,
    },
    #[serde(rename_all = "camelCase")]
    SkillStreak {
        #[serde(default)]
        skill: Option<SkillId>,
        days: u32,
    },
    AllSkillsLevel { level: u8 },
    #[serde(rename_all = "camelCase")]
    QuestCount {
        #[serde(default)]
        quest_id: Option<String>,
        count: u32,
    },
    #[serde(rename_all = "camelCase")]
    QuestSequence {
        quest_ids: Vec<String>,
        #[serde(default)]
        same_day: bool,
    },
    #[serde(rename_all = "camelCase")]
    PathProgress {
        #[serde(default)]
        path_id: Option<String>,
        count: u32,
    },
    #[serde(rename_all = "camelCase")]
    PathStage { path_id: String, stage: usize },
    #[serde(rename_all = "camelCase")]
    PathComplete {
        #[serde(default)]
        path_id: Option<String>,
    },
    ChallengeStarted { count: u32 },
    #[serde(rename_all = "camelCase")]
    ChallengeStreak {
        #[serde(default)]
        challenge_id: Option<String>,
        streak: u32,
    },
    #[serde(rename_all = "camelCase")]
    ChallengeComplete {
        #[serde(default)]
        challenge_id: Option<String>,
        count: u32,
    },
    /// Only a caller can claim it.
    Manual,
}

/// Optional payout on unlock. Bonus XP goes to `skill` when one is named.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementReward {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_xp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<SkillId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tier: Tier,
    pub trigger: Trigger,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<AchievementReward>,
}

impl Achievement {
    pub fn new(id: &str, name: &str, description: &str, tier: Tier, trigger: Trigger) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            tier,
            trigger,
            completed: false,
            completed_date: None,
            reward: None,
        }
    }

    pub fn with_reward(mut self, reward: AchievementReward) -> Self {
        self.reward = Some(reward);
        self
    }

    fn unlock(&mut self, now: DateTime<Utc>) -> UnlockedAchievement {
        self.completed = true;
        self.completed_date = Some(now);
        UnlockedAchievement {
            id: self.id.clone(),
            name: self.name.clone(),
            tier: self.tier,
            reward: self.reward.clone(),
        }
    }
}

/// Newly unlocked achievement, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub id: String,
    pub name: String,
    pub tier: Tier,
    pub reward: Option<AchievementReward>,
}

/// Read-only slice of the profile the triggers look at.
#[derive(Debug, Clone, Copy)]
pub struct ProgressView<'a> {
    pub skills: &'a SkillSet,
    pub ledger: &'a Ledger,
    pub paths: &'a [Path],
    pub challenges: &'a [Challenge],
    pub challenges_started: u32,
}

impl<'a> ProgressView<'a> {
    fn skill_matches(&self, skill: &Option<SkillId>, test: impl Fn(u8, u32) -> bool) -> bool {
        self.skills
            .iter()
            .filter(|(id, _)| skill.map_or(true, |s| s == **id))
            .any(|(_, s)| test(s.level(), s.current_streak))
    }

    fn any_path(&self, path_id: &Option<String>, test: impl Fn(&Path) -> bool) -> bool {
        self.paths
            .iter()
            .filter(|p| path_id.as_ref().map_or(true, |id| &p.id == id))
            .any(test)
    }

    fn any_challenge(
        &self,
        challenge_id: &Option<String>,
        test: impl Fn(&Challenge) -> bool,
    ) -> bool {
        self.challenges
            .iter()
            .filter(|c| challenge_id.as_ref().map_or(true, |id| &c.id == id))
            .any(test)
    }
}

/// Whether `trigger` holds for the current state.
pub fn is_met(trigger: &Trigger, view: &ProgressView<'_>) -> bool {
    match trigger {
        Trigger::SkillLevel { skill, level } => {
            view.skill_matches(skill, |lvl, _| lvl >= *level)
        }
        Trigger::SkillStreak { skill, days } => {
            view.skill_matches(skill, |_, streak| streak >= *days)
        }
        Trigger::AllSkillsLevel { level } => {
            !view.skills.is_empty() && view.skills.values().all(|s| s.level() >= *level)
        }
        Trigger::QuestCount { quest_id, count } => {
            let n = match quest_id {
                Some(id) => view.ledger.count_for(id),
                None => view.ledger.len(),
            };
            n >= *count as usize
        }
        Trigger::QuestSequence { quest_ids, same_day } => {
            if quest_ids.is_empty() {
                return false;
            }
            if *same_day {
                view.ledger
                    .quests_by_day()
                    .values()
                    .any(|done| quest_ids.iter().all(|q| done.contains(q.as_str())))
            } else {
                quest_ids.iter().all(|q| view.ledger.has_completed(q))
            }
        }
        Trigger::PathProgress { path_id, count } => {
            view.any_path(path_id, |p| p.satisfied_count() >= *count as usize)
        }
        Trigger::PathStage { path_id, stage } => view
            .paths
            .iter()
            .any(|p| &p.id == path_id && p.is_stage_complete(*stage)),
        Trigger::PathComplete { path_id } => view.any_path(path_id, |p| p.completed),
        Trigger::ChallengeStarted { count } => view.challenges_started >= *count,
        Trigger::ChallengeStreak { challenge_id, streak } => {
            view.any_challenge(challenge_id, |c| c.current_streak >= *streak)
        }
        Trigger::ChallengeComplete { challenge_id, count } => {
            view.any_challenge(challenge_id, |c| c.successful_periods() >= *count)
        }
        Trigger::Manual => false,
    }
}

/// Evaluate every open achievement and latch the ones now met.
pub fn check_achievements(
    achievements: &mut [Achievement],
    view: &ProgressView<'_>,
    now: DateTime<Utc>,
) -> Vec<UnlockedAchievement> {
    let mut unlocked = Vec::new();
    for ach in achievements.iter_mut().filter(|a| !a.completed) {
        if is_met(&ach.trigger, view) {
            info!(achievement = %ach.id, "achievement unlocked");
            unlocked.push(ach.unlock(now));
        }
    }
    unlocked
}

/// Latch a manual achievement. Returns `None` if unknown, automatic, or done.
pub fn claim_manual(
    achievements: &mut [Achievement],
    id: &str,
    now: DateTime<Utc>,
) -> Option<UnlockedAchievement> {
    let ach = achievements
        .iter_mut()
        .find(|a| a.id == id && !a.completed && a.trigger == Trigger::Manual)?;
    Some(ach.unlock(now))
}

/// Completed count per tier, in tier order.
pub fn tier_summary(achievements: &[Achievement]) -> Vec<(Tier, usize, usize)> {
    Tier::ALL
        .iter()
        .map(|tier| {
            let in_tier: Vec<_> = achievements.iter().filter(|a| a.tier == *tier).collect();
            (*tier, in_tier.iter().filter(|a| a.completed).count(), in_tier.len())
        })
        .collect()
}
