//! Quest catalog entries.

use serde::{Deserialize, Serialize};

use crate::skills::SkillId;

/// How often a quest may be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    AsNeeded,
    OneTime,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::AsNeeded => "as-needed",
            Frequency::OneTime => "one-time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub skill: SkillId,
    pub xp: u32,
}

impl Reward {
    pub fn new(skill: SkillId, xp: u32) -> Self {
        Self { skill, xp }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    /// Stable id, referenced by the ledger, paths and challenges
    pub id: String,
    /// Display name
    pub name: String,
    /// How often it can be completed
    pub frequency: Frequency,
    /// XP paid out per skill on completion
    pub rewards: Vec<Reward>,
    /// Challenge this quest was adopted into
    #[serde(default)]
    pub challenge_id: Option<String>,
    /// Created by the player; only these can be edited or deleted
    #[serde(default)]
    pub custom: bool,
    /// Inactive quests cannot be completed
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Quest {
    pub fn new(id: &str, name: &str, frequency: Frequency, rewards: Vec<Reward>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            frequency,
            rewards,
            challenge_id: None,
            custom: false,
            active: true,
        }
    }

    pub fn total_xp(&self) -> u64 {
        self.rewards.iter().map(|r| r.xp as u64).sum()
    }

    pub fn rewards_skill(&self, skill: SkillId) -> bool {
        self.rewards.iter().any(|r| r.skill == skill)
    }
}

/// Input for a user-created quest.
#[derive(Debug, Clone)]
pub struct NewQuest {
    pub name: String,
    pub frequency: Frequency,
    pub rewards: Vec<Reward>,
}

/// Partial update of a quest. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct QuestEdit {
    pub name: Option<String>,
    pub frequency: Option<Frequency>,
    pub rewards: Option<Vec<Reward>>,
}

/// Drop zero-XP entries and merge duplicate skills, keeping first-seen order.
pub fn normalize_rewards(rewards: Vec<Reward>) -> Vec<Reward> {
    let mut out: Vec<Reward> = Vec::with_capacity(rewards.len());
    for reward in rewards.into_iter().filter(|r| r.xp > 0) {
        match out.iter_mut().find(|r| r.skill == reward.skill) {
            Some(existing) => existing.xp = existing.xp.saturating_add(reward.xp),
            None => out.push(reward),
        }
    }
    out
}
