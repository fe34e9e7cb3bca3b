//! Skills: XP totals and per-skill daily streaks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::clock::yesterday;
use crate::leveling::level_from_xp;

/// Skill ids of the current schema (v3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillId {
    Athleticism,
    Nutrition,
    Creativity,
    Intelligence,
    Career,
    Partnership,
    Friendships,
    Mindfulness,
    Wellness,
    Homecraft,
}

impl SkillId {
    pub const ALL: [SkillId; 10] = [
        SkillId::Athleticism,
        SkillId::Nutrition,
        SkillId::Creativity,
        SkillId::Intelligence,
        SkillId::Career,
        SkillId::Partnership,
        SkillId::Friendships,
        SkillId::Mindfulness,
        SkillId::Wellness,
        SkillId::Homecraft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillId::Athleticism => "athleticism",
            SkillId::Nutrition => "nutrition",
            SkillId::Creativity => "creativity",
            SkillId::Intelligence => "intelligence",
            SkillId::Career => "career",
            SkillId::Partnership => "partnership",
            SkillId::Friendships => "friendships",
            SkillId::Mindfulness => "mindfulness",
            SkillId::Wellness => "wellness",
            SkillId::Homecraft => "homecraft",
        }
    }

    pub fn parse(raw: &str) -> Option<SkillId> {
        SkillId::ALL.iter().copied().find(|s| s.as_str() == raw)
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streak fields as they were before the first award of `last_awarded_date`.
/// Lets a same-day undo put the streak back exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSnapshot {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_awarded_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    /// Total XP earned
    pub xp: u64,
    /// Consecutive days with an award, ending today or yesterday
    pub current_streak: u32,
    /// Best streak ever
    pub longest_streak: u32,
    /// Local day of the last award
    pub last_awarded_date: Option<NaiveDate>,
    /// Streak state before today's first award, for undo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_today: Option<StreakSnapshot>,
}

impl Skill {
    pub fn level(&self) -> u8 {
        level_from_xp(self.xp)
    }

    /// Add XP and return (old level, new level).
    pub fn award(&mut self, xp: u64) -> (u8, u8) {
        let old = self.level();
        self.xp = self.xp.saturating_add(xp);
        (old, self.level())
    }

    /// Remove XP, clamped at zero. Returns the amount actually removed.
    pub fn revoke(&mut self, xp: u64) -> u64 {
        let removed = xp.min(self.xp);
        self.xp -= removed;
        removed
    }

    /// Streak bookkeeping for an XP award on `today`.
    ///
    /// Same day: unchanged. Yesterday: +1. Anything else: restart at 1.
    pub fn touch_streak(&mut self, today: NaiveDate) {
        if self.last_awarded_date == Some(today) {
            return;
        }
        self.before_today = Some(StreakSnapshot {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_awarded_date: self.last_awarded_date,
        });
        if self.last_awarded_date == Some(yesterday(today)) {
            self.current_streak += 1;
        } else {
            self.current_streak = 1;
        }
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_awarded_date = Some(today);
    }

    /// Undo the streak effect of today's first award. No-op unless the skill
    /// was last awarded on `today` and a snapshot exists.
    pub fn restore_streak(&mut self, today: NaiveDate) -> bool {
        if self.last_awarded_date != Some(today) {
            return false;
        }
        match self.before_today.take() {
            Some(snap) => {
                self.current_streak = snap.current_streak;
                self.longest_streak = snap.longest_streak;
                self.last_awarded_date = snap.last_awarded_date;
                true
            }
            None => false,
        }
    }

    /// Day-change check: a streak survives only if XP landed yesterday or today.
    pub fn expire_streak(&mut self, today: NaiveDate) -> bool {
        let alive =
            matches!(self.last_awarded_date, Some(d) if d == today || d == yesterday(today));
        if !alive && self.current_streak > 0 {
            self.current_streak = 0;
            return true;
        }
        false
    }
}

pub type SkillSet = BTreeMap<SkillId, Skill>;

pub fn fresh_skills() -> SkillSet {
    SkillId::ALL.iter().map(|id| (*id, Skill::default())).collect()
}

/// Sum of all skill levels.
pub fn total_level(skills: &SkillSet) -> u32 {
    skills.values().map(|s| s.level() as u32).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_streak_consecutive_days() {
        let mut skill = Skill::default();
        skill.touch_streak(day(1));
        skill.touch_streak(day(2));
        skill.touch_streak(day(3));
        assert_eq!(skill.current_streak, 3);
        assert_eq!(skill.longest_streak, 3);
    }

    #[test]
    fn test_streak_same_day_unchanged() {
        let mut skill = Skill::default();
        skill.touch_streak(day(1));
        skill.touch_streak(day(1));
        assert_eq!(skill.current_streak, 1);
    }

    #[test]
    fn test_streak_gap_restarts() {
        let mut skill = Skill::default();
        skill.touch_streak(day(1));
        skill.touch_streak(day(2));
        skill.touch_streak(day(5));
        assert_eq!(skill.current_streak, 1);
        assert_eq!(skill.longest_streak, 2);
    }

    #[test]
    fn test_restore_streak() {
        let mut skill = Skill::default();
        skill.touch_streak(day(1));
        let before = skill.clone();
        skill.touch_streak(day(2));
        assert!(skill.restore_streak(day(2)));
        assert_eq!(skill.current_streak, before.current_streak);
        assert_eq!(skill.last_awarded_date, before.last_awarded_date);
        assert!(!skill.restore_streak(day(2)));
    }

    #[test]
    fn test_expire_streak() {
        let mut skill = Skill::default();
        skill.touch_streak(day(1));
        assert!(!skill.expire_streak(day(2)));
        assert!(skill.expire_streak(day(7)));
        assert_eq!(skill.current_streak, 0);
        assert_eq!(skill.longest_streak, 1);
    }

    #[test]
    fn test_revoke_clamps() {
        let mut skill = Skill { xp: 30, ..Default::default() };
        assert_eq!(skill.revoke(50), 30);
        assert_eq!(skill.xp, 0);
    }

    #[test]
    fn test_skill_id_serde_key() {
        let skills = fresh_skills();
        let json = serde_json::to_string(&skills).unwrap();
        assert!(json.contains("\"athleticism\""));
        let back: SkillSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 10);
        assert_eq!(total_level(&back), 10);
    }
}
