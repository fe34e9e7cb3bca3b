//! Completion ledger.
//!
//! The append-only list of quest completions is the source of truth. The four
//! "completed" id sets are a materialized view over it; `rebuild_caches` is
//! their only writer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::clock::{cache_week_start, local_day, start_of_month};
use crate::quests::{Frequency, Quest, Reward};
use crate::skills::SkillId;

/// One completion of one quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub quest_id: String,
    pub timestamp: DateTime<Utc>,
    pub xp_awarded: Vec<Reward>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl CompletionRecord {
    pub fn new(quest_id: &str, timestamp: DateTime<Utc>, xp_awarded: Vec<Reward>) -> Self {
        Self {
            quest_id: quest_id.to_string(),
            timestamp,
            xp_awarded,
            photo: None,
        }
    }

    pub fn with_photo(mut self, photo: Option<String>) -> Self {
        self.photo = photo;
        self
    }

    pub fn day(&self) -> NaiveDate {
        local_day(&self.timestamp)
    }

    pub fn total_xp(&self) -> u64 {
        self.xp_awarded.iter().map(|r| r.xp as u64).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    completion_log: Vec<CompletionRecord>,
    #[serde(default)]
    completed_today: BTreeSet<String>,
    #[serde(default)]
    completed_this_week: BTreeSet<String>,
    #[serde(default)]
    completed_this_month: BTreeSet<String>,
    #[serde(default)]
    completed_ever: BTreeSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CompletionRecord] {
        &self.completion_log
    }

    pub fn len(&self) -> usize {
        self.completion_log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completion_log.is_empty()
    }

    /// Append a completion. Earlier entries are never touched.
    pub fn record(&mut self, record: CompletionRecord) {
        self.completion_log.push(record);
    }

    /// Recompute every derived set from the full log.
    ///
    /// `ever` only tracks one-time quests, so it needs the catalog.
    pub fn rebuild_caches(&mut self, quests: &[Quest], today: NaiveDate) {
        let week_start = cache_week_start(today);
        let month_start = start_of_month(today);
        let one_time: BTreeSet<&str> = quests
            .iter()
            .filter(|q| q.frequency == Frequency::OneTime)
            .map(|q| q.id.as_str())
            .collect();

        let mut by_today = BTreeSet::new();
        let mut by_week = BTreeSet::new();
        let mut by_month = BTreeSet::new();
        let mut ever = BTreeSet::new();

        for entry in &self.completion_log {
            let day = entry.day();
            if day == today {
                by_today.insert(entry.quest_id.clone());
            }
            if day >= week_start && day <= today {
                by_week.insert(entry.quest_id.clone());
            }
            if day >= month_start && day <= today {
                by_month.insert(entry.quest_id.clone());
            }
            if one_time.contains(entry.quest_id.as_str()) {
                ever.insert(entry.quest_id.clone());
            }
        }

        self.completed_today = by_today;
        self.completed_this_week = by_week;
        self.completed_this_month = by_month;
        self.completed_ever = ever;
    }

    pub fn completed_today(&self) -> &BTreeSet<String> {
        &self.completed_today
    }

    pub fn completed_this_week(&self) -> &BTreeSet<String> {
        &self.completed_this_week
    }

    pub fn completed_this_month(&self) -> &BTreeSet<String> {
        &self.completed_this_month
    }

    pub fn completed_ever(&self) -> &BTreeSet<String> {
        &self.completed_ever
    }

    /// Whether the quest's recurrence window still has room.
    pub fn can_complete(&self, quest: &Quest) -> bool {
        match quest.frequency {
            Frequency::Daily => !self.completed_today.contains(&quest.id),
            Frequency::Weekly => !self.completed_this_week.contains(&quest.id),
            Frequency::Monthly => !self.completed_this_month.contains(&quest.id),
            Frequency::OneTime => !self.completed_ever.contains(&quest.id),
            Frequency::AsNeeded => true,
        }
    }

    /// Index of the latest entry for `quest_id` stamped on `today`.
    pub fn latest_on(&self, quest_id: &str, today: NaiveDate) -> Option<usize> {
        self.completion_log
            .iter()
            .rposition(|e| e.quest_id == quest_id && e.day() == today)
    }

    /// Splice one entry out. Only the undo path calls this.
    pub(crate) fn remove(&mut self, index: usize) -> Option<CompletionRecord> {
        if index < self.completion_log.len() {
            Some(self.completion_log.remove(index))
        } else {
            None
        }
    }

    pub fn count_for(&self, quest_id: &str) -> usize {
        self.completion_log.iter().filter(|e| e.quest_id == quest_id).count()
    }

    pub fn has_completed(&self, quest_id: &str) -> bool {
        self.completion_log.iter().any(|e| e.quest_id == quest_id)
    }

    /// Whether any entry on `day` awarded XP to `skill`.
    pub fn awarded_skill_on(&self, skill: SkillId, day: NaiveDate) -> bool {
        self.completion_log
            .iter()
            .any(|e| e.day() == day && e.xp_awarded.iter().any(|r| r.skill == skill))
    }

    /// Quest ids completed on each calendar day.
    pub fn quests_by_day(&self) -> BTreeMap<NaiveDate, BTreeSet<&str>> {
        let mut days: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
        for entry in &self.completion_log {
            days.entry(entry.day()).or_default().insert(entry.quest_id.as_str());
        }
        days
    }

    pub fn xp_on(&self, day: NaiveDate) -> u64 {
        self.completion_log
            .iter()
            .filter(|e| e.day() == day)
            .map(|e| e.total_xp())
            .sum()
    }

    /// XP per skill from `from` through `to` inclusive.
    pub fn xp_by_skill_between(&self, from: NaiveDate, to: NaiveDate) -> BTreeMap<SkillId, u64> {
        let mut totals = BTreeMap::new();
        for entry in self.completion_log.iter().filter(|e| {
            let d = e.day();
            d >= from && d <= to
        }) {
            for reward in &entry.xp_awarded {
                *totals.entry(reward.skill).or_insert(0) += reward.xp as u64;
            }
        }
        totals
    }

    /// Entries carrying a photo, newest first.
    pub fn with_photos(&self) -> Vec<&CompletionRecord> {
        self.completion_log.iter().rev().filter(|e| e.photo.is_some()).collect()
    }
}
