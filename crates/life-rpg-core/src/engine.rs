//! The progression engine.
//!
//! Owns the profile, the store and the clock. Every mutating operation rolls
//! the calendar forward first (streak expiry, challenge period sweep, cache
//! rebuild) and persists the whole document exactly once at the end.
//! `&mut self` on every mutation keeps it to one writer at a time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::achievements::{
    check_achievements, claim_manual, tier_summary, Achievement, Tier, UnlockedAchievement,
};
use crate::challenges::{self, adopt_template_quests, Challenge, ChallengeEvent};
use crate::clock::{start_of_week, Clock, SystemClock};
use crate::collection_log::{self, CollectionEntry, CollectionStats};
use crate::config::EngineConfig;
use crate::error::{EngineError, StoreError};
use crate::leveling::{level_progress, xp_to_next_level};
use crate::ledger::{CompletionRecord, Ledger};
use crate::migrate::{migrate, stored_version, MigrationReport};
use crate::paths::{self, Path, PathEvent};
use crate::profile::Profile;
use crate::quests::{normalize_rewards, Frequency, NewQuest, Quest, QuestEdit, Reward};
use crate::registry::{challenge_template, CURRENT_VERSION};
use crate::skills::{total_level, Skill, SkillId, SkillSet};
use crate::store::{FileStore, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUp {
    pub skill: SkillId,
    pub from: u8,
    pub to: u8,
}

/// Everything one completion changed, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult {
    pub quest_id: String,
    pub xp_gained: Vec<Reward>,
    pub level_ups: Vec<LevelUp>,
    pub path_events: Vec<PathEvent>,
    pub challenge_events: Vec<ChallengeEvent>,
    pub achievements_unlocked: Vec<UnlockedAchievement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnknownQuest,
    Inactive,
    /// The quest's recurrence window already has a completion.
    NotAvailable(Frequency),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed(CompletionResult),
    Rejected(RejectReason),
}

impl CompletionOutcome {
    pub fn result(&self) -> Option<&CompletionResult> {
        match self {
            CompletionOutcome::Completed(r) => Some(r),
            CompletionOutcome::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    Undone {
        record: CompletionRecord,
        /// XP actually taken back, after clamping at zero.
        xp_removed: Vec<Reward>,
    },
    NothingToUndo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartChallengeOutcome {
    Started {
        challenge: Challenge,
        achievements_unlocked: Vec<UnlockedAchievement>,
    },
    AlreadyActive,
    UnknownTemplate,
}

/// What a day-change sweep did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetReport {
    pub day_changed: bool,
    pub streaks_broken: Vec<SkillId>,
    pub challenge_events: Vec<ChallengeEvent>,
    pub achievements_unlocked: Vec<UnlockedAchievement>,
    pub level_ups: Vec<LevelUp>,
}

impl ResetReport {
    fn changed(&self) -> bool {
        self.day_changed || !self.achievements_unlocked.is_empty()
    }
}

const STORAGE_FULL_GUIDANCE: &str =
    "Export your data, then delete old photos or collection log entries to free space.";

pub struct Engine<S: KeyValueStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    profile: Profile,
    storage_key: String,
    backup_key: String,
    backup_before_migration: bool,
    last_migration: Option<MigrationReport>,
}

impl Engine<FileStore, SystemClock> {
    /// File-backed engine on the wall clock, laid out per `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Engine::open(config.file_store(), SystemClock, config)
    }
}

impl<S: KeyValueStore, C: Clock> Engine<S, C> {
    /// Load (and if needed migrate) the stored profile. A missing document
    /// gives a fresh profile.
    pub fn open(store: S, clock: C, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut engine = Self {
            store,
            clock,
            profile: Profile::fresh(),
            storage_key: config.storage.storage_key.clone(),
            backup_key: config.storage.backup_key.clone(),
            backup_before_migration: config.migration.backup_before_migration,
            last_migration: None,
        };
        match engine.store.get(&engine.storage_key)? {
            Some(raw) => {
                if engine.adopt_document(&raw)?.migrated() {
                    engine.save()?;
                }
            }
            None => {
                info!(key = %engine.storage_key, "no saved profile, starting fresh");
                let today = engine.clock.today();
                engine.profile.ledger.rebuild_caches(&engine.profile.quests, today);
            }
        }
        Ok(engine)
    }

    /// Parse, back up, migrate and type a raw document, then make it current.
    /// The current profile is untouched on failure. Does not save.
    fn adopt_document(&mut self, raw: &str) -> Result<MigrationReport, EngineError> {
        let mut doc: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| EngineError::CorruptDocument(format!("unparseable profile: {}", e)))?;

        let version = stored_version(&doc);
        if version < CURRENT_VERSION && self.backup_before_migration {
            match self.store.set(&self.backup_key, raw) {
                Ok(()) => info!(key = %self.backup_key, version, "pre-migration backup written"),
                Err(e) => warn!(error = %e, "pre-migration backup skipped"),
            }
        }

        let report = migrate(&mut doc, self.clock.now_utc())?;
        let mut profile: Profile = serde_json::from_value(doc).map_err(|e| {
            EngineError::CorruptDocument(format!("profile does not match schema: {}", e))
        })?;
        profile.ledger.rebuild_caches(&profile.quests, self.clock.today());
        self.profile = profile;

        if report.migrated() {
            info!(from = report.from_version, to = report.to_version, "profile migrated");
        }
        self.last_migration = Some(report.clone());
        Ok(report)
    }

    /// Write the whole document. When the store is full, the backup key is
    /// dropped and the write retried once.
    pub fn save(&mut self) -> Result<(), EngineError> {
        let doc = serde_json::to_string(&self.profile)?;
        match self.store.set(&self.storage_key, &doc) {
            Ok(()) => {
                debug!(bytes = doc.len(), "profile saved");
                Ok(())
            }
            Err(StoreError::QuotaExceeded { .. }) => {
                warn!(
                    key = %self.backup_key,
                    "storage quota exceeded, dropping backup and retrying"
                );
                self.store.remove(&self.backup_key)?;
                match self.store.set(&self.storage_key, &doc) {
                    Ok(()) => Ok(()),
                    Err(StoreError::QuotaExceeded { needed, available }) => {
                        Err(EngineError::StorageFull {
                            guidance: format!(
                                "The profile needs {} bytes but only {} are free. {}",
                                needed, available, STORAGE_FULL_GUIDANCE
                            ),
                        })
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save_if(&mut self, changed: bool) -> Result<(), EngineError> {
        if changed {
            self.save()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Calendar
    // ------------------------------------------------------------------

    /// Collapse every day since the last interaction into one sweep.
    fn roll_forward(&mut self) -> ResetReport {
        let today = self.clock.today();
        let now = self.clock.now_utc();
        let mut report = ResetReport::default();

        if self.profile.last_active_date != Some(today) {
            report.day_changed = true;
            for (id, skill) in self.profile.skills.iter_mut() {
                if skill.expire_streak(today) {
                    report.streaks_broken.push(*id);
                }
            }
            report.challenge_events =
                challenges::process_periods(&mut self.profile.challenges, today);
            self.profile.ledger.rebuild_caches(&self.profile.quests, today);
            debug!(
                last_active = ?self.profile.last_active_date,
                %today,
                broken = report.streaks_broken.len(),
                "day changed"
            );
            self.profile.last_active_date = Some(today);
        }

        let (unlocked, level_ups) = self.evaluate_achievements(now);
        report.achievements_unlocked = unlocked;
        report.level_ups = level_ups;
        report
    }

    /// Session-start sweep. Saves only when something changed, so a second
    /// call on the same day does nothing.
    pub fn check_resets(&mut self) -> Result<ResetReport, EngineError> {
        let report = self.roll_forward();
        self.save_if(report.changed())?;
        Ok(report)
    }

    /// Latch achievements until nothing new unlocks. Bonus XP can raise
    /// levels, which can unlock more.
    fn evaluate_achievements(
        &mut self,
        now: DateTime<Utc>,
    ) -> (Vec<UnlockedAchievement>, Vec<LevelUp>) {
        let mut unlocked = Vec::new();
        let mut level_ups = Vec::new();
        loop {
            let mut achievements = std::mem::take(&mut self.profile.achievements);
            let batch = check_achievements(&mut achievements, &self.profile.progress_view(), now);
            self.profile.achievements = achievements;
            if batch.is_empty() {
                break;
            }
            for ach in &batch {
                level_ups.extend(apply_bonus(&mut self.profile.skills, ach));
            }
            unlocked.extend(batch);
        }
        (unlocked, level_ups)
    }

    // ------------------------------------------------------------------
    // Completion and undo
    // ------------------------------------------------------------------

    pub fn can_complete_quest(&self, quest_id: &str) -> bool {
        let Some(quest) = self.profile.quest(quest_id) else {
            return false;
        };
        if !quest.active {
            return false;
        }
        let today = self.clock.today();
        if self.profile.last_active_date == Some(today) {
            self.profile.ledger.can_complete(quest)
        } else {
            // Caches still describe an earlier day.
            let mut ledger = self.profile.ledger.clone();
            ledger.rebuild_caches(&self.profile.quests, today);
            ledger.can_complete(quest)
        }
    }

    pub fn complete_quest(
        &mut self,
        quest_id: &str,
        photo: Option<String>,
    ) -> Result<CompletionOutcome, EngineError> {
        let rolled = self.roll_forward();
        let today = self.clock.today();
        let now = self.clock.now_utc();

        let quest = match self.profile.quest(quest_id) {
            Some(q) if q.active && self.profile.ledger.can_complete(q) => q.clone(),
            other => {
                let reason = match other {
                    None => RejectReason::UnknownQuest,
                    Some(q) if !q.active => RejectReason::Inactive,
                    Some(q) => RejectReason::NotAvailable(q.frequency),
                };
                debug!(quest = quest_id, ?reason, "completion rejected");
                self.save_if(rolled.changed())?;
                return Ok(CompletionOutcome::Rejected(reason));
            }
        };

        let mut level_ups = rolled.level_ups;
        for reward in &quest.rewards {
            let skill = self.profile.skills.entry(reward.skill).or_default();
            let (from, to) = skill.award(reward.xp as u64);
            skill.touch_streak(today);
            if to > from {
                info!(skill = %reward.skill, from, to, "level up");
                level_ups.push(LevelUp { skill: reward.skill, from, to });
            }
        }

        self.profile
            .ledger
            .record(CompletionRecord::new(&quest.id, now, quest.rewards.clone()).with_photo(photo));
        self.profile.ledger.rebuild_caches(&self.profile.quests, today);

        let path_events = paths::on_quest_completed(&mut self.profile.paths, &quest.id, now);
        let mut challenge_events = rolled.challenge_events;
        challenge_events.extend(challenges::on_quest_completed(
            &mut self.profile.challenges,
            &quest.id,
            now,
        ));

        let mut achievements_unlocked = rolled.achievements_unlocked;
        let (unlocked, bonus_levels) = self.evaluate_achievements(now);
        achievements_unlocked.extend(unlocked);
        level_ups.extend(bonus_levels);

        self.save()?;
        info!(quest = %quest.id, xp = quest.total_xp(), "quest completed");

        Ok(CompletionOutcome::Completed(CompletionResult {
            quest_id: quest.id,
            xp_gained: quest.rewards,
            level_ups,
            path_events,
            challenge_events,
            achievements_unlocked,
        }))
    }

    /// Reverse today's latest completion of `quest_id`.
    ///
    /// Earlier days are final. Path progress and unlocked achievements stay.
    pub fn undo_completion(&mut self, quest_id: &str) -> Result<UndoOutcome, EngineError> {
        let rolled = self.roll_forward();
        let today = self.clock.today();

        let Some(record) = self
            .profile
            .ledger
            .latest_on(quest_id, today)
            .and_then(|idx| self.profile.ledger.remove(idx))
        else {
            self.save_if(rolled.changed())?;
            return Ok(UndoOutcome::NothingToUndo);
        };

        let mut xp_removed = Vec::with_capacity(record.xp_awarded.len());
        for reward in &record.xp_awarded {
            if let Some(skill) = self.profile.skills.get_mut(&reward.skill) {
                let removed = skill.revoke(reward.xp as u64);
                xp_removed.push(Reward::new(reward.skill, removed as u32));
            }
        }
        // A streak only goes back if nothing else fed the skill today.
        for reward in &record.xp_awarded {
            if self.profile.ledger.awarded_skill_on(reward.skill, today) {
                continue;
            }
            if let Some(skill) = self.profile.skills.get_mut(&reward.skill) {
                skill.restore_streak(today);
            }
        }

        self.profile.ledger.rebuild_caches(&self.profile.quests, today);
        if self.profile.ledger.latest_on(quest_id, today).is_none() {
            for challenge in self.profile.challenges.iter_mut() {
                challenge.forget(quest_id, today);
            }
        }

        self.save()?;
        info!(quest = quest_id, "completion undone");
        Ok(UndoOutcome::Undone { record, xp_removed })
    }

    // ------------------------------------------------------------------
    // Challenges
    // ------------------------------------------------------------------

    /// Start a challenge from a template, or restart a stopped one.
    pub fn start_challenge(
        &mut self,
        template_id: &str,
    ) -> Result<StartChallengeOutcome, EngineError> {
        let rolled = self.roll_forward();
        let Some(template) = challenge_template(template_id) else {
            self.save_if(rolled.changed())?;
            return Ok(StartChallengeOutcome::UnknownTemplate);
        };
        let now = self.clock.now_utc();

        let challenge = match self.profile.challenges.iter_mut().find(|c| c.id == template.id) {
            Some(existing) if existing.active => {
                self.save_if(rolled.changed())?;
                return Ok(StartChallengeOutcome::AlreadyActive);
            }
            Some(existing) => {
                existing.restart(now);
                existing.clone()
            }
            None => {
                let fresh = Challenge::from_template(&template, now);
                self.profile.challenges.push(fresh.clone());
                fresh
            }
        };
        let added = adopt_template_quests(&mut self.profile.quests, &template);
        self.profile.challenges_started += 1;
        self.profile.ledger.rebuild_caches(&self.profile.quests, self.clock.today());

        let mut achievements_unlocked = rolled.achievements_unlocked;
        achievements_unlocked.extend(self.evaluate_achievements(now).0);
        self.save()?;
        info!(challenge = %challenge.id, quests_added = added, "challenge started");

        Ok(StartChallengeOutcome::Started { challenge, achievements_unlocked })
    }

    /// Stop an active challenge. Its history stays.
    pub fn abandon_challenge(&mut self, challenge_id: &str) -> Result<bool, EngineError> {
        let rolled = self.roll_forward();
        let active = self
            .profile
            .challenges
            .iter_mut()
            .find(|c| c.id == challenge_id && c.active);
        let found = match active {
            Some(challenge) => {
                challenge.active = false;
                info!(
                    challenge = challenge_id,
                    streak = challenge.current_streak,
                    "challenge abandoned"
                );
                true
            }
            None => false,
        };
        self.save_if(found || rolled.changed())?;
        Ok(found)
    }

    // ------------------------------------------------------------------
    // Achievements
    // ------------------------------------------------------------------

    /// Claim a manual achievement. `None` if unknown, automatic, or done.
    pub fn claim_achievement(
        &mut self,
        id: &str,
    ) -> Result<Option<UnlockedAchievement>, EngineError> {
        let rolled = self.roll_forward();
        let now = self.clock.now_utc();
        let Some(claimed) = claim_manual(&mut self.profile.achievements, id, now) else {
            self.save_if(rolled.changed())?;
            return Ok(None);
        };
        apply_bonus(&mut self.profile.skills, &claimed);
        self.evaluate_achievements(now);
        self.save()?;
        info!(achievement = id, "achievement claimed");
        Ok(Some(claimed))
    }

    // ------------------------------------------------------------------
    // Custom quests
    // ------------------------------------------------------------------

    /// Add a user quest. `None` when the name is blank or no reward is left
    /// after dropping zero-XP entries.
    pub fn add_custom_quest(&mut self, new: NewQuest) -> Result<Option<Quest>, EngineError> {
        let name = new.name.trim();
        let rewards = normalize_rewards(new.rewards);
        if name.is_empty() || rewards.is_empty() {
            return Ok(None);
        }
        let mut quest = Quest::new(
            &format!("custom_{}", uuid::Uuid::new_v4().simple()),
            name,
            new.frequency,
            rewards,
        );
        quest.custom = true;
        self.profile.quests.push(quest.clone());
        self.profile.ledger.rebuild_caches(&self.profile.quests, self.clock.today());
        self.save()?;
        info!(quest = %quest.id, "custom quest added");
        Ok(Some(quest))
    }

    fn custom_quest_mut(&mut self, id: &str) -> Option<&mut Quest> {
        self.profile.quests.iter_mut().find(|q| q.id == id && q.custom)
    }

    /// Edit a custom quest. Catalog quests are read-only.
    pub fn edit_quest(&mut self, id: &str, edit: QuestEdit) -> Result<bool, EngineError> {
        let name = edit
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let rewards = edit.rewards.map(normalize_rewards).filter(|r| !r.is_empty());
        let Some(quest) = self.custom_quest_mut(id) else {
            return Ok(false);
        };
        if let Some(name) = name {
            quest.name = name;
        }
        if let Some(frequency) = edit.frequency {
            quest.frequency = frequency;
        }
        if let Some(rewards) = rewards {
            quest.rewards = rewards;
        }
        self.profile.ledger.rebuild_caches(&self.profile.quests, self.clock.today());
        self.save()?;
        Ok(true)
    }

    pub fn set_quest_active(&mut self, id: &str, active: bool) -> Result<bool, EngineError> {
        let Some(quest) = self.custom_quest_mut(id) else {
            return Ok(false);
        };
        quest.active = active;
        self.save()?;
        Ok(true)
    }

    /// Delete a custom quest. Its ledger entries stay.
    pub fn delete_quest(&mut self, id: &str) -> Result<bool, EngineError> {
        let before = self.profile.quests.len();
        self.profile.quests.retain(|q| !(q.id == id && q.custom));
        if self.profile.quests.len() == before {
            return Ok(false);
        }
        self.profile.ledger.rebuild_caches(&self.profile.quests, self.clock.today());
        self.save()?;
        info!(quest = id, "custom quest deleted");
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Collection log
    // ------------------------------------------------------------------

    pub fn add_collection_entry(
        &mut self,
        title: &str,
        description: &str,
        tags: &str,
    ) -> Result<Option<CollectionEntry>, EngineError> {
        if title.trim().is_empty() {
            return Ok(None);
        }
        let entry = CollectionEntry::new(title, description, tags, self.clock.now_utc());
        self.profile.collection_log.push(entry.clone());
        self.save()?;
        Ok(Some(entry))
    }

    pub fn complete_collection_entry(
        &mut self,
        id: &str,
        photo: String,
    ) -> Result<bool, EngineError> {
        let now = self.clock.now_utc();
        if !collection_log::complete(&mut self.profile.collection_log, id, photo, now) {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn remove_collection_entry(&mut self, id: &str) -> Result<bool, EngineError> {
        let before = self.profile.collection_log.len();
        self.profile.collection_log.retain(|e| e.id != id);
        let removed = self.profile.collection_log.len() != before;
        self.save_if(removed)?;
        Ok(removed)
    }

    pub fn collection_stats(&self) -> CollectionStats {
        collection_log::stats(&self.profile.collection_log)
    }

    /// Every tag in the collection log, for filtering.
    pub fn collection_tags(&self) -> Vec<String> {
        collection_log::all_tags(&self.profile.collection_log)
    }

    // ------------------------------------------------------------------
    // Import / export
    // ------------------------------------------------------------------

    pub fn export_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(&self.profile)?)
    }

    /// Replace the profile wholesale, migrating if the document is older.
    pub fn import_json(&mut self, raw: &str) -> Result<MigrationReport, EngineError> {
        let report = self.adopt_document(raw)?;
        self.roll_forward();
        self.save()?;
        info!(from = report.from_version, "profile imported");
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn skills(&self) -> &SkillSet {
        &self.profile.skills
    }

    pub fn skill(&self, id: SkillId) -> Option<&Skill> {
        self.profile.skills.get(&id)
    }

    pub fn level(&self, id: SkillId) -> u8 {
        self.skill(id).map_or(1, Skill::level)
    }

    /// Fraction of the way through the current level, 0.0..=1.0.
    pub fn level_progress(&self, id: SkillId) -> f64 {
        level_progress(self.skill(id).map_or(0, |s| s.xp))
    }

    /// XP still needed for the next level, `None` at the cap.
    pub fn xp_to_next_level(&self, id: SkillId) -> Option<u64> {
        xp_to_next_level(self.skill(id).map_or(0, |s| s.xp))
    }

    pub fn total_level(&self) -> u32 {
        total_level(&self.profile.skills)
    }

    pub fn xp_today(&self) -> u64 {
        self.profile.ledger.xp_on(self.clock.today())
    }

    /// XP per skill since Monday.
    pub fn weekly_xp(&self) -> BTreeMap<SkillId, u64> {
        let today = self.clock.today();
        self.profile.ledger.xp_by_skill_between(start_of_week(today), today)
    }

    pub fn quests(&self) -> &[Quest] {
        &self.profile.quests
    }

    /// Active quests that pay into `skill`.
    pub fn quests_for_skill(&self, skill: SkillId) -> impl Iterator<Item = &Quest> {
        self.profile.quests.iter().filter(move |q| q.active && q.rewards_skill(skill))
    }

    pub fn paths(&self) -> &[Path] {
        &self.profile.paths
    }

    pub fn challenges(&self) -> &[Challenge] {
        &self.profile.challenges
    }

    pub fn active_challenges(&self) -> impl Iterator<Item = &Challenge> {
        self.profile.challenges.iter().filter(|c| c.active)
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.profile.achievements
    }

    /// (tier, completed, total) for each tier.
    pub fn achievement_summary(&self) -> Vec<(Tier, usize, usize)> {
        tier_summary(&self.profile.achievements)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.profile.ledger
    }

    /// Completions with a photo attached, newest first.
    pub fn photos(&self) -> Vec<&CompletionRecord> {
        self.profile.ledger.with_photos()
    }

    pub fn collection_log(&self) -> &[CollectionEntry] {
        &self.profile.collection_log
    }

    /// Report from the migration run at open or import, if any.
    pub fn last_migration(&self) -> Option<&MigrationReport> {
        self.last_migration.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Test and embedding hook: edit the profile directly, then persist.
    pub fn update_profile<F: FnOnce(&mut Profile)>(&mut self, f: F) -> Result<(), EngineError> {
        f(&mut self.profile);
        self.profile.ledger.rebuild_caches(&self.profile.quests, self.clock.today());
        self.save()
    }
}

/// Credit an unlocked achievement's bonus XP. Bonuses do not touch streaks.
fn apply_bonus(skills: &mut SkillSet, unlocked: &UnlockedAchievement) -> Option<LevelUp> {
    let reward = unlocked.reward.as_ref()?;
    let (Some(xp), Some(skill)) = (reward.bonus_xp, reward.skill) else {
        return None;
    };
    let (from, to) = skills.entry(skill).or_default().award(xp as u64);
    info!(achievement = %unlocked.id, %skill, xp, "achievement bonus");
    (to > from).then_some(LevelUp { skill, from, to })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn engine() -> Engine<MemoryStore, FixedClock> {
        let clock = FixedClock::at_noon(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        Engine::open(MemoryStore::new(), clock, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_unknown_and_repeat_rejected() {
        let mut e = engine();
        assert_eq!(
            e.complete_quest("nope", None).unwrap(),
            CompletionOutcome::Rejected(RejectReason::UnknownQuest)
        );
        assert!(e.complete_quest("run", None).unwrap().result().is_some());
        assert_eq!(
            e.complete_quest("run", None).unwrap(),
            CompletionOutcome::Rejected(RejectReason::NotAvailable(Frequency::Daily))
        );
        assert!(!e.can_complete_quest("run"));
    }

    #[test]
    fn test_save_drops_backup_when_full() {
        let mut e = engine();
        let doc_len = serde_json::to_string(e.profile()).unwrap().len() as u64;
        let mut store = MemoryStore::new().with_quota(doc_len + 50);
        store.set(DEFAULT_BACKUP, &"x".repeat(200)).unwrap();
        e.store = store;
        e.save().unwrap();
        assert!(!e.store().contains(DEFAULT_BACKUP));
    }

    #[test]
    fn test_save_reports_storage_full() {
        let mut e = engine();
        e.store = MemoryStore::new().with_quota(16);
        let err = e.save().unwrap_err();
        assert!(matches!(err, EngineError::StorageFull { .. }));
        assert_eq!(err.code(), -32011);
    }

    #[test]
    fn test_bonus_xp_applied_once() {
        let mut e = engine();
        e.update_profile(|p| {
            p.achievements.push(
                Achievement::new(
                    "bonus_run",
                    "Bonus",
                    "",
                    crate::achievements::Tier::Beginner,
                    crate::achievements::Trigger::QuestCount {
                        quest_id: Some("run".into()),
                        count: 1,
                    },
                )
                .with_reward(crate::achievements::AchievementReward {
                    bonus_xp: Some(100),
                    skill: Some(SkillId::Athleticism),
                    message: None,
                }),
            )
        })
        .unwrap();
        let outcome = e.complete_quest("run", None).unwrap();
        let result = outcome.result().unwrap();
        assert!(result.achievements_unlocked.iter().any(|a| a.id == "bonus_run"));
        assert_eq!(e.skill(SkillId::Athleticism).unwrap().xp, 150);
        // 150 xp crosses the level-2 threshold of 83.
        assert!(result.level_ups.iter().any(|l| l.skill == SkillId::Athleticism && l.to == 2));
    }

    const DEFAULT_BACKUP: &str = crate::config::DEFAULT_BACKUP_KEY;
}
