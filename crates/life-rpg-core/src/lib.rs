//! Life RPG progression engine.
//!
//! Turns completed real-life quests into XP, levels, streaks, path progress,
//! challenge periods and achievements, all held in one JSON document that is
//! migrated forward from every earlier schema on load.

pub mod achievements;
pub mod challenges;
pub mod clock;
pub mod collection_log;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod leveling;
pub mod migrate;
pub mod paths;
pub mod profile;
pub mod quests;
pub mod registry;
pub mod skills;
pub mod store;

pub use achievements::{Achievement, AchievementReward, Tier, Trigger, UnlockedAchievement};
pub use challenges::{Challenge, ChallengeEvent, Interval, IntervalUnit};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{
    CompletionOutcome, CompletionResult, Engine, LevelUp, RejectReason, ResetReport,
    StartChallengeOutcome, UndoOutcome,
};
pub use error::{EngineError, StoreError};
pub use ledger::{CompletionRecord, Ledger};
pub use leveling::{level_from_xp, xp_required_for_level, MAX_LEVEL};
pub use migrate::{FragmentFallback, MigrationReport, StepReport};
pub use paths::{Path, PathEvent, Stage};
pub use profile::{Profile, Settings};
pub use quests::{Frequency, NewQuest, Quest, QuestEdit, Reward};
pub use registry::CURRENT_VERSION;
pub use skills::{Skill, SkillId};
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
