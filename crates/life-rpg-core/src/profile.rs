//! The persisted player profile: one JSON document holding all progression
//! state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::achievements::{Achievement, ProgressView};
use crate::challenges::Challenge;
use crate::collection_log::CollectionEntry;
use crate::ledger::Ledger;
use crate::paths::Path;
use crate::quests::Quest;
use crate::registry::{self, CURRENT_VERSION};
use crate::skills::{fresh_skills, SkillSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_player_name")]
    pub player_name: String,
    #[serde(default)]
    pub onboarding_complete: bool,
}

fn default_player_name() -> String {
    "Adventurer".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            player_name: default_player_name(),
            onboarding_complete: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub version: u32,
    pub skills: SkillSet,
    pub quests: Vec<Quest>,
    pub paths: Vec<Path>,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    pub achievements: Vec<Achievement>,
    #[serde(flatten)]
    pub ledger: Ledger,
    #[serde(default)]
    pub last_active_date: Option<NaiveDate>,
    /// Every successful challenge start, restarts included.
    #[serde(default)]
    pub challenges_started: u32,
    #[serde(default)]
    pub collection_log: Vec<CollectionEntry>,
    #[serde(default)]
    pub settings: Settings,
}

impl Profile {
    /// A brand-new profile built from the default catalogs.
    pub fn fresh() -> Self {
        Self {
            version: CURRENT_VERSION,
            skills: fresh_skills(),
            quests: registry::default_quests(),
            paths: registry::default_paths(),
            challenges: Vec::new(),
            achievements: registry::default_achievements(),
            ledger: Ledger::new(),
            last_active_date: None,
            challenges_started: 0,
            collection_log: Vec::new(),
            settings: Settings::default(),
        }
    }

    pub fn quest(&self, id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    pub fn challenge(&self, id: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == id)
    }

    pub fn progress_view(&self) -> ProgressView<'_> {
        ProgressView {
            skills: &self.skills,
            ledger: &self.ledger,
            paths: &self.paths,
            challenges: &self.challenges,
            challenges_started: self.challenges_started,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::fresh()
    }
}
