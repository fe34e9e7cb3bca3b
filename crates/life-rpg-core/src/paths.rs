//! Multi-stage paths.
//!
//! Stages form a strict line: stage i takes progress only once stage i-1 is
//! completed. Stage 0 is always open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: String,
    pub name: String,
    /// Quests that must each be done once to clear the stage
    pub quest_ids: Vec<String>,
    /// Required quests already done
    #[serde(default)]
    pub satisfied_quests: BTreeSet<String>,
    #[serde(default)]
    pub completed: bool,
    /// When the last required quest was done
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
}

impl Stage {
    pub fn new(id: &str, name: &str, quest_ids: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            quest_ids: quest_ids.iter().map(|q| q.to_string()).collect(),
            satisfied_quests: BTreeSet::new(),
            completed: false,
            completed_date: None,
        }
    }

    fn requires(&self, quest_id: &str) -> bool {
        self.quest_ids.iter().any(|q| q == quest_id)
    }

    fn all_satisfied(&self) -> bool {
        self.quest_ids.iter().all(|q| self.satisfied_quests.contains(q))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Path {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Cleared strictly in order
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
}

/// What one completion did to one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PathEvent {
    QuestSatisfied { path_id: String, stage_index: usize, quest_id: String },
    StageCompleted { path_id: String, stage_index: usize },
    PathCompleted { path_id: String },
}

impl Path {
    pub fn new(id: &str, name: &str, description: &str, stages: Vec<Stage>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            stages,
            completed: false,
            completed_date: None,
        }
    }

    /// A stage is locked while its predecessor is incomplete.
    pub fn is_unlocked(&self, index: usize) -> bool {
        index == 0 || self.stages.get(index - 1).map(|s| s.completed).unwrap_or(false)
    }

    /// Index of the first stage not yet completed, `None` when all are done.
    pub fn current_stage(&self) -> Option<usize> {
        self.stages.iter().position(|s| !s.completed)
    }

    pub fn satisfied_count(&self) -> usize {
        self.stages.iter().map(|s| s.satisfied_quests.len()).sum()
    }

    pub fn required_count(&self) -> usize {
        self.stages.iter().map(|s| s.quest_ids.len()).sum()
    }

    pub fn is_stage_complete(&self, index: usize) -> bool {
        self.stages.get(index).map(|s| s.completed).unwrap_or(false)
    }

    /// Apply one quest completion. Only the first open stage that needs the
    /// quest and has not yet seen it moves.
    pub fn on_quest_completed(&mut self, quest_id: &str, now: DateTime<Utc>) -> Vec<PathEvent> {
        let mut events = Vec::new();
        let target = (0..self.stages.len()).find(|&i| {
            let stage = &self.stages[i];
            self.is_unlocked(i)
                && !stage.completed
                && stage.requires(quest_id)
                && !stage.satisfied_quests.contains(quest_id)
        });
        let Some(index) = target else {
            return events;
        };

        let stage = &mut self.stages[index];
        stage.satisfied_quests.insert(quest_id.to_string());
        events.push(PathEvent::QuestSatisfied {
            path_id: self.id.clone(),
            stage_index: index,
            quest_id: quest_id.to_string(),
        });

        if stage.all_satisfied() {
            stage.completed = true;
            stage.completed_date = Some(now);
            events.push(PathEvent::StageCompleted { path_id: self.id.clone(), stage_index: index });

            if !self.completed && self.stages.iter().all(|s| s.completed) {
                self.completed = true;
                self.completed_date = Some(now);
                events.push(PathEvent::PathCompleted { path_id: self.id.clone() });
            }
        }
        events
    }
}

/// Fan one completion out to every path.
pub fn on_quest_completed(
    paths: &mut [Path],
    quest_id: &str,
    now: DateTime<Utc>,
) -> Vec<PathEvent> {
    paths
        .iter_mut()
        .flat_map(|p| p.on_quest_completed(quest_id, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stage() -> Path {
        Path::new(
            "p",
            "Path",
            "",
            vec![Stage::new("a", "A", &["q1", "q2"]), Stage::new("b", "B", &["q3"])],
        )
    }

    #[test]
    fn test_locked_stage_ignores_quest() {
        let mut path = two_stage();
        let events = path.on_quest_completed("q3", Utc::now());
        assert!(events.is_empty());
        assert!(path.stages[1].satisfied_quests.is_empty());
    }

    #[test]
    fn test_stage_gate_sequence() {
        let mut path = two_stage();
        let now = Utc::now();
        assert_eq!(path.on_quest_completed("q1", now).len(), 1);
        let events = path.on_quest_completed("q2", now);
        let cleared = PathEvent::StageCompleted { path_id: "p".into(), stage_index: 0 };
        assert!(events.contains(&cleared));
        assert!(path.is_unlocked(1));
        assert!(!path.completed);

        let events = path.on_quest_completed("q3", now);
        assert!(events.contains(&PathEvent::PathCompleted { path_id: "p".into() }));
        assert!(path.completed);
        assert_eq!(path.current_stage(), None);
    }

    #[test]
    fn test_repeat_completion_is_silent() {
        let mut path = two_stage();
        let now = Utc::now();
        path.on_quest_completed("q1", now);
        assert!(path.on_quest_completed("q1", now).is_empty());
        assert_eq!(path.satisfied_count(), 1);
    }

    #[test]
    fn test_quest_in_two_stages_advances_first_open() {
        let mut path = Path::new(
            "p",
            "Path",
            "",
            vec![Stage::new("a", "A", &["q1"]), Stage::new("b", "B", &["q1", "q2"])],
        );
        let now = Utc::now();
        let events = path.on_quest_completed("q1", now);
        assert_eq!(events.len(), 2);
        assert!(path.stages[1].satisfied_quests.is_empty());

        // Second completion now lands in the unlocked stage B
        path.on_quest_completed("q1", now);
        assert!(path.stages[1].satisfied_quests.contains("q1"));
    }
}
