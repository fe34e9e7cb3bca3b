//! Recurring challenges.
//!
//! A challenge asks for a fixed set of quests inside every period. Periods are
//! closed lazily: the sweep runs on the first interaction of a new day, and a
//! gap of several periods collapses into a single closure.

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::local_day;
use crate::quests::Quest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub value: u32,
    pub unit: IntervalUnit,
}

impl Interval {
    pub const fn days(value: u32) -> Self {
        Self { value, unit: IntervalUnit::Days }
    }

    pub const fn weeks(value: u32) -> Self {
        Self { value, unit: IntervalUnit::Weeks }
    }

    pub const fn months(value: u32) -> Self {
        Self { value, unit: IntervalUnit::Months }
    }

    /// Last day of a period that starts on `start`. A one-day interval ends
    /// the day it starts.
    pub fn period_end(&self, start: NaiveDate) -> NaiveDate {
        let value = self.value.max(1);
        let after = match self.unit {
            IntervalUnit::Days => start.checked_add_days(Days::new(value as u64)),
            IntervalUnit::Weeks => start.checked_add_days(Days::new(7 * value as u64)),
            IntervalUnit::Months => start.checked_add_months(Months::new(value)),
        };
        after
            .and_then(|d| d.checked_sub_days(Days::new(1)))
            .unwrap_or(start)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodCompletion {
    pub quest_id: String,
    pub completed_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub completed_quests: Vec<PeriodCompletion>,
}

impl Period {
    pub fn open(start: NaiveDate, interval: &Interval) -> Self {
        Self {
            start_date: start,
            end_date: interval.period_end(start),
            completed_quests: Vec::new(),
        }
    }

    pub fn has(&self, quest_id: &str) -> bool {
        self.completed_quests.iter().any(|c| c.quest_id == quest_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub completed_quests: Vec<PeriodCompletion>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Same as the template id for template-built challenges
    pub id: String,
    #[serde(default)]
    pub template_id: Option<String>,
    pub name: String,
    /// Quests required in every period
    pub quest_ids: Vec<String>,
    /// Length of one period
    pub interval: Interval,
    /// Period still open for completions
    pub current_period: Period,
    /// Consecutive successful periods
    #[serde(default)]
    pub current_streak: u32,
    /// Best streak ever, kept across restarts
    #[serde(default)]
    pub longest_streak: u32,
    /// Closed periods, oldest first
    #[serde(default)]
    pub history: Vec<ClosedPeriod>,
    /// False once abandoned or finished
    #[serde(default)]
    pub active: bool,
    /// Time of the latest start or restart
    pub started_date: DateTime<Utc>,
    /// Successful periods needed to finish, if the challenge has an end.
    #[serde(default)]
    pub target_periods: Option<u32>,
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ChallengeEvent {
    QuestRecorded { challenge_id: String, quest_id: String },
    PeriodSatisfied { challenge_id: String },
    PeriodClosed { challenge_id: String, success: bool, current_streak: u32 },
    ChallengeFinished { challenge_id: String },
}

/// Reusable blueprint for a challenge, with its own quest definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub interval: Interval,
    pub target_periods: Option<u32>,
    pub quests: Vec<Quest>,
}

impl ChallengeTemplate {
    pub fn quest_ids(&self) -> Vec<String> {
        self.quests.iter().map(|q| q.id.clone()).collect()
    }
}

impl Challenge {
    pub fn from_template(template: &ChallengeTemplate, now: DateTime<Utc>) -> Self {
        Self {
            id: template.id.to_string(),
            template_id: Some(template.id.to_string()),
            name: template.name.to_string(),
            quest_ids: template.quest_ids(),
            interval: template.interval,
            current_period: Period::open(local_day(&now), &template.interval),
            current_streak: 0,
            longest_streak: 0,
            history: Vec::new(),
            active: true,
            started_date: now,
            target_periods: template.target_periods,
            finished: false,
        }
    }

    /// Reactivate a stopped challenge. History and best streak survive.
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.current_period = Period::open(local_day(&now), &self.interval);
        self.current_streak = 0;
        self.active = true;
        self.finished = false;
        self.started_date = now;
    }

    pub fn requires(&self, quest_id: &str) -> bool {
        self.quest_ids.iter().any(|q| q == quest_id)
    }

    pub fn is_period_satisfied(&self) -> bool {
        self.quest_ids.iter().all(|q| self.current_period.has(q))
    }

    /// Archived successes, plus the current period once it is already met.
    pub fn successful_periods(&self) -> u32 {
        let archived = self.history.iter().filter(|p| p.success).count() as u32;
        archived + u32::from(self.active && self.is_period_satisfied())
    }

    fn record(&mut self, quest_id: &str, now: DateTime<Utc>) -> Vec<ChallengeEvent> {
        if !self.active || !self.requires(quest_id) || self.current_period.has(quest_id) {
            return Vec::new();
        }
        self.current_period.completed_quests.push(PeriodCompletion {
            quest_id: quest_id.to_string(),
            completed_date: now,
        });
        let mut events = vec![ChallengeEvent::QuestRecorded {
            challenge_id: self.id.clone(),
            quest_id: quest_id.to_string(),
        }];
        if self.is_period_satisfied() {
            events.push(ChallengeEvent::PeriodSatisfied { challenge_id: self.id.clone() });
        }
        events
    }

    /// Drop the current-period mark for a completion being undone on `day`.
    pub fn forget(&mut self, quest_id: &str, day: NaiveDate) -> bool {
        let before = self.current_period.completed_quests.len();
        self.current_period
            .completed_quests
            .retain(|c| !(c.quest_id == quest_id && local_day(&c.completed_date) == day));
        before != self.current_period.completed_quests.len()
    }

    /// Close the current period if `today` is past its end.
    ///
    /// A gap longer than one period is still a single closure, but the
    /// streak does not survive it.
    pub fn roll_over(&mut self, today: NaiveDate) -> Vec<ChallengeEvent> {
        if !self.active || today <= self.current_period.end_date {
            return Vec::new();
        }
        let success = self.is_period_satisfied();
        let skipped = self
            .current_period
            .end_date
            .succ_opt()
            .map_or(false, |next| today > self.interval.period_end(next));
        let next = Period::open(today, &self.interval);
        let closed = std::mem::replace(&mut self.current_period, next);
        self.history.push(ClosedPeriod {
            start_date: closed.start_date,
            end_date: closed.end_date,
            completed_quests: closed.completed_quests,
            success,
        });

        if success {
            self.current_streak += 1;
            self.longest_streak = self.longest_streak.max(self.current_streak);
        } else {
            self.current_streak = 0;
        }
        info!(
            challenge = %self.id,
            success,
            streak = self.current_streak,
            "challenge period closed"
        );

        let finished = self.target_periods.map_or(false, |target| self.current_streak >= target);
        if skipped && !finished {
            self.current_streak = 0;
        }

        let mut events = vec![ChallengeEvent::PeriodClosed {
            challenge_id: self.id.clone(),
            success,
            current_streak: self.current_streak,
        }];
        if finished {
            self.finished = true;
            self.active = false;
            events.push(ChallengeEvent::ChallengeFinished { challenge_id: self.id.clone() });
        }
        events
    }
}

/// Record a completion against every active challenge that needs it.
pub fn on_quest_completed(
    challenges: &mut [Challenge],
    quest_id: &str,
    now: DateTime<Utc>,
) -> Vec<ChallengeEvent> {
    challenges.iter_mut().flat_map(|c| c.record(quest_id, now)).collect()
}

/// Close every expired period.
pub fn process_periods(challenges: &mut [Challenge], today: NaiveDate) -> Vec<ChallengeEvent> {
    challenges.iter_mut().flat_map(|c| c.roll_over(today)).collect()
}

/// Merge a template's quests into the catalog: add missing ones, point
/// existing ones at the challenge.
pub fn adopt_template_quests(catalog: &mut Vec<Quest>, template: &ChallengeTemplate) -> usize {
    let mut added = 0;
    for quest in &template.quests {
        match catalog.iter_mut().find(|q| q.id == quest.id) {
            Some(existing) => existing.challenge_id = Some(template.id.to_string()),
            None => {
                let mut quest = quest.clone();
                quest.challenge_id = Some(template.id.to_string());
                catalog.push(quest);
                added += 1;
            }
        }
    }
    added
}
