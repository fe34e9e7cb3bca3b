//! Schema migrations for the persisted profile.
//!
//! Works on the raw JSON document so that every historical shape can be read.
//! Steps run in order, each gated on the stored version, and each reports the
//! fragments it had to replace instead of aborting the load:
//!
//! - v1 -> v2: single-skill quests become reward lists, `type` becomes
//!   `frequency`, the completed-today list is replayed into the ledger,
//!   tiered achievements are flattened onto the trigger catalog, and the
//!   75 Hard checklist becomes a period-tracked challenge.
//! - v2 -> v3: six skills become ten. XP is split by percentage, streaks
//!   take the max over their sources, and every skill reference is remapped.
//! - normalize: always runs. Fills in settings, one entry per current skill,
//!   and any catalog entries the document is missing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::challenges::Challenge;
use crate::clock::{local_day, local_noon, parse_any_date, parse_any_instant};
use crate::error::EngineError;
use crate::registry::{
    self, challenge_template, primary_successor, successors_of, CURRENT_VERSION,
    LEGACY_75HARD_CHECKLIST, LEGACY_SKILLS,
};
use crate::skills::{Skill, SkillId};

/// A fragment that could not be carried over and was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentFallback {
    pub fragment: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub target_version: u32,
    pub fallbacks: Vec<FragmentFallback>,
}

impl StepReport {
    fn new(target_version: u32) -> Self {
        Self { target_version, fallbacks: Vec::new() }
    }

    fn fallback(&mut self, fragment: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(fragment, %reason, version = self.target_version, "migration fallback");
        self.fallbacks.push(FragmentFallback { fragment: fragment.to_string(), reason });
    }

    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub steps: Vec<StepReport>,
    pub normalization: StepReport,
}

impl MigrationReport {
    pub fn migrated(&self) -> bool {
        self.from_version < self.to_version
    }

    pub fn fallbacks(&self) -> impl Iterator<Item = &FragmentFallback> {
        self.steps
            .iter()
            .chain(std::iter::once(&self.normalization))
            .flat_map(|s| s.fallbacks.iter())
    }
}

/// Version tag of a stored document. Untagged documents are v1.
pub fn stored_version(doc: &Value) -> u32 {
    doc.get("version")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(1)
}

/// Upgrade `doc` in place to [`CURRENT_VERSION`].
pub fn migrate(doc: &mut Value, now: DateTime<Utc>) -> Result<MigrationReport, EngineError> {
    let from_version = stored_version(doc);
    if from_version > CURRENT_VERSION {
        return Err(EngineError::CorruptDocument(format!(
            "profile version {} is newer than supported version {}",
            from_version, CURRENT_VERSION
        )));
    }
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| EngineError::CorruptDocument("profile is not a JSON object".to_string()))?;

    let mut report = MigrationReport {
        from_version,
        to_version: CURRENT_VERSION,
        ..Default::default()
    };

    if from_version < 2 {
        info!("migrating profile v1 -> v2");
        report.steps.push(v1_to_v2(obj, now));
        obj.insert("version".into(), json!(2));
    }
    if from_version < 3 {
        info!("migrating profile v2 -> v3");
        report.steps.push(v2_to_v3(obj));
        obj.insert("version".into(), json!(3));
    }
    report.normalization = normalize(obj);
    obj.insert("version".into(), json!(CURRENT_VERSION));

    debug!(from = from_version, fallbacks = report.fallbacks().count(), "migration finished");
    Ok(report)
}

// ============================================================================
// Value helpers
// ============================================================================

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Non-negative integer out of whatever a legacy field holds.
fn lossy_u64(v: Option<&Value>) -> u64 {
    match v {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f.floor() as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| *f > 0.0)
            .map(|f| f.floor() as u64)
            .unwrap_or(0),
        _ => 0,
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn date_value(date: Option<NaiveDate>) -> Value {
    date.map(|d| json!(d.format("%Y-%m-%d").to_string())).unwrap_or(Value::Null)
}

fn ensure_array<'a>(obj: &'a mut Map<String, Value>, key: &str) -> &'a mut Vec<Value> {
    let entry = obj.entry(key.to_string()).or_insert_with(|| json!([]));
    if !entry.is_array() {
        *entry = json!([]);
    }
    match entry {
        Value::Array(items) => items,
        _ => unreachable!("entry was just forced to an array"),
    }
}

fn has_id(items: &[Value], id: &str) -> bool {
    items.iter().any(|v| v.get("id").and_then(Value::as_str) == Some(id))
}

const FREQUENCIES: [&str; 5] = ["daily", "weekly", "monthly", "as-needed", "one-time"];

// ============================================================================
// v1 -> v2
// ============================================================================

fn v1_to_v2(doc: &mut Map<String, Value>, now: DateTime<Utc>) -> StepReport {
    let mut report = StepReport::new(2);

    doc.insert("skills".into(), v1_skills(doc.get("skills")));
    let quests = v1_quests(doc.get("quests"), &mut report);
    doc.insert("quests".into(), Value::Array(quests));

    let mut log = v1_ledger(doc.remove("completedToday"), now);
    let orphans = attach_photos(&mut log, doc.remove("photos"), now);
    ensure_array(doc, "completionLog").extend(log);
    ensure_array(doc, "collectionLog").extend(orphans);

    if !doc.get("paths").map(Value::is_array).unwrap_or(false) {
        doc.insert("paths".into(), to_value(&registry::default_paths()));
    }

    let flat = match doc.remove("achievements") {
        Some(Value::Array(items)) => Value::Array(items),
        Some(Value::Object(tiers)) => Value::Array(flatten_achievements(&tiers)),
        _ => to_value(&registry::default_achievements()),
    };
    doc.insert("achievements".into(), flat);

    let legacy_challenge = doc.remove("activeChallenge").filter(|v| !v.is_null());
    let last_active = str_field(doc, "lastActiveDate").and_then(parse_any_date);
    doc.insert("lastActiveDate".into(), date_value(last_active));

    if !doc.get("challenges").map(Value::is_array).unwrap_or(false) {
        doc.insert("challenges".into(), json!([]));
    }
    if let Some(raw) = legacy_challenge {
        migrate_legacy_challenge(doc, &raw, last_active, now, &mut report);
    }

    report
}

fn v1_skills(raw: Option<&Value>) -> Value {
    let mut skills = Map::new();
    for id in LEGACY_SKILLS {
        let old = raw.and_then(|s| s.get(id)).and_then(Value::as_object);
        let current = lossy_u64(old.and_then(|o| o.get("currentStreak")));
        let longest = lossy_u64(old.and_then(|o| o.get("longestStreak"))).max(current);
        let last = old
            .and_then(|o| str_field(o, "lastAwardedDate").or_else(|| str_field(o, "lastCompleted")))
            .and_then(parse_any_date);
        skills.insert(
            id.to_string(),
            json!({
                "xp": lossy_u64(old.and_then(|o| o.get("xp"))),
                "currentStreak": current,
                "longestStreak": longest,
                "lastAwardedDate": date_value(last),
            }),
        );
    }
    Value::Object(skills)
}

fn v1_quests(raw: Option<&Value>, report: &mut StepReport) -> Vec<Value> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return match serde_json::to_value(registry::default_quests()) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        };
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(old) = item.as_object() else {
            report.fallback(&format!("quests[{}]", i), "not an object, dropped");
            continue;
        };
        let Some(id) = str_field(old, "id") else {
            report.fallback(&format!("quests[{}]", i), "quest without id, dropped");
            continue;
        };

        let rewards = match old.get("rewards") {
            Some(Value::Array(r)) => Value::Array(r.clone()),
            _ => match str_field(old, "skill") {
                Some(skill) => json!([{ "skill": skill, "xp": lossy_u64(old.get("xp")) }]),
                None => json!([]),
            },
        };
        let frequency = str_field(old, "frequency")
            .or_else(|| str_field(old, "type"))
            .filter(|f| FREQUENCIES.contains(f))
            .unwrap_or("daily");

        out.push(json!({
            "id": id,
            "name": str_field(old, "name").unwrap_or(id),
            "frequency": frequency,
            "rewards": rewards,
            "challengeId": old.get("challengeId").cloned().unwrap_or(Value::Null),
            "custom": old.get("custom").and_then(Value::as_bool).unwrap_or(false),
            "active": old.get("active").and_then(Value::as_bool).unwrap_or(true),
        }));
    }
    out
}

/// Replay the v1 completed-today list as ledger entries.
fn v1_ledger(raw: Option<Value>, now: DateTime<Utc>) -> Vec<Value> {
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|c| {
            let quest_id = str_field(c, "questId")?;
            let ts = str_field(c, "timestamp").and_then(parse_any_instant).unwrap_or(now);
            let awarded = match (str_field(c, "skill"), c.get("xpAwarded")) {
                (_, Some(Value::Array(list))) => Value::Array(list.clone()),
                (Some(skill), _) => json!([{ "skill": skill, "xp": lossy_u64(c.get("xp")) }]),
                (None, _) => json!([]),
            };
            Some(json!({
                "questId": quest_id,
                "timestamp": to_value(&ts),
                "xpAwarded": awarded,
                "photo": Value::Null,
            }))
        })
        .collect()
}

/// Hang v1 photos on the same-day completion of their quest. Photos with no
/// matching completion become completed collection-log entries.
fn attach_photos(log: &mut [Value], raw: Option<Value>, now: DateTime<Utc>) -> Vec<Value> {
    let Some(Value::Array(photos)) = raw else {
        return Vec::new();
    };
    let mut orphans = Vec::new();
    for photo in photos.iter().filter_map(Value::as_object) {
        let Some(url) = str_field(photo, "url") else {
            continue;
        };
        let date = str_field(photo, "date").and_then(parse_any_instant);
        let quest_id = str_field(photo, "questId");

        let slot = log.iter_mut().find(|entry| {
            let stamp = entry
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(parse_any_instant);
            quest_id.is_some()
                && entry.get("questId").and_then(Value::as_str) == quest_id
                && entry.get("photo").map(Value::is_null).unwrap_or(true)
                && match (date, stamp) {
                    (Some(p), Some(e)) => local_day(&p) == local_day(&e),
                    _ => false,
                }
        });
        match slot {
            Some(entry) => {
                entry["photo"] = json!(url);
            }
            None => {
                let title = quest_id
                    .map(|q| format!("Photo: {}", q))
                    .unwrap_or_else(|| {
                        format!("Photo: {}", str_field(photo, "category").unwrap_or("memory"))
                    });
                let stamp = to_value(&date.unwrap_or(now));
                orphans.push(json!({
                    "id": format!("log_photo_{}", lossy_u64(photo.get("id"))),
                    "title": title,
                    "description": "",
                    "tags": ["photo"],
                    "completed": true,
                    "photo": url,
                    "dateAdded": stamp.clone(),
                    "dateCompleted": stamp,
                }));
            }
        }
    }
    orphans
}

/// Map v1 `{tier: [achievement, ...]}` onto the flat trigger catalog by id.
fn flatten_achievements(tiers: &Map<String, Value>) -> Vec<Value> {
    let mut legacy: BTreeMap<String, (String, Map<String, Value>)> = BTreeMap::new();
    for (tier, list) in tiers {
        for item in list.as_array().into_iter().flatten().filter_map(Value::as_object) {
            if let Some(id) = str_field(item, "id") {
                legacy.insert(id.to_string(), (tier.clone(), item.clone()));
            }
        }
    }

    let mut out = Vec::new();
    for ach in registry::default_achievements() {
        let mut value = to_value(&ach);
        if let Some((_, old)) = legacy.remove(&ach.id) {
            carry_completion(&mut value, &old);
        }
        out.push(value);
    }

    // Completed legacy achievements without a catalog counterpart survive
    // as manual ones.
    for (id, (tier, old)) in legacy {
        if !old.get("completed").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        let tier = match tier.as_str() {
            "beginner" | "medium" | "hard" | "elite" | "grandmaster" => tier,
            _ => "medium".to_string(),
        };
        let mut value = json!({
            "id": id,
            "name": str_field(&old, "name").unwrap_or(&id),
            "description": str_field(&old, "description").unwrap_or(""),
            "tier": tier,
            "trigger": { "type": "manual" },
            "completed": false,
            "completedDate": Value::Null,
        });
        carry_completion(&mut value, &old);
        out.push(value);
    }
    out
}

fn carry_completion(target: &mut Value, old: &Map<String, Value>) {
    if old.get("completed").and_then(Value::as_bool).unwrap_or(false) {
        target["completed"] = json!(true);
        let date = str_field(old, "date")
            .or_else(|| str_field(old, "completedDate"))
            .and_then(parse_any_instant);
        target["completedDate"] = date.map(|d| to_value(&d)).unwrap_or(Value::Null);
    }
    if target.get("reward").map(Value::is_null).unwrap_or(true) {
        match old.get("reward") {
            Some(Value::String(message)) => target["reward"] = json!({ "message": message }),
            Some(Value::Object(reward)) => target["reward"] = Value::Object(reward.clone()),
            _ => {}
        }
    }
}

/// Carry the v1 single active challenge into the challenge list, or start a
/// fresh one from the template if its record cannot be read.
fn migrate_legacy_challenge(
    doc: &mut Map<String, Value>,
    raw: &Value,
    last_active: Option<NaiveDate>,
    now: DateTime<Utc>,
    report: &mut StepReport,
) {
    let Some(template) = challenge_template("75hard") else {
        report.fallback("activeChallenge", "no 75hard template available, dropped");
        return;
    };

    let challenge = match reshape_legacy_challenge(raw, last_active, now) {
        Ok(challenge) => challenge,
        Err(reason) => {
            report.fallback("activeChallenge", format!("{}; started a fresh 75 Hard", reason));
            to_value(&Challenge::from_template(&template, now))
        }
    };

    let quests = ensure_array(doc, "quests");
    for quest in &template.quests {
        let existing = quests
            .iter_mut()
            .find(|q| q.get("id").and_then(Value::as_str) == Some(quest.id.as_str()));
        match existing {
            Some(existing) => existing["challengeId"] = json!(template.id),
            None => {
                let mut value = to_value(quest);
                value["challengeId"] = json!(template.id);
                quests.push(value);
            }
        }
    }

    let challenges = ensure_array(doc, "challenges");
    if !has_id(challenges, template.id) {
        challenges.push(challenge);
    }
    let started = lossy_u64(doc.get("challengesStarted")).max(1);
    doc.insert("challengesStarted".into(), json!(started));
}

fn reshape_legacy_challenge(
    raw: &Value,
    last_active: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<Value, String> {
    let obj = raw.as_object().ok_or("activeChallenge is not an object")?;
    let day = obj
        .get("day")
        .and_then(Value::as_u64)
        .filter(|d| *d >= 1)
        .ok_or("missing or invalid day counter")?;
    let checklist = obj
        .get("checklist")
        .and_then(Value::as_object)
        .ok_or("missing checklist")?;
    let started = str_field(obj, "startDate")
        .and_then(parse_any_instant)
        .ok_or("missing or invalid startDate")?;
    let template = challenge_template("75hard").ok_or("no 75hard template")?;

    // The checklist belongs to the last day the app was opened.
    let period_day = last_active.unwrap_or_else(|| local_day(&now));
    let stamp = local_noon(period_day).with_timezone(&Utc);
    let mut done = Vec::new();
    for (key, quest_id) in LEGACY_75HARD_CHECKLIST {
        match checklist.get(key) {
            Some(Value::Bool(true)) => {
                done.push(json!({ "questId": quest_id, "completedDate": to_value(&stamp) }))
            }
            Some(Value::Bool(false)) | None => {}
            Some(other) => {
                return Err(format!("checklist item {} is not a boolean: {}", key, other))
            }
        }
    }

    let mut challenge = Challenge::from_template(&template, started);
    let streak = (day - 1) as u32;
    challenge.current_streak = streak;
    challenge.longest_streak = streak;
    challenge.current_period = crate::challenges::Period::open(period_day, &template.interval);
    let mut value = to_value(&challenge);
    value["currentPeriod"]["completedQuests"] = Value::Array(done);
    Ok(value)
}

// ============================================================================
// v2 -> v3
// ============================================================================

#[derive(Default)]
struct SkillAccumulator {
    xp: u64,
    current: u64,
    longest: u64,
    last: Option<NaiveDate>,
}

impl SkillAccumulator {
    fn absorb(&mut self, xp: u64, current: u64, longest: u64, last: Option<NaiveDate>) {
        self.xp += xp;
        self.current = self.current.max(current);
        self.longest = self.longest.max(longest).max(self.current);
        self.last = self.last.max(last);
    }
}

/// Split `xp` by percentage shares. The first share takes the rounding
/// remainder so the parts always sum to `xp`.
pub fn split_xp(xp: u64, shares: &[(SkillId, u64)]) -> Vec<(SkillId, u64)> {
    let mut parts: Vec<(SkillId, u64)> =
        shares.iter().map(|(s, pct)| (*s, xp * pct / 100)).collect();
    let assigned: u64 = parts.iter().map(|(_, x)| x).sum();
    if let Some(first) = parts.first_mut() {
        first.1 += xp.saturating_sub(assigned);
    }
    parts
}

fn v2_to_v3(doc: &mut Map<String, Value>) -> StepReport {
    let mut report = StepReport::new(3);

    let mut acc: BTreeMap<SkillId, SkillAccumulator> =
        SkillId::ALL.iter().map(|s| (*s, SkillAccumulator::default())).collect();
    if let Some(Value::Object(old)) = doc.get("skills") {
        for (id, skill) in old {
            let xp = lossy_u64(skill.get("xp"));
            let current = lossy_u64(skill.get("currentStreak"));
            let longest = lossy_u64(skill.get("longestStreak"));
            let last = skill
                .get("lastAwardedDate")
                .and_then(Value::as_str)
                .and_then(parse_any_date);

            let parts = match (successors_of(id), SkillId::parse(id)) {
                (Some(shares), _) => split_xp(xp, shares),
                (None, Some(same)) => vec![(same, xp)],
                (None, None) => {
                    report.fallback(
                        &format!("skills.{}", id),
                        format!("unknown skill with {} xp dropped", xp),
                    );
                    continue;
                }
            };
            for (target, part) in parts {
                if let Some(slot) = acc.get_mut(&target) {
                    slot.absorb(part, current, longest, last);
                }
            }
        }
    }
    let skills: Map<String, Value> = acc
        .into_iter()
        .map(|(id, a)| {
            (
                id.as_str().to_string(),
                json!({
                    "xp": a.xp,
                    "currentStreak": a.current,
                    "longestStreak": a.longest,
                    "lastAwardedDate": date_value(a.last),
                }),
            )
        })
        .collect();
    doc.insert("skills".into(), Value::Object(skills));

    for (i, quest) in ensure_array(doc, "quests").iter_mut().enumerate() {
        if let Some(rewards) = quest.get_mut("rewards") {
            remap_rewards(rewards, &format!("quests[{}].rewards", i), &mut report);
        }
    }
    for (i, entry) in ensure_array(doc, "completionLog").iter_mut().enumerate() {
        if let Some(awarded) = entry.get_mut("xpAwarded") {
            remap_rewards(awarded, &format!("completionLog[{}].xpAwarded", i), &mut report);
        }
    }
    for ach in ensure_array(doc, "achievements").iter_mut() {
        for holder in ["trigger", "reward"] {
            if let Some(slot) = ach.get_mut(holder).and_then(|h| h.get_mut("skill")) {
                let remapped = slot.as_str().map(|old| {
                    primary_successor(old)
                        .map(|s| json!(s.as_str()))
                        .unwrap_or(Value::Null)
                });
                if let Some(remapped) = remapped {
                    *slot = remapped;
                }
            }
        }
    }

    report
}

/// Point a reward list at v3 skills, merging entries that collapse onto the
/// same successor.
fn remap_rewards(rewards: &mut Value, fragment: &str, report: &mut StepReport) {
    let Some(items) = rewards.as_array() else {
        report.fallback(fragment, "not a list, cleared");
        *rewards = json!([]);
        return;
    };
    let mut merged: Vec<(SkillId, u64)> = Vec::new();
    for item in items {
        let xp = lossy_u64(item.get("xp"));
        let Some(skill) = item.get("skill").and_then(Value::as_str) else {
            continue;
        };
        match primary_successor(skill) {
            Some(target) => match merged.iter_mut().find(|(s, _)| *s == target) {
                Some(slot) => slot.1 += xp,
                None => merged.push((target, xp)),
            },
            None => {
                report.fallback(fragment, format!("reward for unknown skill {} dropped", skill))
            }
        }
    }
    *rewards = Value::Array(
        merged
            .into_iter()
            .map(|(s, xp)| json!({ "skill": s.as_str(), "xp": xp }))
            .collect(),
    );
}

// ============================================================================
// Always-applied normalization
// ============================================================================

fn normalize(doc: &mut Map<String, Value>) -> StepReport {
    let mut report = StepReport::new(CURRENT_VERSION);

    let settings = doc.entry("settings".to_string()).or_insert_with(|| json!({}));
    if !settings.is_object() {
        report.fallback("settings", "not an object, reset");
        *settings = json!({});
    }
    if let Value::Object(s) = settings {
        s.entry("playerName".to_string()).or_insert_with(|| json!("Adventurer"));
        s.entry("onboardingComplete".to_string()).or_insert_with(|| json!(false));
    }

    let skills = doc.entry("skills".to_string()).or_insert_with(|| json!({}));
    if !skills.is_object() {
        report.fallback("skills", "not an object, reset");
        *skills = json!({});
    }
    if let Value::Object(s) = skills {
        for id in SkillId::ALL {
            if !s.contains_key(id.as_str()) {
                debug!(skill = %id, "missing skill filled in");
                s.insert(id.as_str().to_string(), to_value(&Skill::default()));
            }
        }
    }

    ensure_array(doc, "completionLog");
    ensure_array(doc, "collectionLog");
    let challenge_count = ensure_array(doc, "challenges").len();
    if !doc.get("challengesStarted").map(Value::is_u64).unwrap_or(false) {
        doc.insert("challengesStarted".into(), json!(challenge_count));
    }
    doc.entry("lastActiveDate".to_string()).or_insert(Value::Null);

    let quests = ensure_array(doc, "quests");
    for quest in registry::default_quests() {
        if !has_id(quests, &quest.id) {
            quests.push(to_value(&quest));
        }
    }
    let paths = ensure_array(doc, "paths");
    for path in registry::default_paths() {
        if !has_id(paths, &path.id) {
            paths.push(to_value(&path));
        }
    }
    let achievements = ensure_array(doc, "achievements");
    for ach in registry::default_achievements() {
        if !has_id(achievements, &ach.id) {
            achievements.push(to_value(&ach));
        }
    }

    report
}
