//! End-to-end tests for the progression engine.
//!
//! Every test drives a real engine over an in-memory or temp-dir store with a
//! fixed clock that the test moves across days.

use chrono::NaiveDate;
use life_rpg_core::challenges::ChallengeEvent;
use life_rpg_core::paths::PathEvent;
use life_rpg_core::store::{FileStore, KeyValueStore, MemoryStore};
use life_rpg_core::{
    CompletionOutcome, Engine, EngineConfig, FixedClock, Frequency, NewQuest, QuestEdit,
    RejectReason, Reward, SkillId, StartChallengeOutcome, Tier, UndoOutcome,
};
use tempfile::TempDir;

const HARD75: [&str; 7] = [
    "hard75_workout_indoor",
    "hard75_workout_outdoor",
    "hard75_water",
    "hard75_read",
    "hard75_photo",
    "hard75_diet",
    "hard75_no_alcohol",
];

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

fn engine_at(d: u32) -> (Engine<MemoryStore, FixedClock>, FixedClock) {
    let clock = FixedClock::at_noon(day(d));
    let engine = Engine::open(MemoryStore::new(), clock.clone(), &EngineConfig::default()).unwrap();
    (engine, clock)
}

fn complete(
    engine: &mut Engine<MemoryStore, FixedClock>,
    quest: &str,
) -> life_rpg_core::CompletionResult {
    match engine.complete_quest(quest, None).unwrap() {
        CompletionOutcome::Completed(result) => result,
        CompletionOutcome::Rejected(reason) => panic!("{} rejected: {:?}", quest, reason),
    }
}

fn unlocked(result: &life_rpg_core::CompletionResult, id: &str) -> bool {
    result.achievements_unlocked.iter().any(|a| a.id == id)
}

#[test]
fn test_three_day_streak_scenario() {
    let (mut engine, clock) = engine_at(14);

    let first = complete(&mut engine, "run");
    assert!(unlocked(&first, "first_quest"));
    assert!(!unlocked(&first, "streak_3"));

    clock.advance_days(1);
    let second = complete(&mut engine, "run");
    assert!(!unlocked(&second, "streak_3"));

    clock.advance_days(1);
    let third = complete(&mut engine, "run");
    assert!(unlocked(&third, "streak_3"));

    let athleticism = engine.skill(SkillId::Athleticism).unwrap();
    assert_eq!(athleticism.xp, 150);
    assert_eq!(athleticism.current_streak, 3);
    assert_eq!(athleticism.longest_streak, 3);
    assert_eq!(athleticism.last_awarded_date, Some(day(16)));
    // 150 is past the 83 xp needed for level 2.
    assert_eq!(engine.level(SkillId::Athleticism), 2);
}

#[test]
fn test_level_up_reported_once() {
    let (mut engine, clock) = engine_at(14);
    assert!(complete(&mut engine, "run").level_ups.is_empty());
    clock.advance_days(1);
    let result = complete(&mut engine, "run");
    assert_eq!(result.level_ups.len(), 1);
    assert_eq!((result.level_ups[0].from, result.level_ups[0].to), (1, 2));
}

#[test]
fn test_complete_then_undo_restores_skills() {
    let (mut engine, clock) = engine_at(14);
    complete(&mut engine, "workout");
    clock.advance_days(1);
    engine.check_resets().unwrap();

    let before: Vec<_> = [SkillId::Athleticism, SkillId::Wellness]
        .iter()
        .map(|id| {
            let s = engine.skill(*id).unwrap();
            (s.xp, s.current_streak, s.longest_streak, s.last_awarded_date)
        })
        .collect();
    let ledger_len = engine.ledger().len();

    let result = complete(&mut engine, "workout");
    assert_eq!(
        result.xp_gained,
        vec![Reward::new(SkillId::Athleticism, 40), Reward::new(SkillId::Wellness, 10)]
    );
    assert_eq!(engine.skill(SkillId::Athleticism).unwrap().current_streak, 2);

    match engine.undo_completion("workout").unwrap() {
        UndoOutcome::Undone { xp_removed, .. } => assert_eq!(xp_removed.len(), 2),
        UndoOutcome::NothingToUndo => panic!("expected an undo"),
    }

    let after: Vec<_> = [SkillId::Athleticism, SkillId::Wellness]
        .iter()
        .map(|id| {
            let s = engine.skill(*id).unwrap();
            (s.xp, s.current_streak, s.longest_streak, s.last_awarded_date)
        })
        .collect();
    assert_eq!(before, after);
    assert_eq!(engine.ledger().len(), ledger_len);
    assert!(engine.can_complete_quest("workout"));
}

#[test]
fn test_undo_keeps_streak_fed_by_other_quest() {
    let (mut engine, _clock) = engine_at(16);
    complete(&mut engine, "run");
    complete(&mut engine, "workout");
    engine.undo_completion("workout").unwrap();

    let athleticism = engine.skill(SkillId::Athleticism).unwrap();
    assert_eq!(athleticism.xp, 50);
    assert_eq!(athleticism.current_streak, 1);
    assert_eq!(athleticism.last_awarded_date, Some(day(16)));

    let wellness = engine.skill(SkillId::Wellness).unwrap();
    assert_eq!(wellness.xp, 0);
    assert_eq!(wellness.current_streak, 0);
    assert_eq!(wellness.last_awarded_date, None);
}

#[test]
fn test_undo_only_same_day() {
    let (mut engine, clock) = engine_at(15);
    assert_eq!(engine.undo_completion("run").unwrap(), UndoOutcome::NothingToUndo);
    complete(&mut engine, "run");
    clock.advance_days(1);
    assert_eq!(engine.undo_completion("run").unwrap(), UndoOutcome::NothingToUndo);
    assert_eq!(engine.skill(SkillId::Athleticism).unwrap().xp, 50);
}

#[test]
fn test_recurrence_windows() {
    let (mut engine, clock) = engine_at(14);
    complete(&mut engine, "date_night");
    complete(&mut engine, "first_race");
    assert_eq!(
        engine.complete_quest("date_night", None).unwrap(),
        CompletionOutcome::Rejected(RejectReason::NotAvailable(Frequency::Weekly))
    );

    // Oct 18 2026 is a Sunday: the completed-this-week window starts over.
    clock.advance_days(4);
    assert!(engine.can_complete_quest("date_night"));
    assert!(!engine.can_complete_quest("first_race"));
    complete(&mut engine, "date_night");

    complete(&mut engine, "biz_research");
    complete(&mut engine, "biz_research");
    assert_eq!(engine.ledger().count_for("biz_research"), 2);
}

#[test]
fn test_check_resets_breaks_streaks_once() {
    let (mut engine, clock) = engine_at(10);
    complete(&mut engine, "run");
    clock.advance_days(5);

    let report = engine.check_resets().unwrap();
    assert!(report.day_changed);
    assert_eq!(report.streaks_broken, vec![SkillId::Athleticism]);
    let athleticism = engine.skill(SkillId::Athleticism).unwrap();
    assert_eq!((athleticism.current_streak, athleticism.longest_streak), (0, 1));

    let saved = engine.store().get("lifeRPGData").unwrap();
    let again = engine.check_resets().unwrap();
    assert!(!again.day_changed);
    assert!(again.streaks_broken.is_empty());
    assert_eq!(engine.store().get("lifeRPGData").unwrap(), saved);
}

#[test]
fn test_path_progress_events() {
    let (mut engine, _clock) = engine_at(16);
    let run = complete(&mut engine, "run");
    assert!(run.path_events.iter().any(|e| matches!(
        e,
        PathEvent::QuestSatisfied { path_id, quest_id, .. }
            if path_id == "fitness-goddess" && quest_id == "run"
    )));
    assert!(unlocked(&run, "first_step"));

    // Only the first stage is open, so a later-stage quest does nothing.
    let later = complete(&mut engine, "fitness_rest");
    assert!(later.path_events.is_empty());
}

#[test]
fn test_challenge_lifecycle() {
    let (mut engine, clock) = engine_at(10);

    let started = engine.start_challenge("75hard").unwrap();
    match &started {
        StartChallengeOutcome::Started { challenge, achievements_unlocked } => {
            assert_eq!(challenge.quest_ids.len(), 7);
            assert!(achievements_unlocked.iter().any(|a| a.id == "challenger"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(engine
        .quests()
        .iter()
        .any(|q| q.id == "hard75_water" && q.challenge_id.as_deref() == Some("75hard")));
    assert_eq!(engine.start_challenge("75hard").unwrap(), StartChallengeOutcome::AlreadyActive);
    assert_eq!(engine.start_challenge("nope").unwrap(), StartChallengeOutcome::UnknownTemplate);

    for quest in HARD75 {
        complete(&mut engine, quest);
    }
    clock.advance_days(1);
    let report = engine.check_resets().unwrap();
    assert!(report.challenge_events.iter().any(|e| matches!(
        e,
        ChallengeEvent::PeriodClosed { success: true, current_streak: 1, .. }
    )));

    complete(&mut engine, "hard75_water");
    clock.advance_days(1);
    let report = engine.check_resets().unwrap();
    assert!(report.challenge_events.iter().any(|e| matches!(
        e,
        ChallengeEvent::PeriodClosed { success: false, current_streak: 0, .. }
    )));

    let challenge = engine.profile().challenge("75hard").unwrap();
    assert_eq!(challenge.history.len(), 2);
    assert_eq!(challenge.longest_streak, 1);

    assert!(engine.abandon_challenge("75hard").unwrap());
    assert!(!engine.abandon_challenge("75hard").unwrap());
    assert_eq!(engine.active_challenges().count(), 0);

    assert!(matches!(
        engine.start_challenge("75hard").unwrap(),
        StartChallengeOutcome::Started { .. }
    ));
    assert_eq!(engine.profile().challenges_started, 2);
    assert_eq!(engine.profile().challenge("75hard").unwrap().longest_streak, 1);
}

/// Complete every 75 Hard task today, then move to the next day.
fn hard75_day(engine: &mut Engine<MemoryStore, FixedClock>, clock: &FixedClock) {
    for quest in HARD75 {
        complete(engine, quest);
    }
    clock.advance_days(1);
}

fn achievement_done(engine: &Engine<MemoryStore, FixedClock>, id: &str) -> bool {
    engine.achievements().iter().any(|a| a.id == id && a.completed)
}

#[test]
fn test_75_hard_unlocks_on_finish() {
    let (mut engine, clock) = engine_at(1);
    engine.start_challenge("75hard").unwrap();
    for _ in 0..75 {
        hard75_day(&mut engine, &clock);
    }
    let report = engine.check_resets().unwrap();
    assert!(report
        .challenge_events
        .contains(&ChallengeEvent::ChallengeFinished { challenge_id: "75hard".into() }));
    assert!(report.achievements_unlocked.iter().any(|a| a.id == "75_hard"));

    let challenge = engine.profile().challenge("75hard").unwrap();
    assert!(challenge.finished);
    assert_eq!(challenge.current_streak, 75);
}

#[test]
fn test_75_hard_miss_keeps_it_locked() {
    let (mut engine, clock) = engine_at(1);
    engine.start_challenge("75hard").unwrap();
    for _ in 0..40 {
        hard75_day(&mut engine, &clock);
    }
    clock.advance_days(1);
    for _ in 0..35 {
        hard75_day(&mut engine, &clock);
    }
    engine.check_resets().unwrap();

    let challenge = engine.profile().challenge("75hard").unwrap();
    assert_eq!(challenge.current_streak, 35);
    assert_eq!(challenge.longest_streak, 40);
    assert_eq!(challenge.successful_periods(), 75);
    assert!(challenge.active);
    assert!(!achievement_done(&engine, "75_hard"));
}

#[test]
fn test_undo_clears_challenge_mark() {
    let (mut engine, _clock) = engine_at(16);
    engine.start_challenge("75hard").unwrap();
    complete(&mut engine, "hard75_water");
    assert!(engine.profile().challenge("75hard").unwrap().current_period.has("hard75_water"));
    engine.undo_completion("hard75_water").unwrap();
    assert!(!engine.profile().challenge("75hard").unwrap().current_period.has("hard75_water"));
}

#[test]
fn test_manual_achievement_claim() {
    let (mut engine, _clock) = engine_at(16);
    let claimed = engine.claim_achievement("first_sale").unwrap().unwrap();
    assert_eq!(
        claimed.reward.and_then(|r| r.message).as_deref(),
        Some("GRANDMASTER QUEST COMPLETE!")
    );
    assert!(engine.claim_achievement("first_sale").unwrap().is_none());
    assert!(engine.claim_achievement("first_quest").unwrap().is_none());
}

#[test]
fn test_custom_quest_management() {
    let (mut engine, _clock) = engine_at(16);
    let rejected = engine
        .add_custom_quest(NewQuest {
            name: "  ".into(),
            frequency: Frequency::Daily,
            rewards: vec![Reward::new(SkillId::Homecraft, 10)],
        })
        .unwrap();
    assert!(rejected.is_none());

    let quest = engine
        .add_custom_quest(NewQuest {
            name: "Water the plants".into(),
            frequency: Frequency::Daily,
            rewards: vec![Reward::new(SkillId::Homecraft, 10), Reward::new(SkillId::Homecraft, 5)],
        })
        .unwrap()
        .unwrap();
    assert!(quest.id.starts_with("custom_"));
    assert!(quest.custom);
    assert_eq!(quest.rewards, vec![Reward::new(SkillId::Homecraft, 15)]);

    assert!(engine
        .edit_quest(
            &quest.id,
            QuestEdit { name: Some("Water all plants".into()), ..Default::default() },
        )
        .unwrap());
    let rename = QuestEdit { name: Some("Jog".into()), ..Default::default() };
    assert!(!engine.edit_quest("run", rename).unwrap());

    assert!(engine.set_quest_active(&quest.id, false).unwrap());
    assert_eq!(
        engine.complete_quest(&quest.id, None).unwrap(),
        CompletionOutcome::Rejected(RejectReason::Inactive)
    );
    engine.set_quest_active(&quest.id, true).unwrap();
    complete(&mut engine, &quest.id);

    assert!(engine.delete_quest(&quest.id).unwrap());
    assert!(!engine.delete_quest("run").unwrap());
    assert_eq!(engine.ledger().count_for(&quest.id), 1);
    assert_eq!(engine.skill(SkillId::Homecraft).unwrap().xp, 15);
}

#[test]
fn test_display_helpers() {
    let (mut engine, clock) = engine_at(12);
    assert_eq!(engine.total_level(), 10);
    assert_eq!(engine.xp_today(), 0);

    complete(&mut engine, "run");
    // 50 of the 83 xp needed for level 2.
    let progress = engine.level_progress(SkillId::Athleticism);
    assert!(progress > 0.60 && progress < 0.61);
    assert_eq!(engine.xp_to_next_level(SkillId::Athleticism), Some(33));
    assert!(engine.quests_for_skill(SkillId::Athleticism).any(|q| q.id == "run"));
    assert!(!engine.quests_for_skill(SkillId::Athleticism).any(|q| q.id == "read"));

    let summary = engine.achievement_summary();
    assert_eq!(summary.len(), 5);
    assert_eq!(summary[0].0, Tier::Beginner);
    assert!(summary[0].1 >= 1);
    assert_eq!(summary[4], (Tier::Grandmaster, 0, 1));
    complete(&mut engine, "workout");
    assert_eq!(engine.xp_today(), 100);
    assert_eq!(engine.total_level(), 11);

    clock.advance_days(1);
    complete(&mut engine, "read");
    assert_eq!(engine.xp_today(), 30);

    // Oct 12 2026 is a Monday, so both days count toward the week.
    let weekly = engine.weekly_xp();
    assert_eq!(weekly.get(&SkillId::Athleticism), Some(&90));
    assert_eq!(weekly.get(&SkillId::Intelligence), Some(&30));
    assert_eq!(weekly.get(&SkillId::Wellness), Some(&10));
}

#[test]
fn test_photos_and_collection_log() {
    let (mut engine, _clock) = engine_at(16);
    engine.complete_quest("cook_meal", Some("photo://dinner".into())).unwrap();
    complete(&mut engine, "run");
    let photos = engine.photos();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].quest_id, "cook_meal");

    assert!(engine.add_collection_entry("", "", "").unwrap().is_none());
    let entry = engine
        .add_collection_entry("See the aurora", "Iceland", "Travel, night")
        .unwrap()
        .unwrap();
    engine.add_collection_entry("Run a marathon", "", "sport").unwrap();
    assert!(engine.complete_collection_entry(&entry.id, "photo://aurora".into()).unwrap());
    assert!(!engine.complete_collection_entry(&entry.id, "photo://again".into()).unwrap());

    assert_eq!(engine.collection_tags(), vec!["night", "sport", "travel"]);

    let stats = engine.collection_stats();
    assert_eq!((stats.total, stats.completed, stats.completion_rate), (2, 1, 50));
    assert!(engine.remove_collection_entry(&entry.id).unwrap());
    assert_eq!(engine.collection_log().len(), 1);
}

#[test]
fn test_export_import_roundtrip() {
    let (mut source, _clock) = engine_at(16);
    complete(&mut source, "run");
    source.start_challenge("75hard").unwrap();
    let exported = source.export_json().unwrap();

    let (mut target, _clock) = engine_at(16);
    let report = target.import_json(&exported).unwrap();
    assert!(!report.migrated());
    assert_eq!(target.skill(SkillId::Athleticism).unwrap().xp, 50);
    assert_eq!(target.ledger().len(), 1);
    assert_eq!(target.active_challenges().count(), 1);
    assert!(!target.can_complete_quest("run"));

    assert!(target.import_json("{not json").unwrap_err().is_corruption());
    assert_eq!(target.ledger().len(), 1);
}

#[test]
fn test_file_store_persists_across_sessions() {
    let dir = TempDir::new().unwrap();
    let clock = FixedClock::at_noon(day(16));
    let config = EngineConfig::default();

    {
        let mut engine = Engine::open(FileStore::new(dir.path()), clock.clone(), &config).unwrap();
        engine.complete_quest("run", None).unwrap();
    }

    let engine = Engine::open(FileStore::new(dir.path()), clock.clone(), &config).unwrap();
    assert_eq!(engine.skill(SkillId::Athleticism).unwrap().xp, 50);
    assert!(!engine.can_complete_quest("run"));
    assert!(engine.last_migration().map(|r| !r.migrated()).unwrap_or(false));
}

#[test]
fn test_corrupt_document_surfaces() {
    let mut store = MemoryStore::new();
    store.set("lifeRPGData", "{\"version\": 3, \"skills\": ").unwrap();
    let err = Engine::open(store, FixedClock::at_noon(day(16)), &EngineConfig::default())
        .err()
        .unwrap();
    assert!(err.is_corruption());
}
