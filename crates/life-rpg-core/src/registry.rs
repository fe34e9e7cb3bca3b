//! Default catalogs and challenge templates.
//!
//! Every schema version freezes its own skill-id set; migrations diff the
//! frozen sets through [`SKILL_SUCCESSORS`].

use crate::achievements::{Achievement, AchievementReward, Tier, Trigger};
use crate::challenges::{ChallengeTemplate, Interval};
use crate::paths::{Path, Stage};
use crate::quests::{Frequency, Quest, Reward};
use crate::skills::SkillId::{self, *};

/// Schema version written by this build.
pub const CURRENT_VERSION: u32 = 3;

/// Skill ids used by schema v1 and v2.
pub const LEGACY_SKILLS: [&str; 6] = [
    "strength",
    "creativity",
    "intelligence",
    "charisma",
    "wisdom",
    "constitution",
];

/// v2 -> v3 skill split: each retired id hands its XP to its successors in
/// percent. The first successor is the primary one and absorbs rounding.
pub const SKILL_SUCCESSORS: [(&str, &[(SkillId, u64)]); 6] = [
    ("strength", &[(Athleticism, 75), (Nutrition, 25)]),
    ("creativity", &[(Creativity, 100)]),
    ("intelligence", &[(Intelligence, 70), (Career, 30)]),
    ("charisma", &[(Partnership, 50), (Friendships, 50)]),
    ("wisdom", &[(Mindfulness, 80), (Wellness, 20)]),
    ("constitution", &[(Homecraft, 100)]),
];

/// Skill-id set frozen by a schema version.
pub fn skill_ids_for_version(version: u32) -> Vec<&'static str> {
    if version >= 3 {
        SkillId::ALL.iter().map(|s| s.as_str()).collect()
    } else {
        LEGACY_SKILLS.to_vec()
    }
}

pub fn successors_of(old: &str) -> Option<&'static [(SkillId, u64)]> {
    SKILL_SUCCESSORS.iter().find(|(id, _)| *id == old).map(|(_, s)| *s)
}

/// Id a reference to a skill should point at after v3. Current ids map to
/// themselves.
pub fn primary_successor(id: &str) -> Option<SkillId> {
    match successors_of(id) {
        Some(list) => list.first().map(|(s, _)| *s),
        None => SkillId::parse(id),
    }
}

fn q(id: &str, name: &str, frequency: Frequency, rewards: &[(SkillId, u32)]) -> Quest {
    Quest::new(
        id,
        name,
        frequency,
        rewards.iter().map(|(s, xp)| Reward::new(*s, *xp)).collect(),
    )
}

pub fn default_quests() -> Vec<Quest> {
    use Frequency::*;
    vec![
        // Daily
        q("run", "Go for a run", Daily, &[(Athleticism, 50)]),
        q("workout", "Strength training", Daily, &[(Athleticism, 40), (Wellness, 10)]),
        q("yoga", "Yoga/Stretching", Daily, &[(Mindfulness, 20), (Athleticism, 10)]),
        q("cross_stitch", "Cross stitch (30+ min)", Daily, &[(Creativity, 30)]),
        q("cook_meal", "Cook a meal", Daily, &[(Nutrition, 30), (Homecraft, 5)]),
        q("dev_work", "Moonshot Dev work (1+ hr)", Daily, &[(Career, 40), (Intelligence, 10)]),
        q("quality_time", "Quality time with partner", Daily, &[(Partnership, 30)]),
        q("phone_free", "Phone-free hour", Daily, &[(Mindfulness, 25)]),
        q("read", "Read (30+ min)", Daily, &[(Intelligence, 30)]),
        // Weekly
        q("run_5k", "Complete a 5K run", Weekly, &[(Athleticism, 150)]),
        q("date_night", "Date night", Weekly, &[(Partnership, 75)]),
        q("reno_task", "Home renovation task", Weekly, &[(Homecraft, 60)]),
        q("meal_prep", "Meal prep for the week", Weekly, &[(Nutrition, 40), (Homecraft, 10)]),
        q("social", "Hang with friends", Weekly, &[(Friendships, 60)]),
        q(
            "content_create",
            "Create content for social media",
            Weekly,
            &[(Creativity, 40), (Career, 20)],
        ),
        // Monthly
        q("new_recipe", "Master a new recipe", Monthly, &[(Nutrition, 60), (Creativity, 40)]),
        q("art_project", "Complete a major art project", Monthly, &[(Creativity, 150)]),
        q("fitness_milestone", "Hit a fitness milestone", Monthly, &[(Athleticism, 150)]),
        // One-time
        q("first_race", "Run an organised race", OneTime, &[(Athleticism, 250), (Friendships, 25)]),
        q(
            "declutter_home",
            "Declutter the whole home",
            OneTime,
            &[(Homecraft, 200), (Mindfulness, 50)],
        ),
        // Business path
        q(
            "biz_research",
            "Market research for plugin ideas",
            AsNeeded,
            &[(Career, 30), (Intelligence, 10)],
        ),
        q("biz_design", "Design business website mockup", AsNeeded, &[(Creativity, 50)]),
        q("biz_brand", "Create brand assets (logo, colors)", AsNeeded, &[(Creativity, 60)]),
        q(
            "biz_website_dev",
            "Build Moonshot Dev website",
            AsNeeded,
            &[(Career, 70), (Intelligence, 30)],
        ),
        q("biz_plugin_plan", "Plan first plugin features", AsNeeded, &[(Career, 50)]),
        q(
            "biz_plugin_dev",
            "Develop plugin core functionality",
            AsNeeded,
            &[(Intelligence, 100), (Career, 50)],
        ),
        q("biz_plugin_polish", "Polish plugin UI/UX", AsNeeded, &[(Creativity, 75)]),
        q("biz_docs", "Write plugin documentation", AsNeeded, &[(Career, 60)]),
        q("biz_marketing_plan", "Create marketing strategy", AsNeeded, &[(Career, 50)]),
        q(
            "biz_social",
            "Build social media presence",
            AsNeeded,
            &[(Friendships, 20), (Career, 20)],
        ),
        q("biz_launch_prep", "Prepare for launch", AsNeeded, &[(Career, 75)]),
        // Culinary path
        q("culinary_experiment", "Try a new cooking technique", AsNeeded, &[(Nutrition, 45)]),
        q("culinary_plate", "Focus on plating/presentation", AsNeeded, &[(Creativity, 30)]),
        q(
            "culinary_themed",
            "Plan themed dinner night",
            AsNeeded,
            &[(Nutrition, 30), (Friendships, 20)],
        ),
        // Art path
        q(
            "art_learn",
            "Learn a new art technique",
            AsNeeded,
            &[(Intelligence, 20), (Creativity, 30)],
        ),
        q(
            "art_share",
            "Share your art on social media",
            AsNeeded,
            &[(Creativity, 15), (Friendships, 20)],
        ),
        // Influencer path
        q("influencer_photo", "Curate aesthetic photo shoot", AsNeeded, &[(Creativity, 40)]),
        q(
            "influencer_reel",
            "Create a lifestyle reel/video",
            AsNeeded,
            &[(Creativity, 40), (Career, 20)],
        ),
        q(
            "influencer_engage",
            "Engage with community (comments/DMs)",
            AsNeeded,
            &[(Friendships, 30)],
        ),
        // Fitness path
        q("fitness_cardio", "Cardio session (30+ min)", AsNeeded, &[(Athleticism, 40)]),
        q(
            "fitness_new_class",
            "Try a new fitness class",
            AsNeeded,
            &[(Athleticism, 40), (Friendships, 10)],
        ),
        q("fitness_rest", "Active recovery day", AsNeeded, &[(Wellness, 30)]),
    ]
}

pub fn default_paths() -> Vec<Path> {
    vec![
        Path::new(
            "business-path",
            "Business Path",
            "Take Moonshot Dev from idea to launch",
            vec![
                Stage::new("research", "Research", &["biz_research", "biz_plugin_plan"]),
                Stage::new("brand", "Brand", &["biz_design", "biz_brand"]),
                Stage::new("build", "Build", &["biz_website_dev", "biz_plugin_dev"]),
                Stage::new(
                    "launch",
                    "Launch",
                    &[
                        "biz_plugin_polish",
                        "biz_docs",
                        "biz_marketing_plan",
                        "biz_social",
                        "biz_launch_prep",
                    ],
                ),
            ],
        ),
        Path::new(
            "culinary-master",
            "Culinary Master",
            "From weeknight cooking to dinner parties",
            vec![
                Stage::new("basics", "Basics", &["cook_meal", "meal_prep"]),
                Stage::new("technique", "Technique", &["culinary_experiment", "culinary_plate"]),
                Stage::new("mastery", "Mastery", &["new_recipe", "culinary_themed"]),
            ],
        ),
        Path::new(
            "artistic-visionary",
            "Artistic Visionary",
            "Practice, create, share",
            vec![
                Stage::new("practice", "Practice", &["cross_stitch", "art_learn"]),
                Stage::new("create", "Create", &["art_project"]),
                Stage::new("share", "Share", &["art_share"]),
            ],
        ),
        Path::new(
            "lifestyle-influencer",
            "Lifestyle Influencer",
            "Build an audience around the things you make",
            vec![
                Stage::new("presence", "Presence", &["biz_social", "influencer_engage"]),
                Stage::new("content", "Content", &["content_create", "influencer_photo"]),
                Stage::new("creator", "Creator", &["influencer_reel", "art_share"]),
            ],
        ),
        Path::new(
            "fitness-goddess",
            "Fitness Goddess",
            "Foundation, endurance, peak form",
            vec![
                Stage::new("foundation", "Foundation", &["run", "workout", "yoga"]),
                Stage::new("endurance", "Endurance", &["fitness_cardio", "run_5k"]),
                Stage::new(
                    "peak",
                    "Peak",
                    &["fitness_new_class", "fitness_rest", "fitness_milestone"],
                ),
            ],
        ),
    ]
}

pub fn default_achievements() -> Vec<Achievement> {
    use Tier::*;
    let a = Achievement::new;
    vec![
        // Beginner
        a(
            "first_quest",
            "First Quest",
            "Complete your first quest",
            Beginner,
            Trigger::QuestCount { quest_id: None, count: 1 },
        ),
        a(
            "streak_3",
            "Streak Starter",
            "3-day streak on any skill",
            Beginner,
            Trigger::SkillStreak { skill: None, days: 3 },
        ),
        a(
            "level_5",
            "Novice Adventurer",
            "Reach level 5 in any skill",
            Beginner,
            Trigger::SkillLevel { skill: None, level: 5 },
        ),
        a(
            "first_step",
            "First Step",
            "Make progress on any path",
            Beginner,
            Trigger::PathProgress { path_id: None, count: 1 },
        ),
        a(
            "challenger",
            "Challenger",
            "Start your first challenge",
            Beginner,
            Trigger::ChallengeStarted { count: 1 },
        ),
        a(
            "morning_routine",
            "Morning Routine",
            "Run and stretch on the same day",
            Beginner,
            Trigger::QuestSequence { quest_ids: vec!["run".into(), "yoga".into()], same_day: true },
        ),
        // Medium
        a(
            "streak_7",
            "Dedicated",
            "7-day streak on any skill",
            Medium,
            Trigger::SkillStreak { skill: None, days: 7 },
        ),
        a(
            "level_20",
            "Skilled Adventurer",
            "Reach level 20 in any skill",
            Medium,
            Trigger::SkillLevel { skill: None, level: 20 },
        ),
        a(
            "multi_skill",
            "Multi-class",
            "Reach level 5 in every skill",
            Medium,
            Trigger::AllSkillsLevel { level: 5 },
        ),
        a(
            "quests_50",
            "Quest Regular",
            "Complete 50 quests",
            Medium,
            Trigger::QuestCount { quest_id: None, count: 50 },
        ),
        a(
            "website_launch",
            "Business Foundation",
            "Launch the Moonshot Dev website",
            Medium,
            Trigger::QuestCount { quest_id: Some("biz_website_dev".into()), count: 1 },
        ),
        a(
            "business_builder",
            "Business Builder",
            "Finish the Build stage of the business path",
            Medium,
            Trigger::PathStage { path_id: "business-path".into(), stage: 2 },
        ),
        a(
            "challenge_week",
            "Week of Grit",
            "Reach a 7-period streak in any challenge",
            Medium,
            Trigger::ChallengeStreak { challenge_id: None, streak: 7 },
        ),
        // Hard
        a(
            "streak_30",
            "Iron Will",
            "30-day streak without breaking",
            Hard,
            Trigger::SkillStreak { skill: None, days: 30 },
        ),
        a(
            "level_50",
            "Expert Adventurer",
            "Reach level 50 in any skill",
            Hard,
            Trigger::SkillLevel { skill: None, level: 50 },
        ),
        a(
            "75_hard",
            "75 Hard Survivor",
            "Complete the full 75 Hard challenge",
            Hard,
            Trigger::ChallengeStreak { challenge_id: Some("75hard".into()), streak: 75 },
        ),
        a(
            "path_complete",
            "Pathfinder",
            "Complete any path",
            Hard,
            Trigger::PathComplete { path_id: None },
        ),
        a(
            "plugin_complete",
            "Plugin Master",
            "Complete the business path",
            Hard,
            Trigger::PathComplete { path_id: Some("business-path".into()) },
        ),
        a(
            "quests_500",
            "Quest Veteran",
            "Complete 500 quests",
            Hard,
            Trigger::QuestCount { quest_id: None, count: 500 },
        ),
        // Elite
        a(
            "skill_cape",
            "Skill Cape",
            "Reach level 99 in any skill",
            Elite,
            Trigger::SkillLevel { skill: None, level: 99 },
        ),
        a(
            "all_99",
            "Completionist",
            "Reach level 99 in all skills",
            Elite,
            Trigger::AllSkillsLevel { level: 99 },
        ),
        // Grandmaster
        a(
            "first_sale",
            "Entrepreneur",
            "Launch Moonshot Dev and make your first sale",
            Grandmaster,
            Trigger::Manual,
        )
        .with_reward(AchievementReward {
            bonus_xp: None,
            skill: None,
            message: Some("GRANDMASTER QUEST COMPLETE!".into()),
        }),
    ]
}

pub fn challenge_templates() -> Vec<ChallengeTemplate> {
    use Frequency::*;
    vec![
        ChallengeTemplate {
            id: "75hard",
            name: "75 Hard",
            description: "Seven daily tasks, 75 days in a row",
            interval: Interval::days(1),
            target_periods: Some(75),
            quests: vec![
                q(
                    "hard75_workout_indoor",
                    "Workout #1 (45+ min, any)",
                    Daily,
                    &[(Athleticism, 45)],
                ),
                q(
                    "hard75_workout_outdoor",
                    "Workout #2 (45+ min, outdoors)",
                    Daily,
                    &[(Athleticism, 45), (Wellness, 10)],
                ),
                q("hard75_water", "Drink 1 gallon of water", Daily, &[(Wellness, 20)]),
                q("hard75_read", "Read 10 pages (non-fiction)", Daily, &[(Intelligence, 20)]),
                q("hard75_photo", "Take progress photo", Daily, &[(Mindfulness, 10)]),
                q("hard75_diet", "Follow diet (no cheat meals)", Daily, &[(Nutrition, 30)]),
                q("hard75_no_alcohol", "No alcohol", Daily, &[(Wellness, 25)]),
            ],
        },
        ChallengeTemplate {
            id: "social_week",
            name: "Social Week",
            description: "See friends, your partner and family every week",
            interval: Interval::weeks(1),
            target_periods: None,
            quests: vec![
                q("social", "Hang with friends", Weekly, &[(Friendships, 60)]),
                q("date_night", "Date night", Weekly, &[(Partnership, 75)]),
                q("call_family", "Call family", Weekly, &[(Friendships, 40)]),
            ],
        },
        ChallengeTemplate {
            id: "creative_month",
            name: "Creative Month",
            description: "Finish a project, a recipe and a post every month",
            interval: Interval::months(1),
            target_periods: None,
            quests: vec![
                q("art_project", "Complete a major art project", Monthly, &[(Creativity, 150)]),
                q(
                    "new_recipe",
                    "Master a new recipe",
                    Monthly,
                    &[(Nutrition, 60), (Creativity, 40)],
                ),
                q(
                    "content_create",
                    "Create content for social media",
                    Weekly,
                    &[(Creativity, 40), (Career, 20)],
                ),
            ],
        },
    ]
}

pub fn challenge_template(id: &str) -> Option<ChallengeTemplate> {
    challenge_templates().into_iter().find(|t| t.id == id)
}

/// v1 75 Hard checklist key -> template quest id.
pub const LEGACY_75HARD_CHECKLIST: [(&str, &str); 7] = [
    ("workout1", "hard75_workout_indoor"),
    ("workout2", "hard75_workout_outdoor"),
    ("water", "hard75_water"),
    ("read", "hard75_read"),
    ("photo", "hard75_photo"),
    ("diet", "hard75_diet"),
    ("alcohol", "hard75_no_alcohol"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_quest_ids_unique() {
        let quests = default_quests();
        let ids: HashSet<_> = quests.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), quests.len());
        assert!(quests.iter().all(|q| !q.rewards.is_empty()));
    }

    #[test]
    fn test_path_stages_reference_catalog() {
        let quests = default_quests();
        for path in default_paths() {
            for stage in &path.stages {
                for id in &stage.quest_ids {
                    assert!(
                        quests.iter().any(|q| &q.id == id),
                        "{} references unknown {}",
                        path.id,
                        id
                    );
                }
            }
        }
    }

    #[test]
    fn test_successor_shares_sum_to_100() {
        for (old, list) in SKILL_SUCCESSORS {
            let total: u64 = list.iter().map(|(_, pct)| pct).sum();
            assert_eq!(total, 100, "{}", old);
        }
        let covered: HashSet<_> = SKILL_SUCCESSORS
            .iter()
            .flat_map(|(_, l)| l.iter().map(|(s, _)| *s))
            .collect();
        assert_eq!(covered.len(), SkillId::ALL.len());
    }

    #[test]
    fn test_versioned_skill_sets() {
        assert_eq!(skill_ids_for_version(1).len(), 6);
        assert_eq!(skill_ids_for_version(2), LEGACY_SKILLS.to_vec());
        assert_eq!(skill_ids_for_version(3).len(), 10);
        assert_eq!(primary_successor("charisma"), Some(Partnership));
        assert_eq!(primary_successor("career"), Some(Career));
        assert_eq!(primary_successor("luck"), None);
    }

    #[test]
    fn test_templates_lookup() {
        assert_eq!(challenge_template("75hard").map(|t| t.quests.len()), Some(7));
        assert!(challenge_template("nope").is_none());
        let ids: HashSet<_> = default_achievements().iter().map(|a| a.id.clone()).collect();
        assert!(ids.contains("first_quest") && ids.contains("streak_3"));
    }
}
