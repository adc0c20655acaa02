use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use growtrack_lib::db::repositories::progression_repository::ProgressionRepository;
use growtrack_lib::db::DbPool;
use growtrack_lib::models::progression::{AchievementKind, GrowthUpdate, ProgressionRecord};
use growtrack_lib::models::task::{TaskCreateInput, TaskUpdateInput};
use growtrack_lib::services::progression_service::ProgressionService;
use growtrack_lib::services::settings_service::SettingsService;
use growtrack_lib::services::task_service::TaskService;
use tempfile::tempdir;

struct Harness {
    pool: DbPool,
    tasks: TaskService,
    progression: Arc<ProgressionService>,
    _dir: tempfile::TempDir,
}

fn setup(user_id: &str) -> Harness {
    setup_in_zone(user_id, Tz::UTC)
}

fn setup_in_zone(user_id: &str, tz: Tz) -> Harness {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("flow.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::with_reference_timezone(pool.clone(), tz));
    let progression = Arc::new(ProgressionService::new(pool.clone(), Arc::clone(&settings)));
    progression.initialize(user_id).expect("init progression");
    let tasks = TaskService::new(pool.clone(), Arc::clone(&progression), Arc::clone(&settings));
    Harness {
        pool,
        tasks,
        progression,
        _dir: dir,
    }
}

fn seed(harness: &Harness, record: &ProgressionRecord) {
    let mut stored = harness.progression.get(&record.user_id).expect("load");
    let version = stored.version;
    stored = record.clone();
    stored.version = version;
    harness
        .pool
        .with_connection(|conn| ProgressionRepository::store(conn, &stored))
        .expect("seed record");
}

fn complete_new_task(harness: &Harness, user_id: &str, at: DateTime<Utc>) -> Option<GrowthUpdate> {
    let created = harness
        .tasks
        .create_task_at(
            user_id,
            TaskCreateInput {
                description: format!("task at {at}"),
                ..Default::default()
            },
            at,
        )
        .expect("create task");

    harness
        .tasks
        .update_task_at(
            user_id,
            &created.task.id,
            TaskUpdateInput {
                completed: Some(true),
                ..Default::default()
            },
            at,
        )
        .expect("complete task")
        .growth_update
}

fn noon(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, day, 12, 0, 0).unwrap()
}

#[test]
fn scenario_fresh_record_first_completion() {
    let harness = setup("alice");
    let update = complete_new_task(&harness, "alice", noon(1)).expect("growth");

    assert_eq!(update.gp_earned, 10);
    assert_eq!(update.current_streak, 1);
    assert_eq!(update.new_level, 0);
    assert!(update.new_achievements.is_empty());

    let record = harness.progression.get("alice").expect("record");
    assert_eq!(record.growth_points, 10);
    assert_eq!(record.longest_streak, 1);
    assert_eq!(record.last_completion_at, Some(noon(1)));
}

#[test]
fn scenario_consecutive_day_bonus_and_first_bloom() {
    let harness = setup("bob");
    let mut record = ProgressionRecord::new("bob");
    record.growth_points = 90;
    record.current_streak = 2;
    record.longest_streak = 2;
    record.last_completion_at = Some(noon(4) - Duration::days(1));
    seed(&harness, &record);

    let update = complete_new_task(&harness, "bob", noon(4)).expect("growth");
    assert_eq!(update.gp_earned, 30);
    assert_eq!(update.current_streak, 3);
    assert_eq!(update.new_level, 1);
    assert_eq!(update.new_achievements, vec![AchievementKind::FirstBloom]);

    let stored = harness.progression.get("bob").expect("record");
    assert_eq!(stored.growth_points, 120);
    assert!(stored.has_achievement(AchievementKind::FirstBloom));
}

#[test]
fn scenario_same_day_second_completion_is_free() {
    let harness = setup("carol");
    complete_new_task(&harness, "carol", noon(2)).expect("first");
    let after_first = harness.progression.get("carol").expect("record");

    let second = complete_new_task(&harness, "carol", noon(2) + Duration::hours(5)).expect("second");
    assert_eq!(second.gp_earned, 0);
    assert_eq!(second.current_streak, 1);

    let after_second = harness.progression.get("carol").expect("record");
    assert_eq!(after_second, after_first);
}

#[test]
fn scenario_gap_resets_streak() {
    let harness = setup("dave");
    let mut record = ProgressionRecord::new("dave");
    record.growth_points = 300;
    record.current_level = 3;
    record.current_streak = 10;
    record.longest_streak = 10;
    record.last_completion_at = Some(noon(10) - Duration::days(5));
    seed(&harness, &record);

    let update = complete_new_task(&harness, "dave", noon(10)).expect("growth");
    assert_eq!(update.gp_earned, 10);
    assert_eq!(update.current_streak, 1);

    let stored = harness.progression.get("dave").expect("record");
    assert_eq!(stored.longest_streak, 10);
    assert_eq!(stored.growth_points, 310);
}

#[test]
fn scenario_productivity_hero_at_one_thousand_points() {
    let harness = setup("erin");
    let mut record = ProgressionRecord::new("erin");
    record.growth_points = 970;
    record.current_level = 9;
    record.current_streak = 2;
    record.longest_streak = 2;
    record.last_completion_at = Some(noon(20) - Duration::days(1));
    seed(&harness, &record);

    let update = complete_new_task(&harness, "erin", noon(20)).expect("growth");
    assert_eq!(update.gp_earned, 30);
    assert_eq!(update.new_level, 10);
    assert!(update
        .new_achievements
        .contains(&AchievementKind::ProductivityHero));
    assert!(update.new_achievements.contains(&AchievementKind::FirstBloom));
    assert!(update.new_achievements.contains(&AchievementKind::ForestCreator));

    let stored = harness.progression.get("erin").expect("record");
    assert_eq!(stored.growth_points, 1000);
    assert_eq!(stored.current_level, 10);
}

#[test]
fn month_of_daily_completions_earns_streak_master_once() {
    let harness = setup("frank");
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
    let mut unlock_counts = std::collections::HashMap::new();

    for day in 0..32 {
        let update = complete_new_task(&harness, "frank", start + Duration::days(day)).expect("growth");
        for kind in update.new_achievements {
            *unlock_counts.entry(kind).or_insert(0) += 1;
        }
    }

    let stored = harness.progression.get("frank").expect("record");
    assert_eq!(stored.current_streak, 32);
    assert_eq!(stored.longest_streak, 32);
    assert!(unlock_counts.values().all(|count| *count == 1));
    assert_eq!(unlock_counts.get(&AchievementKind::StreakMaster), Some(&1));
    assert_eq!(unlock_counts.get(&AchievementKind::SevenDayGrowth), Some(&1));
    assert_eq!(stored.achievements.len(), unlock_counts.len());
}

#[test]
fn reference_timezone_moves_the_day_boundary() {
    let harness = setup_in_zone("gina", Tz::America__New_York);

    // 02:00 UTC on the 6th is still the 5th in New York.
    let evening = Utc.with_ymd_and_hms(2024, 10, 5, 22, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2024, 10, 6, 2, 0, 0).unwrap();

    complete_new_task(&harness, "gina", evening).expect("first");
    let second = complete_new_task(&harness, "gina", late).expect("second");
    assert_eq!(second.gp_earned, 0);

    // The same two instants are separate days in UTC.
    let utc = setup("hank");
    complete_new_task(&utc, "hank", evening).expect("first");
    let next_day = complete_new_task(&utc, "hank", late).expect("second");
    assert_eq!(next_day.gp_earned, 10);
    assert_eq!(next_day.current_streak, 2);
}
