use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use growtrack_lib::db::DbPool;
use growtrack_lib::models::settings::SettingsUpdateInput;
use growtrack_lib::models::task::{TaskCreateInput, TaskUpdateInput};
use growtrack_lib::services::progression_service::ProgressionService;
use growtrack_lib::services::settings_service::SettingsService;
use growtrack_lib::services::task_service::TaskService;
use tempfile::tempdir;

fn build_services(pool: &DbPool) -> (TaskService, Arc<ProgressionService>, Arc<SettingsService>) {
    let settings = Arc::new(SettingsService::new(pool.clone()));
    let progression = Arc::new(ProgressionService::new(pool.clone(), Arc::clone(&settings)));
    let tasks = TaskService::new(pool.clone(), Arc::clone(&progression), Arc::clone(&settings));
    (tasks, progression, settings)
}

#[test]
fn task_crud_flow() {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("integration.sqlite");
    let pool = DbPool::new(db_path).expect("db pool");
    let (service, progression, _settings) = build_services(&pool);
    progression.initialize("user-1").expect("init progression");

    // create
    let created = service
        .create_task(
            "user-1",
            TaskCreateInput {
                description: "Integration Task".into(),
                ..Default::default()
            },
        )
        .expect("create task")
        .task;

    assert!(!created.id.is_empty());
    assert!(!created.completed);
    assert!(created.completed_at.is_none());

    // list
    let tasks = service.list_tasks("user-1").expect("list tasks");
    assert_eq!(tasks.len(), 1);

    // update
    let updated = service
        .update_task(
            "user-1",
            &created.id,
            TaskUpdateInput {
                completed: Some(true),
                ..Default::default()
            },
        )
        .expect("update task");
    assert!(updated.task.completed);
    assert!(updated.task.completed_at.is_some());
    assert!(updated.growth_update.is_some());

    // delete
    service
        .delete_task("user-1", &created.id)
        .expect("delete task");

    let result = service.get_task("user-1", &created.id);
    assert!(result.is_err());
}

#[test]
fn edits_that_do_not_complete_leave_progression_alone() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("edits.sqlite")).expect("db pool");
    let (service, progression, _settings) = build_services(&pool);
    progression.initialize("user-2").expect("init progression");
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

    let task = service
        .create_task_at(
            "user-2",
            TaskCreateInput {
                description: "Repot the monstera".into(),
                ..Default::default()
            },
            now,
        )
        .expect("create")
        .task;

    let renamed = service
        .update_task_at(
            "user-2",
            &task.id,
            TaskUpdateInput {
                description: Some("Repot the big monstera".into()),
                ..Default::default()
            },
            now,
        )
        .expect("rename");
    assert!(renamed.growth_update.is_none());

    let completed = service
        .update_task_at(
            "user-2",
            &task.id,
            TaskUpdateInput {
                completed: Some(true),
                ..Default::default()
            },
            now,
        )
        .expect("complete");
    assert_eq!(completed.growth_update.map(|g| g.gp_earned), Some(10));

    // Re-saving a completed task is not a transition.
    let resaved = service
        .update_task_at(
            "user-2",
            &task.id,
            TaskUpdateInput {
                completed: Some(true),
                ..Default::default()
            },
            now + Duration::days(1),
        )
        .expect("resave");
    assert!(resaved.growth_update.is_none());

    let reopened = service
        .update_task_at(
            "user-2",
            &task.id,
            TaskUpdateInput {
                completed: Some(false),
                ..Default::default()
            },
            now + Duration::days(1),
        )
        .expect("reopen");
    assert!(reopened.growth_update.is_none());
    assert!(reopened.task.completed_at.is_none());

    let record = progression.get("user-2").expect("record");
    assert_eq!(record.growth_points, 10);
    assert_eq!(record.current_streak, 1);
}

#[test]
fn creating_completed_task_awards_nothing() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("create.sqlite")).expect("db pool");
    let (service, progression, _settings) = build_services(&pool);
    progression.initialize("user-3").expect("init progression");

    let mutation = service
        .create_task(
            "user-3",
            TaskCreateInput {
                description: "Already done".into(),
                completed: Some(true),
                ..Default::default()
            },
        )
        .expect("create");

    assert!(mutation.task.completed);
    assert!(mutation.task.completed_at.is_some());
    assert!(mutation.growth_update.is_none());
    assert_eq!(progression.get("user-3").expect("record").growth_points, 0);
}

#[test]
fn list_is_scoped_to_owner() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("scope.sqlite")).expect("db pool");
    let (service, _progression, _settings) = build_services(&pool);

    for (owner, description) in [("a", "first"), ("a", "second"), ("b", "other")] {
        service
            .create_task(
                owner,
                TaskCreateInput {
                    description: description.into(),
                    ..Default::default()
                },
            )
            .expect("create");
    }

    assert_eq!(service.list_tasks("a").expect("list a").len(), 2);
    assert_eq!(service.list_tasks("b").expect("list b").len(), 1);
    assert!(service.list_tasks("c").expect("list c").is_empty());
}

#[test]
fn goal_date_reminder_follows_settings_window() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("reminder.sqlite")).expect("db pool");
    let (service, progression, settings) = build_services(&pool);
    progression.initialize("user-4").expect("init progression");
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();

    let tomorrow = service
        .create_task_at(
            "user-4",
            TaskCreateInput {
                description: "Submit report".into(),
                goal_date: Some((now + Duration::hours(20)).to_rfc3339()),
                ..Default::default()
            },
            now,
        )
        .expect("create");
    assert!(tomorrow.reminder_due);

    let later = service
        .create_task_at(
            "user-4",
            TaskCreateInput {
                description: "Plan trip".into(),
                goal_date: Some((now + Duration::days(3)).to_rfc3339()),
                ..Default::default()
            },
            now,
        )
        .expect("create");
    assert!(!later.reminder_due);

    settings
        .update(SettingsUpdateInput {
            reminder_window_days: Some(3),
            ..Default::default()
        })
        .expect("widen window");

    let moved = service
        .update_task_at(
            "user-4",
            &later.task.id,
            TaskUpdateInput {
                goal_date: Some((now + Duration::days(3)).to_rfc3339()),
                ..Default::default()
            },
            now,
        )
        .expect("move goal");
    assert!(moved.reminder_due);

    // A completion response never carries a reminder.
    let completed = service
        .update_task_at(
            "user-4",
            &tomorrow.task.id,
            TaskUpdateInput {
                completed: Some(true),
                goal_date: Some((now + Duration::hours(20)).to_rfc3339()),
                ..Default::default()
            },
            now,
        )
        .expect("complete");
    assert!(completed.growth_update.is_some());
    assert!(!completed.reminder_due);

    settings
        .update(SettingsUpdateInput {
            reminders_enabled: Some(false),
            ..Default::default()
        })
        .expect("disable reminders");
    let silent = service
        .create_task_at(
            "user-4",
            TaskCreateInput {
                description: "Quiet".into(),
                goal_date: Some((now + Duration::hours(2)).to_rfc3339()),
                ..Default::default()
            },
            now,
        )
        .expect("create");
    assert!(!silent.reminder_due);
}
