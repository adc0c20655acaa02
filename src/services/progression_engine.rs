//! Growth progression rules.
//!
//! Everything here is a pure function over a [`ProgressionRecord`]: a record
//! goes in, a new record and an outcome come out. Nothing touches the
//! database, so the rules can be exercised without one.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::models::progression::{
    AchievementKind, AchievementUnlock, GrowthUpdate, PointsOutcome, ProgressionRecord,
};
use crate::utils::calendar::calendar_date;

pub const BASE_POINTS: u64 = 10;
pub const STREAK_BONUS_POINTS: u64 = 20;
pub const STREAK_BONUS_INTERVAL: u32 = 3;
pub const POINTS_PER_LEVEL: u64 = 100;

const SEVEN_DAY_STREAK: u32 = 7;
const STREAK_MASTER_DAYS: u32 = 30;
const FOREST_LEVEL: u64 = 4;
const PRODUCTIVITY_HERO_POINTS: u64 = 1000;

/// Applies one completion at `completed_at` to the streak counters.
///
/// A second completion on the same calendar day returns the record untouched
/// with zero points; `last_completion_at` is not moved forward either.
pub fn evaluate_completion(
    record: &ProgressionRecord,
    completed_at: DateTime<Utc>,
    tz: Tz,
) -> (ProgressionRecord, PointsOutcome) {
    let today = calendar_date(&completed_at, tz);
    let last_day = record
        .last_completion_at
        .as_ref()
        .map(|ts| calendar_date(ts, tz));

    let mut next = record.clone();
    let mut streak_bonus = 0;

    match last_day {
        None => {
            next.current_streak = 1;
        }
        Some(day) if day == today => {
            debug!(
                target: "app::progression",
                user_id = %record.user_id,
                %today,
                "completion already counted today"
            );
            return (
                record.clone(),
                PointsOutcome {
                    base_points: 0,
                    streak_bonus: 0,
                    already_completed_today: true,
                },
            );
        }
        Some(day) if today.pred_opt() == Some(day) => {
            next.current_streak = record.current_streak.saturating_add(1);
            if next.current_streak % STREAK_BONUS_INTERVAL == 0 {
                streak_bonus = STREAK_BONUS_POINTS;
            }
        }
        // Gaps of two or more days and last completions dated after today
        // both restart the streak.
        Some(_) => {
            next.current_streak = 1;
        }
    }

    next.last_completion_at = Some(completed_at);
    if next.current_streak > next.longest_streak {
        next.longest_streak = next.current_streak;
    }

    let outcome = PointsOutcome {
        base_points: BASE_POINTS,
        streak_bonus,
        already_completed_today: false,
    };

    debug!(
        target: "app::progression",
        user_id = %next.user_id,
        streak = next.current_streak,
        longest = next.longest_streak,
        points = outcome.total(),
        "streak evaluated"
    );

    (next, outcome)
}

/// Raw level for a point total. Display tiers are derived separately.
pub fn derive_level(growth_points: u64) -> u64 {
    growth_points / POINTS_PER_LEVEL
}

fn achievement_triggered(kind: AchievementKind, record: &ProgressionRecord) -> bool {
    match kind {
        AchievementKind::FirstBloom => record.current_level >= 1,
        AchievementKind::SevenDayGrowth => record.current_streak >= SEVEN_DAY_STREAK,
        AchievementKind::ForestCreator => record.current_level >= FOREST_LEVEL,
        AchievementKind::StreakMaster => record.longest_streak >= STREAK_MASTER_DAYS,
        AchievementKind::ProductivityHero => record.growth_points >= PRODUCTIVITY_HERO_POINTS,
    }
}

/// Unlocks every achievement whose condition holds and that the record does
/// not already carry. Returns the kinds unlocked by this call.
pub fn check_achievements(
    record: &ProgressionRecord,
    now: DateTime<Utc>,
) -> (ProgressionRecord, Vec<AchievementKind>) {
    let mut next = record.clone();
    let mut unlocked = Vec::new();

    for kind in AchievementKind::ALL {
        if next.has_achievement(kind) || !achievement_triggered(kind, &next) {
            continue;
        }
        next.achievements.push(AchievementUnlock {
            kind,
            unlocked_at: now,
        });
        unlocked.push(kind);
    }

    (next, unlocked)
}

/// Full completion pipeline: streak and points, level, then achievements.
pub fn apply_completion(
    record: &ProgressionRecord,
    now: DateTime<Utc>,
    tz: Tz,
) -> (ProgressionRecord, GrowthUpdate) {
    let (mut next, outcome) = evaluate_completion(record, now, tz);
    next.growth_points = next.growth_points.saturating_add(outcome.total());
    next.current_level = derive_level(next.growth_points);

    let (next, new_achievements) = check_achievements(&next, now);

    let update = GrowthUpdate {
        gp_earned: outcome.total(),
        new_level: next.current_level,
        current_streak: next.current_streak,
        new_achievements,
    };

    (next, update)
}
