use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One-time unlocks granted by the achievement evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    FirstBloom,
    SevenDayGrowth,
    ForestCreator,
    StreakMaster,
    ProductivityHero,
}

impl AchievementKind {
    pub const ALL: [AchievementKind; 5] = [
        AchievementKind::FirstBloom,
        AchievementKind::SevenDayGrowth,
        AchievementKind::ForestCreator,
        AchievementKind::StreakMaster,
        AchievementKind::ProductivityHero,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AchievementKind::FirstBloom => "first_bloom",
            AchievementKind::SevenDayGrowth => "seven_day_growth",
            AchievementKind::ForestCreator => "forest_creator",
            AchievementKind::StreakMaster => "streak_master",
            AchievementKind::ProductivityHero => "productivity_hero",
        }
    }
}

impl fmt::Display for AchievementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AchievementKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AchievementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown achievement kind: {value}"))
    }
}

/// Collectibles bought with growth points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantKind {
    Flower,
    Tree,
    Bush,
    Cactus,
    Herb,
    Dog,
    Cat,
    Bird,
    Fish,
    Rabbit,
    Hamster,
}

impl PlantKind {
    pub const ALL: [PlantKind; 11] = [
        PlantKind::Flower,
        PlantKind::Tree,
        PlantKind::Bush,
        PlantKind::Cactus,
        PlantKind::Herb,
        PlantKind::Dog,
        PlantKind::Cat,
        PlantKind::Bird,
        PlantKind::Fish,
        PlantKind::Rabbit,
        PlantKind::Hamster,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlantKind::Flower => "flower",
            PlantKind::Tree => "tree",
            PlantKind::Bush => "bush",
            PlantKind::Cactus => "cactus",
            PlantKind::Herb => "herb",
            PlantKind::Dog => "dog",
            PlantKind::Cat => "cat",
            PlantKind::Bird => "bird",
            PlantKind::Fish => "fish",
            PlantKind::Rabbit => "rabbit",
            PlantKind::Hamster => "hamster",
        }
    }
}

impl fmt::Display for PlantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlantKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PlantKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown plant kind: {value}"))
    }
}

/// Display tier for the garden view. Levels above the last tier stay a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantStage {
    Seed,
    Sprout,
    Sapling,
    Bloom,
    Tree,
}

impl PlantStage {
    pub fn from_level(level: u64) -> Self {
        match level {
            0 => PlantStage::Seed,
            1 => PlantStage::Sprout,
            2 => PlantStage::Sapling,
            3 => PlantStage::Bloom,
            _ => PlantStage::Tree,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlock {
    pub kind: AchievementKind,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantUnlock {
    pub kind: PlantKind,
    pub unlocked_at: DateTime<Utc>,
}

/// Per-user gamification state. `version` is bumped on every successful
/// write and guards against concurrent writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionRecord {
    pub user_id: String,
    pub growth_points: u64,
    pub current_level: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_completion_at: Option<DateTime<Utc>>,
    pub achievements: Vec<AchievementUnlock>,
    pub plants: Vec<PlantUnlock>,
    pub version: i64,
}

impl ProgressionRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            growth_points: 0,
            current_level: 0,
            current_streak: 0,
            longest_streak: 0,
            last_completion_at: None,
            achievements: Vec::new(),
            plants: Vec::new(),
            version: 0,
        }
    }

    pub fn has_achievement(&self, kind: AchievementKind) -> bool {
        self.achievements.iter().any(|unlock| unlock.kind == kind)
    }

    pub fn has_plant(&self, kind: PlantKind) -> bool {
        self.plants.iter().any(|unlock| unlock.kind == kind)
    }
}

/// Points awarded by one streak evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsOutcome {
    pub base_points: u64,
    pub streak_bonus: u64,
    pub already_completed_today: bool,
}

impl PointsOutcome {
    pub fn total(&self) -> u64 {
        self.base_points + self.streak_bonus
    }
}

/// What a completion earned, surfaced to the client alongside the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthUpdate {
    pub gp_earned: u64,
    pub new_level: u64,
    pub current_streak: u32,
    pub new_achievements: Vec<AchievementKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionProfile {
    #[serde(flatten)]
    pub record: ProgressionRecord,
    pub plant_stage: PlantStage,
    pub next_plant_cost: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantUnlockInput {
    pub plant_type: String,
}
