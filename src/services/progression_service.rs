use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::db::repositories::progression_repository::ProgressionRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::progression::{
    GrowthUpdate, PlantKind, PlantStage, PlantUnlock, ProgressionProfile, ProgressionRecord,
};
use crate::services::progression_engine::{self, POINTS_PER_LEVEL};
use crate::services::settings_service::SettingsService;

pub struct ProgressionService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl ProgressionService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    /// Creates the zeroed record for a freshly registered account. Calling it
    /// again for the same user is a no-op that returns the stored record.
    pub fn initialize(&self, user_id: &str) -> AppResult<ProgressionRecord> {
        let user_id = normalize_user_id(user_id)?;
        self.db.with_transaction(|tx| {
            if let Some(existing) = ProgressionRepository::find(tx, &user_id)? {
                debug!(target: "app::progression", %user_id, "progression already initialized");
                return Ok(existing);
            }
            let record = ProgressionRecord::new(user_id.clone());
            ProgressionRepository::insert(tx, &record)?;
            info!(target: "app::progression", %user_id, "progression initialized");
            Ok(record)
        })
    }

    pub fn get(&self, user_id: &str) -> AppResult<ProgressionRecord> {
        self.db.with_connection(|conn| load_record(conn, user_id))
    }

    pub fn profile(&self, user_id: &str) -> AppResult<ProgressionProfile> {
        let record = self.get(user_id)?;
        Ok(ProgressionProfile {
            plant_stage: PlantStage::from_level(record.current_level),
            next_plant_cost: next_plant_cost(&record),
            record,
        })
    }

    /// Spends nothing: plants are gated on lifetime growth points, each new
    /// plant requiring another hundred. Checks run in order: enough GP, a
    /// known plant type, then not already unlocked.
    pub fn unlock_plant(&self, user_id: &str, plant_type: &str) -> AppResult<ProgressionRecord> {
        let now = Utc::now();

        self.db.with_transaction(|tx| {
            let mut record = load_record(tx, user_id)?;

            let required = next_plant_cost(&record);
            if record.growth_points < required {
                return Err(AppError::validation_with_details(
                    format!("解锁该植物需要 {required} GP"),
                    serde_json::json!({
                        "requiredGp": required,
                        "growthPoints": record.growth_points,
                    }),
                ));
            }

            let kind = PlantKind::from_str(plant_type.trim().to_lowercase().as_str())
                .map_err(|_| AppError::validation("无效的植物类型"))?;

            if record.has_plant(kind) {
                return Err(AppError::conflict("该植物已解锁"));
            }

            record.plants.push(PlantUnlock {
                kind,
                unlocked_at: now,
            });
            record.version = ProgressionRepository::store(tx, &record)?;
            info!(target: "app::progression", user_id = %record.user_id, plant = %kind, "plant unlocked");
            Ok(record)
        })
    }

    /// Loads, evaluates and stores a completion on the caller's transaction so
    /// the task write and the progression write commit together.
    pub fn record_completion(
        &self,
        conn: &Connection,
        user_id: &str,
        completed_at: DateTime<Utc>,
    ) -> AppResult<GrowthUpdate> {
        let tz = self.settings.reference_timezone();
        let current = load_record(conn, user_id)?;
        let (mut next, update) = progression_engine::apply_completion(&current, completed_at, tz);

        if next != current {
            next.version = ProgressionRepository::store(conn, &next)?;
        }

        info!(
            target: "app::progression",
            %user_id,
            gp_earned = update.gp_earned,
            level = update.new_level,
            streak = update.current_streak,
            unlocked = update.new_achievements.len(),
            "completion recorded"
        );
        Ok(update)
    }
}

fn load_record(conn: &Connection, user_id: &str) -> AppResult<ProgressionRecord> {
    ProgressionRepository::find(conn, user_id)?.ok_or_else(AppError::not_found)
}

fn next_plant_cost(record: &ProgressionRecord) -> u64 {
    (record.plants.len() as u64 + 1) * POINTS_PER_LEVEL
}

fn normalize_user_id(user_id: &str) -> AppResult<String> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("用户标识不能为空"));
    }
    Ok(trimmed.to_string())
}
