use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::progression::{
    AchievementKind, AchievementUnlock, PlantKind, PlantUnlock, ProgressionRecord,
};

#[derive(Debug, Clone)]
pub struct ProgressionRow {
    pub user_id: String,
    pub growth_points: i64,
    pub current_level: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_completion_at: Option<String>,
    pub version: i64,
}

impl ProgressionRow {
    pub fn from_record(record: &ProgressionRecord) -> AppResult<Self> {
        Ok(Self {
            user_id: record.user_id.clone(),
            growth_points: to_sql_counter(record.growth_points, "growth_points")?,
            current_level: to_sql_counter(record.current_level, "current_level")?,
            current_streak: record.current_streak,
            longest_streak: record.longest_streak,
            last_completion_at: record.last_completion_at.map(|ts| ts.to_rfc3339()),
            version: record.version,
        })
    }

    fn into_record(
        self,
        achievements: Vec<AchievementUnlock>,
        plants: Vec<PlantUnlock>,
    ) -> AppResult<ProgressionRecord> {
        Ok(ProgressionRecord {
            user_id: self.user_id,
            growth_points: from_sql_counter(self.growth_points, "growth_points")?,
            current_level: from_sql_counter(self.current_level, "current_level")?,
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_completion_at: self
                .last_completion_at
                .as_deref()
                .map(parse_stored_timestamp)
                .transpose()?,
            achievements,
            plants,
            version: self.version,
        })
    }
}

impl TryFrom<&Row<'_>> for ProgressionRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            growth_points: row.get("growth_points")?,
            current_level: row.get("current_level")?,
            current_streak: row.get("current_streak")?,
            longest_streak: row.get("longest_streak")?,
            last_completion_at: row.get("last_completion_at")?,
            version: row.get("version")?,
        })
    }
}

pub struct ProgressionRepository;

impl ProgressionRepository {
    pub fn find(conn: &Connection, user_id: &str) -> AppResult<Option<ProgressionRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    user_id,
                    growth_points,
                    current_level,
                    current_streak,
                    longest_streak,
                    last_completion_at,
                    version
                FROM user_progression
                WHERE user_id = :user_id
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":user_id": user_id}, |row| {
                ProgressionRow::try_from(row)
            })
            .optional()?;

        match row {
            Some(row) => {
                let achievements = Self::list_achievements(conn, user_id)?;
                let plants = Self::list_plants(conn, user_id)?;
                row.into_record(achievements, plants).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn insert(conn: &Connection, record: &ProgressionRecord) -> AppResult<()> {
        let row = ProgressionRow::from_record(record)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
                INSERT INTO user_progression (
                    user_id,
                    growth_points,
                    current_level,
                    current_streak,
                    longest_streak,
                    last_completion_at,
                    version,
                    created_at,
                    updated_at
                ) VALUES (
                    :user_id,
                    :growth_points,
                    :current_level,
                    :current_streak,
                    :longest_streak,
                    :last_completion_at,
                    :version,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":user_id": &row.user_id,
                ":growth_points": row.growth_points,
                ":current_level": row.current_level,
                ":current_streak": row.current_streak,
                ":longest_streak": row.longest_streak,
                ":last_completion_at": &row.last_completion_at,
                ":version": row.version,
                ":created_at": &now,
                ":updated_at": &now,
            },
        )?;

        Self::insert_unlocks(conn, record)?;
        Ok(())
    }

    /// Writes `record` only if the stored version still equals
    /// `record.version`, then returns the bumped version. A mismatch means
    /// another writer got there first and yields `AppError::Conflict`.
    pub fn store(conn: &Connection, record: &ProgressionRecord) -> AppResult<i64> {
        let row = ProgressionRow::from_record(record)?;
        let next_version = row.version + 1;
        let affected = conn.execute(
            r#"
                UPDATE user_progression SET
                    growth_points = :growth_points,
                    current_level = :current_level,
                    current_streak = :current_streak,
                    longest_streak = :longest_streak,
                    last_completion_at = :last_completion_at,
                    version = :next_version,
                    updated_at = :updated_at
                WHERE user_id = :user_id AND version = :version
            "#,
            named_params! {
                ":user_id": &row.user_id,
                ":growth_points": row.growth_points,
                ":current_level": row.current_level,
                ":current_streak": row.current_streak,
                ":longest_streak": row.longest_streak,
                ":last_completion_at": &row.last_completion_at,
                ":version": row.version,
                ":next_version": next_version,
                ":updated_at": Utc::now().to_rfc3339(),
            },
        )?;

        if affected == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM user_progression WHERE user_id = ?1)",
                [&row.user_id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                AppError::conflict("成长记录已被其他请求更新")
            } else {
                AppError::not_found()
            });
        }

        Self::insert_unlocks(conn, record)?;
        Ok(next_version)
    }

    fn insert_unlocks(conn: &Connection, record: &ProgressionRecord) -> AppResult<()> {
        for unlock in &record.achievements {
            conn.execute(
                r#"
                    INSERT OR IGNORE INTO progression_achievements (user_id, kind, unlocked_at)
                    VALUES (:user_id, :kind, :unlocked_at)
                "#,
                named_params! {
                    ":user_id": &record.user_id,
                    ":kind": unlock.kind.as_str(),
                    ":unlocked_at": unlock.unlocked_at.to_rfc3339(),
                },
            )?;
        }

        for unlock in &record.plants {
            conn.execute(
                r#"
                    INSERT OR IGNORE INTO progression_plants (user_id, kind, unlocked_at)
                    VALUES (:user_id, :kind, :unlocked_at)
                "#,
                named_params! {
                    ":user_id": &record.user_id,
                    ":kind": unlock.kind.as_str(),
                    ":unlocked_at": unlock.unlocked_at.to_rfc3339(),
                },
            )?;
        }

        Ok(())
    }

    fn list_achievements(conn: &Connection, user_id: &str) -> AppResult<Vec<AchievementUnlock>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT kind, unlocked_at
                FROM progression_achievements
                WHERE user_id = :user_id
                ORDER BY unlocked_at ASC, rowid ASC
            "#,
        )?;

        let raw = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(kind, unlocked_at)| {
                Ok(AchievementUnlock {
                    kind: kind.parse::<AchievementKind>().map_err(AppError::database)?,
                    unlocked_at: parse_stored_timestamp(&unlocked_at)?,
                })
            })
            .collect()
    }

    fn list_plants(conn: &Connection, user_id: &str) -> AppResult<Vec<PlantUnlock>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT kind, unlocked_at
                FROM progression_plants
                WHERE user_id = :user_id
                ORDER BY unlocked_at ASC, rowid ASC
            "#,
        )?;

        let raw = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(kind, unlocked_at)| {
                Ok(PlantUnlock {
                    kind: kind.parse::<PlantKind>().map_err(AppError::database)?,
                    unlocked_at: parse_stored_timestamp(&unlocked_at)?,
                })
            })
            .collect()
    }
}

fn parse_stored_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("无效的时间戳 {raw}: {err}")))
}

fn to_sql_counter(value: u64, column: &str) -> AppResult<i64> {
    i64::try_from(value).map_err(|_| AppError::database(format!("{column} 超出存储范围")))
}

fn from_sql_counter(value: i64, column: &str) -> AppResult<u64> {
    u64::try_from(value).map_err(|_| AppError::database(format!("{column} 不能为负数")))
}
