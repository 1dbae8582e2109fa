use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use chrono::{Duration, Utc};
use mongodb::bson::DateTime;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{ActionType, Campus},
        dto::{
            response::{ActivityDto, MaterialDto},
            stats::{
                CampusStats, DailyActionRow, DailyStat, HourlyStat, MaterialStats, OverviewStats,
                RealtimeStats, UserStats,
            },
        },
    },
    repositories::{ActivityRepository, MaterialRepository, StatsRepository},
};

const DEFAULT_DAYS: i64 = 7;
const MAX_DAYS: i64 = 365;

pub struct StatsService {
    stats: Arc<dyn StatsRepository>,
    activities: Arc<dyn ActivityRepository>,
    materials: Arc<dyn MaterialRepository>,
}

impl StatsService {
    pub fn new(
        stats: Arc<dyn StatsRepository>,
        activities: Arc<dyn ActivityRepository>,
        materials: Arc<dyn MaterialRepository>,
    ) -> Self {
        Self {
            stats,
            activities,
            materials,
        }
    }

    pub async fn overview(&self) -> AppResult<OverviewStats> {
        self.stats.overview().await
    }

    pub async fn daily(&self, days: Option<i64>) -> AppResult<Vec<DailyStat>> {
        let days = match days {
            Some(d) if d > 0 => d.min(MAX_DAYS),
            _ => DEFAULT_DAYS,
        };
        let since = DateTime::from_chrono(Utc::now() - Duration::days(days));
        let rows = self.stats.daily_rows(since).await?;
        Ok(fold_daily(rows))
    }

    pub async fn realtime(&self) -> AppResult<RealtimeStats> {
        let since = DateTime::from_chrono(Utc::now() - Duration::hours(24));

        let recent = self.activities.recent(since, 20).await?;
        let hourly = self.stats.hourly_counts(since).await?;
        let top = self.materials.top_by_engagement(10).await?;

        Ok(RealtimeStats {
            recent_activities: recent.into_iter().map(ActivityDto::from).collect(),
            hourly_stats: fill_hours(hourly),
            top_materials: top.into_iter().map(MaterialDto::from).collect(),
        })
    }

    pub async fn campus(&self, campus: &str) -> AppResult<CampusStats> {
        let campus: Campus = campus.parse().map_err(AppError::ValidationError)?;
        self.stats.campus(campus).await
    }

    pub async fn materials(&self) -> AppResult<MaterialStats> {
        self.stats.materials().await
    }

    pub async fn users(&self) -> AppResult<UserStats> {
        let since = DateTime::from_chrono(Utc::now() - Duration::days(30));
        self.stats.users(since).await
    }
}

/// One entry per date, ascending. `unique_users` counts a user once per day
/// across all actions.
pub fn fold_daily(rows: Vec<DailyActionRow>) -> Vec<DailyStat> {
    let mut days: BTreeMap<String, (DailyStat, HashSet<String>)> = BTreeMap::new();

    for row in rows {
        let (stat, users) = days.entry(row.key.date.clone()).or_insert_with(|| {
            (
                DailyStat {
                    date: row.key.date.clone(),
                    ..Default::default()
                },
                HashSet::new(),
            )
        });
        match row.key.action {
            ActionType::Download => stat.downloads += row.count,
            ActionType::View => stat.views += row.count,
            ActionType::Upload => stat.uploads += row.count,
            _ => {}
        }
        users.extend(row.users);
    }

    days.into_values()
        .map(|(mut stat, users)| {
            stat.unique_users = users.len() as i64;
            stat
        })
        .collect()
}

/// Exactly 24 entries, hour 0 first, zero where nothing happened.
pub fn fill_hours(counts: Vec<HourlyStat>) -> Vec<HourlyStat> {
    let mut hours: Vec<HourlyStat> = (0..24).map(|hour| HourlyStat { hour, count: 0 }).collect();
    for stat in counts {
        if let Some(slot) = usize::try_from(stat.hour).ok().and_then(|h| hours.get_mut(h)) {
            slot.count += stat.count;
        }
    }
    hours
}
