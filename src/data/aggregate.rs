use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QuerySelect,
    sea_query::{Expr, ExprTrait},
};

use crate::collector::slot;

/// Per-(day of week, hour) sums across dates.
#[derive(Debug, Clone, FromQueryResult)]
pub struct HourlyBucket {
    pub day_of_week: i16,
    pub hour: i16,
    pub active_sum: Option<i64>,
    pub snapshot_count: Option<i64>,
}

/// Per-(day of week, hour, 15-minute slot) sums across dates.
#[derive(Debug, Clone, FromQueryResult)]
pub struct QuarterHourBucket {
    pub day_of_week: i16,
    pub hour: i16,
    pub slot: i16,
    pub active_sum: Option<i64>,
    pub snapshot_count: Option<i64>,
}

pub struct AggregateRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AggregateRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Folds one snapshot into its (date, hour, slot) bucket: adds the active
    /// count to the sum and bumps the sample count.
    ///
    /// Sums are additive across snapshots in the bucket, not unique-member
    /// counts; `active_sum / snapshot_count` gives the bucket's average.
    pub async fn increment(
        &self,
        faction_id: i64,
        slot_timestamp: i64,
        active_count: i32,
    ) -> Result<(), DbErr> {
        let date = slot::date_string(slot_timestamp);
        let hour = slot::hour_of_day(slot_timestamp) as i16;
        let sub_slot = slot::sub_slot(slot_timestamp) as i16;

        let existing = entity::prelude::DailyAggregate::find_by_id((
            faction_id,
            date.clone(),
            hour,
            sub_slot,
        ))
        .one(self.db)
        .await?;

        match existing {
            Some(bucket) => {
                let mut model: entity::daily_aggregate::ActiveModel = bucket.clone().into();
                model.active_sum = ActiveValue::Set(bucket.active_sum + active_count as i64);
                model.snapshot_count = ActiveValue::Set(bucket.snapshot_count + 1);
                entity::prelude::DailyAggregate::update(model).exec(self.db).await?;
            }
            None => {
                let model = entity::daily_aggregate::ActiveModel {
                    faction_id: ActiveValue::Set(faction_id),
                    date: ActiveValue::Set(date),
                    hour: ActiveValue::Set(hour),
                    slot: ActiveValue::Set(sub_slot),
                    day_of_week: ActiveValue::Set(slot::day_of_week(slot_timestamp) as i16),
                    active_sum: ActiveValue::Set(active_count as i64),
                    snapshot_count: ActiveValue::Set(1),
                };
                entity::prelude::DailyAggregate::insert(model).exec_without_returning(self.db).await?;
            }
        }

        Ok(())
    }

    /// Per-(day, hour) sums since `since_date` inclusive.
    pub async fn hourly_since(
        &self,
        faction_id: i64,
        since_date: &str,
    ) -> Result<Vec<HourlyBucket>, DbErr> {
        entity::prelude::DailyAggregate::find()
            .select_only()
            .column(entity::daily_aggregate::Column::DayOfWeek)
            .column(entity::daily_aggregate::Column::Hour)
            .column_as(
                Expr::col(entity::daily_aggregate::Column::ActiveSum).sum(),
                "active_sum",
            )
            .column_as(
                Expr::col(entity::daily_aggregate::Column::SnapshotCount).sum(),
                "snapshot_count",
            )
            .filter(entity::daily_aggregate::Column::FactionId.eq(faction_id))
            .filter(entity::daily_aggregate::Column::Date.gte(since_date))
            .group_by(entity::daily_aggregate::Column::DayOfWeek)
            .group_by(entity::daily_aggregate::Column::Hour)
            .into_model::<HourlyBucket>()
            .all(self.db)
            .await
    }

    /// Per-(day, hour, slot) sums since `since_date` inclusive.
    pub async fn quarter_hour_since(
        &self,
        faction_id: i64,
        since_date: &str,
    ) -> Result<Vec<QuarterHourBucket>, DbErr> {
        entity::prelude::DailyAggregate::find()
            .select_only()
            .column(entity::daily_aggregate::Column::DayOfWeek)
            .column(entity::daily_aggregate::Column::Hour)
            .column(entity::daily_aggregate::Column::Slot)
            .column_as(
                Expr::col(entity::daily_aggregate::Column::ActiveSum).sum(),
                "active_sum",
            )
            .column_as(
                Expr::col(entity::daily_aggregate::Column::SnapshotCount).sum(),
                "snapshot_count",
            )
            .filter(entity::daily_aggregate::Column::FactionId.eq(faction_id))
            .filter(entity::daily_aggregate::Column::Date.gte(since_date))
            .group_by(entity::daily_aggregate::Column::DayOfWeek)
            .group_by(entity::daily_aggregate::Column::Hour)
            .group_by(entity::daily_aggregate::Column::Slot)
            .into_model::<QuarterHourBucket>()
            .all(self.db)
            .await
    }

    pub async fn delete_before(&self, cutoff_date: &str) -> Result<u64, DbErr> {
        let result = entity::prelude::DailyAggregate::delete_many()
            .filter(entity::daily_aggregate::Column::Date.lt(cutoff_date))
            .exec(self.db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        entity::prelude::DailyAggregate::find().count(self.db).await
    }
}
