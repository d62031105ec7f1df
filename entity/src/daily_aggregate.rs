use sea_orm::entity::prelude::*;

/// Pre-aggregated activity bucket: one row per (faction, date, hour, slot).
///
/// `active_sum / snapshot_count` reconstructs the average active count for the
/// bucket. Sums are additive across snapshots, not unique-member counts.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "daily_aggregate")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub faction_id: i64,
    /// Calendar date as `YYYY-MM-DD` (UTC).
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: String,
    /// Hour of day, 0-23 (UTC).
    #[sea_orm(primary_key, auto_increment = false)]
    pub hour: i16,
    /// 15-minute sub-slot within the hour, 0-3.
    #[sea_orm(primary_key, auto_increment = false)]
    pub slot: i16,
    /// Day of week, 0-6 with Sunday = 0 (UTC).
    pub day_of_week: i16,
    pub active_sum: i64,
    pub snapshot_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
