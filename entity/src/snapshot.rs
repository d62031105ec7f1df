use sea_orm::entity::prelude::*;

/// One poll result for one faction at one 15-minute slot.
///
/// The active member set itself lives in `snapshot_member`; this row keeps the
/// counts so activity-level scans never need the membership rows.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "snapshot")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub faction_id: i64,
    /// Unix seconds, aligned to a 15-minute slot boundary.
    pub slot_timestamp: i64,
    pub active_count: i32,
    pub total_count: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::faction::Entity",
        from = "Column::FactionId",
        to = "super::faction::Column::FactionId"
    )]
    Faction,
    #[sea_orm(has_many = "super::snapshot_member::Entity")]
    SnapshotMember,
}

impl Related<super::faction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Faction.def()
    }
}

impl Related<super::snapshot_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SnapshotMember.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
