use sea_orm::entity::prelude::*;

/// A faction known to the system, tracked or merely name-resolved.
///
/// `tracked` marks factions the collector polls each slot; untracked rows are
/// kept so names seen in ranking data remain resolvable.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "faction")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub faction_id: i64,
    pub name: String,
    pub tracked: bool,
    /// Unix seconds of the most recent snapshot write for this faction.
    pub last_updated: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::snapshot::Entity")]
    Snapshot,
}

impl Related<super::snapshot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Snapshot.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
