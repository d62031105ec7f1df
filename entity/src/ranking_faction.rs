use sea_orm::entity::prelude::*;

/// One entry of the locally cached faction ranking directory.
///
/// Replaced wholesale on every ranking refresh; never used as time-series
/// truth.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ranking_faction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub faction_id: i64,
    pub name: String,
    pub members: i32,
    pub position: i32,
    pub rank: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
