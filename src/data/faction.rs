use migration::OnConflict;
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

pub struct FactionRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> FactionRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Upserts a faction's name and last-updated timestamp without touching
    /// its tracked flag. New rows start untracked.
    pub async fn upsert_name(
        &self,
        faction_id: i64,
        name: &str,
        last_updated: i64,
    ) -> Result<(), DbErr> {
        let model = entity::faction::ActiveModel {
            faction_id: ActiveValue::Set(faction_id),
            name: ActiveValue::Set(name.to_string()),
            tracked: ActiveValue::Set(false),
            last_updated: ActiveValue::Set(last_updated),
            ..Default::default()
        };

        entity::prelude::Faction::insert(model)
            .on_conflict(
                OnConflict::column(entity::faction::Column::FactionId)
                    .update_columns([
                        entity::faction::Column::Name,
                        entity::faction::Column::LastUpdated,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db)
            .await?;

        Ok(())
    }

    /// Marks factions as tracked, creating rows for ids not yet known.
    /// Returns how many were newly tracked.
    pub async fn track_many(&self, factions: Vec<(i64, String)>) -> Result<usize, DbErr> {
        if factions.is_empty() {
            return Ok(0);
        }

        let already_tracked = self.tracked_ids().await?;

        let mut added = 0;
        for (faction_id, name) in factions {
            if already_tracked.contains(&faction_id) {
                continue;
            }

            let model = entity::faction::ActiveModel {
                faction_id: ActiveValue::Set(faction_id),
                name: ActiveValue::Set(name),
                tracked: ActiveValue::Set(true),
                last_updated: ActiveValue::Set(0),
                ..Default::default()
            };

            entity::prelude::Faction::insert(model)
                .on_conflict(
                    OnConflict::column(entity::faction::Column::FactionId)
                        .update_columns([entity::faction::Column::Tracked])
                        .to_owned(),
                )
                .exec_without_returning(self.db)
                .await?;

            added += 1;
        }

        Ok(added)
    }

    /// Clears the tracked flag; rows are kept for name resolution. Returns
    /// how many were untracked.
    pub async fn untrack_many(&self, faction_ids: &[i64]) -> Result<u64, DbErr> {
        use sea_orm::entity::prelude::Expr;

        let result = entity::prelude::Faction::update_many()
            .col_expr(entity::faction::Column::Tracked, Expr::value(false))
            .filter(entity::faction::Column::FactionId.is_in(faction_ids.iter().copied()))
            .filter(entity::faction::Column::Tracked.eq(true))
            .exec(self.db)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn tracked_ids(&self) -> Result<Vec<i64>, DbErr> {
        entity::prelude::Faction::find()
            .select_only()
            .column(entity::faction::Column::FactionId)
            .filter(entity::faction::Column::Tracked.eq(true))
            .order_by_asc(entity::faction::Column::FactionId)
            .into_tuple::<i64>()
            .all(self.db)
            .await
    }

    pub async fn tracked_count(&self) -> Result<u64, DbErr> {
        entity::prelude::Faction::find()
            .filter(entity::faction::Column::Tracked.eq(true))
            .count(self.db)
            .await
    }

    pub async fn find_by_faction_id(
        &self,
        faction_id: i64,
    ) -> Result<Option<entity::faction::Model>, DbErr> {
        entity::prelude::Faction::find()
            .filter(entity::faction::Column::FactionId.eq(faction_id))
            .one(self.db)
            .await
    }

    pub async fn all_ordered_by_name(&self) -> Result<Vec<entity::faction::Model>, DbErr> {
        entity::prelude::Faction::find()
            .order_by_asc(entity::faction::Column::Name)
            .all(self.db)
            .await
    }

    /// Unix seconds of the faction's most recent snapshot write, if any.
    pub async fn last_updated(&self, faction_id: i64) -> Result<Option<i64>, DbErr> {
        Ok(self
            .find_by_faction_id(faction_id)
            .await?
            .map(|f| f.last_updated)
            .filter(|ts| *ts > 0))
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        entity::prelude::Faction::find().count(self.db).await
    }
}
