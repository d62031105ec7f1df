//! Database row fixtures.

use sea_orm::{ActiveValue, EntityTrait, sea_query::OnConflict};

use crate::{error::TestError, setup::TestSetup};

impl TestSetup {
    pub async fn insert_tracked_faction(
        &self,
        faction_id: i64,
        name: &str,
    ) -> Result<(), TestError> {
        entity::prelude::Faction::insert(entity::faction::ActiveModel {
            faction_id: ActiveValue::Set(faction_id),
            name: ActiveValue::Set(name.to_string()),
            tracked: ActiveValue::Set(true),
            last_updated: ActiveValue::Set(0),
            ..Default::default()
        })
        .exec_without_returning(&self.db)
        .await?;

        Ok(())
    }

    /// Inserts a bare snapshot row (counts only, no membership rows) and
    /// returns its id. The parent faction row is created when missing so the
    /// snapshot's foreign key holds.
    pub async fn insert_snapshot(
        &self,
        faction_id: i64,
        slot_timestamp: i64,
        active_count: i32,
        total_count: i32,
    ) -> Result<i32, TestError> {
        entity::prelude::Faction::insert(entity::faction::ActiveModel {
            faction_id: ActiveValue::Set(faction_id),
            name: ActiveValue::Set(format!("Faction {faction_id}")),
            tracked: ActiveValue::Set(false),
            last_updated: ActiveValue::Set(0),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(entity::faction::Column::FactionId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;

        let result = entity::prelude::Snapshot::insert(entity::snapshot::ActiveModel {
            faction_id: ActiveValue::Set(faction_id),
            slot_timestamp: ActiveValue::Set(slot_timestamp),
            active_count: ActiveValue::Set(active_count),
            total_count: ActiveValue::Set(total_count),
            ..Default::default()
        })
        .exec(&self.db)
        .await?;

        Ok(result.last_insert_id)
    }

    pub async fn insert_member(&self, member_id: i64, name: &str) -> Result<(), TestError> {
        entity::prelude::Member::insert(entity::member::ActiveModel {
            id: ActiveValue::Set(member_id),
            name: ActiveValue::Set(name.to_string()),
            last_seen: ActiveValue::Set(0),
        })
        .exec_without_returning(&self.db)
        .await?;

        Ok(())
    }
}
