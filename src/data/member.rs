use migration::OnConflict;
use sea_orm::{
    ActiveValue, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::LikeExpr,
};

const UPSERT_CHUNK_SIZE: usize = 500;

pub struct MemberRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> MemberRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Upserts member identities observed in a faction payload, refreshing
    /// name and last-seen on conflict.
    pub async fn upsert_many(&self, members: &[(i64, String)], seen_at: i64) -> Result<(), DbErr> {
        for chunk in members.chunks(UPSERT_CHUNK_SIZE) {
            let models = chunk.iter().map(|(id, name)| entity::member::ActiveModel {
                id: ActiveValue::Set(*id),
                name: ActiveValue::Set(name.clone()),
                last_seen: ActiveValue::Set(seen_at),
            });

            entity::prelude::Member::insert_many(models)
                .on_conflict(
                    OnConflict::column(entity::member::Column::Id)
                        .update_columns([
                            entity::member::Column::Name,
                            entity::member::Column::LastSeen,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(self.db)
                .await?;
        }

        Ok(())
    }

    /// Records member-to-faction sightings. First-seen is set only when the
    /// pair is new; last-seen always advances.
    pub async fn record_associations(
        &self,
        member_ids: &[i64],
        faction_id: i64,
        seen_at: i64,
    ) -> Result<(), DbErr> {
        for chunk in member_ids.chunks(UPSERT_CHUNK_SIZE) {
            let models = chunk.iter().map(|member_id| entity::member_faction::ActiveModel {
                member_id: ActiveValue::Set(*member_id),
                faction_id: ActiveValue::Set(faction_id),
                first_seen: ActiveValue::Set(seen_at),
                last_seen: ActiveValue::Set(seen_at),
            });

            entity::prelude::MemberFaction::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        entity::member_faction::Column::MemberId,
                        entity::member_faction::Column::FactionId,
                    ])
                    .update_columns([entity::member_faction::Column::LastSeen])
                    .to_owned(),
                )
                .exec_without_returning(self.db)
                .await?;
        }

        Ok(())
    }

    pub async fn find_by_id(&self, member_id: i64) -> Result<Option<entity::member::Model>, DbErr> {
        entity::prelude::Member::find_by_id(member_id).one(self.db).await
    }

    pub async fn find_by_ids(&self, member_ids: &[i64]) -> Result<Vec<entity::member::Model>, DbErr> {
        entity::prelude::Member::find()
            .filter(entity::member::Column::Id.is_in(member_ids.iter().copied()))
            .all(self.db)
            .await
    }

    /// Faction ids the member has been sighted in, most recent first.
    pub async fn faction_history(
        &self,
        member_id: i64,
    ) -> Result<Vec<entity::member_faction::Model>, DbErr> {
        entity::prelude::MemberFaction::find()
            .filter(entity::member_faction::Column::MemberId.eq(member_id))
            .order_by_desc(entity::member_faction::Column::LastSeen)
            .all(self.db)
            .await
    }

    /// Name or id search. Exact name matches sort before prefix matches,
    /// which sort before substring matches.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<entity::member::Model>, DbErr> {
        let pattern = LikeExpr::new(format!("%{}%", escape_like(query))).escape('\\');

        let mut condition = Condition::any()
            .add(entity::member::Column::Name.like(pattern));
        if let Ok(id) = query.parse::<i64>() {
            condition = condition.add(entity::member::Column::Id.eq(id));
        }

        // Over-fetch, then rank in memory; the candidate set is small.
        let mut matches = entity::prelude::Member::find()
            .filter(condition)
            .limit((limit * 4) as u64)
            .all(self.db)
            .await?;

        let needle = query.to_lowercase();
        matches.sort_by_cached_key(|m| {
            let name = m.name.to_lowercase();
            let tier = if name == needle {
                0
            } else if name.starts_with(&needle) {
                1
            } else {
                2
            };
            (tier, name)
        });
        matches.truncate(limit);

        Ok(matches)
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        entity::prelude::Member::find().count(self.db).await
    }
}

/// Escapes LIKE wildcards so user input matches literally; pair with an
/// `ESCAPE '\'` clause.
pub(crate) fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
