pub mod daily_aggregate;
pub mod faction;
pub mod member;
pub mod member_faction;
pub mod ranking_faction;
pub mod ranking_meta;
pub mod snapshot;
pub mod snapshot_member;

pub mod prelude {
    pub use super::daily_aggregate::Entity as DailyAggregate;
    pub use super::faction::Entity as Faction;
    pub use super::member::Entity as Member;
    pub use super::member_faction::Entity as MemberFaction;
    pub use super::ranking_faction::Entity as RankingFaction;
    pub use super::ranking_meta::Entity as RankingMeta;
    pub use super::snapshot::Entity as Snapshot;
    pub use super::snapshot_member::Entity as SnapshotMember;
}
