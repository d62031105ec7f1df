use mockito::{Mock, Server, ServerGuard};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, sea_query::TableCreateStatement};

use crate::error::TestError;

/// Mock upstream server plus an in-memory database, the common harness for
/// integration tests.
pub struct TestSetup {
    pub server: ServerGuard,
    pub db: DatabaseConnection,
    pub mocks: Vec<Mock>,
}

impl TestSetup {
    pub async fn new() -> Result<Self, TestError> {
        let server = Server::new_async().await;
        let db = Database::connect("sqlite::memory:").await?;

        Ok(TestSetup {
            server,
            db,
            mocks: Vec::new(),
        })
    }

    /// Base URL of the mock upstream server.
    pub fn api_url(&self) -> String {
        self.server.url()
    }

    pub async fn with_tables(&self, stmts: Vec<TableCreateStatement>) -> Result<(), TestError> {
        for stmt in stmts {
            self.db.execute(&stmt).await?;
        }

        Ok(())
    }

    /// Assert all registered mock endpoints were called as expected.
    ///
    /// # Panics
    /// Panics if any mock endpoint was not called the expected number of
    /// times.
    pub fn assert_mocks(&self) {
        for mock in &self.mocks {
            mock.assert();
        }
    }
}

#[macro_export]
macro_rules! test_setup_with_tables {
    // Pattern 1: No entities provided
    () => {{
        TestSetup::new().await
    }};

    // Pattern 2: Entities provided
    ($($entity:expr),+ $(,)?) => {{
        async {
            let setup = TestSetup::new().await?;

            let schema = sea_orm::Schema::new(sea_orm::DbBackend::Sqlite);
            let stmts = vec![
                $(schema.create_table_from_entity($entity),)+
            ];
            setup.with_tables(stmts).await?;

            Ok::<_, $crate::error::TestError>(setup)
        }.await
    }};
}

/// Creates every engine table; most integration tests want all of them since
/// snapshot writes touch five tables in one transaction.
#[macro_export]
macro_rules! test_setup_with_all_tables {
    () => {{
        $crate::test_setup_with_tables!(
            entity::prelude::Faction,
            entity::prelude::Snapshot,
            entity::prelude::SnapshotMember,
            entity::prelude::Member,
            entity::prelude::MemberFaction,
            entity::prelude::DailyAggregate,
            entity::prelude::RankingFaction,
            entity::prelude::RankingMeta,
        )
    }};
}
