/// API keys for tests. Long enough to produce a distinct four-character hint.
pub const TEST_API_KEY: &str = "testkey00000AAAA";
pub const TEST_API_KEY_2: &str = "testkey00000BBBB";

pub const TEST_FACTION_ID: i64 = 9_001;
pub const TEST_FACTION_NAME: &str = "Midnight Exports";

/// 2024-01-15 12:30:00 UTC, a slot boundary.
pub const TEST_SLOT_TIMESTAMP: i64 = 1_705_321_800;
