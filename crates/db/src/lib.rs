pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod query;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{SeedDataset, SeedResult, VerificationResult, ENGINEERING_HEADCOUNT};
pub use query::{execute_readonly, schema_summary, QueryError, NO_ROWS_MESSAGE};
