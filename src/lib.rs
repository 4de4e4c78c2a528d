// Fund Catalog - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod ingest;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use db::{
    count_funds, create_fund, get_fund, list_funds, open_database, setup_database, sum_aum,
    upsert_batch, UpsertReport,
};
pub use entities::{CandidateRecord, Fund, FundValues, Strategy};
pub use error::{ErrorKind, FundError, ValidationError};
pub use ingest::{ingest, parse_funds};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
