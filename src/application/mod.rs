// Application layer - use cases and orchestration.
// Owns account lookup and sessions; every ledger mutation goes through a
// `LedgerSession`, which serializes it and persists it in one batch.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
