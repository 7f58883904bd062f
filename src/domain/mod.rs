mod account;
mod agent;
mod beneficiary;
mod compliance;
mod error;
mod fx;
mod ledger;
mod money;
mod notification;
mod support;
mod transaction;
mod validation;

pub use account::*;
pub use agent::*;
pub use beneficiary::*;
pub use compliance::*;
pub use error::*;
pub use fx::*;
pub use ledger::*;
pub use money::*;
pub use notification::*;
pub use support::*;
pub use transaction::*;
pub use validation::{validate_email, validate_phone};
