pub mod store;

pub use store::{AccountsStore, AccountsTx, InsertOutcome};

use crate::domain::events::AccountOutcome;

/// Output port: report operation outcomes (no knowledge of transport).
pub trait OutcomeSink: Send + Sync + 'static {
    fn record(&self, outcome: &AccountOutcome);
}
