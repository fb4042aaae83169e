//! Document state and logic (UI-agnostic).

mod history;
mod io;
mod model;
mod notify;
mod ops;
mod state;

pub use model::{DEFAULT_SHEET_NAME, Estimate, Repair, TotalsSummary};
pub use notify::{ChangeEvent, Listener, SubscriptionId};
pub use state::DocumentStore;
