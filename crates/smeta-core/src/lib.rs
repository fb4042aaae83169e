//! smeta-core - estimate document store, recalculation scheduling and storage.

pub mod config;
pub mod document;
pub mod error;
pub mod recalc;
pub mod storage;

pub use config::{EngineConfig, load_config};
pub use document::{ChangeEvent, DocumentStore, Estimate, Repair, SubscriptionId, TotalsSummary};
pub use error::{EstimateError, Result};
pub use recalc::RecalcState;

pub use smeta_engine::engine::{Category, Direction, Field, Row, Sheet, SheetTotals};
