//! smeta_engine - Estimate row classification, pricing and aggregation.

pub mod engine;
