//! Persisted state layer: diesel models and repositories over the
//! time-series store. Per spec.md §6, the core persists no state of its
//! own — everything here is a read against tables owned by the ingestion
//! pipeline (a tick table and one OHLC table per resolution).

pub mod models;
pub mod repositories;
pub mod schema;
