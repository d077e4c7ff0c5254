//! Query & Data-Availability Core for a read-optimized OHLC candle service.
//!
//! `lib.rs` is the public API contract for this crate: `main.rs` and any
//! integration tests import through here, the same way the teacher's
//! binary imports its order book engine through its own `lib.rs`.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod database;
pub mod errors;
pub mod manager;
pub mod planner;
pub mod pool;
pub mod query;
pub mod smart;

pub use api::{create_router, AppState};
pub use catalog::{Resolution, ResolutionCatalog};
pub use config::AppConfig;
pub use errors::CoreError;
pub use manager::DataManager;
pub use planner::ResolutionPlanner;
pub use pool::ConnectionPool;
pub use smart::{CandleResponse, SmartQuery};
