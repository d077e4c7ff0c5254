//! Shared application state threaded into every handler via axum's `State`.
//!
//! One `Arc`-wrapped struct constructed once in `main`, mirroring the
//! teacher's `AppState = Arc<OrderBookEngine>` pattern but widened to the
//! set of components the Query & Data-Availability Core composes.

use crate::cache::Cache;
use crate::catalog::ResolutionCatalog;
use crate::config::AppConfig;
use crate::database::repositories::SymbolRepository;
use crate::manager::DataManager;
use crate::pool::ConnectionPool;
use crate::smart::{CandleResponse, SmartQuery};
use std::sync::Arc;
use std::time::Instant;

pub struct AppStateInner {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<ResolutionCatalog>,
    pub pool: Arc<ConnectionPool>,
    pub cache: Arc<Cache<CandleResponse>>,
    pub smart_query: Arc<SmartQuery>,
    pub data_manager: Arc<DataManager>,
    pub symbol_repository: Arc<dyn SymbolRepository>,
    pub started_at: Instant,
}

#[derive(Clone)]
pub struct AppState(pub Arc<AppStateInner>);

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AppConfig>,
        catalog: Arc<ResolutionCatalog>,
        pool: Arc<ConnectionPool>,
        cache: Arc<Cache<CandleResponse>>,
        smart_query: Arc<SmartQuery>,
        data_manager: Arc<DataManager>,
        symbol_repository: Arc<dyn SymbolRepository>,
    ) -> Self {
        Self(Arc::new(AppStateInner {
            config,
            catalog,
            pool,
            cache,
            smart_query,
            data_manager,
            symbol_repository,
            started_at: Instant::now(),
        }))
    }
}

impl std::ops::Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
