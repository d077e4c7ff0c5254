use crate::database::models::Symbol;
use crate::database::schema::symbols;
use crate::errors::CoreError;
use crate::pool::ConnectionPool;
use diesel::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Symbol lookups backing `/symbols`. Read-only — the core has no write path.
pub trait SymbolRepository: Send + Sync {
    fn get_all(&self) -> Result<Vec<Symbol>, CoreError>;
    fn find(&self, symbol: &str) -> Result<Option<Symbol>, CoreError>;
}

pub struct PgSymbolRepository {
    pool: Arc<ConnectionPool>,
    acquire_timeout: Duration,
}

impl PgSymbolRepository {
    pub fn new(pool: Arc<ConnectionPool>, acquire_timeout: Duration) -> Self {
        Self { pool, acquire_timeout }
    }
}

impl SymbolRepository for PgSymbolRepository {
    fn get_all(&self) -> Result<Vec<Symbol>, CoreError> {
        let mut conn = self.pool.acquire(self.acquire_timeout)?;
        symbols::table
            .order(symbols::symbol.asc())
            .load::<Symbol>(&mut *conn)
            .map_err(CoreError::from)
    }

    fn find(&self, symbol: &str) -> Result<Option<Symbol>, CoreError> {
        let mut conn = self.pool.acquire(self.acquire_timeout)?;
        symbols::table
            .filter(symbols::symbol.eq(symbol))
            .first::<Symbol>(&mut *conn)
            .optional()
            .map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    // Exercising these requires a live DATABASE_URL; covered by the
    // `#[ignore]`d pool tests and the manager/query integration tests.
}
