use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A tradeable instrument. Thin on purpose — the core only needs enough to
/// list symbols and resolve `/data/range`; everything else about an
/// instrument lives upstream of this service.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize, ToSchema)]
#[diesel(table_name = crate::database::schema::symbols)]
#[diesel(primary_key(symbol))]
pub struct Symbol {
    pub symbol: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
