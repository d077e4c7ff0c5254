use chrono::{DateTime, Utc};
use diesel::sql_types::{BigInt, Double, Nullable, Text, Timestamptz};
use diesel::QueryableByName;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single OHLC bar, read back from whichever resolution table the
/// catalog names for the request. Column order here must match the
/// `SELECT` list in `candle_repository::scan`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, QueryableByName)]
pub struct Candle {
    #[diesel(sql_type = Timestamptz)]
    pub timestamp: DateTime<Utc>,
    #[diesel(sql_type = Text)]
    pub symbol: String,
    #[diesel(sql_type = Double)]
    pub open: f64,
    #[diesel(sql_type = Double)]
    pub high: f64,
    #[diesel(sql_type = Double)]
    pub low: f64,
    #[diesel(sql_type = Double)]
    pub close: f64,
    #[diesel(sql_type = Double)]
    pub volume: f64,
    #[diesel(sql_type = Nullable<BigInt>)]
    pub tick_count: Option<i64>,
    #[diesel(sql_type = Nullable<Double>)]
    pub vwap: Option<f64>,
    #[diesel(sql_type = Nullable<Text>)]
    pub session: Option<String>,
}

impl Candle {
    /// Property 1: `low ≤ min(open, close) ≤ max(open, close) ≤ high`, `volume ≥ 0`.
    pub fn is_valid(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high && self.volume >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc::now(),
            symbol: "EURUSD".to_string(),
            open,
            high,
            low,
            close,
            volume: 100.0,
            tick_count: Some(10),
            vwap: None,
            session: None,
        }
    }

    #[test]
    fn accepts_a_well_formed_bar() {
        assert!(candle(1.1000, 1.1010, 1.0995, 1.1005).is_valid());
    }

    #[test]
    fn rejects_a_high_below_the_body() {
        assert!(!candle(1.1000, 1.1001, 1.0995, 1.1005).is_valid());
    }

    #[test]
    fn rejects_negative_volume() {
        let mut c = candle(1.1000, 1.1010, 1.0995, 1.1005);
        c.volume = -1.0;
        assert!(!c.is_valid());
    }
}
