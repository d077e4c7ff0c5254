use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use utoipa::ToSchema;

/// Bar resolution identifier, drawn from the closed set the catalog supports.
///
/// Resolutions form a strict ordering by bar duration, finest to coarsest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
pub enum Resolution {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Resolution {
    /// Ordered finest-to-coarsest, matching the catalog's scan order.
    pub const ALL: [Resolution; 7] = [
        Resolution::OneMinute,
        Resolution::FiveMinutes,
        Resolution::FifteenMinutes,
        Resolution::ThirtyMinutes,
        Resolution::OneHour,
        Resolution::FourHours,
        Resolution::OneDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::OneMinute => "1m",
            Resolution::FiveMinutes => "5m",
            Resolution::FifteenMinutes => "15m",
            Resolution::ThirtyMinutes => "30m",
            Resolution::OneHour => "1h",
            Resolution::FourHours => "4h",
            Resolution::OneDay => "1d",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Resolution::OneMinute),
            "5m" => Some(Resolution::FiveMinutes),
            "15m" => Some(Resolution::FifteenMinutes),
            "30m" => Some(Resolution::ThirtyMinutes),
            "1h" => Some(Resolution::OneHour),
            "4h" => Some(Resolution::FourHours),
            "1d" => Some(Resolution::OneDay),
            _ => None,
        }
    }

    /// Bar duration in seconds.
    pub fn duration_seconds(&self) -> i64 {
        match self {
            Resolution::OneMinute => 60,
            Resolution::FiveMinutes => 300,
            Resolution::FifteenMinutes => 900,
            Resolution::ThirtyMinutes => 1_800,
            Resolution::OneHour => 3_600,
            Resolution::FourHours => 14_400,
            Resolution::OneDay => 86_400,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql<Text, Pg> for Resolution {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Pg> for Resolution {
    fn from_sql(bytes: <Pg as diesel::backend::Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let text = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        Resolution::from_str(&text).ok_or_else(|| format!("invalid resolution value: {text}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for r in Resolution::ALL {
            assert_eq!(Resolution::from_str(r.as_str()), Some(r));
        }
    }

    #[test]
    fn durations_increase_monotonically() {
        let durations: Vec<i64> = Resolution::ALL.iter().map(|r| r.duration_seconds()).collect();
        for pair in durations.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn unknown_string_is_none() {
        assert_eq!(Resolution::from_str("2m"), None);
    }
}
