use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// India Standard Time (UTC+05:30), the exchanges' local time.
pub fn ist_offset() -> FixedOffset {
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Coarse period token accepted by the history endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[serde(rename = "1D")]
    Intraday,
    #[default]
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "3Y")]
    ThreeYears,
}

impl HistoryPeriod {
    /// Parse a period token. Unknown or missing tokens mean one month.
    pub fn from_param(value: Option<&str>) -> HistoryPeriod {
        let Some(token) = value else {
            return Self::default();
        };
        match token.trim().to_ascii_lowercase().as_str() {
            "1d" | "intraday" | "today" => Self::Intraday,
            "1m" | "1mo" => Self::OneMonth,
            "3m" | "3mo" => Self::ThreeMonths,
            "1y" => Self::OneYear,
            "3y" => Self::ThreeYears,
            _ => Self::default(),
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Intraday => "1D",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::OneYear => "1Y",
            Self::ThreeYears => "3Y",
        }
    }

    /// Yahoo chart `(range, interval)` pair for this period.
    ///
    /// Yahoo has no 3-year range, so three years are fetched as five and
    /// trimmed afterwards (see [`HistoryPeriod::trim_days`]).
    pub fn range_interval(&self) -> (&'static str, &'static str) {
        match self {
            Self::Intraday => ("1d", "5m"),
            Self::OneMonth => ("1mo", "1d"),
            Self::ThreeMonths => ("3mo", "1d"),
            Self::OneYear => ("1y", "1d"),
            Self::ThreeYears => ("5y", "1wk"),
        }
    }

    /// Number of trailing days to keep after fetching, if the provider range
    /// is wider than the period.
    pub fn trim_days(&self) -> Option<i64> {
        match self {
            Self::ThreeYears => Some(3 * 365),
            _ => None,
        }
    }

    /// Number of points produced by the synthetic series generator.
    pub fn synthetic_points(&self) -> usize {
        match self {
            Self::Intraday => 75,
            Self::OneMonth => 22,
            Self::ThreeMonths => 64,
            Self::OneYear => 250,
            Self::ThreeYears => 156,
        }
    }
}

/// One point of a historical price series, in exchange-local (IST) time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub price: Decimal,
    pub volume: u64,
}

/// Series returned by the history endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySeries {
    pub symbol: String,
    /// Provider symbol that produced the data; `None` for a synthetic series
    pub yahoo_symbol: Option<String>,
    pub period: HistoryPeriod,
    pub points: Vec<HistoryPoint>,
    /// True when the points are a generated placeholder, not market data
    pub synthetic: bool,
}
