use std::fmt;

use serde::{Deserialize, Serialize};

/// The two Indian exchanges the site quotes.
///
/// Each exchange has a Yahoo symbol suffix and a benchmark index. NSE is the
/// default: a bare ticker is assumed to trade there.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    #[default]
    Nse,
    Bse,
}

impl Exchange {
    pub const ALL: [Exchange; 2] = [Exchange::Nse, Exchange::Bse];

    /// Short tag used in API payloads and stat maps.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Bse => "BSE",
        }
    }

    /// Yahoo symbol suffix, including the dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Nse => ".NS",
            Self::Bse => ".BO",
        }
    }

    /// Yahoo symbol of the exchange's benchmark index.
    pub fn index_symbol(&self) -> &'static str {
        match self {
            Self::Nse => "^NSEI",
            Self::Bse => "^BSESN",
        }
    }

    pub fn index_name(&self) -> &'static str {
        match self {
            Self::Nse => "NIFTY 50",
            Self::Bse => "S&P BSE SENSEX",
        }
    }

    pub fn currency(&self) -> &'static str {
        "INR"
    }

    pub fn alternate(&self) -> Exchange {
        match self {
            Self::Nse => Self::Bse,
            Self::Bse => Self::Nse,
        }
    }

    /// Append this exchange's suffix to a bare ticker.
    pub fn qualify(&self, bare: &str) -> String {
        format!("{}{}", bare, self.suffix())
    }

    /// Parse an exchange from a query parameter.
    ///
    /// Anything other than `BSE` (case-insensitive) means NSE, including a
    /// missing parameter.
    pub fn from_param(value: Option<&str>) -> Exchange {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("BSE") || v.eq_ignore_ascii_case("BO") => Self::Bse,
            _ => Self::Nse,
        }
    }

    /// Exchange implied by a Yahoo suffix (`NS`/`BO`, with or without the dot).
    pub fn from_suffix(suffix: &str) -> Option<Exchange> {
        let trimmed = suffix.trim_start_matches('.');
        if trimmed.eq_ignore_ascii_case("NS") {
            Some(Self::Nse)
        } else if trimmed.eq_ignore_ascii_case("BO") {
            Some(Self::Bse)
        } else {
            None
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
