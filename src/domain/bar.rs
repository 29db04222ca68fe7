//! Market data bar and named price columns.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use super::error::LedgerError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub instrument: String,
    pub tradingday: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub open_interest: Option<i64>,
}

impl Bar {
    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
        }
    }
}

/// Which bar column a limit order is priced from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        };
        f.write_str(name)
    }
}

impl FromStr for PriceField {
    type Err = LedgerError;

    /// Accepts both the short column names and the `*price` spellings
    /// used by exchange data dumps (`closeprice`, `openprice`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_suffix("price").unwrap_or(&lower);
        match name {
            "open" => Ok(PriceField::Open),
            "high" | "highest" => Ok(PriceField::High),
            "low" | "lowest" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            _ => Err(LedgerError::invalid(format!("unknown price field '{s}'"))),
        }
    }
}
