// Strategy - closed classification of a fund's investment approach
//
// Stored and serialized as its display string ("Long/Short Equity", ...).
// Anything outside the three values is rejected at the store boundary.

use crate::error::ValidationError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "Long/Short Equity")]
    LongShortEquity,

    #[serde(rename = "Global Macro")]
    GlobalMacro,

    #[serde(rename = "Arbitrage")]
    Arbitrage,
}

impl Strategy {
    /// Every strategy, in display order
    pub const ALL: [Strategy; 3] = [
        Strategy::LongShortEquity,
        Strategy::GlobalMacro,
        Strategy::Arbitrage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::LongShortEquity => "Long/Short Equity",
            Strategy::GlobalMacro => "Global Macro",
            Strategy::Arbitrage => "Arbitrage",
        }
    }

    /// Next strategy in display order, wrapping back to `None` after the last
    pub fn cycle(current: Option<Strategy>) -> Option<Strategy> {
        match current {
            None => Some(Strategy::LongShortEquity),
            Some(Strategy::LongShortEquity) => Some(Strategy::GlobalMacro),
            Some(Strategy::GlobalMacro) => Some(Strategy::Arbitrage),
            Some(Strategy::Arbitrage) => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ValidationError;

    /// Exact, case-sensitive match against the display strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new(
                    "strategy",
                    format!(
                        "'{}' is not one of: {}",
                        s,
                        Strategy::ALL.map(|st| st.as_str()).join(", ")
                    ),
                )
            })
    }
}

impl ToSql for Strategy {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Strategy {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|e: ValidationError| FromSqlError::Other(Box::new(e)))
    }
}
