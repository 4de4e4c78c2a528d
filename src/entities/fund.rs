// Fund Entity - stable identity + business key
//
// "id" is IDENTITY (assigned once, never changes)
// "name" is the BUSINESS KEY (unique, used to merge uploads)
// strategy / aum / inception_date are VALUES (updated by later uploads)

use crate::entities::Strategy;
use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted fund name, in characters
pub const MAX_NAME_LEN: usize = 255;

/// Accepted AUM range, a 32-bit column. Sums over it cannot overflow `i64`.
pub const MIN_AUM: i64 = i32::MIN as i64;
pub const MAX_AUM: i64 = i32::MAX as i64;

/// Date format used for inception dates on input, storage and output
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// FUND ENTITY
// ============================================================================

/// A persisted fund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    /// Stable identity - NEVER supplied by input data
    pub id: Uuid,

    /// Unique, case-sensitive
    pub name: String,

    pub strategy: Strategy,

    /// Assets under management (USD), absent when not reported
    pub aum: Option<i64>,

    pub inception_date: Option<NaiveDate>,
}

// ============================================================================
// FUND VALUES (validated, not yet persisted)
// ============================================================================

/// Typed field values of a fund, already checked against the store's rules
#[derive(Debug, Clone, PartialEq)]
pub struct FundValues {
    pub name: String,
    pub strategy: Strategy,
    pub aum: Option<i64>,
    pub inception_date: Option<NaiveDate>,
}

// ============================================================================
// CANDIDATE RECORD (raw row awaiting upsert)
// ============================================================================

/// One normalized input row: blank fields are `None`, everything else is
/// kept verbatim until the store coerces it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub name: Option<String>,
    pub strategy: Option<String>,
    pub aum: Option<String>,
    pub inception_date: Option<String>,

    /// Provenance: line in the uploaded file (None for interactive input)
    #[serde(skip)]
    pub line: Option<u64>,
}

impl CandidateRecord {
    /// Build a candidate from raw strings, turning empty strings into `None`
    pub fn new(name: &str, strategy: &str, aum: &str, inception_date: &str) -> Self {
        CandidateRecord {
            name: normalize(name),
            strategy: normalize(strategy),
            aum: normalize(aum),
            inception_date: normalize(inception_date),
            line: None,
        }
    }

    /// Builder pattern: attach the source line
    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    /// Coerce raw fields into typed values.
    ///
    /// Rejects a missing name, a name over `MAX_NAME_LEN` characters, a
    /// strategy outside the enumeration, a non-integer AUM and an inception
    /// date not in `YYYY-MM-DD` form.
    pub fn validate(&self) -> Result<FundValues, ValidationError> {
        let name = match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(ValidationError::new("name", "required field is empty").at_line(self.line))
            }
        };

        if name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::new(
                "name",
                format!("longer than {} characters", MAX_NAME_LEN),
            )
            .at_line(self.line));
        }

        let strategy = match self.strategy.as_deref() {
            Some(raw) => raw.parse::<Strategy>().map_err(|e| e.at_line(self.line))?,
            None => {
                return Err(
                    ValidationError::new("strategy", "required field is empty").at_line(self.line)
                )
            }
        };

        let aum = self
            .aum
            .as_deref()
            .map(|raw| {
                let aum = raw.parse::<i64>().map_err(|_| {
                    ValidationError::new("aum", format!("'{}' is not an integer", raw))
                        .at_line(self.line)
                })?;

                if !(MIN_AUM..=MAX_AUM).contains(&aum) {
                    return Err(ValidationError::new(
                        "aum",
                        format!("{} is outside {}..={}", aum, MIN_AUM, MAX_AUM),
                    )
                    .at_line(self.line));
                }

                Ok(aum)
            })
            .transpose()?;

        let inception_date = self
            .inception_date
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
                    ValidationError::new(
                        "inception_date",
                        format!("'{}' is not a date (expected YYYY-MM-DD)", raw),
                    )
                    .at_line(self.line)
                })
            })
            .transpose()?;

        Ok(FundValues {
            name: name.to_string(),
            strategy,
            aum,
            inception_date,
        })
    }
}

/// Empty string → explicit absence; anything else passes through untouched
pub fn normalize(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}
