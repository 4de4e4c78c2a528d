// Entity Models
//
// Each entity has:
// - Stable identity (UUID) that NEVER changes
// - A business key used to merge incoming data
// - Values that later uploads may replace

pub mod fund;
pub mod strategy;

pub use fund::{
    normalize, CandidateRecord, Fund, FundValues, DATE_FORMAT, MAX_AUM, MAX_NAME_LEN, MIN_AUM,
};
pub use strategy::Strategy;
