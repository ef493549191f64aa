//! Document lifecycle and money rules, free of storage concerns.

pub mod calculator;
mod error;
pub mod lifecycle;
pub mod numbering;
pub mod versioning;

pub use calculator::{LineAmounts, TaxBreakdownEntry, Totals};
pub use error::DocumentError;
pub use lifecycle::TransitionEffect;
pub use numbering::{NumberingAuthority, NumberingConfig, SequenceSource};
