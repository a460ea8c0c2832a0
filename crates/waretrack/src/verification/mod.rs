pub mod fuzzy;
pub mod matcher;

pub use fuzzy::fuzzy_match;
pub use matcher::{FieldComparison, MatchReport, MatchThresholds, TagVerificationMatcher};
