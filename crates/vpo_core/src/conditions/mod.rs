//! Rule predicates over track and file facts.

mod evaluator;
mod types;

pub use evaluator::{evaluate, evaluate_with_reason, matches_filters, EvaluationFacts};
pub use types::{
    CompareOp, Comparison, Condition, CountCondition, MultiLanguageCondition, NumericMatch,
    TitleMatch, TitlePattern, TrackFilters, TrackQuery, DEFAULT_MULTI_LANGUAGE_THRESHOLD,
};
