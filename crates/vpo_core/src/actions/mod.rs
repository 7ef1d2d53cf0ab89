//! Conditional rules: `when` predicates with `then` / `else` actions.
//!
//! Skip actions accumulate into [`SkipFlags`](crate::models::SkipFlags),
//! warn actions collect messages, fail actions abort the file.

mod executor;
mod types;

pub use executor::{substitute_placeholders, ActionExecutor};
pub use types::{
    ActionContext, ActionOutcome, ConditionalAction, ConditionalRule, FlagAction, RuleEvaluation,
};
