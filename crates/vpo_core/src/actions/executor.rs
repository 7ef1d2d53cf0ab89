//! Execution of conditional rules and their actions.

use std::path::Path;

use tracing::{debug, info};

use crate::conditions::{evaluate_with_reason, EvaluationFacts};
use crate::models::{language_in, FlagType, SkipFlags, TrackFlagChange};
use crate::policy::{PolicyError, PolicyResult};

use super::types::{
    ActionContext, ActionOutcome, ConditionalAction, ConditionalRule, FlagAction, RuleEvaluation,
};

/// Replace `{filename}`, `{path}` and `{rule_name}` in one left-to-right pass.
///
/// Substituted values are never scanned again. Other brace tokens are left
/// untouched.
pub fn substitute_placeholders(template: &str, ctx: &ActionContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let value = if tail.starts_with("{filename}") {
            Some(("{filename}".len(), ctx.filename()))
        } else if tail.starts_with("{path}") {
            Some(("{path}".len(), ctx.path().display().to_string()))
        } else if tail.starts_with("{rule_name}") {
            Some(("{rule_name}".len(), ctx.rule_name.clone()))
        } else {
            None
        };
        match value {
            Some((len, text)) => {
                out.push_str(&text);
                rest = &tail[len..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Runs rule lists against the facts of one file.
pub struct ActionExecutor<'a> {
    facts: EvaluationFacts<'a>,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(facts: EvaluationFacts<'a>) -> Self {
        Self { facts }
    }

    /// Evaluate every rule in order, starting from `skip_flags`.
    ///
    /// A `fail` action stops evaluation immediately; nothing accumulated so
    /// far is returned in that case.
    pub fn run_rules(
        &self,
        rules: &[ConditionalRule],
        file_path: &Path,
        skip_flags: SkipFlags,
    ) -> PolicyResult<ActionOutcome> {
        let mut outcome = ActionOutcome::new(skip_flags);

        for rule in rules {
            let (matched, reason) = evaluate_with_reason(&rule.when, &self.facts);
            debug!(rule = %rule.name, matched, %reason, "Evaluated conditional rule");
            outcome.evaluations.push(RuleEvaluation {
                rule_name: rule.name.clone(),
                matched,
                reason,
            });

            let actions = if matched { &rule.then } else { &rule.otherwise };
            let ctx = ActionContext::new(file_path, rule.name.as_str());
            self.execute(actions, &ctx, &mut outcome)?;
        }

        Ok(outcome)
    }

    /// Execute an action list, accumulating into `outcome`.
    pub fn execute(
        &self,
        actions: &[ConditionalAction],
        ctx: &ActionContext,
        outcome: &mut ActionOutcome,
    ) -> PolicyResult<()> {
        for action in actions {
            match action {
                ConditionalAction::Skip(skip) => {
                    outcome.skip_flags = outcome.skip_flags.with(*skip);
                    debug!(rule = %ctx.rule_name, ?skip, "Skip flag set");
                }
                ConditionalAction::Warn(template) => {
                    let message = substitute_placeholders(template, ctx);
                    info!(rule = %ctx.rule_name, "{}", message);
                    outcome.warnings.push(message);
                }
                ConditionalAction::Fail(template) => {
                    let message = substitute_placeholders(template, ctx);
                    return Err(PolicyError::conditional_fail(
                        &ctx.rule_name,
                        ctx.path(),
                        message,
                    ));
                }
                ConditionalAction::SetDefault(target) => {
                    self.flag_changes(target, FlagType::Default, true, outcome);
                }
                ConditionalAction::SetForced(target) => {
                    self.flag_changes(target, FlagType::Forced, false, outcome);
                }
            }
        }
        Ok(())
    }

    fn flag_changes(
        &self,
        target: &FlagAction,
        flag: FlagType,
        first_only: bool,
        outcome: &mut ActionOutcome,
    ) {
        let languages: Option<Vec<String>> = target.language.clone().map(|l| vec![l]);
        let mut matching = self.facts.tracks.iter().filter(|t| {
            t.track_type == target.track_type
                && languages.as_ref().is_none_or(|langs| language_in(&t.language, langs))
        });

        let selected: Vec<_> = if first_only {
            matching.next().into_iter().collect()
        } else {
            matching.collect()
        };

        for track in selected {
            let current = match flag {
                FlagType::Default => track.is_default,
                FlagType::Forced => track.is_forced,
            };
            let already_recorded = outcome
                .flag_changes
                .iter()
                .any(|c| c.track_index == track.index && c.flag == flag);
            if current != target.value && !already_recorded {
                outcome.flag_changes.push(TrackFlagChange {
                    track_index: track.index,
                    flag,
                    value: target.value,
                });
            }
        }
    }
}
