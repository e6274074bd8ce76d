//! Post-build normalization rules.
//!
//! Rules run once, in registration order, at the end of
//! [`ModelBuilder::build`](crate::builder::ModelBuilder::build), after the
//! initial-state fallback has been applied.

use crate::model::{Model, StateKind, Transition};

/// A rewrite applied to a freshly built model.
pub trait PostBuildRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Applies the rule and returns the number of changes made.
    fn apply(&self, model: &mut Model) -> usize;
}

/// Copies the initial state's transitions for one trigger onto a compound
/// state, so the compound reacts to that trigger the same way.
///
/// Each copy gets the id `<original>@<compound>`. A copy is skipped when
/// the compound already has a transition with the same target and trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionInjectionRule {
    compound: String,
    trigger: String,
}

impl TransitionInjectionRule {
    pub fn new(compound: impl Into<String>, trigger: impl Into<String>) -> Self {
        Self {
            compound: compound.into(),
            trigger: trigger.into(),
        }
    }

    fn derived_id(&self, original: &str) -> String {
        format!("{}@{}", original, self.compound)
    }
}

impl PostBuildRule for TransitionInjectionRule {
    fn name(&self) -> &str {
        "transition-injection"
    }

    fn apply(&self, model: &mut Model) -> usize {
        match model.state(&self.compound) {
            Some(state) if state.kind == StateKind::Compound => {}
            _ => return 0,
        }
        let Some(initial) = model.initial_state().map(|s| s.id.clone()) else {
            return 0;
        };

        let candidates: Vec<Transition> = model
            .transitions_from(&initial)
            .filter(|t| t.trigger.eq_ignore_ascii_case(&self.trigger))
            .cloned()
            .collect();

        let mut injected = 0;
        for original in candidates {
            let duplicate = model.transitions_from(&self.compound).any(|t| {
                t.target == original.target && t.trigger == original.trigger
            });
            if duplicate {
                continue;
            }

            let id = self.derived_id(&original.id);
            if model.transition(&id).is_some() {
                tracing::warn!(
                    "Rule {} skipped '{}': transition id already taken",
                    self.name(),
                    id
                );
                continue;
            }

            let mut copy = original;
            copy.id = id;
            copy.source = self.compound.clone();
            tracing::debug!(
                "Injected transition {} ({} -> {})",
                copy.id,
                copy.source,
                copy.target
            );
            model.transitions.insert(copy);
            injected += 1;
        }

        injected
    }
}
