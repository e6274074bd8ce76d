//! Incremental model construction.
//!
//! Commands may be issued in any order, with two ordering preconditions:
//! a parent state must be added before its children (an unknown parent is
//! skipped, not reported), and a transition's source, target and trigger
//! must exist before the transition is added.

use crate::error::{FsmError, ReferenceRole};
use crate::factory::{DefaultStateFactory, StateFactory};
use crate::model::{Action, ActionKind, Model, State, StateKind, Transition, Trigger};
use crate::rules::PostBuildRule;

/// Builds a [`Model`] one element at a time.
pub struct ModelBuilder {
    model: Model,
    factory: Box<dyn StateFactory>,
    rules: Vec<Box<dyn PostBuildRule>>,
}

impl std::fmt::Debug for ModelBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("model", &self.model)
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::with_factory(DefaultStateFactory)
    }

    pub fn with_factory(factory: impl StateFactory + 'static) -> Self {
        Self {
            model: Model::new(),
            factory: Box::new(factory),
            rules: Vec::new(),
        }
    }

    /// Registers a rule to run at the end of [`build`](Self::build).
    pub fn with_rule(&mut self, rule: impl PostBuildRule + 'static) -> &mut Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn has_state(&self, id: &str) -> bool {
        self.model.has_state(id)
    }

    pub fn has_transition(&self, id: &str) -> bool {
        self.model.transition(id).is_some()
    }

    /// Adds a state, replacing any state with the same id.
    ///
    /// An `Initial` state becomes the initial and current state (the last
    /// one added wins). A `Final` state joins the final set. The parent link
    /// is made only if `parent_id` is already registered.
    pub fn add_state(
        &mut self,
        id: &str,
        name: &str,
        kind: StateKind,
        parent_id: Option<&str>,
    ) -> &mut Self {
        let state = self.factory.create_state(id, name, kind);
        self.register_state(state, parent_id);
        self
    }

    /// Adds a state from a textual kind tag such as `"COMPOUND"`.
    ///
    /// Fails with [`FsmError::UnknownKind`] when the factory does not
    /// recognize the tag; nothing is registered in that case.
    pub fn add_state_tagged(
        &mut self,
        id: &str,
        name: &str,
        tag: &str,
        parent_id: Option<&str>,
    ) -> Result<&mut Self, FsmError> {
        let state = self.factory.create_state_tagged(id, name, tag)?;
        self.register_state(state, parent_id);
        Ok(self)
    }

    fn register_state(&mut self, state: State, parent_id: Option<&str>) {
        let id = state.id.clone();
        let kind = state.kind;
        self.model.insert_state(state);

        match kind {
            StateKind::Initial => self.model.set_initial(&id),
            StateKind::Final => self.model.mark_final(&id),
            StateKind::Simple | StateKind::Compound => {}
        }

        if let Some(parent_id) = parent_id {
            if !self.model.link(&id, parent_id) {
                tracing::debug!("State '{}': parent '{}' not linked", id, parent_id);
            }
        }
    }

    pub fn add_trigger(&mut self, id: &str, name: &str) -> &mut Self {
        self.model.triggers.insert(Trigger::new(id, name));
        self
    }

    pub fn add_action(&mut self, id: &str, name: &str, kind: ActionKind) -> &mut Self {
        self.model.actions.insert(Action::new(id, name, kind));
        self
    }

    pub fn add_entry_action(&mut self, state_id: &str, action_id: &str) -> &mut Self {
        self.attach_to_state(state_id, action_id, ActionKind::EntryAction)
    }

    pub fn add_exit_action(&mut self, state_id: &str, action_id: &str) -> &mut Self {
        self.attach_to_state(state_id, action_id, ActionKind::ExitAction)
    }

    pub fn add_do_action(&mut self, state_id: &str, action_id: &str) -> &mut Self {
        self.attach_to_state(state_id, action_id, ActionKind::DoAction)
    }

    fn attach_to_state(&mut self, state_id: &str, action_id: &str, list: ActionKind) -> &mut Self {
        if self.model.action(action_id).is_none() {
            tracing::debug!("Action '{}' not registered; not attached", action_id);
            return self;
        }
        let Some(state) = self.model.states.get_mut(state_id) else {
            tracing::debug!("State '{}' not registered; action not attached", state_id);
            return self;
        };

        let actions = match list {
            ActionKind::EntryAction => &mut state.entry_actions,
            ActionKind::ExitAction => &mut state.exit_actions,
            ActionKind::DoAction | ActionKind::TransitionAction => &mut state.do_actions,
        };
        actions.push(action_id.to_string());
        self
    }

    /// Adds a transition. Fails if the source, target or trigger is unknown.
    pub fn add_transition(
        &mut self,
        id: &str,
        source_id: &str,
        target_id: &str,
        trigger_id: &str,
        guard: &str,
    ) -> Result<&mut Self, FsmError> {
        let missing = if !self.model.has_state(source_id) {
            Some((ReferenceRole::Source, source_id))
        } else if !self.model.has_state(target_id) {
            Some((ReferenceRole::Target, target_id))
        } else if self.model.trigger(trigger_id).is_none() {
            Some((ReferenceRole::Trigger, trigger_id))
        } else {
            None
        };

        if let Some((role, missing_id)) = missing {
            return Err(FsmError::InvalidReference {
                transition: id.to_string(),
                role,
                id: missing_id.to_string(),
            });
        }

        self.model
            .transitions
            .insert(Transition::new(id, source_id, target_id, trigger_id, guard));
        Ok(self)
    }

    pub fn add_transition_action(&mut self, transition_id: &str, action_id: &str) -> &mut Self {
        if self.model.action(action_id).is_none() {
            tracing::debug!("Action '{}' not registered; not attached", action_id);
            return self;
        }
        match self.model.transitions.get_mut(transition_id) {
            Some(transition) => transition.actions.push(action_id.to_string()),
            None => tracing::debug!(
                "Transition '{}' not registered; action not attached",
                transition_id
            ),
        }
        self
    }

    /// Finalizes the model.
    ///
    /// Without an explicit initial state, the first registered state is
    /// used. Post-build rules run afterwards, in registration order.
    pub fn build(mut self) -> Model {
        if self.model.initial_state.is_none() {
            if let Some(first) = self.model.states.first().map(|s| s.id.clone()) {
                tracing::warn!(
                    "No initial state defined; using first registered state '{}'",
                    first
                );
                self.model.set_initial(&first);
            }
        }

        for rule in &self.rules {
            let changes = rule.apply(&mut self.model);
            if changes > 0 {
                tracing::info!("Rule {} applied {} change(s)", rule.name(), changes);
            }
        }

        self.model
    }
}
