//! State machine model types.
//!
//! The model owns every state, trigger, action and transition by id. A
//! compound state owns its children through the id list in `children`; the
//! `parent` link is a plain id lookup, so the graph never holds a cycle of
//! owning references.

use crate::error::FsmError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Variant tag of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateKind {
    Initial,
    Simple,
    Compound,
    Final,
}

impl StateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Initial => "INITIAL",
            StateKind::Simple => "SIMPLE",
            StateKind::Compound => "COMPOUND",
            StateKind::Final => "FINAL",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateKind {
    type Err = FsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INITIAL" => Ok(StateKind::Initial),
            "SIMPLE" => Ok(StateKind::Simple),
            "COMPOUND" => Ok(StateKind::Compound),
            "FINAL" => Ok(StateKind::Final),
            _ => Err(FsmError::UnknownKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// Kind of an action, deciding which attachment list it belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    EntryAction,
    ExitAction,
    DoAction,
    TransitionAction,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::EntryAction => "ENTRY_ACTION",
            ActionKind::ExitAction => "EXIT_ACTION",
            ActionKind::DoAction => "DO_ACTION",
            ActionKind::TransitionAction => "TRANSITION_ACTION",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = FsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ENTRY_ACTION" => Ok(ActionKind::EntryAction),
            "EXIT_ACTION" => Ok(ActionKind::ExitAction),
            "DO_ACTION" => Ok(ActionKind::DoAction),
            "TRANSITION_ACTION" => Ok(ActionKind::TransitionAction),
            _ => Err(FsmError::UnknownActionKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// A state in the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub id: String,
    pub name: String,
    pub kind: StateKind,
    parent: Option<String>,
    children: Vec<String>,
    pub(crate) entry_actions: Vec<String>,
    pub(crate) exit_actions: Vec<String>,
    pub(crate) do_actions: Vec<String>,
}

impl State {
    /// Creates a detached state with no actions.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: StateKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            do_actions: Vec::new(),
        }
    }

    /// Id of the enclosing state, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Ids of nested states, in the order they were linked.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn entry_actions(&self) -> &[String] {
        &self.entry_actions
    }

    pub fn exit_actions(&self) -> &[String] {
        &self.exit_actions
    }

    pub fn do_actions(&self) -> &[String] {
        &self.do_actions
    }

    /// Only compound states are meant to hold children.
    pub fn accepts_children(&self) -> bool {
        matches!(self.kind, StateKind::Compound)
    }
}

/// A named event that transitions listen for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub id: String,
    pub name: String,
}

impl Trigger {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Case-insensitive match against either the id or the name.
    pub fn matches(&self, token: &str) -> bool {
        self.id.eq_ignore_ascii_case(token)
            || (!self.name.is_empty() && self.name.eq_ignore_ascii_case(token))
    }
}

/// An action attached to a state or a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: String,
    pub name: String,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// A transition between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub source: String,
    pub target: String,
    pub trigger: String,
    /// Free-form condition; empty means unconditional.
    pub guard: String,
    pub(crate) actions: Vec<String>,
}

impl Transition {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        trigger: impl Into<String>,
        guard: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            trigger: trigger.into(),
            guard: guard.into(),
            actions: Vec::new(),
        }
    }

    /// Transition action ids, in execution order.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn is_guarded(&self) -> bool {
        !self.guard.is_empty()
    }
}

pub(crate) trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for State {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Trigger {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Action {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Transition {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Id-indexed collection that remembers insertion order.
///
/// Re-inserting an existing id replaces the entry in place, keeping its
/// original position.
#[derive(Debug, Clone)]
pub(crate) struct Registry<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> Registry<T> {
    pub(crate) fn insert(&mut self, item: T) -> Option<T> {
        match self.index.get(item.key()) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos], item)),
            None => {
                self.index.insert(item.key().to_string(), self.entries.len());
                self.entries.push(item);
                None
            }
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.index.get(id).map(|&pos| &mut self.entries[pos])
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub(crate) fn first(&self) -> Option<&T> {
        self.entries.first()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A complete state machine plus its simulation cursor.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub(crate) states: Registry<State>,
    pub(crate) transitions: Registry<Transition>,
    pub(crate) triggers: Registry<Trigger>,
    pub(crate) actions: Registry<Action>,
    pub(crate) initial_state: Option<String>,
    pub(crate) final_states: Vec<String>,
    pub(crate) current_state: Option<String>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // States
    // =========================================================================

    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.get(id)
    }

    pub fn has_state(&self, id: &str) -> bool {
        self.states.contains(id)
    }

    /// All states in registration order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// States without a parent, in registration order.
    pub fn roots(&self) -> impl Iterator<Item = &State> {
        self.states.iter().filter(|s| s.parent.is_none())
    }

    /// Direct children of a state, in link order.
    pub fn children<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a State> + 'a {
        let children = self.states.get(id).map(|s| s.children.as_slice()).unwrap_or(&[]);
        children.iter().filter_map(move |c| self.states.get(c))
    }

    /// Walks parent links upward, nearest ancestor first.
    pub fn ancestors<'a>(&'a self, id: &str) -> Ancestors<'a> {
        Ancestors {
            model: self,
            next: self.states.get(id).and_then(|s| s.parent.as_deref()),
            remaining: self.states.len(),
        }
    }

    pub fn initial_state(&self) -> Option<&State> {
        self.initial_state.as_deref().and_then(|id| self.states.get(id))
    }

    pub fn final_states(&self) -> impl Iterator<Item = &State> {
        self.final_states.iter().filter_map(|id| self.states.get(id))
    }

    pub fn is_final(&self, id: &str) -> bool {
        self.final_states.iter().any(|f| f == id)
    }

    pub fn current_state(&self) -> Option<&State> {
        self.current_state.as_deref().and_then(|id| self.states.get(id))
    }

    /// Moves the simulation cursor back to the initial state.
    pub fn reset(&mut self) {
        self.current_state = self.initial_state.clone();
    }

    pub(crate) fn set_current_state(&mut self, id: &str) {
        self.current_state = Some(id.to_string());
    }

    // =========================================================================
    // Triggers, actions, transitions
    // =========================================================================

    pub fn trigger(&self, id: &str) -> Option<&Trigger> {
        self.triggers.get(id)
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.get(id)
    }

    /// All transitions in registration order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Transitions whose source is the given state, in registration order.
    pub fn transitions_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| t.source == id)
    }

    // =========================================================================
    // Mutation (builder only)
    // =========================================================================

    /// Registers a state, replacing any previous state with the same id.
    ///
    /// A replaced state is detached from its parent, its children become
    /// roots, and it loses its final and initial roles unless the new state
    /// claims them again.
    pub(crate) fn insert_state(&mut self, state: State) {
        let id = state.id.clone();
        let new_kind = state.kind;
        let Some(old) = self.states.insert(state) else {
            return;
        };

        if let Some(parent_id) = old.parent.as_deref() {
            if let Some(parent) = self.states.get_mut(parent_id) {
                if let Some(pos) = parent.children.iter().position(|c| *c == id) {
                    parent.children.remove(pos);
                }
            }
        }
        for child_id in &old.children {
            if let Some(child) = self.states.get_mut(child_id) {
                child.parent = None;
            }
        }
        self.final_states.retain(|f| *f != id);
        if self.initial_state.as_deref() == Some(id.as_str()) && new_kind != StateKind::Initial {
            self.initial_state = None;
            self.current_state = None;
        }
    }

    /// Links `child` under `parent` both ways. Returns false when either id
    /// is unknown, the ids are equal, or the link would create a cycle.
    pub(crate) fn link(&mut self, child_id: &str, parent_id: &str) -> bool {
        if child_id == parent_id
            || !self.states.contains(child_id)
            || !self.states.contains(parent_id)
            || self.ancestors(parent_id).any(|a| a.id == child_id)
        {
            return false;
        }

        if let Some(old_parent) = self.states.get(child_id).and_then(|c| c.parent.clone()) {
            if let Some(p) = self.states.get_mut(&old_parent) {
                p.children.retain(|c| c != child_id);
            }
        }
        if let Some(parent) = self.states.get_mut(parent_id) {
            parent.children.push(child_id.to_string());
        }
        if let Some(child) = self.states.get_mut(child_id) {
            child.parent = Some(parent_id.to_string());
        }
        true
    }

    pub(crate) fn mark_final(&mut self, id: &str) {
        if !self.is_final(id) {
            self.final_states.push(id.to_string());
        }
    }

    pub(crate) fn set_initial(&mut self, id: &str) {
        self.initial_state = Some(id.to_string());
        self.current_state = Some(id.to_string());
    }
}

/// Iterator over a state's ancestors. Bounded by the state count so a
/// corrupted parent chain cannot loop forever.
pub struct Ancestors<'a> {
    model: &'a Model,
    next: Option<&'a str>,
    remaining: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a State;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let state = self.model.states.get(self.next?)?;
        self.next = state.parent.as_deref();
        Some(state)
    }
}
