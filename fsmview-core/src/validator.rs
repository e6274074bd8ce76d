//! Static model checks.
//!
//! Validation never mutates the model and never fails: every finding is an
//! advisory [`Diagnostic`]. All checks run, in this order:
//!
//! 1. initial state: defined, and without incoming transitions
//! 2. final states: without outgoing transitions
//! 3. non-determinism: same source and trigger without distinguishing guards
//! 4. reachability: breadth-first from the initial state, where reaching a
//!    state also reaches all of its ancestors
//! 5. hierarchy: only compound states hold children, at most one state of
//!    kind `INITIAL`

use crate::model::{Model, StateKind, Transition};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// The check that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    InitialState,
    FinalState,
    NonDeterminism,
    Reachability,
    Hierarchy,
}

/// One validation finding. Displays as its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub check: Check,
    pub message: String,
}

impl Diagnostic {
    fn new(check: Check, message: String) -> Self {
        Self { check, message }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Read-only analysis of a model.
pub trait Validator {
    fn validate(&self, model: &Model) -> Vec<Diagnostic>;
}

/// The standard set of checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelValidator;

impl Validator for ModelValidator {
    fn validate(&self, model: &Model) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        check_initial_state(model, &mut diagnostics);
        check_final_states(model, &mut diagnostics);
        check_non_determinism(model, &mut diagnostics);
        check_reachability(model, &mut diagnostics);
        check_hierarchy(model, &mut diagnostics);
        diagnostics
    }
}

/// Runs [`ModelValidator`].
pub fn validate(model: &Model) -> Vec<Diagnostic> {
    ModelValidator.validate(model)
}

/// Runs [`ModelValidator`] and returns only the messages.
pub fn validate_messages(model: &Model) -> Vec<String> {
    validate(model).into_iter().map(|d| d.message).collect()
}

fn check_initial_state(model: &Model, out: &mut Vec<Diagnostic>) {
    let Some(initial) = model.initial_state() else {
        out.push(Diagnostic::new(
            Check::InitialState,
            "No initial state defined".to_string(),
        ));
        return;
    };

    if model.transitions().any(|t| t.target == initial.id) {
        out.push(Diagnostic::new(
            Check::InitialState,
            format!("Initial state '{}' has incoming transitions", initial.id),
        ));
    }
}

fn check_final_states(model: &Model, out: &mut Vec<Diagnostic>) {
    for state in model.final_states() {
        if model.transitions_from(&state.id).next().is_some() {
            out.push(Diagnostic::new(
                Check::FinalState,
                format!("Final state '{}' has outgoing transitions", state.id),
            ));
        }
    }
}

fn check_non_determinism(model: &Model, out: &mut Vec<Diagnostic>) {
    // Groups keep first-encounter order so output is stable.
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut groups: HashMap<(&str, &str), Vec<&Transition>> = HashMap::new();
    for t in model.transitions() {
        let key = (t.source.as_str(), t.trigger.as_str());
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(t);
    }

    for key in order {
        let group = &groups[&key];
        if group.len() > 1 && is_ambiguous(group) {
            let ids: Vec<&str> = group.iter().map(|t| t.id.as_str()).collect();
            out.push(Diagnostic::new(
                Check::NonDeterminism,
                format!(
                    "Non-deterministic transitions from state '{}' with trigger '{}': {}",
                    key.0,
                    key.1,
                    ids.join(", ")
                ),
            ));
        }
    }
}

/// A group is ambiguous if any member is unguarded or two members share a
/// guard.
fn is_ambiguous(group: &[&Transition]) -> bool {
    let mut seen = HashSet::new();
    group
        .iter()
        .any(|t| !t.is_guarded() || !seen.insert(t.guard.as_str()))
}

fn check_reachability(model: &Model, out: &mut Vec<Diagnostic>) {
    let Some(initial) = model.initial_state() else {
        return;
    };

    let mut reachable: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    mark_reachable(model, &initial.id, &mut reachable, &mut queue);
    while let Some(current) = queue.pop_front() {
        for t in model.transitions_from(current) {
            mark_reachable(model, &t.target, &mut reachable, &mut queue);
        }
    }

    for state in model.states() {
        if !reachable.contains(state.id.as_str()) {
            out.push(Diagnostic::new(
                Check::Reachability,
                format!("State '{}' is not reachable from initial state", state.id),
            ));
        }
    }
}

/// Marks a state and every ancestor reachable, queueing newly marked ones.
fn mark_reachable<'a>(
    model: &'a Model,
    id: &str,
    reachable: &mut HashSet<&'a str>,
    queue: &mut VecDeque<&'a str>,
) {
    let Some(state) = model.state(id) else {
        return;
    };
    if !reachable.insert(state.id.as_str()) {
        return;
    }
    queue.push_back(state.id.as_str());

    for ancestor in model.ancestors(&state.id) {
        if reachable.insert(ancestor.id.as_str()) {
            queue.push_back(ancestor.id.as_str());
        }
    }
}

fn check_hierarchy(model: &Model, out: &mut Vec<Diagnostic>) {
    for state in model.states() {
        if !state.children().is_empty() && !state.accepts_children() {
            out.push(Diagnostic::new(
                Check::Hierarchy,
                format!(
                    "State '{}' has children but is {}, not COMPOUND",
                    state.id, state.kind
                ),
            ));
        }
    }

    let initials: Vec<&str> = model
        .states()
        .filter(|s| s.kind == StateKind::Initial)
        .map(|s| s.id.as_str())
        .collect();
    if initials.len() > 1 {
        out.push(Diagnostic::new(
            Check::Hierarchy,
            format!("Multiple initial states defined: {}", initials.join(", ")),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::parser::parse;

    fn checks(diagnostics: &[Diagnostic], check: Check) -> Vec<&str> {
        diagnostics
            .iter()
            .filter(|d| d.check == check)
            .map(|d| d.message.as_str())
            .collect()
    }

    fn forked(guard_a: &str, guard_b: &str) -> Model {
        let mut builder = ModelBuilder::new();
        builder
            .add_state("s1", "S1", StateKind::Initial, None)
            .add_state("s2", "S2", StateKind::Simple, None)
            .add_state("s3", "S3", StateKind::Simple, None)
            .add_trigger("trig", "Trig");
        builder.add_transition("A", "s1", "s2", "trig", guard_a).unwrap();
        builder.add_transition("B", "s1", "s3", "trig", guard_b).unwrap();
        builder.build()
    }

    #[test]
    fn test_valid_machine_has_no_diagnostics() {
        let output = parse(
            r#"STATE s1 _ "S1" : INITIAL; STATE s2 _ "S2" : SIMPLE; STATE s3 _ "S3" : FINAL;
               TRIGGER t1 "T1"; TRANSITION tr1 s1 -> s2 t1; TRANSITION tr2 s2 -> s3 t1;"#,
        );
        assert!(validate(&output.model).is_empty());
    }

    #[test]
    fn test_missing_initial_state() {
        let diagnostics = validate(&Model::new());
        assert_eq!(
            checks(&diagnostics, Check::InitialState),
            vec!["No initial state defined"]
        );
        assert!(checks(&diagnostics, Check::Reachability).is_empty());
    }

    #[test]
    fn test_initial_state_with_incoming_transition() {
        let output = parse(
            r#"STATE a _ "A" : INITIAL; STATE b _ "B" : SIMPLE; TRIGGER go "Go";
               TRANSITION t1 a -> b go; TRANSITION t2 b -> a go;"#,
        );
        assert_eq!(
            validate_messages(&output.model),
            vec!["Initial state 'a' has incoming transitions"]
        );
    }

    #[test]
    fn test_final_state_with_outgoing_transition() {
        let output = parse(
            r#"STATE a _ "A" : INITIAL; STATE z _ "Z" : FINAL; STATE b _ "B" : SIMPLE;
               TRIGGER go "Go"; TRANSITION t1 a -> z go; TRANSITION t2 z -> b go;"#,
        );
        let diagnostics = validate(&output.model);
        assert_eq!(
            checks(&diagnostics, Check::FinalState),
            vec!["Final state 'z' has outgoing transitions"]
        );
    }

    #[test]
    fn test_unguarded_fork_is_non_deterministic() {
        let diagnostics = validate(&forked("", ""));
        assert_eq!(
            checks(&diagnostics, Check::NonDeterminism),
            vec!["Non-deterministic transitions from state 's1' with trigger 'trig': A, B"]
        );
    }

    #[test]
    fn test_distinct_guards_disambiguate() {
        let diagnostics = validate(&forked("x", "y"));
        assert!(checks(&diagnostics, Check::NonDeterminism).is_empty());
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_identical_guards_are_ambiguous() {
        let diagnostics = validate(&forked("x", "x"));
        assert_eq!(checks(&diagnostics, Check::NonDeterminism).len(), 1);
    }

    #[test]
    fn test_one_unguarded_member_is_ambiguous() {
        let diagnostics = validate(&forked("x", ""));
        assert_eq!(checks(&diagnostics, Check::NonDeterminism).len(), 1);
    }

    #[test]
    fn test_unreachable_state() {
        let output = parse(
            r#"STATE a _ "A" : INITIAL; STATE b _ "B" : SIMPLE; STATE lost _ "Lost" : SIMPLE;
               TRIGGER go "Go"; TRANSITION t1 a -> b go;"#,
        );
        assert_eq!(
            validate_messages(&output.model),
            vec!["State 'lost' is not reachable from initial state"]
        );
    }

    #[test]
    fn test_untargeted_child_of_reachable_compound_is_unreachable() {
        let output = parse(
            r#"STATE start _ "Start" : INITIAL;
               STATE on _ "On" : COMPOUND;
               STATE idle on "Idle" : SIMPLE;
               STATE busy on "Busy" : SIMPLE;
               TRIGGER power "Power";
               TRANSITION t1 start -> idle power;"#,
        );
        let diagnostics = validate(&output.model);
        // idle is targeted, so its parent 'on' is reachable too; busy is
        // never a transition target.
        assert_eq!(
            checks(&diagnostics, Check::Reachability),
            vec!["State 'busy' is not reachable from initial state"]
        );
    }

    #[test]
    fn test_reached_compound_explores_its_own_transitions() {
        let output = parse(
            r#"STATE start _ "Start" : INITIAL;
               STATE on _ "On" : COMPOUND;
               STATE idle on "Idle" : SIMPLE;
               STATE off _ "Off" : FINAL;
               TRIGGER power "Power";
               TRANSITION t1 start -> idle power;
               TRANSITION t2 on -> off power;"#,
        );
        assert!(validate(&output.model).is_empty());
    }

    #[test]
    fn test_hierarchy_checks() {
        let output = parse(
            r#"STATE a _ "A" : INITIAL;
               STATE s _ "S" : SIMPLE;
               STATE c s "C" : SIMPLE;
               STATE b _ "B" : INITIAL;"#,
        );
        let diagnostics = validate(&output.model);
        assert_eq!(
            checks(&diagnostics, Check::Hierarchy),
            vec![
                "State 's' has children but is SIMPLE, not COMPOUND",
                "Multiple initial states defined: a, b",
            ]
        );
    }

    #[test]
    fn test_diagnostic_serializes_with_check_name() {
        let diagnostic = Diagnostic::new(Check::NonDeterminism, "conflict".to_string());
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["check"], "non_determinism");
        assert_eq!(json["message"], "conflict");
    }
}
