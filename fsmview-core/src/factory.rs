//! State construction.

use crate::error::FsmError;
use crate::model::{State, StateKind};

/// Creates state instances for the builder.
pub trait StateFactory: Send + Sync {
    fn create_state(&self, id: &str, name: &str, kind: StateKind) -> State;

    /// Creates a state from a textual kind tag such as `"COMPOUND"`.
    fn create_state_tagged(&self, id: &str, name: &str, tag: &str) -> Result<State, FsmError> {
        let kind = tag.parse::<StateKind>()?;
        Ok(self.create_state(id, name, kind))
    }
}

/// Factory producing plain, detached states.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStateFactory;

impl StateFactory for DefaultStateFactory {
    fn create_state(&self, id: &str, name: &str, kind: StateKind) -> State {
        State::new(id, name, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_each_kind() {
        let factory = DefaultStateFactory;
        for kind in [
            StateKind::Initial,
            StateKind::Simple,
            StateKind::Compound,
            StateKind::Final,
        ] {
            let state = factory.create_state("s", "S", kind);
            assert_eq!(state.kind, kind);
            assert!(state.parent().is_none());
            assert!(state.children().is_empty());
        }
    }

    #[test]
    fn test_only_compound_accepts_children() {
        let factory = DefaultStateFactory;
        assert!(factory
            .create_state("c1", "CompoundState", StateKind::Compound)
            .accepts_children());
        assert!(!factory
            .create_state("s1", "SimpleState", StateKind::Simple)
            .accepts_children());
    }

    #[test]
    fn test_unknown_tag() {
        let result = DefaultStateFactory.create_state_tagged("h", "History", "HISTORY");
        match result {
            Err(FsmError::UnknownKind { kind }) => assert_eq!(kind, "HISTORY"),
            other => panic!("expected UnknownKind, got {:?}", other),
        }
    }
}
