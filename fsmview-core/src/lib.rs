//! # fsmview-core
//!
//! Hierarchical finite state machines for fsmview.
//!
//! This crate provides:
//! - The state machine model (nested states, triggers, actions, transitions)
//! - Incremental model construction with post-build rules
//! - The textual definition language parser
//! - Static validation (determinism, reachability, hierarchy)
//! - A command-driven simulator with hierarchical trigger resolution
//! - A plain-text renderer

pub mod builder;
pub mod error;
pub mod factory;
pub mod model;
pub mod parser;
pub mod render;
pub mod rules;
pub mod simulator;
pub mod validator;

pub use builder::ModelBuilder;
pub use error::{FsmError, ReferenceRole};
pub use factory::{DefaultStateFactory, StateFactory};
pub use model::{Action, ActionKind, Model, State, StateKind, Transition, Trigger};
pub use parser::{parse, ParseOutput, ParseWarning, Parser};
pub use render::{Renderer, TextRenderer};
pub use rules::{PostBuildRule, TransitionInjectionRule};
pub use simulator::{
    ActionStep, CommandSource, Flow, Resolution, ScriptedInput, Simulator, StepKind,
    TransitionReport,
};
pub use validator::{validate, validate_messages, Check, Diagnostic, ModelValidator, Validator};
