//! Interactive execution of a model.
//!
//! The simulator reads one command per line from a [`CommandSource`] and
//! writes everything it reports to a `Write` sink, so it runs the same
//! against a terminal or a script.
//!
//! Commands: `quit`, `show`, `reset`, `help`; any other token is a trigger,
//! matched case-insensitively against trigger ids and names.

use crate::model::Model;
use crate::render::Renderer;
use std::io::{self, BufRead, Write};

const HELP_TEXT: &str = "Commands:
  <trigger>   Fire a trigger (by id or name)
  show        Display the model
  reset       Return to the initial state
  help        Show this help
  quit        Leave the simulator";

/// Source of command lines.
pub trait CommandSource {
    /// Reads one line, without its line terminator. `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads commands from any buffered reader, ignoring prompts.
pub struct ScriptedInput<R> {
    reader: R,
}

impl<R: BufRead> ScriptedInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> CommandSource for ScriptedInput<R> {
    fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(Some(line))
    }
}

/// Whether the command loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Outcome of looking up a trigger from the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one transition matched at the nearest matching level.
    Single(String),
    /// Several transitions matched at the nearest matching level, in
    /// registration order.
    Ambiguous(Vec<String>),
    /// Nothing matched at any level. Suggestions are the distinct
    /// `(trigger id, trigger name)` pairs usable from `state` or its
    /// ancestors.
    NoMatch {
        state: String,
        suggestions: Vec<(String, String)>,
    },
    NoCurrentState,
}

/// Which list an executed action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Exit,
    Transition,
    Entry,
}

impl StepKind {
    fn label(&self) -> &'static str {
        match self {
            StepKind::Exit => "Exit",
            StepKind::Transition => "Transition",
            StepKind::Entry => "Entry",
        }
    }
}

/// One executed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStep {
    pub kind: StepKind,
    pub action: String,
    pub name: String,
}

/// What happened when a transition was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub transition: String,
    pub source: String,
    pub target: String,
    /// Exit, transition and entry actions, in execution order.
    pub steps: Vec<ActionStep>,
    pub reached_final: bool,
}

/// Drives a model's current state from commands.
pub struct Simulator<'a, R: Renderer + ?Sized> {
    model: &'a mut Model,
    renderer: &'a R,
}

impl<'a, R: Renderer + ?Sized> Simulator<'a, R> {
    pub fn new(model: &'a mut Model, renderer: &'a R) -> Self {
        Self { model, renderer }
    }

    pub fn model(&self) -> &Model {
        &*self.model
    }

    pub fn reset(&mut self) {
        self.model.reset();
    }

    /// Runs the command loop until `quit` or end of input.
    pub fn run<I, W>(&mut self, input: &mut I, out: &mut W) -> io::Result<()>
    where
        I: CommandSource + ?Sized,
        W: Write + ?Sized,
    {
        self.reset();
        writeln!(out, "=== FSM SIMULATOR ===")?;
        writeln!(out, "Available triggers:")?;
        for trigger in self.model.triggers() {
            writeln!(out, "  {}: {}", trigger.id, trigger.name)?;
        }
        writeln!(
            out,
            "Type 'quit' to exit, 'show' to display the model, 'reset' to restart, 'help' for help"
        )?;
        writeln!(out)?;

        loop {
            if let Some(current) = self.model.current_state() {
                writeln!(out, "Current state: {} ({})", current.id, current.name)?;
            }
            let Some(line) = input.read_line("Enter trigger: ")? else {
                tracing::debug!("Simulator input closed");
                break;
            };
            if self.handle(&line, input, out)? == Flow::Quit {
                break;
            }
        }

        Ok(())
    }

    /// Handles one command line.
    pub fn handle<I, W>(&mut self, line: &str, input: &mut I, out: &mut W) -> io::Result<Flow>
    where
        I: CommandSource + ?Sized,
        W: Write + ?Sized,
    {
        let token = line.trim();
        match token.to_ascii_lowercase().as_str() {
            "" => return Ok(Flow::Continue),
            "quit" => return Ok(Flow::Quit),
            "show" => {
                writeln!(out, "{}", self.renderer.render(&*self.model))?;
            }
            "reset" => {
                self.reset();
                writeln!(out, "FSM reset to initial state")?;
            }
            "help" => {
                writeln!(out, "{}", HELP_TEXT)?;
            }
            _ => {
                self.fire(token, input, out)?;
            }
        }
        writeln!(out)?;
        Ok(Flow::Continue)
    }

    /// Finds the transitions a trigger selects, searching the current state
    /// first and then each ancestor. The first level with a match wins.
    pub fn resolve(&self, token: &str) -> Resolution {
        let Some(current) = self.model.current_state() else {
            return Resolution::NoCurrentState;
        };

        let levels = std::iter::once(current).chain(self.model.ancestors(&current.id));
        for level in levels {
            let mut matches: Vec<String> = self
                .model
                .transitions_from(&level.id)
                .filter(|t| self.trigger_matches(&t.trigger, token))
                .map(|t| t.id.clone())
                .collect();

            match matches.len() {
                0 => continue,
                1 => return Resolution::Single(matches.swap_remove(0)),
                _ => return Resolution::Ambiguous(matches),
            }
        }

        Resolution::NoMatch {
            state: current.id.clone(),
            suggestions: self.suggestions(&current.id),
        }
    }

    fn trigger_matches(&self, trigger_id: &str, token: &str) -> bool {
        match self.model.trigger(trigger_id) {
            Some(trigger) => trigger.matches(token),
            None => trigger_id.eq_ignore_ascii_case(token),
        }
    }

    fn suggestions(&self, state_id: &str) -> Vec<(String, String)> {
        let mut levels = vec![state_id.to_string()];
        levels.extend(self.model.ancestors(state_id).map(|s| s.id.clone()));

        let mut pairs: Vec<(String, String)> = Vec::new();
        for t in self.model.transitions().filter(|t| levels.contains(&t.source)) {
            let name = self
                .model
                .trigger(&t.trigger)
                .map(|tr| tr.name.clone())
                .unwrap_or_default();
            let pair = (t.trigger.clone(), name);
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        }
        pairs
    }

    /// Resolves a trigger and executes the chosen transition, asking the
    /// input source to pick when several match.
    pub fn fire<I, W>(
        &mut self,
        token: &str,
        input: &mut I,
        out: &mut W,
    ) -> io::Result<Option<TransitionReport>>
    where
        I: CommandSource + ?Sized,
        W: Write + ?Sized,
    {
        match self.resolve(token) {
            Resolution::Single(id) => self.execute_transition(&id, out),
            Resolution::Ambiguous(ids) => {
                writeln!(out, "Multiple transitions match trigger '{}':", token)?;
                for (i, id) in ids.iter().enumerate() {
                    if let Some(t) = self.model.transition(id) {
                        let guard = if t.is_guarded() {
                            format!(" [{}]", t.guard)
                        } else {
                            String::new()
                        };
                        writeln!(out, "  {}. {}: {} -> {}{}", i + 1, t.id, t.source, t.target, guard)?;
                    }
                }

                let prompt = format!("Select transition (1-{}): ", ids.len());
                let choice = input
                    .read_line(&prompt)?
                    .and_then(|line| line.trim().parse::<usize>().ok())
                    .filter(|n| (1..=ids.len()).contains(n));

                match choice {
                    Some(n) => self.execute_transition(&ids[n - 1], out),
                    None => {
                        writeln!(out, "Invalid selection; no transition executed")?;
                        Ok(None)
                    }
                }
            }
            Resolution::NoMatch { state, suggestions } => {
                writeln!(
                    out,
                    "No transition found for trigger '{}' from state '{}'",
                    token, state
                )?;
                if suggestions.is_empty() {
                    writeln!(out, "No triggers available from this state")?;
                } else {
                    writeln!(out, "Available triggers:")?;
                    for (id, name) in suggestions {
                        writeln!(out, "  {} ({})", id, name)?;
                    }
                }
                Ok(None)
            }
            Resolution::NoCurrentState => {
                writeln!(out, "No current state; the model has no states")?;
                Ok(None)
            }
        }
    }

    /// Takes a transition: source exit actions, transition actions, move the
    /// cursor, target entry actions. Returns `None` for an unknown id.
    pub fn execute_transition<W>(
        &mut self,
        id: &str,
        out: &mut W,
    ) -> io::Result<Option<TransitionReport>>
    where
        W: Write + ?Sized,
    {
        let Some(transition) = self.model.transition(id).cloned() else {
            return Ok(None);
        };
        writeln!(
            out,
            "Executing transition: {} -> {}",
            transition.source, transition.target
        )?;
        tracing::debug!(
            "Transition {}: {} -> {}",
            transition.id,
            transition.source,
            transition.target
        );

        let mut steps = Vec::new();
        let exit_actions = self
            .model
            .state(&transition.source)
            .map(|s| s.exit_actions().to_vec())
            .unwrap_or_default();
        self.run_actions(StepKind::Exit, &exit_actions, &mut steps, out)?;
        self.run_actions(StepKind::Transition, transition.actions(), &mut steps, out)?;

        self.model.set_current_state(&transition.target);

        let entry_actions = self
            .model
            .state(&transition.target)
            .map(|s| s.entry_actions().to_vec())
            .unwrap_or_default();
        self.run_actions(StepKind::Entry, &entry_actions, &mut steps, out)?;

        let reached_final = self.model.is_final(&transition.target);
        if reached_final {
            writeln!(out, "*** FINAL STATE REACHED ***")?;
        }

        Ok(Some(TransitionReport {
            transition: transition.id,
            source: transition.source,
            target: transition.target,
            steps,
            reached_final,
        }))
    }

    fn run_actions<W>(
        &self,
        kind: StepKind,
        ids: &[String],
        steps: &mut Vec<ActionStep>,
        out: &mut W,
    ) -> io::Result<()>
    where
        W: Write + ?Sized,
    {
        for id in ids {
            let name = self
                .model
                .action(id)
                .map_or_else(|| id.clone(), |a| a.name.clone());
            writeln!(out, "  {} action: {}", kind.label(), name)?;
            tracing::debug!("{} action {} ({})", kind.label(), id, name);
            steps.push(ActionStep {
                kind,
                action: id.clone(),
                name,
            });
        }
        Ok(())
    }
}
