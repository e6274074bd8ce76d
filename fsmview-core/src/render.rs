//! Human-readable model rendering.

use crate::model::{Model, State};
use std::fmt::Write;

/// Produces a read-only text projection of a model.
pub trait Renderer {
    fn render(&self, model: &Model) -> String;
}

/// Indented tree view of states, followed by transitions and the cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, model: &Model) -> String {
        let mut out = String::new();
        out.push_str("=== FSM MODEL ===\n\n");

        out.push_str("STATES:\n");
        for root in model.roots() {
            render_state(model, root, 0, &mut out);
        }
        out.push('\n');

        out.push_str("TRANSITIONS:\n");
        for t in model.transitions() {
            let guard = if t.is_guarded() {
                format!(" [{}]", t.guard)
            } else {
                String::new()
            };
            let _ = writeln!(out, "  {} --{}{}--> {}", t.source, t.trigger, guard, t.target);
            if !t.actions().is_empty() {
                let _ = writeln!(out, "    Actions: {}", action_names(model, t.actions()));
            }
        }
        out.push('\n');

        if let Some(current) = model.current_state() {
            let _ = writeln!(out, "CURRENT STATE: {} ({})", current.id, current.name);
        }

        out
    }
}

fn render_state(model: &Model, state: &State, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{}[{}] {}: {}", indent, state.kind, state.id, state.name);

    for (label, actions) in [
        ("Entry", state.entry_actions()),
        ("Exit", state.exit_actions()),
        ("Do", state.do_actions()),
    ] {
        if !actions.is_empty() {
            let _ = writeln!(out, "{}  {}: {}", indent, label, action_names(model, actions));
        }
    }

    // Children are listed under any state that holds them, so a misplaced
    // child is still visible.
    for child in model.children(&state.id) {
        render_state(model, child, depth + 1, out);
    }
}

fn action_names(model: &Model, ids: &[String]) -> String {
    ids.iter()
        .map(|id| model.action(id).map_or(id.as_str(), |a| a.name.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}
