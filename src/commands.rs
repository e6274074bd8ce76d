//! One-shot command execution.

use crate::config::Config;
use crate::loader::{self, Loaded};
use crate::Commands;
use colored::Colorize;
use fsmview_core::{Renderer, TextRenderer};
use serde_json::json;

/// Formatted command output and whether the command succeeded.
pub struct Output {
    pub text: String,
    pub success: bool,
}

/// Executes a non-interactive command.
pub fn execute(config: &Config, cmd: Commands) -> Result<Output, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Menu | Commands::Simulate { .. } => unreachable!(),

        Commands::Validate { file, json } => {
            let loaded = loader::load(&file, config)?;
            let success = loaded.diagnostics.is_empty();
            let text = if json {
                serde_json::to_string_pretty(&json_report(&loaded))? + "\n"
            } else {
                let mut text = format_report(&loaded);
                if success {
                    text.push_str(&format!("{}\n", "Validation passed".green()));
                }
                text
            };
            Ok(Output { text, success })
        }

        Commands::Render { file } => {
            let loaded = loader::load(&file, config)?;
            let mut text = format_warnings(&loaded);
            text.push_str(&TextRenderer.render(&loaded.model));
            Ok(Output {
                text,
                success: true,
            })
        }
    }
}

/// Parse warnings followed by validation errors, if any.
pub fn format_report(loaded: &Loaded) -> String {
    let mut out = format_warnings(loaded);
    if !loaded.diagnostics.is_empty() {
        out.push_str(&format!("{}\n", "=== VALIDATION ERRORS ===".red().bold()));
        for diagnostic in &loaded.diagnostics {
            out.push_str(&format!("{}: {}\n", "ERROR".red(), diagnostic));
        }
        out.push('\n');
    }
    out
}

fn format_warnings(loaded: &Loaded) -> String {
    let mut out = String::new();
    for warning in &loaded.warnings {
        out.push_str(&format!("{}: {}\n", "Warning".yellow(), warning));
    }
    out
}

fn json_report(loaded: &Loaded) -> serde_json::Value {
    json!({
        "path": loaded.path.display().to_string(),
        "states": loaded.model.state_count(),
        "transitions": loaded.model.transition_count(),
        "triggers": loaded.model.triggers().count(),
        "actions": loaded.model.actions().count(),
        "warnings": loaded.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
        "diagnostics": loaded.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_model(dir: &tempfile::TempDir, source: &str) -> String {
        let path = dir.path().join("machine.fsm");
        fs::write(&path, source).unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_validate_clean_model() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let file = write_model(
            &dir,
            "STATE a _ \"A\" : INITIAL;\nSTATE b _ \"B\" : FINAL;\nTRIGGER go \"Go\";\nTRANSITION t a -> b go;\n",
        );

        let output = execute(&Config::default(), Commands::Validate { file, json: false }).unwrap();
        assert!(output.success);
        assert!(output.text.contains("Validation passed"));
    }

    #[test]
    fn test_validate_reports_errors() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        let file = write_model(&dir, "STATE a _ \"A\" : INITIAL;\nSTATE b _ \"B\" : SIMPLE;\n");

        let output = execute(&Config::default(), Commands::Validate { file, json: false }).unwrap();
        assert!(!output.success);
        assert!(output.text.contains("=== VALIDATION ERRORS ==="));
        assert!(output.text.contains("ERROR: State 'b' is not reachable from initial state"));
    }

    #[test]
    fn test_validate_json() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_model(&dir, "STATE a _ \"A\" : INITIAL;\nSTATE b _ \"B\" : SIMPLE;\nACTION beep \"Beep\" : ENTRY_ACTION ON b;\nBOGUS;\n");

        let output = execute(&Config::default(), Commands::Validate { file, json: true }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(value["states"], 2);
        assert_eq!(value["triggers"], 0);
        assert_eq!(value["actions"], 1);
        assert_eq!(value["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(value["diagnostics"][0]["check"], "reachability");
    }

    #[test]
    fn test_render() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_model(&dir, "STATE a _ \"A\" : INITIAL;\n");

        let output = execute(&Config::default(), Commands::Render { file }).unwrap();
        assert!(output.text.contains("=== FSM MODEL ==="));
        assert!(output.text.contains("[INITIAL] a: A"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = execute(
            &Config::default(),
            Commands::Render {
                file: "/nonexistent/machine.fsm".to_string(),
            },
        );
        assert!(result.is_err());
    }
}
