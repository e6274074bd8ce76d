//! Model file lookup and loading.

use crate::config::Config;
use fsmview_core::{validate, Diagnostic, FsmError, Model, ParseWarning, Parser};
use std::path::{Path, PathBuf};

/// A parsed and validated model definition.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub path: PathBuf,
    pub model: Model,
    pub warnings: Vec<ParseWarning>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves a model file name: the path as given, then each search directory.
pub fn resolve(name: &str, search_dirs: &[PathBuf]) -> Result<PathBuf, FsmError> {
    let name = name.trim().trim_matches('"');
    let direct = Path::new(name);
    if direct.is_file() {
        return Ok(direct.to_path_buf());
    }

    if direct.is_relative() {
        for dir in search_dirs {
            let candidate = dir.join(direct);
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "Found model in search dir");
                return Ok(candidate);
            }
        }
    }

    Err(FsmError::NotFound {
        path: direct.to_path_buf(),
    })
}

/// Reads, parses and validates a model definition.
pub fn load(name: &str, config: &Config) -> Result<Loaded, FsmError> {
    let path = resolve(name, &config.models.search_dirs)?;
    let source = std::fs::read_to_string(&path)?;

    let output = Parser::new(config.builder()).parse_str(&source);
    let diagnostics = validate(&output.model);

    tracing::info!(
        path = %path.display(),
        states = output.model.state_count(),
        transitions = output.model.transition_count(),
        warnings = output.warnings.len(),
        diagnostics = diagnostics.len(),
        "Loaded model"
    );

    Ok(Loaded {
        path,
        model: output.model,
        warnings: output.warnings,
        diagnostics,
    })
}
