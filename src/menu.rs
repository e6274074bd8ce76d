//! Interactive main menu.

use crate::commands::format_report;
use crate::config::Config;
use crate::loader;
use colored::Colorize;
use fsmview_core::{CommandSource, Model, Renderer, Simulator, TextRenderer};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config as EditorConfig, Editor};
use std::io;

const MENU_TEXT: &str = "Options:
1. Run simulator
2. Load from file
3. Exit";

/// Line editor shared by the menu and the simulator.
pub struct LineEditor {
    rl: Editor<(), DefaultHistory>,
}

impl LineEditor {
    pub fn new() -> rustyline::Result<Self> {
        let config = EditorConfig::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .build();
        Ok(Self {
            rl: Editor::with_config(config)?,
        })
    }
}

impl CommandSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self.rl.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            // ^C abandons the current line only
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
        }
    }
}

/// Runs the main menu until the user exits.
pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut editor = LineEditor::new()?;
    let history_path = config.repl.history_path();
    let _ = editor.rl.load_history(&history_path);

    println!("{}", "fsmview".bold().cyan());
    let mut loaded: Option<Model> = None;

    loop {
        println!();
        println!("{}", MENU_TEXT);
        let Some(choice) = editor.read_line("Choose option (1-3): ")? else {
            break;
        };
        println!();

        match choice.trim() {
            "1" => match &loaded {
                Some(model) => simulate(model, &mut editor)?,
                None => println!(
                    "{}",
                    "No FSM loaded! Choose option 2 to load one first.".yellow()
                ),
            },
            "2" => {
                let Some(name) = editor.read_line("Enter file name: ")? else {
                    break;
                };
                println!();
                let name = name.trim().trim_matches('"').trim();
                if name.is_empty() {
                    println!("No file name given.");
                    continue;
                }
                if let Some(model) = load(name, config) {
                    loaded = Some(model);
                    println!(
                        "{}",
                        ">> FSM loaded. Choose option 1 to simulate.".green()
                    );
                }
            }
            "3" | "quit" | "exit" => break,
            "" => continue,
            _ => println!("Invalid choice, try again."),
        }
    }

    let _ = editor.rl.save_history(&history_path);
    Ok(())
}

/// Loads, reports and renders a model file. Failures are printed.
fn load(name: &str, config: &Config) -> Option<Model> {
    match loader::load(name, config) {
        Ok(loaded) => {
            println!("Loaded FSM from: {}", loaded.path.display());
            print!("{}", format_report(&loaded));
            println!("{}", TextRenderer.render(&loaded.model));
            Some(loaded.model)
        }
        Err(e) => {
            println!("{}: {}", "Error".red(), e);
            None
        }
    }
}

/// Runs the simulator on a copy of `model`.
pub fn simulate(model: &Model, editor: &mut LineEditor) -> io::Result<()> {
    let mut model = model.clone();
    let mut out = io::stdout();
    Simulator::new(&mut model, &TextRenderer).run(editor, &mut out)
}

/// Loads a model file and runs the simulator on it directly.
pub fn simulate_file(name: &str, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = loader::load(name, config)?;
    print!("{}", format_report(&loaded));

    let mut editor = LineEditor::new()?;
    let history_path = config.repl.history_path();
    let _ = editor.rl.load_history(&history_path);
    simulate(&loaded.model, &mut editor)?;
    let _ = editor.rl.save_history(&history_path);
    Ok(())
}
