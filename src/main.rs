//! fsmview - Define, validate and simulate hierarchical state machines
//!
//! Provides an interactive menu and one-shot commands.

mod commands;
mod config;
mod loader;
mod menu;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fsmview")]
#[command(about = "Define, validate and simulate hierarchical state machines")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "FSMVIEW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive menu
    Menu,

    /// Check a definition file and report problems
    Validate {
        /// Definition file
        file: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the model described by a definition file
    Render {
        /// Definition file
        file: String,
    },

    /// Run the simulator on a definition file
    Simulate {
        /// Definition file
        file: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if !config.repl.color {
        colored::control::set_override(false);
    }

    match cli.command {
        None | Some(Commands::Menu) => menu::run(&config)?,
        Some(Commands::Simulate { file }) => {
            if let Err(e) = menu::simulate_file(&file, &config) {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
        Some(cmd) => match commands::execute(&config, cmd) {
            Ok(output) => {
                print!("{}", output.text);
                if !output.success {
                    std::process::exit(2);
                }
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
