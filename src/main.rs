use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use classboard::DashboardError;
use classboard::cli;

#[derive(Debug, Parser)]
#[command(name = "classboard")]
#[command(about = "Control panel for a classification service")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit four features for prediction, then refresh the dashboard
    Predict {
        /// sepal_length sepal_width petal_length petal_width
        #[arg(num_args = 4, required = true, allow_hyphen_values = true)]
        features: Vec<String>,
        /// Model to use (default from config)
        #[arg(long)]
        model: Option<String>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show prediction statistics, charts and recent activity
    Stats {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Delete all stored predictions
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Interactive session: type predict / refresh / clear / quit
    Watch,
    /// Check service reachability, config and event log
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default config to ~/.classboard/config.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `service.base_url http://10.0.0.2:5000`
    Set { key: String, value: String },
}

fn run(app: App) -> Result<()> {
    match app.command {
        Commands::Predict {
            features,
            model,
            format,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_predict(&features, model.as_deref(), fmt)
        }
        Commands::Stats { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_stats(fmt)
        }
        Commands::Clear { yes } => cli::run_clear(yes),
        Commands::Watch => cli::run_watch(),
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
        },
    }
}

fn main() -> ExitCode {
    match run(App::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // User-facing failures were already shown by the view.
            let shown = err
                .downcast_ref::<DashboardError>()
                .is_some_and(|e| !e.is_defect());
            if !shown {
                eprintln!("{} {err:#}", "error:".red().bold());
            }
            ExitCode::FAILURE
        }
    }
}
