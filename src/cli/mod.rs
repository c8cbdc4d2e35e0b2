//! CLI command implementations.
//!
//! - `classboard predict`: submit a feature vector, then refresh
//! - `classboard stats`: refresh and show the dashboard
//! - `classboard clear`: wipe prediction history (asks first)
//! - `classboard watch`: interactive session reading actions from stdin
//! - `classboard health`: service, config and log status
//! - `classboard config show|init|set`: configuration management

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::charts::memory::MemorySurface;
use crate::charts::terminal::TerminalSurface;
use crate::config::{self, ClassboardConfig};
use crate::dashboard::view::{ActivityRow, DashboardView, PredictionDisplay, RecordedView, Summary};
use crate::dashboard::{CHART_SLOTS, DashboardController, UserAction};
use crate::logging::EventLog;
use crate::service::http::HttpPredictionService;
use crate::service::PredictionService;
use crate::stats;

/// Output format for dashboard commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

// ---------------------------------------------------------------------------
// Terminal view
// ---------------------------------------------------------------------------

/// How the terminal view answers "are you sure?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Ask on stdin.
    Prompt,
    /// The caller already confirmed (`--yes`, or the watch loop asked).
    Granted,
}

/// Prints dashboard updates to stdout.
pub struct TerminalView {
    confirmation: Confirmation,
}

impl TerminalView {
    pub fn new(confirmation: Confirmation) -> Self {
        Self { confirmation }
    }
}

impl DashboardView for TerminalView {
    fn show_summary(&mut self, summary: &Summary) {
        println!();
        println!("{}", "Classification Dashboard".bold().cyan());
        println!("{}", "=".repeat(60));
        println!("  {} {}", "Total predictions:".bold(), summary.total_predictions);
        println!("  {} {}", "Avg confidence:   ".bold(), summary.avg_confidence);
        println!("  {} {}", "Models used:      ".bold(), summary.models_used);
        println!("  {} {}", "Top prediction:   ".bold(), summary.top_class);
        println!();
    }

    fn show_prediction(&mut self, prediction: &PredictionDisplay) {
        println!("{}", "Prediction Result".bold().cyan());
        println!("  {} {}", "Predicted class:".bold(), prediction.predicted_class.green());
        println!("  {} {}", "Confidence:     ".bold(), prediction.confidence);
    }

    fn replace_activity(&mut self, rows: &[ActivityRow]) {
        println!("{}", "Recent Predictions".bold().cyan());
        if rows.is_empty() {
            println!("  {}", "No predictions yet.".yellow());
            println!();
            return;
        }
        println!(
            "  {:<20} {:<22} {:<14} {:>10}",
            "Time", "Model", "Prediction", "Confidence"
        );
        println!("  {}", "-".repeat(69));
        for (i, row) in rows.iter().enumerate() {
            let line = format!(
                "  {:<20} {:<22} {:<14} {:>10}",
                row.time,
                truncate(&row.model, 22),
                truncate(&row.prediction, 14),
                row.confidence,
            );
            if i % 2 == 0 {
                println!("{line}");
            } else {
                println!("{}", line.dimmed());
            }
        }
        println!();
    }

    fn notify(&mut self, message: &str) {
        println!("{} {}", "!".yellow().bold(), message.yellow());
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        match self.confirmation {
            Confirmation::Granted => true,
            Confirmation::Prompt => {
                print!("{prompt} [y/N] ");
                let _ = io::stdout().flush();
                let mut answer = String::new();
                if io::stdin().lock().read_line(&mut answer).is_err() {
                    return false;
                }
                is_yes(&answer)
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ---------------------------------------------------------------------------
// Controller construction
// ---------------------------------------------------------------------------

type TerminalController =
    DashboardController<HttpPredictionService, TerminalSurface<io::Stdout>, TerminalView>;
type HeadlessController = DashboardController<HttpPredictionService, MemorySurface, RecordedView>;

fn terminal_controller(cfg: &ClassboardConfig, confirmation: Confirmation) -> TerminalController {
    DashboardController::new(
        HttpPredictionService::from_config(&cfg.service),
        TerminalSurface::stdout(CHART_SLOTS),
        TerminalView::new(confirmation),
        cfg.models.available.clone(),
    )
    .with_event_log(EventLog::from_config(&cfg.logging))
}

fn headless_controller(cfg: &ClassboardConfig, confirm: bool) -> HeadlessController {
    DashboardController::new(
        HttpPredictionService::from_config(&cfg.service),
        MemorySurface::with_slots(CHART_SLOTS),
        RecordedView::answering(confirm),
        cfg.models.available.clone(),
    )
    .with_event_log(EventLog::from_config(&cfg.logging))
}

/// The dashboard state of a headless controller as JSON.
pub fn dashboard_json<S: PredictionService>(
    controller: &DashboardController<S, MemorySurface, RecordedView>,
) -> serde_json::Value {
    let view = controller.view();
    let charts: Vec<_> = controller
        .charts()
        .target()
        .charts()
        .into_iter()
        .map(|(slot, spec)| json!({ "slot": slot, "chart": spec }))
        .collect();
    json!({
        "summary": view.summary,
        "prediction": view.prediction,
        "charts": charts,
        "recent_predictions": view.activity,
        "notifications": view.notifications,
    })
}

fn print_json<S: PredictionService>(
    controller: &DashboardController<S, MemorySurface, RecordedView>,
) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&dashboard_json(controller))?);
    Ok(())
}

// ---------------------------------------------------------------------------
// classboard predict
// ---------------------------------------------------------------------------

pub fn run_predict(features: &[String], model: Option<&str>, format: OutputFormat) -> Result<()> {
    let cfg = config::load();
    let model = model.unwrap_or(cfg.models.default.as_str()).to_string();

    match format {
        OutputFormat::Table => {
            let mut controller = terminal_controller(&cfg, Confirmation::Prompt);
            controller.submit_prediction(features, &model)?;
        }
        OutputFormat::Json => {
            let mut controller = headless_controller(&cfg, false);
            let outcome = controller.submit_prediction(features, &model);
            print_json(&controller)?;
            outcome?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// classboard stats
// ---------------------------------------------------------------------------

pub fn run_stats(format: OutputFormat) -> Result<()> {
    let cfg = config::load();

    match format {
        OutputFormat::Table => {
            let mut controller = terminal_controller(&cfg, Confirmation::Prompt);
            controller.refresh()?;
        }
        OutputFormat::Json => {
            let mut controller = headless_controller(&cfg, false);
            let outcome = controller.refresh();
            print_json(&controller)?;
            outcome?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// classboard clear
// ---------------------------------------------------------------------------

pub fn run_clear(assume_yes: bool) -> Result<()> {
    let cfg = config::load();
    let confirmation = if assume_yes {
        Confirmation::Granted
    } else {
        Confirmation::Prompt
    };
    let mut controller = terminal_controller(&cfg, confirmation);
    if controller.clear_history()?.is_none() {
        println!("{}", "Cancelled; history left untouched.".dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// classboard watch
// ---------------------------------------------------------------------------

/// One line typed in watch mode.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchCommand {
    Action(UserAction),
    /// `clear`: needs a confirmation line before it becomes an action.
    Clear,
    Help,
    Quit,
    Unknown(String),
    /// Known verb, unusable arguments.
    Invalid(String),
}

/// Parse a watch-mode line. `predict` takes four features and an optional
/// model; validation happens in the controller.
pub fn parse_watch_command(line: &str, default_model: &str) -> Option<WatchCommand> {
    let mut words = line.split_whitespace();
    let verb = words.next()?;
    let args: Vec<String> = words.map(str::to_string).collect();

    let command = match verb {
        "predict" | "p" if args.len() > 5 => WatchCommand::Invalid(format!(
            "predict takes four features and an optional model, got {} arguments",
            args.len()
        )),
        "predict" | "p" => {
            let (features, model) = if args.len() == 5 {
                (args[..4].to_vec(), args[4].clone())
            } else {
                (args, default_model.to_string())
            };
            WatchCommand::Action(UserAction::Submit { features, model })
        }
        "refresh" | "r" => WatchCommand::Action(UserAction::Refresh),
        "clear" => WatchCommand::Clear,
        "help" | "?" => WatchCommand::Help,
        "quit" | "exit" | "q" => WatchCommand::Quit,
        other => WatchCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Read watch commands from `input` and forward actions until `quit`, EOF,
/// or the controller goes away.
pub fn forward_actions<R: BufRead>(mut input: R, actions: Sender<UserAction>, default_model: &str) {
    let mut line = String::new();
    loop {
        line.clear();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let action = match parse_watch_command(&line, default_model) {
            None => continue,
            Some(WatchCommand::Action(action)) => action,
            Some(WatchCommand::Clear) => {
                print!("Are you sure you want to clear prediction history? [y/N] ");
                let _ = io::stdout().flush();
                line.clear();
                if input.read_line(&mut line).is_err() || !is_yes(&line) {
                    println!("{}", "Cancelled.".dimmed());
                    continue;
                }
                UserAction::ClearHistory
            }
            Some(WatchCommand::Help) => {
                print_watch_help();
                continue;
            }
            Some(WatchCommand::Quit) => return,
            Some(WatchCommand::Invalid(message)) => {
                println!("{} {message}", "!".yellow().bold());
                continue;
            }
            Some(WatchCommand::Unknown(verb)) => {
                println!("{} unknown command '{verb}' (try 'help')", "!".yellow().bold());
                continue;
            }
        };

        if actions.send(action).is_err() {
            return;
        }
    }
}

fn print_watch_help() {
    println!("{}", "Commands".bold().cyan());
    println!("  predict <f1> <f2> <f3> <f4> [model]   submit a prediction");
    println!("  refresh                               reload statistics");
    println!("  clear                                 wipe prediction history");
    println!("  quit                                  leave");
}

pub fn run_watch() -> Result<()> {
    let cfg = config::load();
    let (tx, rx) = mpsc::channel();
    let default_model = cfg.models.default.clone();

    // Confirmation for `clear` is collected by the input thread.
    let mut controller = terminal_controller(&cfg, Confirmation::Granted);
    print_watch_help();
    controller.dispatch(UserAction::Refresh)?;

    thread::spawn(move || forward_actions(io::stdin().lock(), tx, &default_model));
    controller.run(rx)?;
    controller.teardown();
    Ok(())
}

// ---------------------------------------------------------------------------
// classboard health
// ---------------------------------------------------------------------------

pub fn run_health() -> Result<()> {
    println!("{}", "classboard Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());
    let cfg = config::load();

    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.classboard/config.toml found"
        } else {
            "not found (run `classboard config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".classboard.toml found"
        } else {
            "none (optional)"
        },
    );
    print_health_item("Models", true, &cfg.models.available.join(", "));

    let service = HttpPredictionService::from_config(&cfg.service);
    match service.fetch_stats() {
        Ok(raw) => {
            print_health_item("Service", true, &format!("reachable at {}", service.base_url()));
            match stats::parse_snapshot(&raw) {
                Ok(snapshot) => print_health_item(
                    "Stats payload",
                    true,
                    &format!("{} predictions recorded", snapshot.total_predictions()),
                ),
                Err(e) => print_health_item("Stats payload", false, &e.to_string()),
            }
        }
        Err(e) => print_health_item(
            "Service",
            false,
            &format!("{} ({e})", service.base_url()),
        ),
    }

    let log = EventLog::from_config(&cfg.logging);
    match log.path() {
        Some(path) => print_health_item(
            "Event log",
            true,
            &format!(
                "{}{}",
                path.display(),
                if path.exists() { "" } else { " (not written yet)" }
            ),
        ),
        None => print_health_item("Event log", false, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// classboard config show | init | set
// ---------------------------------------------------------------------------

pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective classboard Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    for (label, path) in [
        ("~/.classboard/config.toml", config::global_config_file()),
        (".classboard.toml", config::project_config_file()),
    ] {
        if path.is_some_and(|p| p.exists()) {
            println!("  {} {}", "✓".green(), label.dimmed());
        } else {
            println!("  {} {}", "·".dimmed(), format!("{label} (not found)").dimmed());
        }
    }
    println!("  {} {}", "·".dimmed(), "CLASSBOARD_* environment variables".dimmed());
    Ok(())
}

pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
