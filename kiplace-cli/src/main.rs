//! kiplace CLI - create KiCad projects and place components from the command line.
//!
//! Every command prints exactly one JSON object on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use kiplace::{
    load_settings, ComponentRequest, KiplaceCore, KiplaceError, PlacementOptions,
    ProjectRequest, Settings,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kiplace")]
#[command(about = "KiCad project creation and component placement tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a JSON settings file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create <name>.kicad_pro, <name>.kicad_sch and <name>.kicad_pcb in PATH
    #[command(name = "create_project", allow_negative_numbers = true)]
    CreateProject {
        /// Project name
        name: String,

        /// Directory for the project files (created if missing)
        path: PathBuf,

        /// Number of copper layers
        #[arg(default_value_t = 2)]
        layers: u32,

        /// Board width in mm
        #[arg(default_value_t = 100.0)]
        width: f64,

        /// Board height in mm
        #[arg(default_value_t = 80.0)]
        height: f64,
    },

    /// Place a footprint on a board
    #[command(name = "add_component", allow_negative_numbers = true)]
    AddComponent {
        /// Path to the .kicad_pcb file
        pcb_path: PathBuf,

        /// Component value, e.g. 10k
        value: String,

        /// Library footprint, e.g. Resistor_SMD:R_0603_1608Metric
        footprint: String,

        /// X position in mm
        x: f64,

        /// Y position in mm
        y: f64,

        /// Rotation in degrees
        #[arg(default_value_t = 0.0)]
        rotation: f64,

        /// Board side: front or back
        #[arg(default_value = "front")]
        layer: String,
    },

    /// List the components on a board
    #[command(name = "get_components")]
    GetComponents {
        /// Path to the .kicad_pcb file
        pcb_path: PathBuf,
    },

    /// Remove a component by reference designator
    #[command(name = "remove_component")]
    RemoveComponent {
        /// Path to the .kicad_pcb file
        pcb_path: PathBuf,

        /// Reference designator, e.g. R1
        reference: String,
    },

    /// Write a CSV bill of materials
    #[command(name = "bom")]
    Bom {
        /// Path to the .kicad_pcb file
        pcb_path: PathBuf,

        /// Output CSV file (default: <board>-bom.csv next to the board)
        output: Option<PathBuf>,
    },
}

/// Determines the log level from CLI arguments.
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber; stdout is reserved for JSON.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!(
                "{}",
                json!({ "success": false, "error": e.to_string() })
            );
            ExitCode::FAILURE
        }
    }
}

/// Failure before any command ran: JSON on stdout, non-zero exit.
fn fail(error: &KiplaceError) -> ExitCode {
    println!(
        "{}",
        json!({
            "success": false,
            "error": error.to_string(),
            "message": error.to_string(),
        })
    );
    ExitCode::FAILURE
}

fn usage_error(e: &clap::Error) -> KiplaceError {
    let rendered = e.to_string();
    let first_line = rendered.lines().next().unwrap_or_default();
    let detail = first_line.strip_prefix("error: ").unwrap_or(first_line);
    match e.kind() {
        ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            KiplaceError::Usage("No command specified".to_string())
        }
        _ => KiplaceError::Usage(detail.to_string()),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => return fail(&usage_error(&e)),
        },
    };

    let settings: Settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => return fail(&e),
    };

    init_tracing(get_log_level(cli.verbose, cli.quiet, &settings.logging.level));
    debug!(command = ?cli.command, "dispatching");

    let options = PlacementOptions::from(&settings);
    run(cli.command, &options)
}

fn run(command: Commands, options: &PlacementOptions) -> ExitCode {
    match command {
        Commands::CreateProject {
            name,
            path,
            layers,
            width,
            height,
        } => {
            let request = ProjectRequest {
                name,
                path,
                layers,
                width,
                height,
            };
            print_json(&KiplaceCore::create_project(&request, options))
        }
        Commands::AddComponent {
            pcb_path,
            value,
            footprint,
            x,
            y,
            rotation,
            layer,
        } => {
            let request = ComponentRequest::new(value, footprint, x, y)
                .rotation(rotation)
                .layer(layer);
            print_json(&KiplaceCore::add_component(&pcb_path, &request, options))
        }
        Commands::GetComponents { pcb_path } => {
            print_json(&KiplaceCore::get_components(&pcb_path))
        }
        Commands::RemoveComponent {
            pcb_path,
            reference,
        } => print_json(&KiplaceCore::remove_component(&pcb_path, &reference)),
        Commands::Bom { pcb_path, output } => {
            print_json(&KiplaceCore::bom(&pcb_path, output.as_deref()))
        }
    }
}
