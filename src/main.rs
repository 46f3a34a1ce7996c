//! Silent Guardian - command-line host
//!
//! Wires the file-backed platform to the guardian. Every invocation is a
//! fresh process, the same way the OS wakes the app for a geofence event.
//!
//! Usage:
//!   silent-guardian enable
//!   silent-guardian event enter "Tech Store_40.43_-79.95"
//!   silent-guardian permissions set background granted

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use silent_guardian::api::{Guardian, PlatformServices};
use silent_guardian::constants;
use silent_guardian::logic::config::GuardianConfig;
use silent_guardian::logic::error::GuardianResult;
use silent_guardian::logic::handler::EventOutcome;
use silent_guardian::logic::platform::{
    GeofenceEvent, GeofenceEventType, LocalGeofencing, LocalPermissions, NotificationOutbox,
    PermissionKind, PermissionStatus, TaskInvocation,
};

#[derive(Parser, Debug)]
#[command(name = "silent-guardian", version)]
#[command(about = "Background spending nudges near danger zones")]
struct Cli {
    /// Config file (defaults to GUARDIAN_CONFIG, then the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request permissions and start watching every danger zone
    Enable,
    /// Stop watching
    Disable,
    /// Show whether the guardian is active
    Status {
        /// Include model and feature layout details
        #[arg(long)]
        verbose: bool,
    },
    /// List the danger zone dataset
    Zones,
    /// List the geofence regions that enable would register
    Regions,
    /// Deliver a geofence transition, as the OS would
    Event {
        #[arg(value_parser = parse_event_type)]
        event_type: GeofenceEventType,
        identifier: String,
    },
    /// Inspect or change permission grants
    Permissions {
        #[command(subcommand)]
        action: PermissionAction,
    },
    /// Show notifications presented so far
    Outbox,
}

#[derive(Subcommand, Debug)]
enum PermissionAction {
    Show,
    /// Change a grant the way the system Settings screen would
    Set {
        #[arg(value_parser = parse_permission_kind)]
        kind: PermissionKind,
        #[arg(value_parser = parse_permission_status)]
        status: PermissionStatus,
    },
}

fn parse_event_type(s: &str) -> Result<GeofenceEventType, String> {
    GeofenceEventType::parse(s).ok_or_else(|| format!("expected enter or exit, got {}", s))
}

fn parse_permission_kind(s: &str) -> Result<PermissionKind, String> {
    PermissionKind::parse(s)
        .ok_or_else(|| format!("expected foreground, background or notifications, got {}", s))
}

fn parse_permission_status(s: &str) -> Result<PermissionStatus, String> {
    PermissionStatus::parse(s)
        .ok_or_else(|| format!("expected granted, denied or undetermined, got {}", s))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> GuardianResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> GuardianResult<ExitCode> {
    let config = GuardianConfig::load(cli.config.as_deref())?;
    let data_dir = config.data_dir();
    log::debug!("Silent Guardian v{} using {}", constants::APP_VERSION, data_dir.display());

    let permissions = Arc::new(LocalPermissions::new(&data_dir));
    let outbox = Arc::new(NotificationOutbox::new(&data_dir, Arc::clone(&permissions)));

    let guardian = Guardian::from_config(
        config,
        PlatformServices {
            geofencing: Arc::new(LocalGeofencing::new(&data_dir)),
            permissions: permissions.clone(),
            notifications: outbox.clone(),
        },
    );

    if matches!(cli.command, Command::Enable | Command::Status { .. } | Command::Event { .. }) {
        match guardian.load_model() {
            Ok(()) => log::info!("ONNX model loaded successfully"),
            Err(e) => log::warn!("Prediction model unavailable: {}", e),
        }
    }

    match cli.command {
        Command::Enable => match guardian.try_enable().await {
            Ok(count) => {
                println!("Silent Guardian enabled, watching {} danger zones", count);
            }
            Err(e) => {
                log::error!("Failed to enable Silent Guardian: {}", e);
                eprintln!("{}", e.user_message());
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Disable => {
            guardian.disable().await;
            println!("Silent Guardian disabled");
        }
        Command::Status { verbose } => {
            if verbose {
                print_json(&guardian.status_report().await)?;
            } else {
                print_json(&guardian.status().await)?;
            }
        }
        Command::Zones => print_json(&guardian.danger_zones()?)?,
        Command::Regions => print_json(&guardian.regions()?)?,
        Command::Event { event_type, identifier } => {
            let invocation = TaskInvocation {
                data: Some(GeofenceEvent { event_type, region_identifier: identifier }),
                error: None,
            };
            let outcome = guardian.event_handler().on_task(invocation).await;
            print_json(&outcome)?;
            if outcome == EventOutcome::TaskError {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Permissions { action: PermissionAction::Show } => {
            for (kind, status) in permissions.snapshot() {
                println!("{:<22} {:?}", kind.as_str(), status);
            }
        }
        Command::Permissions { action: PermissionAction::Set { kind, status } } => {
            permissions.set(kind, status)?;
            println!("{} set to {:?}", kind, status);
        }
        Command::Outbox => print_json(&outbox.read_all()?)?,
    }

    Ok(ExitCode::SUCCESS)
}
