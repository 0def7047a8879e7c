// src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod assignment;
mod attendance;
mod backend;
mod clock;
mod config;
mod geo;
mod geofence;
mod location;
mod policy;
mod service;
mod store;
mod workplace;

mod attendance_tests;
mod policy_tests;
mod workplace_tests;

use assignment::AssignmentResolver;
use attendance::{AttendanceLedger, DayStatus};
use backend::{BackendClient, BackendError, IncidentReport, InventoryRequest, ReassignmentRequest};
use clock::SystemClock;
use config::AppConfig;
use geo::Coordinates;
use geofence::GeofenceEvaluator;
use location::FixedLocationProvider;
use service::{ClockInOutcome, ClockOutOutcome, FieldOpsService};
use store::FileStore;
use workplace::WorkplaceDirectory;

/// Field-operations client: geofenced attendance, incident reporting,
/// inventory and reassignment requests.
#[derive(Parser)]
#[command(name = "fieldops", version, about)]
struct Cli {
    /// Device latitude (stands in for the platform location fix).
    #[arg(long, global = true)]
    lat: Option<f64>,

    /// Device longitude (stands in for the platform location fix).
    #[arg(long, global = true)]
    lon: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the issued auth token locally.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Discard the stored auth token and cached profile.
    Logout,
    /// List known workplace locations.
    Locations {
        /// Re-fetch the list from the backend first.
        #[arg(long)]
        refresh: bool,
        /// Only show active locations.
        #[arg(long)]
        active: bool,
    },
    /// Check whether the device is inside the assigned workplace radius.
    CheckLocation {
        /// Check another employee's assignment instead of your own.
        #[arg(long)]
        employee: Option<String>,
    },
    /// Clock in for today (geofence and time window permitting).
    ClockIn,
    /// Clock out for today (geofence and time window permitting).
    ClockOut,
    /// Show today's attendance status and windows.
    Status,
    /// Submit an incident report, optionally with media attachments.
    ReportIncident {
        title: String,
        description: String,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        location_id: Option<String>,
        /// Media files to attach; repeat for multiple.
        #[arg(long)]
        media: Vec<PathBuf>,
    },
    /// Submit an inventory request.
    RequestInventory {
        item: String,
        quantity: u32,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Request reassignment to another workplace location.
    RequestReassignment {
        location_id: String,
        reason: String,
    },
    /// Submit a password reset request (no login required).
    RequestPasswordReset { email: String },
    /// List submitted password reset requests.
    PasswordResets,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to read configuration from environment")?;
    debug!("Configuration: {:?}", config);

    let store = Arc::new(
        FileStore::new(config.state_dir.clone())
            .context("Failed to open local state directory")?,
    );
    let clock = Arc::new(SystemClock);
    let backend = BackendClient::new(&config, store.clone())
        .context("Failed to construct backend client")?;

    let device_position = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        (None, None) => None,
        _ => bail!("--lat and --lon must be given together"),
    };
    let location = Arc::new(FixedLocationProvider::new(device_position));

    let directory = WorkplaceDirectory::new(Arc::new(backend.clone()));
    let resolver = AssignmentResolver::new(
        Arc::new(backend.clone()),
        clock.clone(),
        config.assignment_cache_ttl_secs,
    );
    let geofence = GeofenceEvaluator::new(resolver, location.clone());
    let ledger = AttendanceLedger::new(store, clock.clone());
    let service = FieldOpsService::new(
        backend.clone(),
        directory,
        geofence,
        ledger,
        location,
        clock,
    );

    match cli.command {
        Command::Login { email, password } => {
            let user = backend
                .login(&email, &password)
                .await
                .map_err(report_backend_error)?;
            println!("Logged in as {} ({})", user.name, user.id);
        }
        Command::Logout => {
            backend.logout().await?;
            println!("Logged out.");
        }
        Command::Locations { refresh, active } => {
            let mut locations = service.locations(refresh).await;
            if active {
                locations.retain(|l| l.is_active);
            }
            for l in &locations {
                println!(
                    "{}  {}  ({:.4}, {:.4})  radius {} m{}",
                    l.id,
                    l.name,
                    l.latitude,
                    l.longitude,
                    l.radius_meters,
                    if l.is_active { "" } else { "  [inactive]" }
                );
            }
        }
        Command::CheckLocation { employee } => {
            let result = service.check_location(employee.as_deref()).await;
            match (&result.error, &result.assigned_location) {
                (Some(error), _) => println!("Check failed: {}", error),
                (None, Some(location)) => {
                    println!(
                        "{} the radius of {}: {:.0} m away (allowed {} m)",
                        if result.is_within_radius {
                            "Within"
                        } else {
                            "Outside"
                        },
                        location.name,
                        result.distance_meters,
                        location.radius_meters
                    );
                }
                (None, None) => println!("Check failed: no assigned location"),
            }
        }
        Command::ClockIn => {
            let employee_id = current_employee_id(&backend)?;
            match service
                .clock_in(&employee_id)
                .await
                .map_err(report_service_error)?
            {
                ClockInOutcome::Recorded { time, late } => {
                    println!(
                        "Clocked in at {}{}",
                        time,
                        if late { " (late)" } else { "" }
                    );
                }
                ClockInOutcome::Blocked(reason) => println!("Clock-in blocked: {}", reason),
            }
        }
        Command::ClockOut => {
            let employee_id = current_employee_id(&backend)?;
            match service
                .clock_out(&employee_id)
                .await
                .map_err(report_service_error)?
            {
                ClockOutOutcome::Recorded { time } => println!("Clocked out at {}", time),
                ClockOutOutcome::Blocked(reason) => println!("Clock-out blocked: {}", reason),
            }
        }
        Command::Status => {
            let employee_id = current_employee_id(&backend)?;
            let overview = service.today_overview(&employee_id);
            println!("Date: {}", overview.date);
            println!(
                "Status: {}",
                match overview.status {
                    DayStatus::NotStarted => "not started",
                    DayStatus::InProgress => "in progress",
                    DayStatus::Completed => "completed",
                }
            );
            if let Some(record) = &overview.record {
                if let Some(t) = &record.clock_in_time {
                    println!("Clocked in:  {}", t);
                }
                if let Some(t) = &record.clock_out_time {
                    println!("Clocked out: {}", t);
                }
            }
            if overview.clock_in.available {
                println!(
                    "Clock-in is open{}",
                    if overview.clock_in.is_late {
                        " (would count as late)"
                    } else {
                        ""
                    }
                );
            } else if overview.clock_in.is_expired {
                println!("Clock-in window has closed");
            }
            if let Some(millis) = overview.clock_out_countdown_millis {
                let total_secs = millis / 1000;
                println!(
                    "Time until clock-out opens: {:02}:{:02}:{:02}",
                    total_secs / 3600,
                    (total_secs / 60) % 60,
                    total_secs % 60
                );
            }
        }
        Command::ReportIncident {
            title,
            description,
            severity,
            location_id,
            media,
        } => {
            let report = IncidentReport {
                title,
                description,
                severity,
                workplace_location_id: location_id,
            };
            let ack = backend
                .submit_incident_report(&report, &media)
                .await
                .map_err(report_backend_error)?;
            println!(
                "{}",
                ack.message.unwrap_or_else(|| "Incident reported.".to_string())
            );
        }
        Command::RequestInventory {
            item,
            quantity,
            reason,
        } => {
            let request = InventoryRequest {
                item_name: item,
                quantity,
                reason,
            };
            let ack = backend
                .submit_inventory_request(&request)
                .await
                .map_err(report_backend_error)?;
            println!(
                "{}",
                ack.message
                    .unwrap_or_else(|| "Inventory request submitted.".to_string())
            );
        }
        Command::RequestReassignment {
            location_id,
            reason,
        } => {
            let request = ReassignmentRequest {
                requested_location_id: location_id,
                reason,
            };
            let ack = backend
                .submit_reassignment_request(&request)
                .await
                .map_err(report_backend_error)?;
            println!(
                "{}",
                ack.message
                    .unwrap_or_else(|| "Reassignment request submitted.".to_string())
            );
        }
        Command::RequestPasswordReset { email } => {
            let ack = backend
                .submit_password_reset(&email)
                .await
                .map_err(report_backend_error)?;
            println!(
                "{}",
                ack.message
                    .unwrap_or_else(|| "Password reset requested.".to_string())
            );
        }
        Command::PasswordResets => {
            let requests = backend
                .list_password_resets()
                .await
                .map_err(report_backend_error)?;
            if requests.is_empty() {
                println!("No password reset requests.");
            }
            for r in &requests {
                println!("{}  {}  {}  {}", r.id, r.email, r.status, r.requested_at);
            }
        }
    }

    Ok(())
}

/// The employee acting in this session is the logged-in user.
fn current_employee_id(backend: &BackendClient) -> Result<String> {
    match backend.cached_user()? {
        Some(user) => Ok(user.id),
        None => bail!("Not logged in; run `fieldops login` first"),
    }
}

/// Validation failures are shown field by field; everything else becomes a
/// plain message.
fn report_backend_error(error: BackendError) -> anyhow::Error {
    if let BackendError::Validation { message, errors } = &error {
        eprintln!("{}", message);
        for (field, messages) in errors {
            for m in messages {
                eprintln!("  {}: {}", field, m);
            }
        }
    }
    anyhow::Error::new(error)
}

fn report_service_error(error: service::ServiceError) -> anyhow::Error {
    match error {
        service::ServiceError::Backend(backend_error) => report_backend_error(backend_error),
        other => anyhow::Error::new(other),
    }
}
