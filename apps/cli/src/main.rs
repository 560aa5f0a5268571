//! Operator CLI for the doctor directory and admin accounts.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use admin_cell::models::CreateUserRequest;
use admin_cell::AdminAccountService;
use doctor_cell::models::ImportMode;
use doctor_cell::services::{DoctorCsvService, DoctorService};
use shared_config::AppConfig;
use shared_database::{migrations, AppState};
use shared_models::auth::AdminRole;
use shared_models::pagination::PageParams;
use symptom_cell::services::QueryService;

#[derive(Parser)]
#[command(name = "hkdoc-admin")]
#[command(about = "Maintenance commands for the HK doctor matching service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade both databases
    Migrate,
    /// Create an admin panel or doctor portal account
    CreateAdmin {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        /// super_admin, admin or doctor
        #[arg(long, default_value = "super_admin")]
        role: String,

        /// Directory entry the doctor account belongs to
        #[arg(long)]
        doctor_id: Option<i64>,
    },
    /// Load doctors from a CSV file
    ImportDoctors {
        path: PathBuf,

        /// Delete every existing doctor first
        #[arg(long)]
        replace: bool,
    },
    /// Write the directory as CSV to a file or stdout
    ExportDoctors {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Set a doctor's ranking boost (0-10)
    SetPriority { doctor_id: i64, priority: i64 },
    /// Report row counts and incomplete doctor records
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let state = AppState::connect(AppConfig::from_env())
        .await
        .context("Failed to open databases")?;

    match cli.command {
        Commands::Migrate => {
            let doctors = migrations::current_version(state.doctors_db.pool()).await?;
            let admin = migrations::current_version(state.admin_db.pool()).await?;
            info!("doctors.db at schema version {}, admin_data.db at schema version {}", doctors, admin);
        }
        Commands::CreateAdmin {
            username,
            password,
            role,
            doctor_id,
        } => {
            let role: AdminRole = role.parse().map_err(anyhow::Error::msg)?;
            let user = AdminAccountService::new(&state)
                .create(CreateUserRequest {
                    username,
                    password,
                    role,
                    doctor_id,
                })
                .await?;
            info!("Created {} account {} (id {})", user.role, user.username, user.id);
        }
        Commands::ImportDoctors { path, replace } => {
            let data = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let mode = if replace { ImportMode::Replace } else { ImportMode::Append };

            let report = DoctorCsvService::new(&state)
                .import(&data, mode)
                .await?;

            info!("Imported {} doctors", report.imported);
            for skipped in &report.skipped {
                warn!("Line {} skipped: {}", skipped.line, skipped.error);
            }
        }
        Commands::ExportDoctors { output } => {
            let csv = DoctorCsvService::new(&state)
                .export()
                .await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, csv).with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Exported doctors to {}", path.display());
                }
                None => print!("{}", csv),
            }
        }
        Commands::SetPriority { doctor_id, priority } => {
            let doctor = DoctorService::new(&state)
                .set_priority(doctor_id, priority)
                .await?;
            info!("{} now has priority {}", doctor.display_name(), doctor.priority_flag);
        }
        Commands::Check => check(&state).await?,
    }

    Ok(())
}

async fn check(state: &AppState) -> anyhow::Result<()> {
    let doctors = DoctorService::new(state);
    let doctor_count = doctors.count().await?;
    let admin_count = AdminAccountService::new(state)
        .count()
        .await?;
    let query_count = QueryService::new(state)
        .list(&PageParams::default())
        .await?
        .total;

    println!("doctors:      {}", doctor_count);
    println!("admin users:  {}", admin_count);
    println!("user queries: {}", query_count);
    if admin_count == 0 {
        warn!("No admin accounts exist; run `hkdoc-admin create-admin`");
    }

    let incomplete = doctors.find_incomplete().await?;
    if incomplete.is_empty() {
        println!("All doctor records have bilingual names and an address.");
        return Ok(());
    }

    println!("{} doctor records are incomplete:", incomplete.len());
    for doctor in &incomplete {
        let mut missing = Vec::new();
        if doctor.name_en.as_deref().unwrap_or("").is_empty() {
            missing.push("name_en");
        }
        if doctor.name_zh.as_deref().unwrap_or("").is_empty() {
            missing.push("name_zh");
        }
        if doctor.address_en.as_deref().unwrap_or("").is_empty() && doctor.address_zh.as_deref().unwrap_or("").is_empty() {
            missing.push("address");
        }
        println!("  #{:<6} {:<40} missing {}", doctor.id, doctor.display_name(), missing.join(", "));
    }
    Ok(())
}
