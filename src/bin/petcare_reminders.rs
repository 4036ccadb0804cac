//! Headless PetCare reminder host.
//!
//! Runs a scripted session against the in-memory adapters and prints the
//! reconciliation report of each step. Tracing output goes to stderr.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use petcare::data::photos::InMemoryBlobStore;
use petcare::data::store::InMemoryDocumentStore;
use petcare::model::{AppointmentPatch, NewAppointment, NewPet, Species};
use petcare::reminders::memory::InMemoryReminderStore;
use petcare::{AppointmentType, DataLayer, OwnerId, PassReport, PetCareConfig, ReminderService};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// PetCare appointment reminder host.
#[derive(Parser)]
#[command(name = "petcare-reminders", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scripted session against in-memory stores.
    Demo {
        /// Account id to sign in as.
        #[arg(long, default_value = "demo-user")]
        owner: String,

        /// Print the final snapshot as JSON before signing out.
        #[arg(long)]
        dump: bool,
    },

    /// Print the effective configuration as TOML.
    ShowConfig,

    /// Write the default configuration to the default config path.
    InitConfig,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PetCareConfig> {
    if let Some(path) = path {
        return PetCareConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()));
    }
    let default_path = PetCareConfig::default_config_path();
    if default_path.exists() {
        return PetCareConfig::from_file(&default_path)
            .with_context(|| format!("loading config from {}", default_path.display()));
    }
    Ok(PetCareConfig::default())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    match cli.command.unwrap_or(Command::Demo {
        owner: "demo-user".to_owned(),
        dump: false,
    }) {
        Command::Demo { owner, dump } => run_demo(config, OwnerId::new(owner), dump).await,
        Command::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Command::InitConfig => {
            let path = PetCareConfig::default_config_path();
            PetCareConfig::default().save_to_file(&path)?;
            println!("wrote {}", path.display());
            Ok(())
        }
    }
}

/// Wait for the passes triggered by the previous step and return the last one.
async fn settle(service: &mut ReminderService, debounce: Duration) -> anyhow::Result<PassReport> {
    let first = tokio::time::timeout(debounce + Duration::from_secs(5), service.next_report())
        .await
        .context("timed out waiting for a reconciliation pass")?
        .context("reminder service stopped")?;
    tokio::time::sleep(debounce * 2).await;
    let mut last = first;
    while let Some(report) = service.try_next_report() {
        last = report;
    }
    Ok(last)
}

async fn run_demo(config: PetCareConfig, owner: OwnerId, dump: bool) -> anyhow::Result<()> {
    println!("PetCare reminders v{}", env!("CARGO_PKG_VERSION"));
    let debounce = config.reminders.debounce();

    let reminders = Arc::new(InMemoryReminderStore::new());
    let data = DataLayer::new(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryBlobStore::new()),
        config.data.clone(),
    );
    let mut service = ReminderService::start(&data, reminders.clone(), &config.reminders);

    data.start_session(owner.clone()).await?;
    let pet_id = data
        .add_pet(
            NewPet {
                name: "Max".to_owned(),
                species: Species::Dog,
                breed: "Labrador".to_owned(),
                birth_date: "2020-06-01".to_owned(),
                ..NewPet::default()
            },
            Some("file:///demo/max.png"),
        )
        .await?;
    let in_three_days = (Utc::now() + chrono::Duration::days(3)).to_rfc3339();
    let appointment_id = data
        .add_appointment(NewAppointment {
            pet_id: pet_id.clone(),
            kind: AppointmentType::Vaccine,
            date_time: in_three_days,
            reminder_enabled: true,
            ..NewAppointment::default()
        })
        .await?;
    println!("signed in:     {}", settle(&mut service, debounce).await?.summary());

    let in_five_days = (Utc::now() + chrono::Duration::days(5)).to_rfc3339();
    data.update_appointment(
        &appointment_id,
        AppointmentPatch {
            date_time: Some(in_five_days),
            ..AppointmentPatch::default()
        },
    )
    .await?;
    println!("rescheduled:   {}", settle(&mut service, debounce).await?.summary());

    for reminder in reminders.notifications() {
        println!(
            "  {} [{}] {} at {}",
            reminder.identifier,
            reminder.title,
            reminder.body,
            reminder
                .trigger_at
                .map_or_else(|| "unknown".to_owned(), |t| t.to_rfc3339())
        );
    }

    data.update_appointment(
        &appointment_id,
        AppointmentPatch {
            reminder_enabled: Some(false),
            ..AppointmentPatch::default()
        },
    )
    .await?;
    println!("disabled:      {}", settle(&mut service, debounce).await?.summary());

    if dump {
        if let Some(snapshot) = data.snapshot() {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    data.end_session();
    tokio::time::sleep(debounce).await;
    println!(
        "signed out:    {} reminders outstanding",
        reminders.outstanding().len()
    );

    service.shutdown().await?;
    info!("demo finished");
    Ok(())
}
