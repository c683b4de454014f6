//! cohort: command-line frontend for the FHIR cohort client.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cohort_client::{ClientConfig, Collector, FhirClient, SearchParams};
use cohort_core::Patient;

#[derive(Parser)]
#[command(
    name = "cohort",
    about = "Collect and manage patient cohorts on a FHIR R4 server",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// FHIR server base URL (falls back to FHIR_SERVER_URL, then the public HAPI server).
    #[arg(long, global = true)]
    server: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for patients and collect a bounded cohort.
    Search {
        /// Name to search for (partial match).
        #[arg(long)]
        name: Option<String>,
        /// Gender to filter by.
        #[arg(long)]
        gender: Option<String>,
        /// Birth date filter with optional FHIR prefix (e.g. ge1990-01-01).
        #[arg(long)]
        birthdate: Option<String>,
        /// Page size hint for the server (_count).
        #[arg(long)]
        page_size: Option<u32>,
        /// Stop after collecting this many patients.
        #[arg(long, default_value_t = 10)]
        max: usize,
        /// Keep only patients with at least one encounter.
        #[arg(long)]
        only_with_encounters: bool,
    },

    /// Read a single patient by id.
    Read {
        /// The patient's id on the server.
        id: String,
    },

    /// Create a patient with a single name.
    Create {
        /// Family name.
        #[arg(long)]
        family: String,
        /// Given name.
        #[arg(long)]
        given: String,
    },

    /// Add a home phone number to an existing patient.
    Update {
        /// The patient's id on the server.
        id: String,
        /// Phone number to append to the contact set.
        #[arg(long)]
        phone: String,
    },

    /// Delete a patient by id.
    Delete {
        /// The patient's id on the server.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let client = build_client(cli.server.as_deref(), cli.timeout_secs)?;

    match cli.command {
        Commands::Search {
            name,
            gender,
            birthdate,
            page_size,
            max,
            only_with_encounters,
        } => {
            run_search(
                client,
                name.as_deref(),
                gender.as_deref(),
                birthdate.as_deref(),
                page_size,
                max,
                only_with_encounters,
            )
            .await?;
        }
        Commands::Read { id } => {
            let patient = client.read(&id).await?;
            print_patient(&patient);
        }
        Commands::Create { family, given } => {
            let created = client.create(&Patient::new(&family, &given)).await?;
            match created.id.as_deref() {
                Some(id) => println!("Created Patient/{id}"),
                None => println!("Created patient (server returned no id)"),
            }
        }
        Commands::Update { id, phone } => {
            let mut patient = client.read(&id).await?;
            patient.add_phone(&phone);
            let updated = client.update(&patient).await?;
            println!("Updated Patient/{id}");
            print_patient(&updated);
        }
        Commands::Delete { id } => {
            client.delete(&id).await?;
            println!("Deleted Patient/{id}");
        }
    }

    Ok(())
}

fn build_client(server: Option<&str>, timeout_secs: u64) -> Result<FhirClient> {
    let config = match server {
        Some(url) => ClientConfig::new(url)?,
        None => ClientConfig::from_env()?,
    };
    let config = config.with_timeout(Duration::from_secs(timeout_secs));
    tracing::debug!(server = %config.base_url, "Using FHIR server");
    Ok(FhirClient::new(config)?)
}

async fn run_search(
    client: FhirClient,
    name: Option<&str>,
    gender: Option<&str>,
    birthdate: Option<&str>,
    page_size: Option<u32>,
    max: usize,
    only_with_encounters: bool,
) -> Result<()> {
    let mut params = SearchParams::new();
    if let Some(name) = name {
        params = params.with_name(name);
    }
    if let Some(gender) = gender {
        params = params.with_gender(gender);
    }
    if let Some(birthdate) = birthdate {
        params = params.with_birthdate(birthdate);
    }
    if let Some(count) = page_size {
        params = params.with_count(count);
    }

    let collector = Collector::new(client);
    let patients = collector.collect(&params, max, only_with_encounters).await?;

    if patients.is_empty() {
        println!("No matching patients");
        return Ok(());
    }
    for patient in &patients {
        print_patient(patient);
    }
    println!("Collected {} patient(s)", patients.len());
    Ok(())
}

fn print_patient(patient: &Patient) {
    let id = patient.id.as_deref().unwrap_or("(no id)");
    let mut line = format!("{id}  {}", patient.display_name());
    if let Some(gender) = &patient.gender {
        line.push_str(&format!("  {gender}"));
    }
    if let Some(birth_date) = &patient.birth_date {
        line.push_str(&format!("  born {birth_date}"));
    }
    println!("{line}");
    for contact in &patient.telecom {
        if let (Some(system), Some(value)) = (&contact.system, &contact.value) {
            println!("    {system}: {value}");
        }
    }
}
