use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use clinic_core::config::{
    appointment_minutes_from_env_value, clinic_hours_from_env_values, database_url_from_env_value,
};
use clinic_core::models::PatientFilter;
use clinic_core::{db, Clinic, CoreConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic management administration CLI")]
struct Cli {
    /// Database URL (defaults to `DATABASE_URL`, then `sqlite://clinic.db`)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create the first administrator account
    CreateAdmin {
        first_name: String,
        last_name: String,
        email: String,
        /// Initial password (at least 8 characters)
        #[arg(long)]
        password: String,
    },
    /// List patients
    Patients {
        /// Match against names and national id
        #[arg(long)]
        search: Option<String>,
        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Export reports
    Report {
        #[command(subcommand)]
        report: Report,
    },
}

#[derive(Subcommand)]
enum Report {
    /// Appointments in a date range as CSV
    Appointments {
        /// First day (YYYY-MM-DD), inclusive
        #[arg(long)]
        from: NaiveDate,
        /// Last day (YYYY-MM-DD), inclusive
        #[arg(long)]
        to: NaiveDate,
        /// Output file (defaults to stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let database_url =
        database_url_from_env_value(cli.database_url.or_else(|| std::env::var("DATABASE_URL").ok()));

    match cli.command {
        Some(command) => run(command, &database_url).await,
        None => {
            println!("Use 'clinic --help' for commands");
            Ok(())
        }
    }
}

/// Build the clinic services for `database_url`, migrating the schema first.
async fn open_clinic(database_url: &str) -> anyhow::Result<Clinic> {
    let hours = clinic_hours_from_env_values(
        std::env::var("CLINIC_OPENS_AT").ok(),
        std::env::var("CLINIC_CLOSES_AT").ok(),
        std::env::var("CLINIC_WORKING_DAYS").ok(),
    )?;
    let minutes = appointment_minutes_from_env_value(std::env::var("APPOINTMENT_MINUTES").ok())?;
    let cfg = CoreConfig::new(database_url.to_string(), hours, minutes)?;

    let pool = db::connect_and_migrate(database_url)
        .await
        .with_context(|| format!("failed to open database {database_url}"))?;
    Ok(Clinic::new(pool, Arc::new(cfg)))
}

async fn run(command: Commands, database_url: &str) -> anyhow::Result<()> {
    let clinic = open_clinic(database_url).await?;

    match command {
        Commands::Migrate => {
            println!("Database is up to date");
        }
        Commands::CreateAdmin {
            first_name,
            last_name,
            email,
            password,
        } => {
            let admin = clinic
                .employees
                .bootstrap_admin(&first_name, &last_name, &email, &password)
                .await?;
            println!("Created administrator {} (ID: {})", admin.email, admin.id);
        }
        Commands::Patients { search, page } => {
            let page = clinic.page_request(Some(page), Some(clinic.config().max_page_size()));
            let patients = clinic
                .patients
                .search(
                    &PatientFilter {
                        search,
                        active: None,
                    },
                    page,
                )
                .await?;
            if patients.items.is_empty() {
                println!("No patients found.");
            } else {
                for patient in &patients.items {
                    println!(
                        "ID: {}, Name: {}, National ID: {}, Born: {}{}",
                        patient.id,
                        patient.full_name(),
                        patient.national_id,
                        patient.birth_date,
                        if patient.active { "" } else { " (inactive)" }
                    );
                }
                let page_size = i64::from(patients.page_size);
                let pages = (patients.total + page_size - 1) / page_size;
                if pages > 1 {
                    println!(
                        "Page {} of {} ({} patients); use --page for more",
                        patients.page, pages, patients.total
                    );
                }
            }
        }
        Commands::Report {
            report: Report::Appointments { from, to, out },
        } => {
            // `out` is only touched once the report has been built.
            let csv = clinic.reports.appointments_csv(from, to).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Wrote appointment report to {}", path.display());
                }
                None => std::io::stdout().write_all(&csv)?,
            }
            tracing::debug!(bytes = csv.len(), "appointment export finished");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_url(dir: &tempfile::TempDir) -> String {
        format!("sqlite://{}", dir.path().join("clinic.db").display())
    }

    #[test]
    fn parses_report_arguments() {
        let cli = Cli::try_parse_from([
            "clinic",
            "report",
            "appointments",
            "--from",
            "2099-06-01",
            "--to",
            "2099-06-30",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Report {
                report: Report::Appointments { from, to, out },
            }) => {
                assert_eq!(from.to_string(), "2099-06-01");
                assert_eq!(to.to_string(), "2099-06-30");
                assert!(out.is_none());
            }
            _ => panic!("expected report command"),
        }

        assert!(Cli::try_parse_from(["clinic", "report", "appointments", "--from", "soon"]).is_err());
    }

    #[test]
    fn patients_listing_is_paged() {
        let cli = Cli::try_parse_from(["clinic", "patients", "--search", "smith", "--page", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Patients { page: 3, search: Some(ref s) }) if s == "smith"
        ));

        let cli = Cli::try_parse_from(["clinic", "patients"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Patients { page: 1, search: None })));
    }

    #[tokio::test]
    async fn create_admin_only_once() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let url = db_url(&dir);

        run(Commands::Migrate, &url).await.unwrap();
        let create = || Commands::CreateAdmin {
            first_name: "Ada".into(),
            last_name: "Admin".into(),
            email: "admin@clinic.org".into(),
            password: "password123".into(),
        };
        run(create(), &url).await.unwrap();
        assert!(run(create(), &url).await.is_err());
    }

    #[tokio::test]
    async fn report_is_written_to_file() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let url = db_url(&dir);
        let out = dir.path().join("appointments.csv");

        run(
            Commands::Report {
                report: Report::Appointments {
                    from: NaiveDate::from_ymd_opt(2099, 6, 1).unwrap(),
                    to: NaiveDate::from_ymd_opt(2099, 6, 30).unwrap(),
                    out: Some(out.clone()),
                },
            },
            &url,
        )
        .await
        .unwrap();

        let csv = std::fs::read_to_string(out).unwrap();
        assert!(csv.starts_with("id,starts_at,ends_at,status"));
    }

    #[tokio::test]
    async fn inverted_report_range_leaves_existing_file_alone() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let url = db_url(&dir);
        let out = dir.path().join("keep.csv");
        std::fs::write(&out, "previous export\n").unwrap();

        let result = run(
            Commands::Report {
                report: Report::Appointments {
                    from: NaiveDate::from_ymd_opt(2099, 6, 30).unwrap(),
                    to: NaiveDate::from_ymd_opt(2099, 6, 1).unwrap(),
                    out: Some(out.clone()),
                },
            },
            &url,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(out).unwrap(), "previous export\n");
    }
}
