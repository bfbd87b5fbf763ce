//! Classbook CLI - a thin command-line driver over `classbook-core`.
//!
//! Sign in, list cached collections and download the teaching report
//! without a browser.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use classbook_core::api::ExportParams;
use classbook_core::models::total_periods;
use classbook_core::{Classbook, Config, Resource, ScopeParams};

/// Set to `1` to also write logs to a daily file in the cache directory.
const ENV_LOG_FILE: &str = "CLASSBOOK_LOG_FILE";

const LOG_FILE_PREFIX: &str = "classbook.log";

const DEFAULT_PAGE_SIZE: u32 = 20;

const USAGE: &str = "\
Usage: classbook <command> [args]

Commands:
  login [email]                        Sign in and store the session
  logout                               End the session
  whoami                               Show the signed-in user
  list <resource> [year] [page] [limit]
                                       List classes, teachers, subjects, weeks or teaching-records
  export <year> [teacher-id] [out]     Download the teaching report";

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). The returned guard must
/// stay alive for the file writer to flush.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = match std::env::var(ENV_LOG_FILE) {
        Ok(v) if v == "1" => config.cache_dir().ok(),
        _ => None,
    };
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = Config::load()?;
    let _guard = init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let classbook = Classbook::open(&config)?;
    classbook.on_session_expired(|notice| {
        eprintln!("\n{}", notice.message);
        if let Some(context) = &notice.conflicting_context {
            eprintln!("Reason: {}", context);
        }
        eprintln!(
            "Your session was ended. Sign in again within {}s.",
            notice.countdown.as_secs()
        );
    });

    info!(command = %command, "Classbook CLI starting");

    match command.as_str() {
        "login" => login(&classbook, &mut config, args.get(1).cloned()).await,
        "logout" => {
            classbook.logout().await?;
            println!("Signed out.");
            Ok(())
        }
        "whoami" => whoami(&classbook).await,
        "list" => list(&classbook, &args[1..]).await,
        "export" => export(&classbook, &args[1..]).await,
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

async fn login(classbook: &Classbook, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", email))
        .context("Failed to read password")?;

    let user = classbook.login(&email, &password).await?;

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {} ({})", user.display_name(), user.role);
    Ok(())
}

async fn whoami(classbook: &Classbook) -> Result<()> {
    if !classbook.session().is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    let user = classbook.current_user().await?;
    println!("{} <{}> [{}]", user.display_name(), user.email, user.role);
    Ok(())
}

async fn list(classbook: &Classbook, args: &[String]) -> Result<()> {
    let name = args
        .first()
        .ok_or_else(|| anyhow!("Missing resource\n\n{}", USAGE))?;
    let resource =
        Resource::from_name(name).ok_or_else(|| anyhow!("Unknown resource '{}'", name))?;

    let mut scope = ScopeParams::new();
    if let Some(year) = args.get(1) {
        scope = scope.school_year(year.as_str());
    }
    let page = parse_number(args.get(2), 1, "page")?;
    let limit = parse_number(args.get(3), DEFAULT_PAGE_SIZE, "limit")?;
    scope = scope.page(page, limit);

    if resource == Resource::TeachingRecords {
        let records = classbook.teaching_records(scope).await?;
        for record in records.iter() {
            println!("{}", serde_json::to_string(record)?);
        }
        println!("Total periods on this page: {}", total_periods(records.iter()));
        print_pagination(&records.pagination, records.len());
        return Ok(());
    }

    let records = classbook.list::<serde_json::Value>(resource, scope).await?;
    for record in records.iter() {
        println!("{}", record);
    }
    print_pagination(&records.pagination, records.len());
    Ok(())
}

async fn export(classbook: &Classbook, args: &[String]) -> Result<()> {
    let year = args
        .first()
        .ok_or_else(|| anyhow!("Missing school year\n\n{}", USAGE))?;
    let mut params = ExportParams::new(year.as_str());
    if let Some(teacher) = args.get(1).filter(|t| !t.is_empty()) {
        params = params.teacher(teacher.as_str());
    }

    let file = classbook.export_teaching_report(&params).await?;
    let out = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&file.filename));
    std::fs::write(&out, &file.bytes)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("Saved {} ({} bytes)", out.display(), file.bytes.len());
    Ok(())
}

fn print_pagination(pagination: &Option<classbook_core::Pagination>, shown: usize) {
    match pagination {
        Some(p) => println!(
            "Page {}/{} ({} of {} records)",
            p.page, p.total_pages, shown, p.total
        ),
        None => println!("{} records", shown),
    }
}

fn parse_number(arg: Option<&String>, default: u32, what: &str) -> Result<u32> {
    match arg {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid {} '{}'", what, raw)),
        None => Ok(default),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("No input given");
    }
    Ok(value)
}
