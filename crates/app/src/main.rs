use std::fmt;
use std::sync::Arc;

use services::{AppServices, Clock};
use stars_core::{ContentProvider, StaticCatalog};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::Terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCatalogPath { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCatalogPath { raw } => write!(f, "invalid --catalog value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--db <sqlite_url>] [--catalog <path.json>] [--memory]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:stars.sqlite3");
    eprintln!("  --catalog <built-in sample catalog>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STARS_DB_URL, STARS_CATALOG, RUST_LOG");
}

#[derive(Debug, PartialEq, Eq)]
enum Backend {
    Sqlite(String),
    Memory,
}

#[derive(Debug)]
struct Args {
    backend: Backend,
    catalog: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var("STARS_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://stars.sqlite3".into(), normalize_sqlite_url);
        let mut catalog = std::env::var("STARS_CATALOG")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut memory = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => {
                    let value = require_value(args, "--catalog")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidCatalogPath { raw: value });
                    }
                    catalog = Some(value);
                }
                "--memory" => memory = true,
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let backend = if memory {
            Backend::Memory
        } else {
            Backend::Sqlite(db_url)
        };
        Ok(Some(Self { backend, catalog }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_catalog(path: Option<&str>) -> Result<Arc<dyn ContentProvider>, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            StaticCatalog::from_json(&json)?
        }
        None => StaticCatalog::sample()?,
    };
    tracing::info!(
        source = path.unwrap_or("built-in"),
        questions = catalog.question_count(),
        "catalog loaded"
    );
    Ok(Arc::new(catalog))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let Some(parsed) = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    let catalog = load_catalog(parsed.catalog.as_deref())?;
    let clock = Clock::system();

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let services = match &parsed.backend {
        Backend::Memory => AppServices::in_memory(catalog, clock),
        Backend::Sqlite(db_url) => {
            prepare_sqlite_file(db_url)?;
            AppServices::new_sqlite(db_url, catalog, clock).await?
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    Terminal::new(stdin.lock(), stdout.lock())
        .run(&services)
        .await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn memory_flag_selects_in_memory_backend() {
        let args = parse(&["--memory", "--catalog", "content.json"]).unwrap().unwrap();
        assert_eq!(args.backend, Backend::Memory);
        assert_eq!(args.catalog.as_deref(), Some("content.json"));
    }

    #[test]
    fn db_flag_is_normalized() {
        let args = parse(&["--db", "sqlite:/tmp/stars.db"]).unwrap().unwrap();
        assert_eq!(args.backend, Backend::Sqlite("sqlite:///tmp/stars.db".into()));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            parse(&["--catalog", " "]),
            Err(ArgsError::InvalidCatalogPath { .. })
        ));
        assert!(matches!(parse(&["--bogus"]), Err(ArgsError::UnknownArg(_))));
        assert!(parse(&["--help"]).unwrap().is_none());
    }

    #[test]
    fn memory_url_is_left_alone() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://nope").is_err());
    }
}
