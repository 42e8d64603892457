pub mod models {
    pub mod api;
}

pub mod cache;
pub mod client;
pub mod config;
pub mod db {
    pub mod models;
}
pub mod schema;
pub mod state;
pub mod services {
    pub mod catalog;
    pub mod demo;
    pub mod kpi;
    pub mod queries;
    pub mod routing;
    pub mod views;
}

use crate::client::{DirectionsClient, ImageStoreClient};
use crate::config::Config;
use crate::services::{demo, views};
use crate::state::{transition, Action, RequestState};
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};
use std::path::{Path, PathBuf};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug)]
pub struct Cli {
    env_file: Option<PathBuf>,
    page: String,
    bim: Option<String>,
    bims: Vec<String>,
}

fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    match conn.run_pending_migrations(MIGRATIONS) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("Database schema is up to date; no migrations were applied");
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} database migration(s): {}", applied.len(), names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying database migrations failed: {}", e)),
    }
}

fn action_from_cli(cli: &Cli) -> Result<Action, String> {
    match cli.page.as_str() {
        "home" => Ok(Action::OpenHome),
        "bim" => cli
            .bim
            .clone()
            .map(Action::OpenBim)
            .ok_or_else(|| "`--page bim` requires `--bim <key>`".to_string()),
        "route" => {
            if cli.bims.is_empty() {
                Err("`--page route` requires `--bims <k1,k2,...>`".to_string())
            } else {
                Ok(Action::PlanRoute(cli.bims.clone()))
            }
        }
        other => Err(format!("unknown page: {} (expected home, bim or route)", other)),
    }
}

pub fn run(cli: &Cli) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (cache_ttl={}s, directions={}, image_store={}, demo_seed={})",
        cfg.cache_ttl.as_secs(),
        cfg.directions_url,
        cfg.image_store_url.as_deref().unwrap_or("-"),
        cfg.demo_seed
    );

    // 2) Connect DB
    let mut conn = PgConnection::establish(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");

    // 3) Apply pending database migrations
    apply_database_migrations(&mut conn)?;

    // 4) Optional demo seed for an empty database
    if cfg.demo_seed {
        let seeded = demo::seed_if_empty(&mut conn)?;
        if seeded {
            info!("Demo data seeded");
        }
    }

    // 5) External collaborators (both optional to the page outcome)
    let directions = DirectionsClient::new(&cfg.directions_url);
    let images = cfg.image_store_url.as_deref().map(ImageStoreClient::new);

    // 6) Route the request and render the view model
    let action = action_from_cli(cli)?;
    let state = transition(&RequestState::default(), action);
    info!("Rendering page: {:?}", state.page);

    let cache = views::SnapshotCache::new(cfg.cache_ttl);
    let view = views::render(&mut conn, &cache, Some(&directions), images.as_ref(), &state.page);

    let rendered = serde_json::to_string_pretty(&view).map_err(|e| format!("serializing view failed: {}", e))?;
    println!("{}", rendered);
    Ok(())
}

fn parse_cli() -> Result<Cli, String> {
    let mut args = std::env::args();
    args.next(); // skip program name

    let mut cli = Cli {
        env_file: None,
        page: "home".to_string(),
        bim: None,
        bims: Vec::new(),
    };

    fn take_value(args: &mut std::env::Args, flag: &str) -> Result<String, String> {
        args.next().ok_or_else(|| format!("`{}` requires a value", flag))
    }

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--env-file" => {
                if cli.env_file.is_some() {
                    return Err("`--env-file` provided more than once".to_string());
                }
                cli.env_file = Some(PathBuf::from(take_value(&mut args, "--env-file")?));
            }
            "--page" => cli.page = take_value(&mut args, "--page")?,
            "--bim" => cli.bim = Some(take_value(&mut args, "--bim")?),
            "--bims" => {
                cli.bims = take_value(&mut args, "--bims")?
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            other => match other.split_once('=') {
                Some(("--env-file", v)) if !v.is_empty() => cli.env_file = Some(PathBuf::from(v)),
                Some(("--page", v)) => cli.page = v.to_string(),
                Some(("--bim", v)) => cli.bim = Some(v.to_string()),
                Some(("--bims", v)) => {
                    cli.bims = v
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                _ => return Err(format!("unrecognised argument: {}", other)),
            },
        }
    }
    Ok(cli)
}

/// Load `KEY=VALUE` assignments from an env file. Values already present in
/// the process environment win. Supports comments, `export ` prefixes and
/// simple single/double quoting.
fn load_env_file(path: &Path) -> Result<(), String> {
    let contents = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;

    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let assignment = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);
        let (key, raw_value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("{}:{}: missing '=' in assignment", path.display(), index + 1))?;
        let key = key.trim();
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(format!("{}:{}: invalid variable name {:?}", path.display(), index + 1, key));
        }

        let value = parse_env_value(raw_value)
            .map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?;
        if std::env::var_os(key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

fn parse_env_value(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed.strip_prefix(quote) {
            return match inner.rsplit_once(quote) {
                Some((value, rest)) if rest.trim().is_empty() || rest.trim_start().starts_with('#') => {
                    Ok(value.to_string())
                }
                Some(_) => Err("unexpected characters after closing quote".to_string()),
                None => Err("unterminated quoted value".to_string()),
            };
        }
    }
    // Unquoted: cut at an inline comment.
    Ok(trimmed.split('#').next().unwrap_or_default().trim_end().to_string())
}

fn main() {
    let cli = match parse_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Resolve env file before logging so RUST_LOG from .env is respected.
    let env_path = cli.env_file.clone().or_else(|| {
        let default_path = PathBuf::from(".env");
        default_path.is_file().then_some(default_path)
    });
    if let Some(path) = env_path.as_ref() {
        if let Err(err) = load_env_file(path) {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    }

    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(path) = env_path {
        info!("Environment loaded from {}", path.display());
    }

    info!(
        "bim-dashboard {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(&cli) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
