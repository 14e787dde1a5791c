#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::pedantic
)]
#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions, clippy::similar_names)]

use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use zephyrmq::{implementations::postgres::migrate as run_migrations, tokio, tracing, CONFIG};

mod config;
mod healthcheck;
mod serve;
mod wait_for_db;

pub(crate) use config::CONFIG_BIN;
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply embedded database migrations.
    Migrate {},
    /// Wait for the database to become reachable (and optionally migrated).
    WaitForDB {
        #[clap(
            default_value = "false",
            short = 'd',
            help = "Test the DB connection, requires database_url to be set."
        )]
        check_db: bool,
        #[clap(
            default_value = "false",
            short = 'm',
            help = "Check migrations are applied, implies -d."
        )]
        check_migrations: bool,
        #[clap(
            default_value_t = 15,
            long,
            short,
            help = "Number of retries before giving up."
        )]
        retries: u32,
        #[clap(
            default_value_t = 2,
            long,
            short,
            help = "Delay in seconds between retries."
        )]
        backoff: u64,
    },
    /// Run the HTTP server. The database must already be migrated.
    Serve {
        #[clap(
            default_value = "true",
            short = 'f',
            long = "force-start",
            help = "Start even if the database is not yet reachable or migrated."
        )]
        force_start: bool,
    },
    /// Check the health of the service.
    Healthcheck {
        #[clap(
            default_value = "false",
            short = 'a',
            help = "Check everything, implies -d and -s."
        )]
        check_all: bool,
        #[clap(
            default_value = "false",
            short = 'd',
            help = "Only check the database connection.",
            conflicts_with("check_all")
        )]
        check_db: bool,
        #[clap(
            default_value = "false",
            short = 's',
            help = "Only check the HTTP listener.",
            conflicts_with("check_all")
        )]
        check_server: bool,
    },
    /// Print the version of the server.
    Version {},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_file(CONFIG_BIN.debug.extended_logs)
        .with_line_number(CONFIG_BIN.debug.extended_logs)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match cli.command {
        Some(Commands::WaitForDB {
            check_db,
            check_migrations,
            retries,
            backoff,
        }) => {
            let check_db = check_db || check_migrations;
            wait_for_db::wait_for_db(check_migrations, retries, backoff, check_db).await?;
        }
        Some(Commands::Migrate {}) => {
            print_info();
            migrate().await?;
        }
        Some(Commands::Serve { force_start }) => {
            print_info();
            serve_and_maybe_migrate(force_start).await?;
        }
        Some(Commands::Healthcheck {
            check_all,
            mut check_db,
            mut check_server,
        }) => {
            check_db |= check_all;
            check_server |= check_all;
            healthcheck::health(check_db, check_server).await?;
        }
        Some(Commands::Version {}) => {
            println!("{VERSION}");
        }
        None => {
            if CONFIG_BIN.debug.auto_serve {
                print_info();
                serve_and_maybe_migrate(true).await?;
            } else {
                eprintln!("No subcommand provided. Use --help for more information.");
                anyhow::bail!("No subcommand provided");
            }
        }
    }

    Ok(())
}

async fn serve_and_maybe_migrate(force_start: bool) -> anyhow::Result<()> {
    if CONFIG_BIN.debug.migrate_before_serve {
        wait_for_db::wait_for_db(false, 15, 2, true).await?;
        migrate().await?;
    }
    run_serve(force_start).await
}

async fn migrate() -> anyhow::Result<()> {
    println!("Migrating database...");
    let pool = zephyrmq::implementations::postgres::connect_pool(
        &CONFIG.database_url,
        CONFIG.pg_max_connections,
        std::time::Duration::from_secs(CONFIG.pg_acquire_timeout_seconds),
    )
    .await?;
    run_migrations(&pool).await?;
    println!("Database migration complete.");
    Ok(())
}

async fn run_serve(force_start: bool) -> anyhow::Result<()> {
    tracing::info!("Starting server on {}...", CONFIG.bind_address);
    let bind_addr: std::net::SocketAddr = CONFIG.bind_address.parse()?;
    if !force_start {
        wait_for_db::wait_for_db(true, 0, 0, true).await?;
    }
    serve::serve(bind_addr).await
}

fn print_info() {
    println!("zephyrmq {VERSION}");
    tracing::info!("zephyrmq version: {VERSION}");
}
