use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roombook::catalog::{default_rooms, RoomCatalog, RoomFilter, StaticCatalog};
use roombook::clock::SystemClock;
use roombook::config::Config;
use roombook::model::{Amenity, BookingId, BookingRequest, Instant, RoomId};
use roombook::persistence::JsonFileStore;
use roombook::{observability, sweeper, BookingManager};

/// Conference room bookings.
#[derive(Debug, Parser)]
#[command(name = "roombook", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the room catalog.
    Rooms,
    /// Active rooms free for a whole time range.
    Available {
        #[arg(long)]
        start: Instant,
        #[arg(long)]
        end: Instant,
        #[arg(long)]
        min_capacity: Option<u32>,
        /// Required amenity; repeat for more.
        #[arg(long = "amenity", value_parser = parse_amenity)]
        amenities: Vec<Amenity>,
    },
    /// Book a room.
    Book {
        #[arg(long)]
        room: String,
        #[arg(long)]
        start: Instant,
        #[arg(long)]
        end: Instant,
    },
    /// Move a booking to a new time range.
    Reschedule {
        id: BookingId,
        #[arg(long)]
        start: Instant,
        #[arg(long)]
        end: Instant,
    },
    Cancel { id: BookingId },
    Complete { id: BookingId },
    Delete { id: BookingId },
    /// All bookings, by start time.
    List,
    Show { id: BookingId },
    /// Free windows of one room inside a time range.
    Free {
        #[arg(long)]
        room: String,
        #[arg(long)]
        start: Instant,
        #[arg(long)]
        end: Instant,
    },
    /// Run until SIGTERM/ctrl-c, completing ended bookings and serving metrics.
    Run,
}

fn parse_amenity(s: &str) -> Result<Amenity, String> {
    Amenity::ALL
        .iter()
        .copied()
        .find(|a| format!("{a:?}").eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown amenity {s:?}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let catalog: Arc<dyn RoomCatalog> = match &config.catalog_file {
        Some(path) => Arc::new(StaticCatalog::load_json(path)?),
        None => Arc::new(StaticCatalog::new(default_rooms())?),
    };
    let persistence = Arc::new(JsonFileStore::new(config.data_file.clone()));
    let manager = BookingManager::open(catalog, persistence, Arc::new(SystemClock)).await?;

    match command {
        Command::Rooms => print(&manager.rooms()),
        Command::Available {
            start,
            end,
            min_capacity,
            amenities,
        } => {
            let filter = RoomFilter {
                min_capacity,
                amenities: amenities.into_iter().collect(),
            };
            print(&manager.find_available_rooms(start, end, &filter).await?)
        }
        Command::Book { room, start, end } => {
            let booking = manager.create_booking(BookingRequest::new(room, start, end)).await?;
            manager.sync_persistence().await;
            print(&booking)
        }
        Command::Reschedule { id, start, end } => {
            let booking = manager.update_booking(id, start, end).await?;
            manager.sync_persistence().await;
            print(&booking)
        }
        Command::Cancel { id } => {
            let booking = manager.cancel_booking(id).await?;
            manager.sync_persistence().await;
            print(&booking)
        }
        Command::Complete { id } => {
            let booking = manager.complete_booking(id).await?;
            manager.sync_persistence().await;
            print(&booking)
        }
        Command::Delete { id } => {
            let booking = manager.delete_booking(id).await?;
            manager.sync_persistence().await;
            print(&booking)
        }
        Command::List => print(&manager.get_bookings()),
        Command::Show { id } => print(&manager.get_booking_by_id(id)?),
        Command::Free { room, start, end } => print(&manager.free_windows(&RoomId::from(room), start, end).await?),
        Command::Run => serve(manager, &config).await,
    }
}

fn print<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn serve(manager: BookingManager, config: &Config) -> Result<(), Box<dyn Error>> {
    observability::init(config.metrics_port)?;
    let manager = Arc::new(manager);

    info!("roombook running");
    info!("  data_file: {}", config.data_file.display());
    info!("  rooms: {}", manager.rooms().len());
    info!("  bookings: {}", manager.get_bookings().len());
    info!("  sweep_interval: {}s", config.sweep_interval.as_secs());
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let sweep_task = tokio::spawn(sweeper::run_sweeper(manager.clone(), config.sweep_interval));

    // Graceful shutdown on SIGTERM/ctrl-c.
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    info!("shutdown signal received, stopping sweeper");
    sweep_task.abort();
    let _ = sweep_task.await;

    info!("flushing bookings...");
    manager.sync_persistence().await;
    info!("roombook stopped");
    Ok(())
}
