//! mudlink - terminal client for MUD servers behind a WebSocket proxy
//!
//! Frames the raw byte stream into lines, renders ANSI color, and tracks the
//! player's position on a room map while they walk around.

mod ansi;
mod client;
mod config;
mod core;
mod framer;
mod frontend;
mod map_data;
mod map_index;
mod network;
mod protocol;
mod text;

use anyhow::Result;
use clap::{Parser as ClapParser, Subcommand};
use frontend::Frontend;
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "mudlink")]
#[command(about = "Terminal MUD client with room tracking", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// WebSocket URL of the game proxy (overrides config)
    #[arg(short, long)]
    url: Option<String>,

    /// Map dataset to load (overrides config)
    #[arg(short, long, value_name = "FILE")]
    map: Option<PathBuf>,

    /// Custom data directory (default: ~/.mudlink)
    /// Can also be set via MUDLINK_DIR environment variable
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a map dataset and print index statistics
    CheckMap {
        /// Map file to check (default: configured map)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Log to a file so stdout stays clean for game output
    // (use RUST_LOG env var to control level, e.g. RUST_LOG=debug)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("mudlink.log")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    if let Some(data_dir) = &cli.data_dir {
        std::env::set_var(config::DIR_ENV, data_dir);
        tracing::info!("Using custom data directory: {:?}", data_dir);
    } else if let Ok(env_dir) = std::env::var(config::DIR_ENV) {
        tracing::info!("Using data directory from {}: {}", config::DIR_ENV, env_dir);
    }

    let mut config = if let Some(config_path) = &cli.config {
        config::Config::load_from_path(config_path)?
    } else {
        config::Config::load()?
    };
    if let Some(url) = cli.url {
        config.connection.url = url;
    }
    if let Some(map) = cli.map {
        config.map.enabled = true;
        config.map.path = map;
    }

    if let Some(command) = cli.command {
        match command {
            Commands::CheckMap { file } => {
                let path = match file {
                    Some(path) => path,
                    None => config.map_path()?,
                };
                check_map(&path);
                return Ok(());
            }
        }
    }

    run(config)
}

/// Print what the resolver would see for a dataset; exits 1 when it can't load
fn check_map(path: &std::path::Path) {
    println!("Checking map file: {:?}", path);
    let map = match map_data::MapData::load(path) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("✗ Failed to load map: {}", e);
            std::process::exit(1);
        }
    };
    let resolver = map_index::RoomResolver::new(map);
    let summary = resolver.map().summary();

    println!("✓ Map loaded successfully");
    println!(
        "  {} areas, {} rooms on {} levels, {} labels",
        summary.areas, summary.rooms, summary.levels, summary.labels
    );
    for area in resolver.map().areas() {
        let levels: Vec<String> = area
            .levels
            .iter()
            .map(|(level, count)| format!("{}:{}", level, count))
            .collect();
        match area.extent() {
            Some([min_x, min_y, max_x, max_y]) => println!(
                "  area {}: levels [{}], extent ({}, {})..({}, {})",
                area.id,
                levels.join(" "),
                min_x,
                min_y,
                max_x,
                max_y
            ),
            None => println!("  area {}: empty", area.id),
        }
    }

    let stats = resolver.index().stats();
    println!(
        "  names: {} keys ({} ambiguous)",
        stats.names, stats.ambiguous_names
    );
    println!(
        "  descriptions: {} keys ({} ambiguous)",
        stats.descriptions, stats.ambiguous_descriptions
    );
    println!(
        "  exits: {} keys ({} ambiguous)",
        stats.exit_keys, stats.ambiguous_exit_keys
    );
    println!("  one-way exits: {}", summary.one_way_exits);

    if stats.ambiguous_exit_keys > 0 {
        println!(
            "⚠ {} room signature(s) resolve to the first of several rooms",
            stats.ambiguous_exit_keys
        );
    }
    if summary.dangling_exits > 0 {
        println!("⚠ {} exit(s) lead to rooms not in the map", summary.dangling_exits);
    }
    if summary.duplicate_room_ids > 0 {
        println!(
            "⚠ {} room id(s) appear more than once; lookups by id use the first",
            summary.duplicate_room_ids
        );
    }
    if summary.bad_label_images > 0 {
        println!("⚠ {} label image(s) failed to decode", summary.bad_label_images);
    }
}

/// Load the configured map; a missing or broken map disables tracking
fn load_resolver(config: &config::Config) -> (Option<map_index::RoomResolver>, Option<String>) {
    if !config.map.enabled {
        tracing::info!("Map tracking disabled");
        return (None, None);
    }

    let path = match config.map_path() {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("Could not resolve map path: {}", e);
            return (None, Some(format!("Map unavailable: {}", e)));
        }
    };

    match map_data::MapData::load(&path) {
        Ok(map) => {
            tracing::info!("Loaded map {:?} with {} rooms", path, map.room_count());
            (Some(map_index::RoomResolver::new(map)), None)
        }
        Err(e) => {
            tracing::warn!("Map unavailable: {}", e);
            (None, Some(format!("Map unavailable: {}", e)))
        }
    }
}

fn run(config: config::Config) -> Result<()> {
    // Use tokio runtime for async network I/O
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_run(config))
}

/// Async main loop: transport, framer timer and stdin
async fn async_run(config: config::Config) -> Result<()> {
    use crate::core::Session;
    use client::{Client, Link};
    use framer::StreamFramer;
    use frontend::{ConsoleFrontend, FrontendEvent};
    use tokio::io::AsyncBufReadExt;
    use tokio::sync::mpsc;
    use tokio::time::{sleep_until, Instant};

    let (resolver, map_warning) = load_resolver(&config);
    let session = Session::new(&config, resolver)?;
    let framer = StreamFramer::with_settings(
        config.framer.flush_delay(),
        config.framer.prompts.clone(),
        config.framer.tick_glyphs.clone(),
    );
    let mut frontend = ConsoleFrontend::new(
        std::io::stdout(),
        config.ui.show_timestamps,
        config.ui.announce_location,
    );

    // Stdin reader task
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<FrontendEvent>();
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if input_tx.send(FrontendEvent::from_input(&line)).is_err() {
                return;
            }
        }
        let _ = input_tx.send(FrontendEvent::Quit);
    });

    let mut client = Client::new(
        session,
        framer,
        config.connection.url.clone(),
        Box::new(Link::open),
    );

    if let Some(warning) = map_warning {
        frontend.apply(&client.session.system(&warning))?;
    }

    loop {
        let deadline = client.flush_deadline();

        let events = tokio::select! {
            msg = client.link_mut().recv() => client.on_server(msg, Instant::now()),
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                client.on_flush(Instant::now())
            }
            input = input_rx.recv() => {
                match client.on_input(input.unwrap_or(FrontendEvent::Quit)) {
                    Some(events) => events,
                    None => break,
                }
            }
        };
        frontend.apply(&events)?;
    }

    client.shutdown();
    frontend.cleanup()?;
    tracing::info!("Exiting");
    Ok(())
}
