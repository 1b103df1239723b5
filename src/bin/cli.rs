//! handlestore CLI
//!
//! Command-line interface over a local handlestore directory.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use handlestore::config::TOPIC_GOLD;
use handlestore::{Config, Manager, OpenManager, Result, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// handlestore CLI
#[derive(Parser, Debug)]
#[command(name = "handlestore")]
#[command(about = "Local on-disk resource store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./handlestore_data")]
    data_dir: PathBuf,

    /// Directory permission bits (octal)
    #[arg(long, default_value = "775", value_parser = parse_mode)]
    dir_mode: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the data directory and its topics
    Init,

    /// Adopt an existing file into a topic by hard link
    Add {
        /// Topic to add the file to
        #[arg(short, long, default_value = TOPIC_GOLD)]
        topic: String,

        /// Name to store the file under (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,

        /// File to adopt
        file: PathBuf,
    },

    /// Write a stored file to stdout
    Cat {
        /// Topic to read from
        #[arg(short, long, default_value = TOPIC_GOLD)]
        topic: String,

        /// Name of the stored file
        name: String,
    },

    /// Copy stdin into a scoped temporary file and report its size
    Scratch {
        /// Prefix for the temporary file name
        #[arg(short, long, default_value = "scratch")]
        prefix: String,
    },
}

fn parse_mode(s: &str) -> std::result::Result<u32, String> {
    u32::from_str_radix(s, 8).map_err(|e| format!("invalid octal mode {:?}: {}", s, e))
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,handlestore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("handlestore v{}", handlestore::VERSION);
    tracing::debug!("Data directory: {}", args.data_dir.display());

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .dir_mode(args.dir_mode)
        .build();

    let mut store = match Store::open(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&store, args.command);

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
    }

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(store: &Store, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            let topics: Vec<&str> = store.topics().collect();
            tracing::info!("Store ready at {} ({})", store.base().display(), topics.join(", "));
            Ok(())
        }

        Commands::Add { topic, name, file } => {
            let name = match name {
                Some(n) => n,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };

            let mut manager = store.permanent(&topic)?;
            let (_, release) = manager.add(&file, &name)?;
            tracing::info!("Added {} to {} as {}", file.display(), topic, name);
            release.release();
            manager.close()
        }

        Commands::Cat { topic, name } => {
            let mut manager = store.permanent(&topic)?;
            let (mut handle, release) = manager.open(&name)?;

            let mut stdout = io::stdout().lock();
            io::copy(&mut handle, &mut stdout)?;
            stdout.flush()?;

            release.release();
            manager.close()
        }

        Commands::Scratch { prefix } => {
            let scope = store.temporary_dir("cli-")?;
            let (mut handle, release) = scope.create(&prefix)?;

            let size = io::copy(&mut io::stdin().lock(), &mut handle)?;
            handle.flush()?;

            println!("{}", size);
            tracing::debug!("Scratch file #{} held {} bytes", release.key(), size);

            release.release();
            scope.exit()
        }
    }
}
