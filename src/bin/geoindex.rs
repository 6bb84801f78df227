//! GeoIndex command-line tool
//!
//! Loads a range table into the index and answers lookups against it.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use geoindex::{Config, Endpoint, GeoIndex, NumericPolicy, QueryMode};
use geoindex::config::ConfigBuilder;
use tracing_subscriber::{fmt, EnvFilter};

/// GeoIndex
#[derive(Parser, Debug)]
#[command(name = "geoindex")]
#[command(about = "IP-range to country index with paged range queries")]
#[command(version)]
struct Args {
    /// TOML config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store endpoint: "memory" or a data directory
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Keyspace name
    #[arg(short, long)]
    keyspace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bulk load a range table
    Load {
        /// Source CSV file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Rows per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Worker threads
        #[arg(short, long)]
        workers: Option<usize>,

        /// Store 0 for unparsable numbers instead of rejecting the row
        #[arg(long)]
        zero_fill: bool,

        /// Drop existing entries before loading
        #[arg(long)]
        truncate: bool,

        /// Rewrite the WAL down to the loaded contents afterwards
        #[arg(long)]
        compact: bool,
    },

    /// Find the range containing a value
    Query {
        /// Address as a number or dotted quad
        value: String,

        /// First start number to scan from
        #[arg(short, long)]
        anchor: Option<i64>,
    },

    /// List ranges starting at or after a value
    Scan {
        /// Address as a number or dotted quad
        from: String,

        /// Maximum entries to print
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,geoindex=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> geoindex::Result<()> {
    let base = match &args.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };

    let mut builder = ConfigBuilder::from_config(base);
    if let Some(endpoint) = &args.endpoint {
        builder = builder.endpoint(endpoint.parse::<Endpoint>()?);
    }
    if let Some(keyspace) = &args.keyspace {
        builder = builder.keyspace(keyspace);
    }

    match args.command {
        Commands::Load {
            file,
            batch_size,
            workers,
            zero_fill,
            truncate,
            compact,
        } => {
            if let Some(file) = file {
                builder = builder.source_file(file);
            }
            if let Some(size) = batch_size {
                builder = builder.batch_size(size);
            }
            if let Some(count) = workers {
                builder = builder.worker_count(count);
            }
            if zero_fill {
                builder = builder.numeric_policy(NumericPolicy::ZeroFill);
            }

            let index = GeoIndex::open(builder.build())?;
            index.bootstrap()?;
            if truncate {
                index.truncate()?;
            }

            let report = index.load_source()?;
            for failure in &report.failures {
                if let Some(e) = &failure.error {
                    println!("batch {} ({} rows) failed: {}", failure.batch_id, failure.rows, e);
                }
            }
            for rejected in &report.rejected {
                println!("rejected: {}", rejected);
            }
            println!(
                "Inserted a total of {} over duration ms: {}",
                report.total_inserted,
                report.elapsed.as_millis()
            );

            if compact {
                index.compact()?;
            }
            index.close()
        }

        Commands::Query { value, anchor } => {
            let lookup = parse_address(&value)?;
            if let Some(anchor) = anchor {
                builder = builder.scan_anchor(anchor);
            }

            let index = GeoIndex::open(builder.build())?;
            match index.lookup(lookup)? {
                Some(entry) => println!("{}", entry.value),
                None => println!("not found"),
            }
            index.close()
        }

        Commands::Scan { from, limit } => {
            let from = parse_address(&from)?;

            let index = GeoIndex::open(builder.build())?;
            for entry in index.query(from, QueryMode::StartAtLeast).take(limit) {
                let entry = entry?;
                println!("{} {} {}", entry.key.start, entry.key.end, entry.value);
            }
            index.close()
        }
    }
}

/// Accept either the numeric form or a dotted IPv4 address
fn parse_address(input: &str) -> geoindex::Result<i64> {
    let input = input.trim();
    if let Ok(number) = input.parse::<i64>() {
        return Ok(number);
    }
    input
        .parse::<Ipv4Addr>()
        .map(|addr| i64::from(u32::from(addr)))
        .map_err(|_| {
            geoindex::GeoError::Config(format!("{:?} is neither a number nor an IPv4 address", input))
        })
}
