//! Replays a JSON-lines capture through the CQL trackers
//!
//! Every traced record is written to stdout as one JSON object per line.
//! Logs go to stderr; `RUST_LOG` overrides the configured level.

mod capture;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wiretap_protocols::cql::Cql;
use wiretap_protocols::{Role, TrackerConfig, TrackerRegistry};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Client,
    Server,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Client => Role::Client,
            RoleArg::Server => Role::Server,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Capture file, or "-" for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Tracker configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which end of each connection the traced process is
    #[arg(short, long, value_enum, default_value_t = RoleArg::Client)]
    role: RoleArg,
}

fn open_input(input: &str) -> Result<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("Failed to open capture {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = TrackerConfig::load(args.config.as_deref())
        .context("Failed to load tracker configuration")?;

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    info!("Replaying capture: {}", args.input);
    let mut registry: TrackerRegistry<Cql> = TrackerRegistry::new(config, args.role.into());
    let mut out = BufWriter::new(io::stdout().lock());
    let mut error_count = 0usize;
    let mut last_ts = 0u64;

    for event in capture::read_events(open_input(&args.input)?) {
        let event = event?;
        registry.add_data(event.conn_id, event.direction, &event.data, event.timestamp_ns);
        last_ts = last_ts.max(event.timestamp_ns);

        let result = registry.poll(last_ts);
        error_count += result.error_count;
        for record in &result.records {
            serde_json::to_writer(&mut out, record).context("Failed to write record")?;
            out.write_all(b"\n")?;
        }
    }

    let discarded = registry.close_all();
    out.flush()?;

    let stats = registry.stats();
    if error_count > 0 || discarded > 0 {
        warn!(error_count, discarded, "Capture contained untraceable frames");
    }
    info!(
        connections = stats.closed_connections,
        records = stats.totals.records,
        bytes = stats.totals.bytes_received,
        "Replay complete"
    );
    Ok(())
}
