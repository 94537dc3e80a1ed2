use clap::Parser;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use pcap::{Activated, Capture};
use probemark::{FrameWalker, SharedAggregator, TagRegistry};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{CaptureSettings, Config};

mod capture;
mod config;
mod report;

#[derive(Parser)]
struct Cli {
    /// TOML configuration file
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Read probe requests from one or more capture files
    File {
        #[clap(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Debug, Default)]
struct FileStats {
    packets: u64,
    probes: u64,
    randomized: u64,
    incomplete: u64,
    errors: u64,
}

fn read_file(
    path: &Path,
    settings: &CaptureSettings,
    walker: &FrameWalker,
    aggregator: &SharedAggregator,
) -> Result<FileStats> {
    let mut pcap: Capture<dyn Activated> = Capture::from_file(path)?.into();
    let mut stats = FileStats::default();

    loop {
        let p = match pcap.next_packet() {
            Err(pcap::Error::NoMorePackets) => break,
            x => x?,
        };
        stats.packets += 1;

        let probe = match capture::handle_packet(p.data, settings.fcs) {
            Ok(Some(x)) => x,
            Ok(None) => continue,
            Err(e) => {
                debug!("packet {}: {e}", stats.packets);
                stats.errors += 1;
                continue;
            }
        };
        stats.probes += 1;

        if capture::is_randomized(&probe.source) {
            stats.randomized += 1;
            if settings.skip_randomized {
                continue;
            }
        }

        let walk = walker.walk(probe.body);
        for issue in &walk.issues {
            debug!("{}: {issue}", capture::format_mac(&probe.source));
        }
        if walk.fingerprint.incomplete {
            stats.incomplete += 1;
        }
        aggregator.add_fingerprint(walk.fingerprint);
    }

    Ok(stats)
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config);

    let registry = TagRegistry::new();
    let aggregator = SharedAggregator::new();

    match cli.command {
        Command::File { paths } => {
            let results: Vec<Result<FileStats>> = std::thread::scope(|s| {
                let handles: Vec<_> = paths
                    .iter()
                    .map(|path| {
                        let walker = FrameWalker::new(&registry);
                        let aggregator = aggregator.clone();
                        let settings = &config.capture;
                        s.spawn(move || read_file(path, settings, &walker, &aggregator))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or_else(|_| Err(anyhow!("reader thread panicked"))))
                    .collect()
            });

            for (path, result) in paths.iter().zip(results) {
                let stats = result.with_context(|| format!("reading {}", path.display()))?;
                info!(
                    "{}: {} packets, {} probe requests ({} randomized, {} incomplete), {} unreadable",
                    path.display(),
                    stats.packets,
                    stats.probes,
                    stats.randomized,
                    stats.incomplete,
                    stats.errors
                );
            }
        }
    }

    let text = aggregator.read(|agg| report::render(agg, &registry, &config.report));
    print!("{text}");

    Ok(())
}
