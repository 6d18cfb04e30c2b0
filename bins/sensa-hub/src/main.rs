//! Producer process: hosts the lifecycle manager over the simulated sensors,
//! publishes the region directory and takes start/stop commands on stdin.
//!
//! ```bash
//! cargo run -p sensa-hub -- [config.toml]
//! ```

use anyhow::{Context, Result};
use sensa_config::SensaConfig;
use sensa_events::ConsumerType;
use sensa_fetcher::{ConsumerLifecycleManager, RegionDirectory};
use sensa_sim::SimulatedProducer;
use std::io::BufRead;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq)]
enum Command {
    Start(ConsumerType),
    Stop(ConsumerType),
    Status,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let cmd = match (words.next()?, words.next()) {
            ("start", Some(name)) => Command::Start(ConsumerType::from_name(name)?),
            ("stop", Some(name)) => Command::Stop(ConsumerType::from_name(name)?),
            ("status", None) => Command::Status,
            ("quit" | "exit", None) => Command::Quit,
            _ => return None,
        };
        words.next().is_none().then_some(cmd)
    }
}

fn load_config() -> Result<SensaConfig> {
    match std::env::args().nth(1) {
        Some(path) => SensaConfig::load(&path).with_context(|| format!("loading {path}")),
        None => Ok(SensaConfig::default()),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

fn main() -> Result<()> {
    let config = load_config()?;
    init_tracing(&config.log_level);

    let mut sim = SimulatedProducer::new(config.poll_interval());
    for consumer in config.absent_types()? {
        sim = sim.without(consumer);
    }
    let mut manager = ConsumerLifecycleManager::new(Box::new(sim), config.fetcher_config());

    let mut directory = RegionDirectory::new(std::process::id());
    for consumer in ConsumerType::ALL {
        let handle = manager
            .buffer_handle(consumer)
            .with_context(|| format!("creating the {consumer} region"))?;
        directory.insert(handle.descriptor());
    }
    directory
        .publish(&config.descriptor_path)
        .with_context(|| format!("writing {}", config.descriptor_path.display()))?;
    info!(
        path = %config.descriptor_path.display(),
        regions = directory.regions.len(),
        "published region directory"
    );

    for consumer in config.consumer_types()? {
        if let Err(e) = manager.start_fetching(consumer) {
            warn!(%consumer, error = %e, "could not start");
        }
    }

    info!("commands: start <type> | stop <type> | status | quit");
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result = match Command::parse(&line) {
            Some(Command::Start(consumer)) => manager.start_fetching(consumer),
            Some(Command::Stop(consumer)) => manager.stop_fetching(consumer),
            Some(Command::Status) => {
                let started = manager.started_consumers();
                info!(
                    ?started,
                    polling = manager.polling_thread_running(),
                    "status"
                );
                Ok(())
            }
            Some(Command::Quit) => break,
            None => {
                warn!(%line, "unknown command");
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "command failed");
        }
    }

    manager.shutdown();
    drop(manager);
    if let Err(e) = std::fs::remove_file(&config.descriptor_path) {
        warn!(error = %e, "could not remove region directory");
    }
    info!("hub stopped");
    Ok(())
}
