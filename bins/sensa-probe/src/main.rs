//! Consumer process: finds the hub's region directory, attaches a reader to
//! each configured stream and prints what it sees until the hub goes away.
//!
//! ```bash
//! cargo run -p sensa-probe -- [config.toml]
//! ```

use anyhow::{Context, Result, ensure};
use sensa_config::SensaConfig;
use sensa_events::{ConsumerType, LightData, MotionData, OrientationData};
use sensa_fetcher::RegionDirectory;
use sensa_icc::{Reader, SharedMemoryHandle};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SAMPLE_PERIOD: Duration = Duration::from_millis(200);
const DIRECTORY_WAIT: Duration = Duration::from_secs(10);

enum Probe {
    Motion(Reader<MotionData>),
    Orientation(Reader<OrientationData>),
    Light(Reader<LightData>),
}

impl Probe {
    fn attach(handle: &SharedMemoryHandle, retry_limit: usize) -> sensa_icc::Result<Self> {
        Ok(match handle.consumer_type() {
            ConsumerType::Motion => {
                Probe::Motion(Reader::attach(handle)?.with_retry_limit(retry_limit))
            }
            ConsumerType::Orientation | ConsumerType::OrientationAbsolute => {
                Probe::Orientation(Reader::attach(handle)?.with_retry_limit(retry_limit))
            }
            ConsumerType::Light => {
                Probe::Light(Reader::attach(handle)?.with_retry_limit(retry_limit))
            }
        })
    }

    fn handle(&self) -> &SharedMemoryHandle {
        match self {
            Probe::Motion(r) => r.handle(),
            Probe::Orientation(r) => r.handle(),
            Probe::Light(r) => r.handle(),
        }
    }

    fn contention_misses(&self) -> u64 {
        match self {
            Probe::Motion(r) => r.contention_misses(),
            Probe::Orientation(r) => r.contention_misses(),
            Probe::Light(r) => r.contention_misses(),
        }
    }

    /// One formatted reading, or `None` if the writer kept the buffer busy.
    fn sample(&mut self) -> Option<String> {
        let consumer = self.handle().consumer_type();
        let line = match self {
            Probe::Motion(r) => format_motion(&r.latest()?),
            Probe::Orientation(r) => format_orientation(&r.latest()?),
            Probe::Light(r) => format_light(&r.latest()?),
        };
        Some(format!("{consumer:<20} {line}"))
    }
}

fn format_motion(m: &MotionData) -> String {
    if !m.has_acceleration() {
        return "no data".to_string();
    }
    format!(
        "accel [{:+.3} {:+.3} {:+.3}] gravity_z {:+.3} rot [{:+.2} {:+.2} {:+.2}] @{}ms",
        m.acceleration_x,
        m.acceleration_y,
        m.acceleration_z,
        m.acceleration_including_gravity_z,
        m.rotation_rate_alpha,
        m.rotation_rate_beta,
        m.rotation_rate_gamma,
        m.interval_ms
    )
}

fn format_orientation(o: &OrientationData) -> String {
    if !o.is_complete() {
        return "no data".to_string();
    }
    format!(
        "alpha {:7.2} beta {:+7.2} gamma {:+7.2}{}",
        o.alpha,
        o.beta,
        o.gamma,
        if o.is_absolute() { " (absolute)" } else { "" }
    )
}

fn format_light(l: &LightData) -> String {
    format!("{:.1} lux", l.lux)
}

fn wait_for_directory(path: &Path) -> Result<RegionDirectory> {
    let deadline = Instant::now() + DIRECTORY_WAIT;
    loop {
        match RegionDirectory::load(path) {
            Ok(directory) => return Ok(directory),
            Err(e) if Instant::now() >= deadline => {
                return Err(e).with_context(|| format!("no region directory at {}", path.display()));
            }
            Err(_) => std::thread::sleep(Duration::from_millis(100)),
        }
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
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let config = load_config()?;
    init_tracing(&config.log_level);

    let directory = wait_for_directory(&config.descriptor_path)?;
    info!(producer = directory.producer_pid, "found region directory");

    let mut probes = Vec::new();
    for consumer in config.consumer_types()? {
        let Some(desc) = directory.find(consumer) else {
            warn!(%consumer, "not published by the hub");
            continue;
        };
        let handle = SharedMemoryHandle::from_descriptor(desc.clone());
        match Probe::attach(&handle, config.read_retry_limit) {
            Ok(probe) => probes.push(probe),
            Err(e) => warn!(%consumer, error = %e, "could not attach"),
        }
    }
    ensure!(!probes.is_empty(), "no stream to attach to");

    loop {
        if probes.iter().any(|p| !p.handle().is_valid()) {
            info!("hub went away");
            break;
        }
        for probe in &mut probes {
            if let Some(line) = probe.sample() {
                println!("{line}");
            }
        }
        std::thread::sleep(SAMPLE_PERIOD);
    }

    for probe in &probes {
        info!(
            consumer = %probe.handle().consumer_type(),
            misses = probe.contention_misses(),
            "detached"
        );
    }
    Ok(())
}
