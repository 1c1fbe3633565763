//! VolWatch — live storage-volume monitor.
//!
//! Thin binary entry point. All tracking logic lives in the
//! `volwatch-core` crate; this frontend wires the Windows volume source
//! to a polling tracker and prints each lifecycle event as it fires.

fn main() -> anyhow::Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    run()
}

#[cfg(windows)]
fn run() -> anyhow::Result<()> {
    use std::sync::Arc;
    use volwatch_core::platform::WindowsVolumeSource;
    use volwatch_core::{SnapshotSource, TriggerConfig, VolumeEvent, VolumeTracker};

    let options = Options::parse(std::env::args().skip(1))?;

    let source: Arc<dyn SnapshotSource> = Arc::new(WindowsVolumeSource);
    let tracker = VolumeTracker::new(
        source,
        TriggerConfig::Polling {
            interval: options.interval,
        },
    );

    for volume in tracker.volumes() {
        println!("{} {}", stamp(), volume);
    }

    let json = options.json;
    tracker.subscribe(move |event: &VolumeEvent| {
        if json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "failed to serialise event"),
            }
        } else {
            println!("{} [{}] {}", stamp(), event.kind(), event.record());
        }
    });

    tracker
        .set_enabled(true)
        .map_err(|e| anyhow::anyhow!("cannot start watching: {e}"))?;
    tracing::info!(
        "watching volumes every {} ms — press Enter to stop",
        options.interval.as_millis()
    );

    // Block until Enter or stdin EOF, then tear down cleanly.
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
    tracker.release();

    Ok(())
}

#[cfg(windows)]
fn stamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

#[cfg(windows)]
struct Options {
    interval: std::time::Duration,
    json: bool,
}

#[cfg(windows)]
impl Options {
    /// `volwatch [INTERVAL_MS] [--json]`
    fn parse(args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut options = Options {
            interval: std::time::Duration::from_millis(2000),
            json: false,
        };
        for arg in args {
            match arg.as_str() {
                "--json" => options.json = true,
                "--help" | "-h" => {
                    println!("usage: volwatch [INTERVAL_MS] [--json]");
                    std::process::exit(0);
                }
                value => {
                    let ms: u64 = value
                        .parse()
                        .map_err(|_| anyhow::anyhow!("unrecognised argument: {value}"))?;
                    anyhow::ensure!(ms > 0, "polling interval must be positive");
                    options.interval = std::time::Duration::from_millis(ms);
                }
            }
        }
        Ok(options)
    }
}

#[cfg(not(windows))]
fn run() -> anyhow::Result<()> {
    anyhow::bail!(
        "volwatch needs a Windows host for volume enumeration; \
         the volwatch-core engine itself is portable"
    )
}
