mod axis;
mod config;
mod contact;
mod device;
mod display;
mod dump;
mod error;
mod event;
mod input;
mod mapping;
mod orientation;
mod relay;
mod sink;
mod ssh;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use clap::Parser;

use axis::StreamKind;
use config::{Cli, Command, Config};
use device::DeviceProfile;
use display::{MonitorProvider, SharedRect, WaylandOutputs};
use input::{StreamError, Target};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(2);

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(msg) = config.validate() {
        eprintln!("Error: {}", msg);
        std::process::exit(1);
    }

    let profile = match config.device {
        Some(model) => model.profile(),
        None => {
            let session = ssh::connect(&config)?;
            DeviceProfile::detect_via_ssh(&session)?
        }
    };

    if let Some(Command::Dump { device }) = &cli.command {
        return dump::run_dump(device, &config, profile);
    }

    let layout = config.layout(&WaylandOutputs);
    let destination = layout.select(config.monitor, config.region)?;
    let target = Target {
        desktop: layout.bounds(config.region),
        destination: SharedRect::new(destination),
    };

    log::info!(
        "rm-mouse starting (host={}, device={}, pen={}, touch={}, output={:?}, destination={})",
        config.host,
        profile.name,
        if config.run_pen() { "on" } else { "off" },
        if config.run_touch() { "on" } else { "off" },
        config.output,
        destination
    );

    let stop = Arc::new(AtomicBool::new(false));
    let failed = Arc::new(AtomicBool::new(false));

    let mut handles = Vec::new();
    for (stream, enabled) in [
        (StreamKind::Pen, config.run_pen()),
        (StreamKind::Touch, config.run_touch()),
    ] {
        if !enabled {
            continue;
        }
        let config = config.clone();
        let target = target.clone();
        let stop = stop.clone();
        let failed = failed.clone();
        handles.push(thread::spawn(move || {
            supervise(stream, &config, profile, &target, &stop, &failed)
        }));
    }

    {
        let destination = target.destination.clone();
        let stop = stop.clone();
        // Not joined: it only ever reads the config file.
        thread::spawn(move || watch_destination(&cli, &destination, &stop));
    }

    for handle in handles {
        if handle.join().is_err() {
            failed.store(true, Ordering::Relaxed);
        }
    }

    if failed.load(Ordering::Relaxed) {
        return Err("a stream failed".into());
    }
    Ok(())
}

/// Keep one stream running, reconnecting after the tablet goes away.
fn supervise(
    stream: StreamKind,
    config: &Config,
    profile: &DeviceProfile,
    target: &Target,
    stop: &AtomicBool,
    failed: &AtomicBool,
) {
    while !stop.load(Ordering::Relaxed) {
        log::info!("[{}] thread starting…", stream);
        match input::run_stream(stream, config, profile, target, stop) {
            Ok(()) => return,
            Err(StreamError::Fatal(e)) => {
                log::error!("[{}] cannot create input device: {}", stream, e);
                failed.store(true, Ordering::Relaxed);
                stop.store(true, Ordering::Relaxed);
                return;
            }
            Err(StreamError::Disconnected(e)) => {
                log::error!("[{}] {}", stream, e);
                if !config.reconnect {
                    failed.store(true, Ordering::Relaxed);
                    stop.store(true, Ordering::Relaxed);
                    return;
                }
            }
        }
        log::warn!("[{}] disconnected, reconnecting in 2s…", stream);
        thread::sleep(RECONNECT_DELAY);
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Re-select the destination whenever the config file changes, so editing
/// `monitor` or `region` moves the mapping without restarting the streams.
fn watch_destination(cli: &Cli, destination: &SharedRect, stop: &AtomicBool) {
    let Ok(Some(path)) = Config::source_path(cli) else {
        return;
    };
    let mut last = modified(&path);

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(CONFIG_POLL_INTERVAL);
        let now = modified(&path);
        if now == last {
            continue;
        }
        last = now;

        reload_destination(cli, &WaylandOutputs, destination);
    }
}

/// Re-read the config and move `destination`; on any error the old one stays.
fn reload_destination(cli: &Cli, provider: &dyn MonitorProvider, destination: &SharedRect) {
    let selected = Config::load(cli)
        .and_then(|config| config.layout(provider).select(config.monitor, config.region));
    match selected {
        Ok(rect) if rect != destination.get() => {
            log::info!("Destination changed to {}", rect);
            destination.set(rect);
        }
        Ok(_) => {}
        Err(e) => log::warn!("Keeping destination {}: {}", destination.get(), e),
    }
}
