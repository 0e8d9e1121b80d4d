pub mod actuator;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hid;
pub mod session;
pub mod store;
pub mod verify;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use actuator::{CommandActuator, TracingActuator};
use store::{FileNvram, Manifest, Nvram, Registry};

pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .init();
}

fn lock_path(registry: &Path) -> PathBuf {
    let mut name = registry.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn open_lock(path: &Path) -> error::Result<fd_lock::RwLock<File>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    Ok(fd_lock::RwLock::new(file))
}

fn open_registry(cfg: &config::Config, path: &Path) -> error::Result<Registry<FileNvram>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let nvram = FileNvram::open(path, cfg.registry_size)?;
    Ok(Registry::new(nvram))
}

/// Runs `f` on the registry while holding its lock. The image is not opened until the
/// lock is held.
fn with_registry<T>(
    cfg: &config::Config,
    f: impl FnOnce(&mut Registry<FileNvram>) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let path = cfg.registry_path()?;
    let lock_path = lock_path(&path);
    let mut lock = open_lock(&lock_path)?;
    let _guard = lock
        .try_write()
        .map_err(|_| anyhow::anyhow!("registry is in use (lock: {})", lock_path.display()))?;
    let mut registry = open_registry(cfg, &path)?;
    f(&mut registry)
}

pub fn wipe(cfg: &config::Config) -> anyhow::Result<()> {
    with_registry(cfg, |registry| {
        registry.wipe()?;
        println!("Registry {} erased", cfg.registry_path()?.display());
        Ok(())
    })
}

pub fn provision(cfg: &config::Config, manifest: &Path) -> anyhow::Result<()> {
    let manifest = Manifest::load(manifest)
        .map_err(|e| anyhow::anyhow!("cannot load {}: {e}", manifest.display()))?;
    let (devices, keys) = manifest.to_records()?;
    with_registry(cfg, |registry| {
        let summary = registry.provision(&devices, &keys)?;
        println!(
            "Provisioned {} device(s) and {} key(s), {} ignored, {} of {} bytes used",
            summary.devices,
            summary.keys,
            summary.skipped,
            summary.bytes_used,
            registry.nvram().capacity(),
        );
        Ok(())
    })
}

/// Prints the registry contents. Key material is shown by length only.
pub fn list(cfg: &config::Config, out: &mut impl Write) -> anyhow::Result<()> {
    let path = cfg.registry_path()?;
    let registry = open_registry(cfg, &path)?;
    list_registry(&registry, out)
}

/// Writes the registry as a JSON manifest that `provision` accepts.
pub fn export(cfg: &config::Config, out: &mut impl Write) -> anyhow::Result<()> {
    let path = cfg.registry_path()?;
    let registry = open_registry(cfg, &path)?;
    writeln!(out, "{}", export_registry(&registry)?.to_json()?)?;
    Ok(())
}

/// Collects every readable record. Unreadable ones are logged and left out.
pub fn export_registry<N: Nvram>(registry: &Registry<N>) -> anyhow::Result<Manifest> {
    let mut devices = Vec::new();
    for entry in registry.devices()? {
        match entry {
            Ok(e) => devices.push(e.record),
            Err(err) => tracing::warn!("device record not exported: {err}"),
        }
    }
    let mut keys = Vec::new();
    for entry in registry.keys()? {
        match entry {
            Ok(e) => keys.push(e.record),
            Err(err) => tracing::warn!("key record not exported: {err}"),
        }
    }
    Ok(Manifest::from_records(&devices, &keys)?)
}

pub fn list_registry<N: Nvram>(
    registry: &Registry<N>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !registry.is_provisioned()? {
        writeln!(out, "registry is not provisioned")?;
        return Ok(());
    }

    writeln!(out, "devices ({}):", registry.read_device_count()?)?;
    for entry in registry.devices()? {
        match entry {
            Ok(e) => writeln!(
                out,
                "  #{:<3} @{:#06x}  vid={:04x} pid={:04x}  {:?}",
                e.index, e.addr, e.record.vid, e.record.pid, e.record.name
            )?,
            Err(err) => writeln!(out, "  unreadable: {err}")?,
        }
    }

    writeln!(out, "keys ({}):", registry.read_key_count()?)?;
    for entry in registry.keys()? {
        match entry {
            Ok(e) => {
                let key = &e.record;
                writeln!(
                    out,
                    "  #{:<3} @{:#06x}  {:<11} {:<8} serial={}B key={}B counter={} tolerance={}",
                    e.index,
                    e.addr,
                    format!("{:?}", key.kind()).to_lowercase(),
                    if key.enabled() { "enabled" } else { "disabled" },
                    key.serial.len(),
                    key.key.len(),
                    key.counter,
                    key.counter_tolerance,
                )?
            }
            Err(err) => writeln!(out, "  unreadable: {err}")?,
        }
    }
    Ok(())
}

/// Runtime for the daemon. Events are handled one at a time on this thread; only the
/// HID reader runs on the blocking pool.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

pub async fn run(cfg: config::Config) -> anyhow::Result<()> {
    tracing::info!("Starting keylatch");

    // Preflight checks
    diagnostics::check(&cfg)?;

    // Single-instance lock, taken before the image is opened
    let path = cfg.registry_path()?;
    let lock_path = lock_path(&path);
    let mut lock = open_lock(&lock_path)?;
    let _guard = lock
        .try_write()
        .map_err(|_| anyhow::anyhow!("keylatch is already running (lock: {})", lock_path.display()))?;
    let registry = open_registry(&cfg, &path)?;

    if !registry.is_provisioned()? {
        tracing::warn!(path = %path.display(), "registry is empty, run with --provision first");
    }
    tracing::info!(
        devices = registry.read_device_count()?,
        keys = registry.read_key_count()?,
        "registry loaded"
    );

    let actuator = (TracingActuator, CommandActuator::from_config(&cfg));
    let session = session::Session::new(registry, actuator).allow_any_device(cfg.allow_any_device);

    let transport = hid::start_hid_transport(cfg.hidraw.clone(), cfg.sysfs_root.clone());
    session::run_session_loop(transport.events_rx, session).await;
    match transport.task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(error::Error::from(e).into()),
        Err(e) => return Err(anyhow::anyhow!("HID transport panicked: {e}")),
    }
    Ok(())
}
