use std::path::Path;

use crate::config::Config;

pub fn check(cfg: &Config) -> anyhow::Result<()> {
    let mut errors: Vec<String> = Vec::new();

    // Check 1: registry directory writable
    let registry = cfg.registry_path()?;
    if let Some(dir) = registry.parent().filter(|d| !d.as_os_str().is_empty()) {
        match std::fs::create_dir_all(dir).and_then(|_| std::fs::metadata(dir)) {
            Ok(meta) if meta.permissions().readonly() => errors.push(format!(
                "registry directory {} is read-only",
                dir.display()
            )),
            Ok(_) => {}
            Err(e) => errors.push(format!(
                "cannot create registry directory {}: {e}",
                dir.display()
            )),
        }
    }

    // Check 2: hidraw node reachable (the token itself may be plugged in later)
    match cfg.hidraw.parent() {
        Some(dir) if dir.is_dir() => {
            match std::fs::File::open(&cfg.hidraw) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => errors.push(format!(
                    "cannot open {}: {e}\n  \
                     → install a udev rule granting read access to the token's hidraw node",
                    cfg.hidraw.display()
                )),
            }
        }
        _ => errors.push(format!("no directory for hidraw node {}", cfg.hidraw.display())),
    }
    if !cfg.sysfs_root.is_dir() {
        errors.push(format!("sysfs root {} does not exist", cfg.sysfs_root.display()));
    }

    // Check 3: shell for actuator hooks
    if cfg.has_hooks() && !Path::new("/bin/sh").exists() {
        errors.push("actuator hooks configured but /bin/sh is missing".into());
    }

    if errors.is_empty() {
        return Ok(());
    }

    for err in &errors {
        eprintln!("ERROR: {err}");
    }
    anyhow::bail!("{} preflight check(s) failed", errors.len());
}
