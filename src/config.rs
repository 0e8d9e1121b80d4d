use std::path::PathBuf;

/// Longest input accepted before delivery is forced.
pub const MAX_INPUT_LEN: usize = 200;
pub const HMAC_KEY_LEN: usize = 20;
pub const DEFAULT_COUNTER_TOLERANCE: u8 = 20;
/// Character the translator emits for Enter; terminates one typed credential.
pub const END_OF_INPUT: u8 = 0x13;

pub const DEVICE_START_PTR: usize = 0x0000;
pub const KEY_START_PTR: usize = 0x0002;
pub const DEFAULT_REGISTRY_SIZE: usize = 1024;

pub const DEVICE_POLL_MILLIS: u64 = 500;

#[derive(clap::Parser, Debug, Clone)]
#[command(name = "keylatch", version, about)]
pub struct Config {
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Registry image [default: <XDG data dir>/keylatch/registry.bin]
    #[arg(long)]
    pub registry: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_REGISTRY_SIZE)]
    pub registry_size: usize,
    #[arg(long, default_value = "/dev/hidraw0")]
    pub hidraw: PathBuf,
    #[arg(long, default_value = "/sys/class/hidraw")]
    pub sysfs_root: PathBuf,
    /// Accept tokens that are not listed in the device registry.
    #[arg(long)]
    pub allow_any_device: bool,
    /// Shell command run when a credential matches (e.g. pulse the lock relay).
    #[arg(long, value_name = "CMD")]
    pub on_valid: Option<String>,
    #[arg(long, value_name = "CMD")]
    pub on_invalid: Option<String>,
    #[arg(long, value_name = "CMD")]
    pub on_awaiting: Option<String>,
    #[arg(long, value_name = "CMD")]
    pub on_supported: Option<String>,
    #[arg(long, value_name = "CMD")]
    pub on_unsupported: Option<String>,
    /// Rebuild the registry from a JSON manifest, then exit.
    #[arg(long, value_name = "MANIFEST")]
    pub provision: Option<PathBuf>,
    /// Print registered devices and keys, then exit.
    #[arg(long)]
    pub list: bool,
    /// Print the registry as a JSON manifest accepted by --provision, then exit.
    #[arg(long)]
    pub export: bool,
    /// Erase the registry, then exit.
    #[arg(long)]
    pub wipe: bool,
}

impl Config {
    pub fn registry_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.registry {
            return Ok(path.clone());
        }
        let data_dir = directories::ProjectDirs::from("", "", "keylatch")
            .ok_or_else(|| anyhow::anyhow!("cannot determine XDG data dir"))?
            .data_dir()
            .to_path_buf();
        Ok(data_dir.join("registry.bin"))
    }

    pub fn has_hooks(&self) -> bool {
        [
            &self.on_valid,
            &self.on_invalid,
            &self.on_awaiting,
            &self.on_supported,
            &self.on_unsupported,
        ]
        .iter()
        .any(|hook| hook.is_some())
    }
}
