use std::process::{Command, Stdio};

use super::{Actuator, Signal};
use crate::config::Config;

/// Runs an operator-supplied shell hook per signal.
///
/// Hooks run through `/bin/sh -c` with `KEYLATCH_SIGNAL` set to the signal name.
/// The child is not waited on; a detached thread reaps it and logs a failing exit.
#[derive(Debug, Clone, Default)]
pub struct CommandActuator {
    pub on_valid: Option<String>,
    pub on_invalid: Option<String>,
    pub on_awaiting: Option<String>,
    pub on_supported: Option<String>,
    pub on_unsupported: Option<String>,
}

impl CommandActuator {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            on_valid: cfg.on_valid.clone(),
            on_invalid: cfg.on_invalid.clone(),
            on_awaiting: cfg.on_awaiting.clone(),
            on_supported: cfg.on_supported.clone(),
            on_unsupported: cfg.on_unsupported.clone(),
        }
    }

    pub fn hook(&self, signal: Signal) -> Option<&str> {
        match signal {
            Signal::CredentialValid => self.on_valid.as_deref(),
            Signal::CredentialInvalid => self.on_invalid.as_deref(),
            Signal::AwaitingInput => self.on_awaiting.as_deref(),
            Signal::DeviceSupported => self.on_supported.as_deref(),
            Signal::DeviceUnsupported => self.on_unsupported.as_deref(),
        }
    }
}

impl Actuator for CommandActuator {
    fn signal(&mut self, signal: Signal) {
        let Some(cmd) = self.hook(signal) else {
            return;
        };
        let spawned = Command::new("/bin/sh")
            .arg("-c")
            .arg(cmd)
            .env("KEYLATCH_SIGNAL", signal.as_str())
            .stdin(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(%signal, "cannot run hook: {e}");
                return;
            }
        };
        tracing::debug!(%signal, pid = child.id(), "hook started");
        std::thread::spawn(move || match child.wait() {
            Ok(status) if status.success() => {}
            Ok(status) => tracing::warn!(%signal, "hook exited with {status}"),
            Err(e) => tracing::warn!(%signal, "hook wait failed: {e}"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_hook_selection() {
        let act = CommandActuator {
            on_valid: Some("true".into()),
            ..Default::default()
        };
        assert_eq!(act.hook(Signal::CredentialValid), Some("true"));
        assert_eq!(act.hook(Signal::CredentialInvalid), None);
    }

    #[test]
    fn test_hook_receives_signal_name() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("signal");
        let mut act = CommandActuator {
            on_awaiting: Some(format!("printf %s \"$KEYLATCH_SIGNAL\" > '{}'", out.display())),
            ..Default::default()
        };
        act.signal(Signal::AwaitingInput);

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if std::fs::read_to_string(&out).is_ok_and(|s| s == "awaiting_input") {
                return;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("hook did not write {}", out.display());
    }
}
