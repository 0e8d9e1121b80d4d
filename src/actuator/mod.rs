pub mod command;

pub use command::CommandActuator;

use std::fmt;

/// Notifications for the lock and indicator hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    CredentialValid,
    CredentialInvalid,
    AwaitingInput,
    DeviceSupported,
    DeviceUnsupported,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CredentialValid => "credential_valid",
            Self::CredentialInvalid => "credential_invalid",
            Self::AwaitingInput => "awaiting_input",
            Self::DeviceSupported => "device_supported",
            Self::DeviceUnsupported => "device_unsupported",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of fire-and-forget signals. Implementations must return promptly.
pub trait Actuator {
    fn signal(&mut self, signal: Signal);
}

/// Logs every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActuator;

impl Actuator for TracingActuator {
    fn signal(&mut self, signal: Signal) {
        match signal {
            Signal::CredentialValid => tracing::info!("access granted"),
            Signal::CredentialInvalid => tracing::warn!("access denied"),
            Signal::AwaitingInput => tracing::info!("awaiting input"),
            Signal::DeviceSupported => tracing::info!("token supported"),
            Signal::DeviceUnsupported => tracing::warn!("token not supported"),
        }
    }
}

/// Records signals in order.
impl Actuator for Vec<Signal> {
    fn signal(&mut self, signal: Signal) {
        self.push(signal);
    }
}

impl<A: Actuator, B: Actuator> Actuator for (A, B) {
    fn signal(&mut self, signal: Signal) {
        self.0.signal(signal);
        self.1.signal(signal);
    }
}
