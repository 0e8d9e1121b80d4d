pub mod accumulator;
pub mod dispatch;

pub use accumulator::KeystrokeAccumulator;
pub use dispatch::run_session_loop;

use crate::actuator::{Actuator, Signal};
use crate::hid::{DeviceInfo, HidEvent, LockState, decode_report, oem_to_ascii};
use crate::store::{Nvram, Registry, StoreError};
use crate::verify::{Verdict, verify};

/// State of the token currently plugged in, and everything needed to judge it.
pub struct Session<N, A> {
    registry: Registry<N>,
    actuator: A,
    accumulator: KeystrokeAccumulator,
    locks: LockState,
    device: Option<DeviceInfo>,
    supported: bool,
    allow_any_device: bool,
}

impl<N: Nvram, A: Actuator> Session<N, A> {
    pub fn new(registry: Registry<N>, actuator: A) -> Self {
        Self {
            registry,
            actuator,
            accumulator: KeystrokeAccumulator::new(),
            locks: LockState::default(),
            device: None,
            supported: false,
            allow_any_device: false,
        }
    }

    /// Accept tokens missing from the device sequence.
    pub fn allow_any_device(mut self, allow: bool) -> Self {
        self.allow_any_device = allow;
        self
    }

    pub fn registry(&self) -> &Registry<N> {
        &self.registry
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn locks(&self) -> LockState {
        self.locks
    }

    pub fn into_parts(self) -> (Registry<N>, A) {
        (self.registry, self.actuator)
    }

    pub fn handle_event(&mut self, event: HidEvent) -> Result<(), StoreError> {
        match event {
            HidEvent::Connected(info) => self.connect(info),
            HidEvent::Report(report) => self.process_report(&report),
            HidEvent::Disconnected => {
                self.disconnect();
                Ok(())
            }
        }
    }

    /// Gates the token against the device sequence, then probes its serial number.
    pub fn connect(&mut self, info: DeviceInfo) -> Result<(), StoreError> {
        self.accumulator.clear();
        self.locks = LockState::default();

        let known = self.registry.find_device(info.vid, info.pid)?;
        self.supported = self.allow_any_device || known.is_some();
        tracing::info!(
            vid = format!("{:04x}", info.vid),
            pid = format!("{:04x}", info.pid),
            name = known.as_ref().map_or("", |d| d.name.as_str()),
            supported = self.supported,
            "device connected"
        );
        let has_serial = !info.serial.is_empty();
        self.device = Some(info);

        if !self.supported {
            self.actuator.signal(Signal::DeviceUnsupported);
            return Ok(());
        }
        self.actuator.signal(Signal::DeviceSupported);
        if has_serial {
            self.submit(&[])?;
        }
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.device.take().is_some() {
            tracing::info!("device disconnected");
        }
        self.supported = false;
        self.accumulator.clear();
    }

    /// Decodes one input report and feeds the typed characters to the accumulator.
    pub fn process_report(&mut self, report: &[u8]) -> Result<(), StoreError> {
        let Some(device) = self.device.as_ref().filter(|_| self.supported) else {
            tracing::trace!(len = report.len(), "report ignored, no supported device");
            return Ok(());
        };
        let strokes = match decode_report(&device.report_descriptor, report) {
            Ok(strokes) => strokes,
            Err(e) => {
                tracing::debug!("report not decoded: {e}");
                return Ok(());
            }
        };

        for stroke in strokes {
            if self.locks.toggle(stroke.scan_code) {
                tracing::debug!(locks = ?self.locks, "lock key");
                continue;
            }
            let Some(ch) = oem_to_ascii(stroke.modifier, stroke.scan_code, self.locks) else {
                tracing::trace!(scan_code = stroke.scan_code, "key types nothing");
                continue;
            };
            if let Some(input) = self.accumulator.push(ch) {
                self.submit(&input)?;
            }
        }
        Ok(())
    }

    /// Runs one attempt through the matcher and signals the verdict.
    pub fn submit(&mut self, input: &[u8]) -> Result<Verdict, StoreError> {
        let serial = self.device.as_ref().map_or(&[][..], |d| d.serial.as_slice());
        tracing::debug!(input_len = input.len(), serial_len = serial.len(), "checking input");
        match verify(&mut self.registry, input, serial) {
            Ok(verdict) => {
                self.actuator.signal(verdict.signal());
                Ok(verdict)
            }
            Err(e) => {
                self.actuator.signal(Signal::CredentialInvalid);
                Err(e)
            }
        }
    }
}
