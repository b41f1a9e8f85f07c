//! Relay power control
//!
//! Drives two relay lines on the adapter's GPIO outputs to power-cycle an
//! external system. Bit 1 holds the power relay, bit 0 the reset relay.
//!
//! The power-on state is remembered in a marker file (see [`MarkerFile`]):
//! reset is only pulsed while the system is marked on.

mod marker;

pub use marker::{MarkerFile, DEFAULT_MARKER};

use crate::core::gpio::{
    AdapterError, GpioAdapter, AA_CONFIG_GPIO_ONLY, AA_I2C_PULLUP_NONE, GPIO_ALL_OUTPUTS,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Output patterns written to the relay lines
pub struct RelayPattern;

impl RelayPattern {
    /// Both relays released
    pub const OFF: u8 = 0x00;
    /// Power relay engaged
    pub const ON: u8 = 0x02;
    /// Power and reset relays engaged
    pub const RESET: u8 = 0x03;
}

/// Default reset pulse width
pub const DEFAULT_RESET_PULSE: Duration = Duration::from_millis(200);

/// Power-control error types
#[derive(Error, Debug)]
pub enum PowerError {
    /// Adapter failure
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Marker file could not be created or removed
    #[error("Marker file error: {0}")]
    Marker(#[from] std::io::Error),
}

/// Requested power action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    /// Pulse the reset line (only while powered on)
    Reset,
    /// Power on
    On,
    /// Power off
    Off,
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
        }
    }
}

/// Result of a power action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerOutcome {
    /// Requested mode
    pub mode: PowerMode,
    /// Adapter port
    pub port: u16,
    /// Whether anything was written to the relay lines
    pub signalled: bool,
    /// Marker state before the action
    pub marker_before: bool,
    /// Marker state after the action
    pub marker_after: bool,
}

/// Power controller
pub struct PowerController<A: GpioAdapter> {
    adapter: A,
    marker: MarkerFile,
    reset_pulse: Duration,
}

impl<A: GpioAdapter> PowerController<A> {
    /// Create a controller over an open adapter
    pub fn new(adapter: A, marker: MarkerFile) -> Self {
        Self {
            adapter,
            marker,
            reset_pulse: DEFAULT_RESET_PULSE,
        }
    }

    /// Set the reset pulse width
    #[must_use]
    pub fn reset_pulse(mut self, pulse: Duration) -> Self {
        self.reset_pulse = pulse;
        self
    }

    /// Marker file in use
    pub fn marker(&self) -> &MarkerFile {
        &self.marker
    }

    /// Put every pin under GPIO control as an output and drop the pull-ups
    fn prepare(&mut self) -> Result<(), AdapterError> {
        self.adapter.configure(AA_CONFIG_GPIO_ONLY)?;
        self.adapter.gpio_direction(GPIO_ALL_OUTPUTS)?;
        self.adapter.i2c_pullup(AA_I2C_PULLUP_NONE)?;
        Ok(())
    }

    /// Apply a power mode
    pub fn apply(&mut self, mode: PowerMode) -> Result<PowerOutcome, PowerError> {
        self.prepare()?;

        let marker_before = self.marker.exists();
        let port = self.adapter.port();
        tracing::debug!(%mode, port, marker_before, "Applying power mode");

        let signalled = match mode {
            PowerMode::Reset => {
                if marker_before {
                    self.adapter.gpio_set(RelayPattern::RESET)?;
                    std::thread::sleep(self.reset_pulse);
                    self.adapter.gpio_set(RelayPattern::ON)?;
                    tracing::info!("Reset pulsed on port {} ({:?})", port, self.reset_pulse);
                    true
                } else {
                    tracing::info!("System is not marked on, reset skipped");
                    false
                }
            }
            PowerMode::On => {
                self.adapter.gpio_set(RelayPattern::ON)?;
                self.marker.create()?;
                tracing::info!("Power on (port {})", port);
                true
            }
            PowerMode::Off => {
                self.adapter.gpio_set(RelayPattern::OFF)?;
                self.marker.remove()?;
                tracing::info!("Power off (port {})", port);
                true
            }
        };

        Ok(PowerOutcome {
            mode,
            port,
            signalled,
            marker_before,
            marker_after: self.marker.exists(),
        })
    }

    /// Release the controller, closing the adapter
    pub fn into_adapter(self) -> A {
        self.adapter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gpio::{GpioOp, MockGpioAdapter, SimulatedAdapter};
    use mockall::{predicate::eq, Sequence};

    fn controller(dir: &tempfile::TempDir) -> (PowerController<SimulatedAdapter>, MarkerFile) {
        let marker = MarkerFile::new(dir.path().join("on"));
        let ctl = PowerController::new(SimulatedAdapter::open(0), marker.clone())
            .reset_pulse(Duration::from_millis(1));
        (ctl, marker)
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(PowerMode::Reset.to_string(), "reset");
        assert_eq!(PowerMode::On.to_string(), "on");
        assert_eq!(PowerMode::Off.to_string(), "off");
    }

    #[test]
    fn test_power_on_creates_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, marker) = controller(&dir);

        let outcome = ctl.apply(PowerMode::On).unwrap();
        assert!(outcome.signalled);
        assert!(!outcome.marker_before);
        assert!(outcome.marker_after);
        assert!(marker.exists());
        assert_eq!(ctl.into_adapter().writes(), vec![RelayPattern::ON]);
    }

    #[test]
    fn test_power_off_removes_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, marker) = controller(&dir);
        marker.create().unwrap();

        let outcome = ctl.apply(PowerMode::Off).unwrap();
        assert!(outcome.marker_before);
        assert!(!outcome.marker_after);
        assert!(!marker.exists());
        assert_eq!(ctl.into_adapter().writes(), vec![RelayPattern::OFF]);
    }

    #[test]
    fn test_power_off_without_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, marker) = controller(&dir);

        let outcome = ctl.apply(PowerMode::Off).unwrap();
        assert!(outcome.signalled);
        assert!(!marker.exists());
    }

    #[test]
    fn test_reset_skipped_when_off() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, marker) = controller(&dir);

        let outcome = ctl.apply(PowerMode::Reset).unwrap();
        assert!(!outcome.signalled);
        assert!(!marker.exists());
        assert!(ctl.into_adapter().writes().is_empty());
    }

    #[test]
    fn test_reset_pulses_when_on() {
        let dir = tempfile::tempdir().unwrap();
        let (mut ctl, marker) = controller(&dir);
        marker.create().unwrap();

        let outcome = ctl.apply(PowerMode::Reset).unwrap();
        assert!(outcome.signalled);
        assert!(outcome.marker_after);

        let adapter = ctl.into_adapter();
        let log = adapter.log();
        drop(adapter);
        assert_eq!(
            *log.lock(),
            vec![
                GpioOp::Configure(AA_CONFIG_GPIO_ONLY),
                GpioOp::Direction(GPIO_ALL_OUTPUTS),
                GpioOp::Pullup(AA_I2C_PULLUP_NONE),
                GpioOp::Set(RelayPattern::RESET),
                GpioOp::Set(RelayPattern::ON),
                GpioOp::Close,
            ]
        );
    }

    #[test]
    fn test_setup_precedes_writes() {
        let mut mock = MockGpioAdapter::new();
        let mut seq = Sequence::new();

        mock.expect_configure()
            .with(eq(AA_CONFIG_GPIO_ONLY))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_gpio_direction()
            .with(eq(GPIO_ALL_OUTPUTS))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_i2c_pullup()
            .with(eq(AA_I2C_PULLUP_NONE))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_port().return_const(4u16);
        mock.expect_gpio_set()
            .with(eq(RelayPattern::ON))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let dir = tempfile::tempdir().unwrap();
        let mut ctl = PowerController::new(mock, MarkerFile::new(dir.path().join("on")));
        let outcome = ctl.apply(PowerMode::On).unwrap();
        assert_eq!(outcome.port, 4);
    }

    #[test]
    fn test_adapter_error_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let marker = MarkerFile::new(dir.path().join("on"));
        let mut ctl =
            PowerController::new(SimulatedAdapter::open(0).failing_writes(), marker.clone());

        let err = ctl.apply(PowerMode::On).unwrap_err();
        assert!(matches!(err, PowerError::Adapter(_)));
        // Write failed before the marker step
        assert!(!marker.exists());
    }
}
