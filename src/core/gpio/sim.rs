//! Simulated GPIO adapter
//!
//! Records every call so dry runs can be inspected and tests can assert on
//! the exact sequence written to the pins. The recorded sequence is logged
//! when the adapter is closed.

use super::{AdapterError, GpioAdapter};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

/// A recorded adapter operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum GpioOp {
    /// `configure` call
    Configure(u8),
    /// `gpio_direction` call
    Direction(u8),
    /// `i2c_pullup` call
    Pullup(u8),
    /// `gpio_set` call
    Set(u8),
    /// Handle closed
    Close,
}

/// Simulated adapter
pub struct SimulatedAdapter {
    port: u16,
    log: Arc<Mutex<Vec<GpioOp>>>,
    fail_on_set: bool,
}

impl SimulatedAdapter {
    /// Open a simulated adapter
    pub fn open(port: u16) -> Self {
        tracing::debug!("Opened simulated adapter on port {}", port);
        Self {
            port,
            log: Arc::new(Mutex::new(Vec::new())),
            fail_on_set: false,
        }
    }

    /// Simulate an unplugged device: opening always fails with `AA_UNABLE_TO_OPEN`
    pub fn open_failing(port: u16) -> Result<Self, AdapterError> {
        Err(AdapterError::OpenFailed { port, code: -7 })
    }

    /// Make every `gpio_set` call fail with a communication error
    #[cfg(test)]
    #[must_use]
    pub fn failing_writes(mut self) -> Self {
        self.fail_on_set = true;
        self
    }

    /// Shared handle to the operation log, valid after the adapter is dropped
    #[cfg(test)]
    pub fn log(&self) -> Arc<Mutex<Vec<GpioOp>>> {
        self.log.clone()
    }

    /// Values written with `gpio_set`, in order
    #[cfg(test)]
    pub fn writes(&self) -> Vec<u8> {
        self.log
            .lock()
            .iter()
            .filter_map(|op| match op {
                GpioOp::Set(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: GpioOp) {
        tracing::trace!("sim port {}: {:?}", self.port, op);
        self.log.lock().push(op);
    }
}

impl GpioAdapter for SimulatedAdapter {
    fn port(&self) -> u16 {
        self.port
    }

    fn configure(&mut self, config: u8) -> Result<(), AdapterError> {
        self.record(GpioOp::Configure(config));
        Ok(())
    }

    fn gpio_direction(&mut self, mask: u8) -> Result<(), AdapterError> {
        self.record(GpioOp::Direction(mask));
        Ok(())
    }

    fn i2c_pullup(&mut self, mask: u8) -> Result<(), AdapterError> {
        self.record(GpioOp::Pullup(mask));
        Ok(())
    }

    fn gpio_set(&mut self, value: u8) -> Result<(), AdapterError> {
        if self.fail_on_set {
            return Err(AdapterError::OperationFailed {
                op: "aa_gpio_set",
                status: "AA_COMMUNICATION_ERROR",
                code: -6,
            });
        }
        self.record(GpioOp::Set(value));
        Ok(())
    }
}

impl Drop for SimulatedAdapter {
    fn drop(&mut self) {
        self.record(GpioOp::Close);
        for op in self.log.lock().iter() {
            tracing::info!("dry run port {}: {:?}", self.port, op);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_operations() {
        let mut adapter = SimulatedAdapter::open(0);
        adapter.configure(0x00).unwrap();
        adapter.gpio_direction(0x3f).unwrap();
        adapter.gpio_set(0x02).unwrap();

        assert_eq!(adapter.writes(), vec![0x02]);

        let log = adapter.log();
        drop(adapter);
        assert_eq!(
            *log.lock(),
            vec![
                GpioOp::Configure(0x00),
                GpioOp::Direction(0x3f),
                GpioOp::Set(0x02),
                GpioOp::Close
            ]
        );
    }

    #[test]
    fn test_failing_writes() {
        let mut adapter = SimulatedAdapter::open(1).failing_writes();
        assert!(adapter.gpio_set(0x03).is_err());
        assert!(adapter.writes().is_empty());
    }

    #[test]
    fn test_open_failing() {
        assert!(matches!(
            SimulatedAdapter::open_failing(2),
            Err(AdapterError::OpenFailed { port: 2, code: -7 })
        ));
    }
}
