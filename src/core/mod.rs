//! Core module containing the main functionality of Benchctl
//!
//! This module provides:
//! - GPIO adapter access (Aardvark FFI backend and a simulated backend)
//! - Relay power control with the marker-file power state
//! - TCP probe client and server
//! - Tracing setup shared by the binaries

pub mod gpio;
pub mod logging;
pub mod power;
pub mod probe;
