//! Aardvark adapter backend
//!
//! The vendor library is loaded at runtime with libloading, so the binary
//! runs (and the simulated backend works) on machines without the driver.
//!
//! Wrapped entry points:
//! - `c_aa_find_devices` - enumerate attached adapters
//! - `c_aa_open` / `c_aa_close` - open/close a handle by port number
//! - `c_aa_configure` - pin ownership (GPIO/I2C/SPI)
//! - `c_aa_gpio_direction` / `c_aa_gpio_set` - GPIO control
//! - `c_aa_i2c_pullup` - I2C pull-up resistors

use super::{status_string, AdapterError, GpioAdapter};
use libloading::Library;
use serde::Serialize;
use std::ffi::c_int;
use std::path::Path;
use std::sync::{Arc, OnceLock};

type FindDevicesFn = unsafe extern "C" fn(c_int, *mut u16) -> c_int;
type OpenFn = unsafe extern "C" fn(c_int) -> c_int;
type CloseFn = unsafe extern "C" fn(c_int) -> c_int;
type HandleU8Fn = unsafe extern "C" fn(c_int, u8) -> c_int;
type ConfigureFn = unsafe extern "C" fn(c_int, c_int) -> c_int;

/// Port number flag set by the driver when another process holds the device
const AA_PORT_NOT_FREE: u16 = 0x8000;

#[cfg(target_os = "windows")]
const LIB_NAMES: &[&str] = &["aardvark.dll"];

#[cfg(not(target_os = "windows"))]
const LIB_NAMES: &[&str] = &["aardvark.so", "./aardvark.so", "libaardvark.so"];

/// Loaded vendor library and its function pointers
struct AardvarkLib {
    find_devices: FindDevicesFn,
    open: OpenFn,
    close: CloseFn,
    configure: ConfigureFn,
    gpio_direction: HandleU8Fn,
    gpio_set: HandleU8Fn,
    i2c_pullup: HandleU8Fn,
    // Function pointers above are only valid while this is alive
    _lib: Library,
}

impl AardvarkLib {
    fn load_from(name: &std::ffi::OsStr) -> Result<Self, AdapterError> {
        let lib = unsafe { Library::new(name) }
            .map_err(|e| AdapterError::LibraryNotFound(e.to_string()))?;

        unsafe {
            Ok(Self {
                find_devices: symbol(&lib, "c_aa_find_devices")?,
                open: symbol(&lib, "c_aa_open")?,
                close: symbol(&lib, "c_aa_close")?,
                configure: symbol(&lib, "c_aa_configure")?,
                gpio_direction: symbol(&lib, "c_aa_gpio_direction")?,
                gpio_set: symbol(&lib, "c_aa_gpio_set")?,
                i2c_pullup: symbol(&lib, "c_aa_i2c_pullup")?,
                _lib: lib,
            })
        }
    }

    fn load_default() -> Result<Self, AdapterError> {
        let mut last_error = String::from("no candidate library names");
        for name in LIB_NAMES {
            match Self::load_from(std::ffi::OsStr::new(name)) {
                Ok(lib) => {
                    tracing::info!("Loaded Aardvark library: {}", name);
                    return Ok(lib);
                }
                Err(e) => {
                    tracing::debug!("Could not load {}: {}", name, e);
                    last_error = e.to_string();
                }
            }
        }
        Err(AdapterError::LibraryNotFound(last_error))
    }
}

/// Resolve a symbol and copy out the function pointer.
///
/// Safety: `T` must match the C signature of `name`.
unsafe fn symbol<T: Copy>(lib: &Library, name: &'static str) -> Result<T, AdapterError> {
    let mut cname = name.as_bytes().to_vec();
    cname.push(0);
    lib.get::<T>(&cname)
        .map(|sym| *sym)
        .map_err(|_| AdapterError::MissingFunction(name))
}

static DEFAULT_LIB: OnceLock<Result<Arc<AardvarkLib>, String>> = OnceLock::new();

fn library(path: Option<&Path>) -> Result<Arc<AardvarkLib>, AdapterError> {
    match path {
        Some(path) => {
            let lib = AardvarkLib::load_from(path.as_os_str())?;
            tracing::info!("Loaded Aardvark library: {}", path.display());
            Ok(Arc::new(lib))
        }
        None => DEFAULT_LIB
            .get_or_init(|| {
                AardvarkLib::load_default()
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            })
            .clone()
            .map_err(AdapterError::LibraryNotFound),
    }
}

fn check(op: &'static str, code: c_int) -> Result<c_int, AdapterError> {
    if code < 0 {
        Err(AdapterError::OperationFailed {
            op,
            status: status_string(code),
            code,
        })
    } else {
        Ok(code)
    }
}

/// An attached adapter as reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Port number to pass to `open`
    pub port: u16,
    /// Whether another process already holds the device
    pub in_use: bool,
}

/// List attached Aardvark adapters
pub fn find_devices(library_path: Option<&Path>) -> Result<Vec<DeviceInfo>, AdapterError> {
    let lib = library(library_path)?;
    let mut ports = [0u16; 16];

    let count = unsafe { (lib.find_devices)(ports.len() as c_int, ports.as_mut_ptr()) };
    if count < 0 {
        return Err(AdapterError::EnumerationFailed {
            status: status_string(count),
            code: count,
        });
    }

    // The driver reports the total count even if it exceeds the buffer
    let listed = (count as usize).min(ports.len());
    Ok(ports[..listed]
        .iter()
        .map(|&raw| DeviceInfo {
            port: raw & !AA_PORT_NOT_FREE,
            in_use: raw & AA_PORT_NOT_FREE != 0,
        })
        .collect())
}

/// Open Aardvark adapter
pub struct AardvarkAdapter {
    lib: Arc<AardvarkLib>,
    handle: c_int,
    port: u16,
}

impl AardvarkAdapter {
    /// Open the adapter on `port`, optionally from an explicit library path
    pub fn open(port: u16, library_path: Option<&Path>) -> Result<Self, AdapterError> {
        let lib = library(library_path)?;
        let handle = unsafe { (lib.open)(c_int::from(port)) };

        if handle <= 0 {
            return Err(AdapterError::OpenFailed { port, code: handle });
        }

        tracing::debug!("Opened Aardvark on port {} (handle {})", port, handle);
        Ok(Self { lib, handle, port })
    }

    fn call_u8(&self, op: &'static str, f: HandleU8Fn, value: u8) -> Result<(), AdapterError> {
        let code = unsafe { f(self.handle, value) };
        check(op, code).map(|_| ())
    }
}

impl GpioAdapter for AardvarkAdapter {
    fn port(&self) -> u16 {
        self.port
    }

    fn configure(&mut self, config: u8) -> Result<(), AdapterError> {
        let code = unsafe { (self.lib.configure)(self.handle, c_int::from(config)) };
        check("aa_configure", code).map(|_| ())
    }

    fn gpio_direction(&mut self, mask: u8) -> Result<(), AdapterError> {
        self.call_u8("aa_gpio_direction", self.lib.gpio_direction, mask)
    }

    fn i2c_pullup(&mut self, mask: u8) -> Result<(), AdapterError> {
        self.call_u8("aa_i2c_pullup", self.lib.i2c_pullup, mask)
    }

    fn gpio_set(&mut self, value: u8) -> Result<(), AdapterError> {
        self.call_u8("aa_gpio_set", self.lib.gpio_set, value)
    }
}

impl Drop for AardvarkAdapter {
    fn drop(&mut self) {
        let code = unsafe { (self.lib.close)(self.handle) };
        if code < 0 {
            tracing::warn!(
                "Closing Aardvark handle {} failed: {}",
                self.handle,
                status_string(code)
            );
        } else {
            tracing::debug!("Closed Aardvark on port {}", self.port);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_path() {
        let result = AardvarkAdapter::open(0, Some(Path::new("/nonexistent/aardvark.so")));
        assert!(matches!(result, Err(AdapterError::LibraryNotFound(_))));
    }

    #[test]
    fn test_check_codes() {
        assert_eq!(check("op", 5).unwrap(), 5);
        let err = check("aa_gpio_set", -9).unwrap_err();
        assert!(err.to_string().contains("AA_INVALID_HANDLE"));
    }
}
