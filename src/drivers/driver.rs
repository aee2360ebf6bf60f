use crate::utils::dyn_future::{DynFuture, DynFutureStatic};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Failure at the BLE layer. Retry policy belongs to the transport,
/// none of these are retried by the protocol core.
#[derive(Debug)]
pub enum TransportError {
    /// The connection is gone.
    Disconnected,
    /// A required GATT characteristic was not found on the device.
    NoCharacteristic(&'static str),
    /// Backend-specific failure.
    Driver(Box<dyn Error + Send + Sync>),
}

impl Error for TransportError {}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Disconnected => write!(f, "Connection closed"),
            TransportError::NoCharacteristic(name) => {
                write!(f, "Characteristic {} not found", name)
            }
            TransportError::Driver(err) => write!(f, "{}", err),
        }
    }
}

/// Transport to one lamp. Two GATT characteristics are involved: the
/// API characteristic carrying writes and notification replies, and a
/// read-only characteristic holding the current scene id.
///
/// Taking `&mut self` everywhere keeps the single-outstanding-request
/// discipline in the type system; concurrent callers wrap the driver
/// in `Arc<Mutex<Box<dyn LampDriver>>>`.
pub trait LampDriver: Send {
    /// Write a frame to the API characteristic. `ack` selects an
    /// acknowledged GATT write.
    fn write_api(&mut self, frame: &[u8], ack: bool) -> DynFuture<'_, Result<(), TransportError>>;

    /// Arm the notification listener on the API characteristic and
    /// return the channel replies arrive on. At most one listener may
    /// be armed at a time; arming is paired with `unsubscribe_api`.
    fn subscribe_api(
        &mut self,
    ) -> DynFuture<'_, Result<mpsc::Receiver<Vec<u8>>, TransportError>>;

    /// Disarm the notification listener.
    fn unsubscribe_api(&mut self) -> DynFuture<'_, Result<(), TransportError>>;

    /// Direct read of the current-scene characteristic. Not
    /// request/response correlated.
    fn read_current_scene(&mut self) -> DynFuture<'_, Result<Vec<u8>, TransportError>>;
}

#[derive(Debug)]
pub enum OpenError {
    NotFound,
    ParameterError(String),
    DriverError(Box<dyn Error + Send + Sync>),
}

impl Error for OpenError {}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::NotFound => write!(f, "No matching driver found"),
            OpenError::ParameterError(descr) => write!(f, "Invalid parameter: {}", descr),
            OpenError::DriverError(err) => write!(f, "Driver failed: {}", err),
        }
    }
}

pub type OpenResult = Result<Box<dyn LampDriver>, OpenError>;

pub struct DriverInfo {
    pub name: String,
    pub description: String,
    /// Opening covers connection establishment, so it is async.
    pub open: fn(HashMap<String, String>) -> DynFutureStatic<OpenResult>,
}

lazy_static! {
    static ref DRIVERS: Mutex<Vec<DriverInfo>> = Mutex::new(Vec::new());
}

pub fn add_driver(info: DriverInfo) {
    let mut drivers = DRIVERS.lock().unwrap();
    drivers.push(info);
}

pub fn driver_names() -> Vec<String> {
    let drivers = DRIVERS.lock().unwrap();
    drivers.iter().map(|d| d.name.clone()).collect()
}

/// Open a driver from a device string `NAME[:key=value[,key=value]...]`,
/// e.g. `btle:address=C4:AC:11:22:33:44`.
pub async fn open(device: &str) -> OpenResult {
    let (name, params) = match device.split_once(':') {
        Some((name, params)) => (name, params),
        None => (device, ""),
    };
    let mut param_map = HashMap::new();
    for param in params.split(',').filter(|p| !p.is_empty()) {
        match param.split_once('=') {
            Some((key, value)) => {
                param_map.insert(key.to_string(), value.to_string());
            }
            None => {
                return Err(OpenError::ParameterError(format!(
                    "'{}' is not of the form key=value",
                    param
                )))
            }
        }
    }
    let open = {
        let drivers = DRIVERS.lock().unwrap();
        match drivers.iter().find(|d| d.name == name) {
            Some(info) => info.open,
            None => return Err(OpenError::NotFound),
        }
    };
    open(param_map).await
}
