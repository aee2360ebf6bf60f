//! Real lamp over `btleplug`. Opening scans for the peripheral by
//! address, connects and resolves the two GATT characteristics of the
//! Luvo control service.

use super::driver::{DriverInfo, LampDriver, OpenError, OpenResult, TransportError};
use crate::utils::dyn_future::{DynFuture, DynFutureStatic};
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Manager, Peripheral};
use futures_util::StreamExt;
use log::{debug, info};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Luvo custom control service.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x44092840_0567_11e6_b862_0002a5d5c51b);
/// External API endpoint, written and notified.
pub const API_UUID: Uuid = Uuid::from_u128(0x44092842_0567_11e6_b862_0002a5d5c51b);
/// Current scene id, read directly.
pub const SCENE_UUID: Uuid = Uuid::from_u128(0x44092844_0567_11e6_b862_0002a5d5c51b);

const DEFAULT_SCAN_SECS: u64 = 5;

fn ble_err(err: btleplug::Error) -> TransportError {
    TransportError::Driver(Box::new(err))
}

pub struct BtleDriver {
    peripheral: Peripheral,
    api: Characteristic,
    scene: Characteristic,
    forward: Option<JoinHandle<()>>,
}

impl LampDriver for BtleDriver {
    fn write_api(&mut self, frame: &[u8], ack: bool) -> DynFuture<'_, Result<(), TransportError>> {
        let write_type = if ack {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        Box::pin(async move {
            self.peripheral
                .write(&self.api, frame, write_type)
                .await
                .map_err(ble_err)
        })
    }

    fn subscribe_api(
        &mut self,
    ) -> DynFuture<'_, Result<mpsc::Receiver<Vec<u8>>, TransportError>> {
        Box::pin(async move {
            self.peripheral.subscribe(&self.api).await.map_err(ble_err)?;
            let mut notifications = self.peripheral.notifications().await.map_err(ble_err)?;
            let uuid = self.api.uuid;
            let (tx, rx) = mpsc::channel(4);
            // The peripheral stream carries every subscribed
            // characteristic; forward only API notifications
            let forward = tokio::spawn(async move {
                while let Some(notification) = notifications.next().await {
                    if notification.uuid != uuid {
                        continue;
                    }
                    if tx.send(notification.value).await.is_err() {
                        break;
                    }
                }
            });
            self.forward = Some(forward);
            Ok(rx)
        })
    }

    fn unsubscribe_api(&mut self) -> DynFuture<'_, Result<(), TransportError>> {
        Box::pin(async move {
            if let Some(forward) = self.forward.take() {
                forward.abort();
            }
            self.peripheral
                .unsubscribe(&self.api)
                .await
                .map_err(ble_err)
        })
    }

    fn read_current_scene(&mut self) -> DynFuture<'_, Result<Vec<u8>, TransportError>> {
        Box::pin(async move { self.peripheral.read(&self.scene).await.map_err(ble_err) })
    }
}

impl Drop for BtleDriver {
    fn drop(&mut self) {
        if let Some(forward) = self.forward.take() {
            forward.abort();
        }
    }
}

fn open_err(err: btleplug::Error) -> OpenError {
    OpenError::DriverError(Box::new(err))
}

async fn find_peripheral(address: &str, scan_secs: u64) -> Result<Peripheral, OpenError> {
    let manager = Manager::new().await.map_err(open_err)?;
    let adapters = manager.adapters().await.map_err(open_err)?;
    let adapter = adapters
        .into_iter()
        .next()
        .ok_or_else(|| OpenError::DriverError("No Bluetooth adapter found".into()))?;
    adapter
        .start_scan(ScanFilter {
            services: vec![SERVICE_UUID],
        })
        .await
        .map_err(open_err)?;
    tokio::time::sleep(Duration::from_secs(scan_secs)).await;
    let peripherals = adapter.peripherals().await.map_err(open_err)?;
    let _ = adapter.stop_scan().await;
    for peripheral in peripherals {
        let addr = peripheral.address().to_string();
        debug!("Scan found {}", addr);
        if addr.eq_ignore_ascii_case(address) {
            return Ok(peripheral);
        }
    }
    Err(OpenError::DriverError(
        format!("No lamp with address {} found", address).into(),
    ))
}

async fn connect(address: String, scan_secs: u64) -> OpenResult {
    let peripheral = find_peripheral(&address, scan_secs).await?;
    peripheral.connect().await.map_err(open_err)?;
    peripheral.discover_services().await.map_err(open_err)?;
    let characteristics = peripheral.characteristics();
    let api = characteristics
        .iter()
        .find(|c| c.uuid == API_UUID)
        .cloned()
        .ok_or_else(|| OpenError::DriverError(Box::new(TransportError::NoCharacteristic("api"))))?;
    let scene = characteristics
        .iter()
        .find(|c| c.uuid == SCENE_UUID)
        .cloned()
        .ok_or_else(|| {
            OpenError::DriverError(Box::new(TransportError::NoCharacteristic("current scene")))
        })?;
    info!("Connected to lamp {}", address);
    Ok(Box::new(BtleDriver {
        peripheral,
        api,
        scene,
        forward: None,
    }))
}

fn driver_open(params: HashMap<String, String>) -> DynFutureStatic<OpenResult> {
    Box::pin(async move {
        let address = match params.get("address") {
            Some(address) => address.clone(),
            None => {
                return Err(OpenError::ParameterError(
                    "address is required".to_string(),
                ))
            }
        };
        let scan_secs = match params.get("scan") {
            None => DEFAULT_SCAN_SECS,
            Some(s) => u64::from_str(s)
                .map_err(|_| OpenError::ParameterError("scan has invalid value".to_string()))?,
        };
        connect(address, scan_secs).await
    })
}

pub fn driver_info() -> DriverInfo {
    DriverInfo {
        name: "btle".to_string(),
        description: "Luvo lamp over a Bluetooth LE adapter".to_string(),
        open: driver_open,
    }
}
