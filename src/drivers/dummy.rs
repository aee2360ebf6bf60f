//! Inert driver. Writes are accepted, notifications never arrive and
//! the current scene reads as off. Emulates an absent lamp.

use super::driver::{DriverInfo, LampDriver, OpenResult, TransportError};
use crate::utils::dyn_future::{DynFuture, DynFutureStatic};
use std::collections::HashMap;
use std::future;
use tokio::sync::mpsc;

pub struct DummyDriver {
    replies: Option<mpsc::Sender<Vec<u8>>>,
}

impl LampDriver for DummyDriver {
    fn write_api(&mut self, _frame: &[u8], _ack: bool) -> DynFuture<'_, Result<(), TransportError>> {
        Box::pin(future::ready(Ok(())))
    }

    fn subscribe_api(
        &mut self,
    ) -> DynFuture<'_, Result<mpsc::Receiver<Vec<u8>>, TransportError>> {
        let (tx, rx) = mpsc::channel(1);
        // Keep the sender so the channel stays open without ever
        // carrying a reply
        self.replies = Some(tx);
        Box::pin(future::ready(Ok(rx)))
    }

    fn unsubscribe_api(&mut self) -> DynFuture<'_, Result<(), TransportError>> {
        self.replies = None;
        Box::pin(future::ready(Ok(())))
    }

    fn read_current_scene(&mut self) -> DynFuture<'_, Result<Vec<u8>, TransportError>> {
        Box::pin(future::ready(Ok(vec![0u8])))
    }
}

fn driver_open(_params: HashMap<String, String>) -> DynFutureStatic<OpenResult> {
    Box::pin(future::ready(Ok(
        Box::new(DummyDriver { replies: None }) as Box<dyn LampDriver>
    )))
}

pub fn driver_info() -> DriverInfo {
    DriverInfo {
        name: "dummy".to_string(),
        description: "Dummy driver. Emulates an absent lamp.".to_string(),
        open: driver_open,
    }
}
