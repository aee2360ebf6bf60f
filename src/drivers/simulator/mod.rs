//! Driver backed by a simulated lamp. Besides the test suite it
//! serves as a hardware-free target for the CLI.

pub mod lamp;
#[cfg(test)]
mod test;

use super::driver::{DriverInfo, LampDriver, OpenResult, TransportError};
use crate::utils::dyn_future::{DynFuture, DynFutureStatic};
use lamp::SimLamp;
use std::collections::HashMap;
use std::future;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// Shared by the driver and any inspection handles
struct SimCtxt {
    lamp: SimLamp,
    replies: Option<mpsc::Sender<Vec<u8>>>,
    sent: Vec<Vec<u8>>,
    subscribe_count: usize,
    unsubscribe_count: usize,
}

pub struct SimDriver {
    ctxt: Arc<Mutex<SimCtxt>>,
}

impl SimDriver {
    pub fn new(lamp: SimLamp) -> SimDriver {
        SimDriver {
            ctxt: Arc::new(Mutex::new(SimCtxt {
                lamp,
                replies: None,
                sent: Vec::new(),
                subscribe_count: 0,
                unsubscribe_count: 0,
            })),
        }
    }

    /// Handle for inspecting the simulation from outside the driver.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            ctxt: self.ctxt.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SimHandle {
    ctxt: Arc<Mutex<SimCtxt>>,
}

impl SimHandle {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.ctxt.lock().unwrap().sent.clone()
    }

    pub fn last_sent(&self) -> Option<Vec<u8>> {
        self.ctxt.lock().unwrap().sent.last().cloned()
    }

    pub fn clear_sent(&self) {
        self.ctxt.lock().unwrap().sent.clear();
    }

    pub fn listener_armed(&self) -> bool {
        self.ctxt.lock().unwrap().replies.is_some()
    }

    pub fn subscribe_count(&self) -> usize {
        self.ctxt.lock().unwrap().subscribe_count
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.ctxt.lock().unwrap().unsubscribe_count
    }

    /// Access the simulated lamp, for fault knobs and state checks.
    pub fn with_lamp<R>(&self, f: impl FnOnce(&mut SimLamp) -> R) -> R {
        f(&mut self.ctxt.lock().unwrap().lamp)
    }
}

impl LampDriver for SimDriver {
    fn write_api(&mut self, frame: &[u8], _ack: bool) -> DynFuture<'_, Result<(), TransportError>> {
        let mut ctxt = self.ctxt.lock().unwrap();
        ctxt.sent.push(frame.to_vec());
        if let Some(reply) = ctxt.lamp.handle_frame(frame) {
            if let Some(tx) = &ctxt.replies {
                // A notification with no armed listener is lost, like
                // on the real transport
                let _ = tx.try_send(reply);
            }
        }
        Box::pin(future::ready(Ok(())))
    }

    fn subscribe_api(
        &mut self,
    ) -> DynFuture<'_, Result<mpsc::Receiver<Vec<u8>>, TransportError>> {
        let mut ctxt = self.ctxt.lock().unwrap();
        if ctxt.replies.is_some() {
            return Box::pin(future::ready(Err(TransportError::Driver(
                "notification listener already armed".into(),
            ))));
        }
        ctxt.subscribe_count += 1;
        let (tx, rx) = mpsc::channel(4);
        ctxt.replies = Some(tx);
        Box::pin(future::ready(Ok(rx)))
    }

    fn unsubscribe_api(&mut self) -> DynFuture<'_, Result<(), TransportError>> {
        let mut ctxt = self.ctxt.lock().unwrap();
        ctxt.unsubscribe_count += 1;
        ctxt.replies = None;
        Box::pin(future::ready(Ok(())))
    }

    fn read_current_scene(&mut self) -> DynFuture<'_, Result<Vec<u8>, TransportError>> {
        let ctxt = self.ctxt.lock().unwrap();
        Box::pin(future::ready(Ok(vec![ctxt.lamp.current_scene])))
    }
}

fn driver_open(_params: HashMap<String, String>) -> DynFutureStatic<OpenResult> {
    Box::pin(future::ready(Ok(
        Box::new(SimDriver::new(SimLamp::demo())) as Box<dyn LampDriver>
    )))
}

pub fn driver_info() -> DriverInfo {
    DriverInfo {
        name: "simulator".to_string(),
        description: "Simulated lamp with a demo scene chain".to_string(),
        open: driver_open,
    }
}
