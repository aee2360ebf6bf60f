//! Enumeration of the lamp's scene chain. The firmware stores scenes
//! as a singly linked list rooted at scene 0, readable one descriptor
//! at a time; each next-pointer is a single byte id fetched over the
//! air, so the walk keeps a visited set instead of trusting the chain
//! to terminate.

use crate::drivers::driver::{LampDriver, TransportError};
use crate::drivers::request::{self, SendError};
use crate::protocol::cmd_defs::{SCENE_DESCRIPTOR, END_OF_SCENES};
use crate::protocol::response;
use log::warn;
use serde_derive::Serialize;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneEntry {
    pub name: String,
    pub id: u8,
}

/// Name to scene-id mapping in traversal order.
#[derive(Debug, Clone, Default)]
pub struct EffectTable {
    entries: Vec<SceneEntry>,
}

impl EffectTable {
    pub fn new() -> EffectTable {
        EffectTable {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: SceneEntry) {
        self.entries.push(entry);
    }

    pub fn id_of(&self, name: &str) -> Option<u8> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    pub fn name_of(&self, id: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[SceneEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walk the chain from scene 0, handing each entry to `found`.
///
/// A failure status, malformed descriptor or missing reply ends the
/// walk with whatever was collected so far; only transport failures
/// propagate. A repeated id means the chain loops and the walk stops
/// rather than hang on malformed firmware data.
async fn walk<F>(
    driver: &mut dyn LampDriver,
    deadline: Duration,
    found: &mut F,
) -> Result<(), TransportError>
where
    F: AsyncFnMut(SceneEntry),
{
    let mut visited = HashSet::new();
    let mut id = 0u8;
    loop {
        if !visited.insert(id) {
            warn!("Scene chain loops back to id {}, stopping", id);
            return Ok(());
        }
        let reply = match request::query(driver, SCENE_DESCRIPTOR(id), deadline).await {
            Ok(reply) => reply,
            Err(SendError::Timeout) => {
                warn!("No descriptor reply for scene {}", id);
                return Ok(());
            }
            Err(SendError::Transport(err)) => return Err(err),
        };
        let descriptor = match response::decode_scene_descriptor(&reply) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!("Failed to retrieve scene {}: {}", id, err);
                return Ok(());
            }
        };
        found(SceneEntry {
            name: descriptor.name,
            id,
        })
        .await;
        if descriptor.next == END_OF_SCENES {
            return Ok(());
        }
        id = descriptor.next;
    }
}

/// Build the effect table by walking the whole chain. Partial tables
/// are returned as-is when the chain cannot be read to the end.
pub async fn build(
    driver: &mut dyn LampDriver,
    deadline: Duration,
) -> Result<EffectTable, TransportError> {
    let mut table = EffectTable::new();
    let mut collect = async |entry| {
        table.push(entry);
    };
    walk(driver, deadline, &mut collect).await?;
    Ok(table)
}

pub type SceneItem = Result<SceneEntry, TransportError>;

async fn scene_thread(
    tx: mpsc::Sender<SceneItem>,
    driver: Arc<Mutex<Box<dyn LampDriver>>>,
    deadline: Duration,
) {
    let mut d = driver.lock().await;
    let d_ref = d.as_mut();
    let cb_tx = tx.clone();
    let mut send_cb = async move |entry| {
        let _ = cb_tx.send(Ok(entry)).await;
    };
    if let Err(err) = walk(d_ref, deadline, &mut send_cb).await {
        let _ = tx.send(Err(err)).await;
    }
}

/// Enumerate scenes as a stream, yielding each entry as soon as its
/// descriptor arrives. The driver stays locked for the duration of
/// the walk.
pub fn scene_stream(
    driver: Arc<Mutex<Box<dyn LampDriver>>>,
    deadline: Duration,
) -> Pin<Box<dyn Stream<Item = SceneItem> + Send>> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(scene_thread(tx, driver, deadline));
    Box::pin(ReceiverStream::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_both_ways() {
        let mut table = EffectTable::new();
        table.push(SceneEntry {
            name: "Off".to_string(),
            id: 0,
        });
        table.push(SceneEntry {
            name: "Reading".to_string(),
            id: 7,
        });
        assert_eq!(table.id_of("Reading"), Some(7));
        assert_eq!(table.id_of("Disco"), None);
        assert_eq!(table.name_of(0), Some("Off"));
        assert_eq!(table.name_of(3), None);
        assert_eq!(table.names().collect::<Vec<_>>(), ["Off", "Reading"]);
        assert_eq!(table.len(), 2);
    }
}
