//! Model of the lamp firmware, answering API frames the way the real
//! device does. Used by the simulator driver and the test suite.

use crate::protocol::cmd_defs::{
    END_OF_SCENES, OP_BRIGHTNESS, OP_BRIGHTNESS_DELTA, OP_IMMEDIATE_LIGHT, OP_PING,
    OP_SCENE_DESCRIPTOR, OP_SCENE_STEP, OP_SELECT_SCENE, PREFIX, SCENE_DEFAULT, VERSION_1,
    VERSION_2,
};

const STATUS_OK: u8 = 0x00;
const STATUS_ERROR: u8 = 0x01;

#[derive(Debug, Clone)]
pub struct SimScene {
    pub id: u8,
    pub next: u8,
    pub name: String,
}

impl SimScene {
    pub fn new(id: u8, next: u8, name: &str) -> SimScene {
        SimScene {
            id,
            next,
            name: name.to_string(),
        }
    }
}

/// Simulated lamp state plus fault knobs for tests.
pub struct SimLamp {
    pub api_version: u8,
    scenes: Vec<SimScene>,
    pub current_scene: u8,
    pub brightness_pct: u8,
    pub uplight: Option<(u8, u16, u8)>,
    pub downlight: Option<(u16, u8)>,
    /// Answer this scene's descriptor query with a failure status.
    pub fail_descriptor: Option<u8>,
    /// Swallow all replies, leaving requests to time out.
    pub silent: bool,
}

impl SimLamp {
    pub fn new(scenes: Vec<SimScene>) -> SimLamp {
        SimLamp {
            api_version: 2,
            scenes,
            current_scene: 0,
            brightness_pct: 100,
            uplight: None,
            downlight: None,
            fail_descriptor: None,
            silent: false,
        }
    }

    /// The chain a factory-fresh demo lamp ships with.
    pub fn demo() -> SimLamp {
        SimLamp::new(vec![
            SimScene::new(0, 5, "Off"),
            SimScene::new(5, 2, "Shiny"),
            SimScene::new(2, 7, "Welcome"),
            SimScene::new(7, END_OF_SCENES, "Candle"),
        ])
    }

    fn scene(&self, id: u8) -> Option<&SimScene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    fn chain_position(&self, id: u8) -> Option<usize> {
        self.scenes.iter().position(|s| s.id == id)
    }

    fn descriptor_reply(&self, id: u8) -> Vec<u8> {
        if self.fail_descriptor == Some(id) {
            return vec![STATUS_ERROR];
        }
        match self.scene(id) {
            Some(scene) => {
                let mut reply = vec![STATUS_OK, scene.id, scene.next];
                reply.extend_from_slice(scene.name.as_bytes());
                reply
            }
            None => vec![STATUS_ERROR],
        }
    }

    fn select_scene(&mut self, id: u8) -> Vec<u8> {
        if id == SCENE_DEFAULT {
            // Firmware default: back to the first non-off scene
            self.current_scene = self
                .scenes
                .iter()
                .map(|s| s.id)
                .find(|&id| id != 0)
                .unwrap_or(0);
            return vec![STATUS_OK];
        }
        if self.scene(id).is_some() {
            self.current_scene = id;
            vec![STATUS_OK]
        } else {
            vec![STATUS_ERROR]
        }
    }

    fn step_scene(&mut self, dir: u8) {
        let Some(pos) = self.chain_position(self.current_scene) else {
            return;
        };
        let pos = match dir {
            0x01 => (pos + 1).min(self.scenes.len() - 1),
            0xff => pos.saturating_sub(1),
            _ => pos,
        };
        self.current_scene = self.scenes[pos].id;
    }

    /// Handle one API frame, returning the notification reply, or
    /// `None` for fire-and-forget opcodes.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        if frame.len() < 3 || frame[0] != PREFIX {
            return Some(vec![STATUS_ERROR]);
        }
        let reply = match (frame[1], frame[2]) {
            (VERSION_2, OP_PING) => Some(vec![STATUS_OK, self.api_version]),
            (VERSION_1, OP_SCENE_DESCRIPTOR) if frame.len() == 4 => {
                Some(self.descriptor_reply(frame[3]))
            }
            (VERSION_2, OP_SELECT_SCENE) if frame.len() == 4 => Some(self.select_scene(frame[3])),
            (VERSION_1, OP_BRIGHTNESS) if frame.len() == 4 => {
                if frame[3] > 100 {
                    Some(vec![STATUS_ERROR])
                } else {
                    self.brightness_pct = frame[3];
                    Some(vec![STATUS_OK])
                }
            }
            (VERSION_2, OP_BRIGHTNESS_DELTA) if frame.len() == 4 => {
                let delta = frame[3] as i8;
                self.brightness_pct =
                    (self.brightness_pct as i16 + delta as i16).clamp(0, 100) as u8;
                None
            }
            (VERSION_2, OP_SCENE_STEP) if frame.len() == 4 => {
                self.step_scene(frame[3]);
                None
            }
            (VERSION_1, OP_IMMEDIATE_LIGHT) => self.immediate_light(&frame[3..]),
            _ => Some(vec![STATUS_ERROR]),
        };
        if self.silent {
            None
        } else {
            reply
        }
    }

    fn immediate_light(&mut self, payload: &[u8]) -> Option<Vec<u8>> {
        match payload.first() {
            Some(0x01) if payload.len() == 7 => {
                let hue = u16::from_be_bytes([payload[4], payload[5]]);
                self.uplight = Some((payload[3], hue, payload[6]));
                Some(vec![STATUS_OK])
            }
            Some(0x02) if payload.len() == 6 => {
                let kelvin = u16::from_be_bytes([payload[3], payload[4]]);
                self.downlight = Some((kelvin, payload[5]));
                Some(vec![STATUS_OK])
            }
            Some(0x03) if payload.len() == 10 => {
                let hue = u16::from_be_bytes([payload[4], payload[5]]);
                self.uplight = Some((payload[3], hue, payload[6]));
                let kelvin = u16::from_be_bytes([payload[7], payload[8]]);
                self.downlight = Some((kelvin, payload[9]));
                Some(vec![STATUS_OK])
            }
            _ => Some(vec![STATUS_ERROR]),
        }
    }
}
