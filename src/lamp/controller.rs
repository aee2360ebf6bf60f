use crate::drivers::driver::{LampDriver, TransportError};
use crate::drivers::request::{self, SendError};
use crate::protocol::cmd_defs as cmd;
use crate::protocol::cmd_defs::{StepDirection, SCENE_DEFAULT, SCENE_OFF};
use crate::protocol::convert;
use crate::protocol::response::{self, ProtocolError};
use crate::utils::scene_table::{self, EffectTable};
use log::{debug, warn};
use std::error::Error;
use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum LampError {
    Transport(TransportError),
    /// No reply notification within the deadline.
    Timeout,
    Protocol(ProtocolError),
    /// The requested effect is not in the effect table; nothing was
    /// sent to the lamp.
    UnknownEffect(String),
}

impl Error for LampError {}

impl fmt::Display for LampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LampError::Transport(err) => write!(f, "{}", err),
            LampError::Timeout => write!(f, "No reply from lamp"),
            LampError::Protocol(err) => write!(f, "{}", err),
            LampError::UnknownEffect(name) => write!(f, "Unknown effect '{}'", name),
        }
    }
}

impl From<TransportError> for LampError {
    fn from(err: TransportError) -> LampError {
        LampError::Transport(err)
    }
}

impl From<SendError> for LampError {
    fn from(err: SendError) -> LampError {
        match err {
            SendError::Timeout => LampError::Timeout,
            SendError::Transport(err) => LampError::Transport(err),
        }
    }
}

impl From<ProtocolError> for LampError {
    fn from(err: ProtocolError) -> LampError {
        LampError::Protocol(err)
    }
}

/// Uplight color, hue in degrees (0-360) and saturation in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsColor {
    pub hue: u16,
    pub saturation: u8,
}

impl HsColor {
    fn clamped(self) -> HsColor {
        HsColor {
            hue: self.hue.min(convert::HUE_MAX),
            saturation: self.saturation.min(convert::SATURATION_MAX),
        }
    }
}

/// Options for `Lamp::turn_on`. A requested effect supersedes the
/// color options, matching the firmware semantics; otherwise
/// brightness, color and color temperature are applied in that order,
/// each through its own exchange.
#[derive(Debug, Clone, Default)]
pub struct TurnOn {
    pub effect: Option<String>,
    /// Canonical brightness, 0-255.
    pub brightness: Option<u8>,
    pub color: Option<HsColor>,
    /// Downlight color temperature in kelvin.
    pub color_temp: Option<u16>,
    /// Fade duration for the color/temperature frames.
    pub transition_ms: Option<u16>,
}

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(2);

/// Logical state of one lamp over one connection. All fields are
/// session scoped; a new connection starts from defaults until
/// refreshed or set.
pub struct Lamp {
    driver: Box<dyn LampDriver>,
    deadline: Duration,
    table: Option<EffectTable>,
    effect: Option<String>,
    brightness: u8,
    color: Option<HsColor>,
    color_temp: Option<u16>,
    api_version: Option<u8>,
}

impl Lamp {
    pub fn new(driver: Box<dyn LampDriver>) -> Lamp {
        Lamp::with_deadline(driver, DEFAULT_DEADLINE)
    }

    pub fn with_deadline(driver: Box<dyn LampDriver>, deadline: Duration) -> Lamp {
        Lamp {
            driver,
            deadline,
            table: None,
            effect: None,
            brightness: 255,
            color: None,
            color_temp: None,
            api_version: None,
        }
    }

    pub fn effect(&self) -> Option<&str> {
        self.effect.as_deref()
    }

    pub fn effects(&self) -> Vec<&str> {
        match &self.table {
            Some(table) => table.names().collect(),
            None => Vec::new(),
        }
    }

    pub fn effect_table(&self) -> Option<&EffectTable> {
        self.table.as_ref()
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn color(&self) -> Option<HsColor> {
        self.color
    }

    pub fn color_temp(&self) -> Option<u16> {
        self.color_temp
    }

    pub fn api_version(&self) -> Option<u8> {
        self.api_version
    }

    /// Drop the cached effect table; the next `refresh` re-enumerates
    /// the scene chain.
    pub fn invalidate_effects(&mut self) {
        self.table = None;
    }

    /// The lamp counts as on unless the current effect is known to be
    /// scene 0.
    pub fn is_on(&self) -> bool {
        let id = self
            .effect
            .as_deref()
            .and_then(|name| self.table.as_ref().and_then(|t| t.id_of(name)));
        id != Some(SCENE_OFF)
    }

    /// Build the effect table if it is missing and re-read the
    /// current scene. An empty enumeration leaves the table absent so
    /// a later call retries.
    pub async fn refresh(&mut self) -> Result<(), LampError> {
        if self.table.is_none() {
            let table = scene_table::build(self.driver.as_mut(), self.deadline).await?;
            if table.is_empty() {
                warn!("Scene enumeration came back empty");
            } else {
                debug!("Found {} scenes", table.len());
                self.table = Some(table);
            }
        }
        let raw = self.driver.read_current_scene().await?;
        let id = response::decode_current_scene(&raw)?;
        self.effect = self.lookup_name(id);
        debug!("Current scene {} ({:?})", id, self.effect);
        Ok(())
    }

    /// Query the firmware api version.
    pub async fn ping(&mut self) -> Result<u8, LampError> {
        let reply = request::query(self.driver.as_mut(), cmd::PING(), self.deadline).await?;
        let version = response::decode_ping(&reply)?;
        self.api_version = Some(version);
        Ok(version)
    }

    pub async fn turn_on(&mut self, on: TurnOn) -> Result<(), LampError> {
        if let Some(name) = &on.effect {
            let id = self
                .table
                .as_ref()
                .and_then(|t| t.id_of(name))
                .ok_or_else(|| LampError::UnknownEffect(name.clone()))?;
            // Effect selection supersedes the color options
            return self.select_scene(id).await;
        }
        let duration = on.transition_ms.unwrap_or(0);
        let mut touched = false;
        if let Some(brightness) = on.brightness {
            let percent = convert::brightness_to_percent(brightness);
            let reply =
                request::query(self.driver.as_mut(), cmd::BRIGHTNESS(percent), self.deadline)
                    .await?;
            response::check_status(&reply)?;
            self.brightness = brightness;
            touched = true;
        }
        if let Some(color) = on.color {
            let color = color.clamped();
            let frame = cmd::UPLIGHT_COLOR(
                duration,
                convert::saturation_to_wire(color.saturation),
                convert::hue_to_wire(color.hue),
                convert::brightness_to_percent(self.brightness),
            );
            let reply = request::query(self.driver.as_mut(), frame, self.deadline).await?;
            response::check_status(&reply)?;
            self.color = Some(color);
            touched = true;
        }
        if let Some(kelvin) = on.color_temp {
            let kelvin = convert::clamp_kelvin(kelvin);
            let frame = cmd::DOWNLIGHT_TEMPERATURE(
                duration,
                kelvin,
                convert::brightness_to_percent(self.brightness),
            );
            let reply = request::query(self.driver.as_mut(), frame, self.deadline).await?;
            response::check_status(&reply)?;
            self.color_temp = Some(kelvin);
            touched = true;
        }
        if !touched {
            self.select_scene(SCENE_DEFAULT).await?;
        }
        Ok(())
    }

    pub async fn turn_off(&mut self) -> Result<(), LampError> {
        self.select_scene(SCENE_OFF).await
    }

    /// Set uplight color and downlight temperature in one frame.
    pub async fn set_both(
        &mut self,
        color: HsColor,
        kelvin: u16,
        transition_ms: u16,
    ) -> Result<(), LampError> {
        let color = color.clamped();
        let kelvin = convert::clamp_kelvin(kelvin);
        let percent = convert::brightness_to_percent(self.brightness);
        let frame = cmd::BOTH_LIGHTS(
            transition_ms,
            convert::saturation_to_wire(color.saturation),
            convert::hue_to_wire(color.hue),
            percent,
            kelvin,
            percent,
        );
        let reply = request::query(self.driver.as_mut(), frame, self.deadline).await?;
        response::check_status(&reply)?;
        self.color = Some(color);
        self.color_temp = Some(kelvin);
        Ok(())
    }

    /// Relative brightness change. The firmware sends no reply for
    /// this opcode; success is assumed unless the write itself fails.
    pub async fn adjust_brightness(&mut self, delta: i8) -> Result<(), LampError> {
        request::send(self.driver.as_mut(), cmd::BRIGHTNESS_DELTA(delta)).await?;
        Ok(())
    }

    /// Jump to the next brighter or dimmer scene. Fire-and-forget,
    /// like `adjust_brightness`.
    pub async fn step_scene(&mut self, direction: StepDirection) -> Result<(), LampError> {
        request::send(self.driver.as_mut(), cmd::SCENE_STEP(direction)).await?;
        Ok(())
    }

    fn lookup_name(&self, id: u8) -> Option<String> {
        self.table
            .as_ref()
            .and_then(|t| t.name_of(id))
            .map(str::to_string)
    }

    async fn select_scene(&mut self, id: u8) -> Result<(), LampError> {
        let reply =
            request::query(self.driver.as_mut(), cmd::SELECT_SCENE(id), self.deadline).await?;
        response::check_status(&reply)?;
        self.effect = self.lookup_name(id);
        Ok(())
    }
}
