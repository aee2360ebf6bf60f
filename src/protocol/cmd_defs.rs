use super::convert;

/// Outbound API frame. `N` is the frame length, `ANSWER` marks
/// commands that are answered with a notification on the API
/// characteristic.
pub struct Command<const N: usize, const ANSWER: bool>(pub [u8; N]);

pub const PREFIX: u8 = 0xa0;
pub const VERSION_1: u8 = 0x01;
pub const VERSION_2: u8 = 0x02;

pub const OP_PING: u8 = 0x00;
pub const OP_SCENE_DESCRIPTOR: u8 = 0x01;
pub const OP_IMMEDIATE_LIGHT: u8 = 0x02;
pub const OP_BRIGHTNESS: u8 = 0x03;
pub const OP_SELECT_SCENE: u8 = 0x05;
pub const OP_SCENE_STEP: u8 = 0x06;
pub const OP_BRIGHTNESS_DELTA: u8 = 0x08;

/// Scene 0 turns the lamp off.
pub const SCENE_OFF: u8 = 0x00;
/// Scene 255 selects the firmware default ("turn on to last state").
pub const SCENE_DEFAULT: u8 = 0xff;
/// Next-id marker terminating the scene chain.
pub const END_OF_SCENES: u8 = 0xff;

/// Light selector bytes for the immediate-light command.
const LIGHT_UP: u8 = 0x01;
const LIGHT_DOWN: u8 = 0x02;
const LIGHT_BOTH: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Brighter,
    Dimmer,
}

impl StepDirection {
    pub const fn wire(self) -> u8 {
        match self {
            StepDirection::Brighter => 0x01,
            // -1 as two's-complement
            StepDirection::Dimmer => 0xff,
        }
    }
}

macro_rules! scene_cmd_def {
    ($sym: ident, $version: expr, $opcode: expr) => {
        #[allow(non_snake_case)]
        #[inline(always)]
        pub const fn $sym(id: u8) -> Command<4, true> {
            Command([PREFIX, $version, $opcode, id])
        }
    };
}

#[allow(non_snake_case)]
#[inline(always)]
pub const fn PING() -> Command<3, true> {
    Command([PREFIX, VERSION_2, OP_PING])
}

scene_cmd_def!(SCENE_DESCRIPTOR, VERSION_1, OP_SCENE_DESCRIPTOR);
scene_cmd_def!(SELECT_SCENE, VERSION_2, OP_SELECT_SCENE);

/// Absolute brightness, percent 0-100.
#[allow(non_snake_case)]
#[inline(always)]
pub fn BRIGHTNESS(percent: u8) -> Command<4, true> {
    Command([PREFIX, VERSION_1, OP_BRIGHTNESS, percent.min(100)])
}

/// Relative brightness. No reply is sent for this opcode.
#[allow(non_snake_case)]
#[inline(always)]
pub fn BRIGHTNESS_DELTA(delta: i8) -> Command<4, false> {
    Command([
        PREFIX,
        VERSION_2,
        OP_BRIGHTNESS_DELTA,
        convert::delta_to_wire(delta),
    ])
}

/// Next/previous scene by brightness. No reply is sent for this opcode.
#[allow(non_snake_case)]
#[inline(always)]
pub const fn SCENE_STEP(direction: StepDirection) -> Command<4, false> {
    Command([PREFIX, VERSION_2, OP_SCENE_STEP, direction.wire()])
}

/// Uplight hue/saturation color. `saturation` and `hue` are wire
/// units (see `convert`), `brightness` is percent.
#[allow(non_snake_case)]
#[inline(always)]
pub fn UPLIGHT_COLOR(duration_ms: u16, saturation: u8, hue: u16, brightness: u8) -> Command<10, true> {
    let [dur_hi, dur_lo] = duration_ms.to_be_bytes();
    let [hue_hi, hue_lo] = hue.to_be_bytes();
    Command([
        PREFIX,
        VERSION_1,
        OP_IMMEDIATE_LIGHT,
        LIGHT_UP,
        dur_hi,
        dur_lo,
        saturation,
        hue_hi,
        hue_lo,
        brightness.min(100),
    ])
}

/// Downlight color temperature. `kelvin` is clamped to the supported
/// range before encoding.
#[allow(non_snake_case)]
#[inline(always)]
pub fn DOWNLIGHT_TEMPERATURE(duration_ms: u16, kelvin: u16, brightness: u8) -> Command<9, true> {
    let [dur_hi, dur_lo] = duration_ms.to_be_bytes();
    let [k_hi, k_lo] = convert::clamp_kelvin(kelvin).to_be_bytes();
    Command([
        PREFIX,
        VERSION_1,
        OP_IMMEDIATE_LIGHT,
        LIGHT_DOWN,
        dur_hi,
        dur_lo,
        k_hi,
        k_lo,
        brightness.min(100),
    ])
}

/// Uplight color and downlight temperature in a single frame.
#[allow(non_snake_case)]
#[inline(always)]
pub fn BOTH_LIGHTS(
    duration_ms: u16,
    saturation: u8,
    hue: u16,
    up_brightness: u8,
    kelvin: u16,
    down_brightness: u8,
) -> Command<13, true> {
    let [dur_hi, dur_lo] = duration_ms.to_be_bytes();
    let [hue_hi, hue_lo] = hue.to_be_bytes();
    let [k_hi, k_lo] = convert::clamp_kelvin(kelvin).to_be_bytes();
    Command([
        PREFIX,
        VERSION_1,
        OP_IMMEDIATE_LIGHT,
        LIGHT_BOTH,
        dur_hi,
        dur_lo,
        saturation,
        hue_hi,
        hue_lo,
        up_brightness.min(100),
        k_hi,
        k_lo,
        down_brightness.min(100),
    ])
}
