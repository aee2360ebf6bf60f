//! Decoders for the notification replies and the current-scene
//! characteristic. Replies carry a status byte first; anything shorter
//! than the opcode minimum or with a non-zero status is an error, not
//! a silent success.

use std::error::Error;
use std::fmt;

const STATUS_OK: u8 = 0x00;

#[derive(Debug)]
pub enum ProtocolError {
    /// Reply shorter than the opcode's minimum length.
    Truncated { expected: usize, got: usize },
    /// Non-zero status byte, kept for diagnostics.
    Status(u8),
    /// Scene name is not valid UTF-8.
    Name(std::str::Utf8Error),
    /// Current-scene value does not fit a scene id.
    SceneWidth(u32),
}

impl Error for ProtocolError {}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated { expected, got } => {
                write!(f, "Reply truncated, expected {} bytes, got {}", expected, got)
            }
            ProtocolError::Status(status) => {
                write!(f, "Device reported failure status 0x{:02x}", status)
            }
            ProtocolError::Name(err) => write!(f, "Scene name is not UTF-8: {}", err),
            ProtocolError::SceneWidth(value) => {
                write!(f, "Current scene value {} is not a scene id", value)
            }
        }
    }
}

fn status(raw: &[u8], min_len: usize) -> Result<(), ProtocolError> {
    if raw.len() < min_len {
        return Err(ProtocolError::Truncated {
            expected: min_len,
            got: raw.len(),
        });
    }
    if raw[0] != STATUS_OK {
        return Err(ProtocolError::Status(raw[0]));
    }
    Ok(())
}

/// Check a `[status]` reply.
pub fn check_status(raw: &[u8]) -> Result<(), ProtocolError> {
    status(raw, 1)
}

/// Decode a ping reply `[status, version]` into the api version.
pub fn decode_ping(raw: &[u8]) -> Result<u8, ProtocolError> {
    status(raw, 2)?;
    Ok(raw[1])
}

/// One entry of the firmware's scene chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneDescriptor {
    /// Scene id, echoed back by the firmware.
    pub id: u8,
    /// Id of the next scene, `END_OF_SCENES` at the end of the chain.
    pub next: u8,
    pub name: String,
}

/// Decode a scene descriptor reply `[status, id, next, name...]`.
/// The name is the remaining UTF-8 suffix and may be empty.
pub fn decode_scene_descriptor(raw: &[u8]) -> Result<SceneDescriptor, ProtocolError> {
    status(raw, 3)?;
    let name = std::str::from_utf8(&raw[3..]).map_err(ProtocolError::Name)?;
    Ok(SceneDescriptor {
        id: raw[1],
        next: raw[2],
        name: name.to_string(),
    })
}

/// Decode the current-scene characteristic: a raw big-endian integer
/// of whatever width the firmware uses (one byte in observed
/// firmware). Values that do not fit an 8-bit scene id are malformed.
pub fn decode_current_scene(raw: &[u8]) -> Result<u8, ProtocolError> {
    if raw.is_empty() || raw.len() > 4 {
        return Err(ProtocolError::Truncated {
            expected: 1,
            got: raw.len(),
        });
    }
    let value = raw.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
    u8::try_from(value).map_err(|_| ProtocolError::SceneWidth(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reply() {
        assert!(check_status(&[0x00]).is_ok());
        assert!(matches!(check_status(&[]), Err(ProtocolError::Truncated { .. })));
        assert!(matches!(check_status(&[0x01]), Err(ProtocolError::Status(0x01))));
    }

    #[test]
    fn ping_reply() {
        assert_eq!(decode_ping(&[0x00, 0x02]).unwrap(), 2);
        assert!(matches!(decode_ping(&[0x00]), Err(ProtocolError::Truncated { .. })));
        assert!(matches!(
            decode_ping(&[0x05, 0x02]),
            Err(ProtocolError::Status(0x05))
        ));
    }

    #[test]
    fn scene_descriptor_reply() {
        let mut raw = vec![0x00, 0x03, 0x07];
        raw.extend_from_slice("Reading".as_bytes());
        let desc = decode_scene_descriptor(&raw).unwrap();
        assert_eq!(desc.id, 3);
        assert_eq!(desc.next, 7);
        assert_eq!(desc.name, "Reading");
    }

    #[test]
    fn scene_descriptor_empty_name() {
        let desc = decode_scene_descriptor(&[0x00, 0x00, 0xff]).unwrap();
        assert_eq!(desc.id, 0);
        assert_eq!(desc.next, 0xff);
        assert_eq!(desc.name, "");
    }

    #[test]
    fn scene_descriptor_failure_status() {
        assert!(matches!(
            decode_scene_descriptor(&[0x01]),
            Err(ProtocolError::Truncated { .. })
        ));
        assert!(matches!(
            decode_scene_descriptor(&[0x01, 0x00, 0x00]),
            Err(ProtocolError::Status(0x01))
        ));
    }

    #[test]
    fn scene_descriptor_bad_name() {
        assert!(matches!(
            decode_scene_descriptor(&[0x00, 0x00, 0xff, 0xc3, 0x28]),
            Err(ProtocolError::Name(_))
        ));
    }

    #[test]
    fn current_scene_widths() {
        assert_eq!(decode_current_scene(&[0x05]).unwrap(), 5);
        assert_eq!(decode_current_scene(&[0x00, 0x05]).unwrap(), 5);
        assert!(decode_current_scene(&[]).is_err());
        assert!(matches!(
            decode_current_scene(&[0x01, 0x00]),
            Err(ProtocolError::SceneWidth(256))
        ));
    }
}
