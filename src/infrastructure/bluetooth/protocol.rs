//! Vehicle BLE Protocol
//!
//! GATT layout, advertisement naming and message framing used by the
//! vehicle's BLE endpoint. Message contents (session keys, signatures) are
//! produced by the command signer and are opaque here.

use crate::domain::error::VehicleError;
use tracing::trace;
use uuid::Uuid;

/// Vehicle BLE Service UUID
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x00000211_b2d1_43f0_9b88_960cebf8b91e);

/// Write Characteristic UUID - where framed messages are sent
pub const TX_CHAR_UUID: Uuid = Uuid::from_u128(0x00000212_b2d1_43f0_9b88_960cebf8b91e);

/// Notify Characteristic UUID - where the vehicle answers
pub const RX_CHAR_UUID: Uuid = Uuid::from_u128(0x00000213_b2d1_43f0_9b88_960cebf8b91e);

/// Largest message body the vehicle accepts
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// Length prefix size in bytes
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Advertised local names look like `S` + 16 hex digits + a role suffix
///
/// ```text
/// S 1a87a5a75f3df858 C
/// ^ ^^^^^^^^^^^^^^^^ ^
/// | VIN digest       role (C, D, P or R)
/// prefix
/// ```
pub fn is_vehicle_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() != 18 || bytes[0] != b'S' {
        return false;
    }

    bytes[1..17].iter().all(u8::is_ascii_hexdigit) && matches!(bytes[17], b'C' | b'D' | b'P' | b'R')
}

/// Frame a message body with its 2-byte big-endian length
pub fn frame_message(body: &[u8]) -> Result<Vec<u8>, VehicleError> {
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(VehicleError::MessageTooLong {
            max: MAX_MESSAGE_SIZE,
            actual: body.len(),
        });
    }

    let mut framed = Vec::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    framed.extend_from_slice(&(body.len() as u16).to_be_bytes());
    framed.extend_from_slice(body);

    #[cfg(debug_assertions)]
    trace!("Framed message: {:02X?}", &framed);

    Ok(framed)
}

/// Accumulates notification fragments until a whole message is available
#[derive(Debug, Default)]
pub struct MessageAssembler {
    buffer: Vec<u8>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every message it completes
    pub fn push(&mut self, fragment: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(fragment);

        let mut messages = Vec::new();
        while self.buffer.len() >= LENGTH_PREFIX_SIZE {
            let length = u16::from_be_bytes([self.buffer[0], self.buffer[1]]) as usize;
            if length > MAX_MESSAGE_SIZE {
                trace!("Dropping oversized message header ({} bytes)", length);
                self.buffer.clear();
                break;
            }
            if self.buffer.len() < LENGTH_PREFIX_SIZE + length {
                break;
            }
            let rest = self.buffer.split_off(LENGTH_PREFIX_SIZE + length);
            let message = self.buffer[LENGTH_PREFIX_SIZE..].to_vec();
            self.buffer = rest;
            messages.push(message);
        }
        messages
    }
}

/// Canonical form of a Bluetooth address typed by the user
pub fn normalize_address(address: &str) -> String {
    address.trim().replace('-', ":").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_strings() {
        assert_eq!(
            SERVICE_UUID.to_string(),
            "00000211-b2d1-43f0-9b88-960cebf8b91e"
        );
        assert_eq!(
            RX_CHAR_UUID.to_string(),
            "00000213-b2d1-43f0-9b88-960cebf8b91e"
        );
    }

    #[test]
    fn test_vehicle_names() {
        assert!(is_vehicle_name("S1a87a5a75f3df858C"));
        assert!(is_vehicle_name("S1A87A5A75F3DF858D"));
        assert!(!is_vehicle_name("S1a87a5a75f3df858X"));
        assert!(!is_vehicle_name("T1a87a5a75f3df858C"));
        assert!(!is_vehicle_name("S1a87a5a75f3df85gC"));
        assert!(!is_vehicle_name("Model 3"));
    }

    #[test]
    fn test_frame_message() {
        assert_eq!(frame_message(&[0xAB, 0xCD]).unwrap(), vec![0x00, 0x02, 0xAB, 0xCD]);
        assert_eq!(frame_message(&[]).unwrap(), vec![0x00, 0x00]);
        assert!(matches!(
            frame_message(&[0u8; MAX_MESSAGE_SIZE + 1]),
            Err(VehicleError::MessageTooLong { actual: 1025, .. })
        ));
    }

    #[test]
    fn test_assembler_joins_fragments() {
        let mut assembler = MessageAssembler::new();
        assert!(assembler.push(&[0x00, 0x03, 0x01]).is_empty());
        assert_eq!(assembler.push(&[0x02, 0x03, 0x00]), vec![vec![1, 2, 3]]);
        assert_eq!(assembler.push(&[0x01, 0x09]), vec![vec![9]]);
    }

    #[test]
    fn test_assembler_splits_back_to_back_messages() {
        let mut assembler = MessageAssembler::new();
        let messages = assembler.push(&[0x00, 0x01, 0xAA, 0x00, 0x02, 0xBB, 0xCC]);
        assert_eq!(messages, vec![vec![0xAA], vec![0xBB, 0xCC]]);
    }

    #[test]
    fn test_assembler_drops_oversized_header() {
        let mut assembler = MessageAssembler::new();
        assert!(assembler.push(&[0xFF, 0xFF, 0x00]).is_empty());
        assert_eq!(assembler.push(&[0x00, 0x01, 0x07]), vec![vec![7]]);
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(" aa-bb-cc-dd-ee-ff\n"), "AA:BB:CC:DD:EE:FF");
    }
}
