use common::{
    insert_emulation_prevention, remove_emulation_prevention, Malformed, RBSP_TRAILING_BITS,
};
use tracing::trace;
use uuid::Uuid;

use crate::errors::SeiError;

pub const UUID_LEN: usize = 16;

/// `payloadType` values from Annex D that show up alongside user data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    BufferingPeriod,
    PicTiming,
    UserDataRegistered,
    UserDataUnregistered,
    RecoveryPoint,
    Other(u32),
}

impl From<u32> for PayloadType {
    fn from(value: u32) -> Self {
        match value {
            0 => PayloadType::BufferingPeriod,
            1 => PayloadType::PicTiming,
            4 => PayloadType::UserDataRegistered,
            5 => PayloadType::UserDataUnregistered,
            6 => PayloadType::RecoveryPoint,
            other => PayloadType::Other(other),
        }
    }
}

impl From<PayloadType> for u32 {
    fn from(value: PayloadType) -> Self {
        match value {
            PayloadType::BufferingPeriod => 0,
            PayloadType::PicTiming => 1,
            PayloadType::UserDataRegistered => 4,
            PayloadType::UserDataUnregistered => 5,
            PayloadType::RecoveryPoint => 6,
            PayloadType::Other(other) => other,
        }
    }
}

/// One `sei_message()` out of an SEI RBSP. `payload.len() == payload_size` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeiMessage {
    pub payload_type: u32,
    pub payload_size: u32,
    pub payload: Vec<u8>,
}

impl SeiMessage {
    pub fn kind(&self) -> PayloadType {
        PayloadType::from(self.payload_type)
    }
}

/// Presentation and decode times in nanoseconds. `None` means unknown; zero is a real time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    pub pts: Option<u64>,
    pub dts: Option<u64>,
}

impl Timing {
    pub const UNKNOWN: Timing = Timing { pts: None, dts: None };

    pub fn from_pts(pts: u64) -> Self {
        Self {
            pts: Some(pts),
            dts: None,
        }
    }
}

/// A `user_data_unregistered` message split into its UUID and the application bytes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataRecord {
    pub uuid: Uuid,
    pub body: Vec<u8>,
    pub timing: Timing,
}

/// Validates raw UUID bytes handed in by a caller.
pub fn uuid_from_slice(bytes: &[u8]) -> Result<Uuid, SeiError> {
    <[u8; UUID_LEN]>::try_from(bytes)
        .map(Uuid::from_bytes)
        .map_err(|_| SeiError::InvalidUuidLength(bytes.len()))
}

/// Parses a UUID written as text, hyphenated or not. Surrounding whitespace is ignored.
pub fn uuid_from_str(text: &str) -> Result<Uuid, SeiError> {
    Ok(Uuid::parse_str(text.trim())?)
}

/// Reads a `payloadType` or `payloadSize` field: every `0xFF` adds 255 and the first byte below
/// `0xFF` adds its own value and ends the field.
fn read_ff_coded(rbsp: &[u8], pos: &mut usize) -> Option<u32> {
    let mut value = 0u32;
    loop {
        let byte = *rbsp.get(*pos)?;
        *pos += 1;
        value = value.saturating_add(u32::from(byte));
        if byte != 0xff {
            return Some(value);
        }
    }
}

fn write_ff_coded(out: &mut Vec<u8>, mut value: usize) {
    while value >= 0xff {
        out.push(0xff);
        value -= 0xff;
    }
    out.push(value as u8);
}

/// False once only `rbsp_trailing_bits` (and any zero padding after them) are left.
fn more_rbsp_data(rest: &[u8]) -> bool {
    match rest.iter().rposition(|&b| b != 0x00) {
        None => false,
        Some(0) => rest[0] != RBSP_TRAILING_BITS,
        Some(_) => true,
    }
}

/// Parses every `sei_message()` in an SEI NAL unit payload (header byte excluded, escapes still
/// present).
///
/// Truncated or garbled input ends enumeration; messages read before that point are returned.
pub fn parse_sei(nal_payload: &[u8]) -> Vec<SeiMessage> {
    let rbsp = remove_emulation_prevention(nal_payload);
    let mut messages = Vec::new();
    let mut pos = 0usize;

    while more_rbsp_data(&rbsp[pos..]) {
        let header_at = pos;
        let (Some(payload_type), Some(payload_size)) = (
            read_ff_coded(&rbsp, &mut pos),
            read_ff_coded(&rbsp, &mut pos),
        ) else {
            let error = Malformed::TruncatedSeiHeader { offset: header_at };
            trace!(%error, "stopping SEI parse");
            break;
        };

        let available = rbsp.len() - pos;
        let declared = payload_size as usize;
        if declared > available {
            let error = Malformed::TruncatedSeiPayload { declared, available };
            trace!(%error, "stopping SEI parse");
            break;
        }

        messages.push(SeiMessage {
            payload_type,
            payload_size,
            payload: rbsp[pos..pos + declared].to_vec(),
        });
        pos += declared;
    }

    messages
}

/// Keeps the `user_data_unregistered` messages that are long enough to carry a UUID.
///
/// The returned records carry [`Timing::UNKNOWN`].
pub fn extract_user_data(messages: &[SeiMessage]) -> Vec<UserDataRecord> {
    messages
        .iter()
        .filter(|m| m.kind() == PayloadType::UserDataUnregistered)
        .filter_map(|m| {
            if m.payload.len() < UUID_LEN {
                let error = Malformed::PayloadTooShortForUuid { size: m.payload.len() };
                trace!(%error, "dropping user data");
                return None;
            }
            let (uuid, body) = m.payload.split_at(UUID_LEN);
            Some(UserDataRecord {
                uuid: uuid_from_slice(uuid).ok()?,
                body: body.to_vec(),
                timing: Timing::UNKNOWN,
            })
        })
        .collect()
}

/// Builds an escaped SEI RBSP holding a single `user_data_unregistered` message.
///
/// Escaping runs over the whole message, size field included. `rbsp_trailing_bits` are not
/// appended here.
pub fn build_sei(uuid: &Uuid, body: &[u8]) -> Vec<u8> {
    let size = UUID_LEN + body.len();
    let mut raw = Vec::with_capacity(size + size / 255 + 2);

    write_ff_coded(&mut raw, u32::from(PayloadType::UserDataUnregistered) as usize);
    write_ff_coded(&mut raw, size);
    raw.extend_from_slice(uuid.as_bytes());
    raw.extend_from_slice(body);

    insert_emulation_prevention(&raw)
}
