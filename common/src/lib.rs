//! Annex-B byte stream primitives for H.264: NAL unit headers, start code scanning and the
//! emulation prevention codec.

mod byte_stream;
mod errors;
mod nal_unit;
mod rbsp;

pub use byte_stream::{nal_unit_types, scan_nal_units, ByteStream};
pub use errors::Malformed;
pub use nal_unit::{NalUnit, NalUnitHeader};
pub use rbsp::{
    insert_emulation_prevention, remove_emulation_prevention, RBSP, RBSP_TRAILING_BITS,
};
