use common::{NalUnit, NalUnitHeader, RBSP_TRAILING_BITS};
use uuid::Uuid;

use crate::payload::build_sei;

/// `nal_ref_idc` 0, `nal_unit_type` 6.
pub const SEI_NAL_HEADER: u8 = NalUnitHeader::new(0, NalUnit::TYPE_SEI).to_byte();

/// A complete Annex-B SEI NAL unit carrying one `user_data_unregistered` message:
/// `00 00 00 01`, header, escaped SEI RBSP, `rbsp_trailing_bits`.
pub fn build_sei_nal(uuid: &Uuid, body: &[u8]) -> Vec<u8> {
    let sei = build_sei(uuid, body);
    let mut nal = Vec::with_capacity(NalUnit::FOUR_BYTE_START_CODE.len() + 2 + sei.len());

    nal.extend_from_slice(&NalUnit::FOUR_BYTE_START_CODE);
    nal.push(SEI_NAL_HEADER);
    nal.extend_from_slice(&sei);
    nal.push(RBSP_TRAILING_BITS);

    nal
}
