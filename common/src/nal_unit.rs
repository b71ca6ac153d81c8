use std::ops::Range;

use crate::rbsp::RBSP;

/// The one-byte header that opens every `NalUnit`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NalUnitHeader {
    /// `forbidden_zero_bit` shall be equal to 0.
    pub forbidden_zero_bit: bool,

    /// `nal_ref_idc` not equal to 0 specifies that the content of the NAL unit contains:
    ///
    /// * a sequence parameter set
    /// * a sequence parameter set extension
    /// * a subset sequence parameter set
    /// * a picture parameter set
    /// * a slice of a reference picture
    /// * a slice data partition of a reference picture, or a prefix NAL unit preceding a slice of a reference picture
    ///
    /// `nal_ref_idc` shall not be equal to 0 for NAL units with nal_unit_type equal to 5.
    ///
    /// `nal_ref_idc` shall be equal to 0 for all NAL units having nal_unit_type equal to 6, 9, 10, 11, or 12.
    pub nal_ref_idc: u8,

    /// `nal_unit_type` specifies the type of `RBSP` data structure contained in the NAL unit.
    pub nal_unit_type: u8,
}

impl NalUnitHeader {
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            forbidden_zero_bit: byte & 0x80 != 0,
            nal_ref_idc: (byte >> 5) & 0b11,
            nal_unit_type: byte & 0b0001_1111,
        }
    }

    pub const fn new(nal_ref_idc: u8, nal_unit_type: u8) -> Self {
        Self {
            forbidden_zero_bit: false,
            nal_ref_idc: nal_ref_idc & 0b11,
            nal_unit_type: nal_unit_type & 0b0001_1111,
        }
    }

    pub const fn to_byte(self) -> u8 {
        ((self.forbidden_zero_bit as u8) << 7) | (self.nal_ref_idc << 5) | self.nal_unit_type
    }

    pub const fn rbsp(&self) -> RBSP {
        RBSP::from_nal_unit_type(self.nal_unit_type)
    }
}

/// `NalUnit` is a syntax structure containing an indication of the type of data to follow and bytes
/// containing that data in the form of an `RBSP` interspersed as necessary with
/// `EMULATION_PREVENTION_BYTE`.
///
/// A `NalUnit` only records offsets into the buffer it was scanned from, so it is meaningless
/// once detached from that buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalUnit {
    /// Offset of the first byte of the start code.
    pub offset: usize,

    /// Either 3 (`00 00 01`) or 4 (`00 00 00 01`).
    pub start_code_length: usize,

    pub header: NalUnitHeader,

    /// Bytes after the header up to the next start code, or the end of the buffer.
    pub payload_range: Range<usize>,
}

impl NalUnit {
    /// A unique sequence of three bytes equal to `0x000001` embedded in the byte stream as a prefix
    /// to each `NalUnit`. The location of a `START_CODE_PREFIX` can be used by a decoder to identify
    /// the beginning of a new `NAL unit` and the end of a previous NAL unit. Emulation of start code
    /// prefixes is prevented within NAL units by the inclusion of `EMULATION_PREVENTION_BYTES`.
    pub const START_CODE_PREFIX: [u8; 3] = [0x00, 0x00, 0x01];

    /// `zero_byte` followed by `START_CODE_PREFIX`.
    pub const FOUR_BYTE_START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

    /// A byte equal to 0x03 that may be present within a `NalUnit`.
    /// The presence of this byte ensures no sequence of consecutive byte-aligned bytes in the
    /// `NALUnit` contains a `START_CODE_PREFIX`.
    pub const EMULATION_PREVENTION_BYTE: u8 = 0x03;

    pub const TYPE_SEI: u8 = 6;

    pub fn nal_unit_type(&self) -> u8 {
        self.header.nal_unit_type
    }

    pub fn nal_ref_idc(&self) -> u8 {
        self.header.nal_ref_idc
    }

    pub fn rbsp(&self) -> RBSP {
        self.header.rbsp()
    }

    /// Offset of the byte just past this NAL unit.
    pub fn end(&self) -> usize {
        self.payload_range.end
    }

    /// The escaped payload, header byte excluded.
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.payload_range.clone()]
    }

    /// Start code, header and payload.
    pub fn bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.offset..self.end()]
    }

    /// Coded slice NAL units carry the picture itself.
    pub fn is_vcl(&self) -> bool {
        self.rbsp().is_coded_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let header = NalUnitHeader::from_byte(0x67);
        assert!(!header.forbidden_zero_bit);
        assert_eq!(header.nal_ref_idc, 3);
        assert_eq!(header.nal_unit_type, 7);
        assert_eq!(header.rbsp(), RBSP::SequenceParameterSet);

        let header = NalUnitHeader::from_byte(0x06);
        assert_eq!(header.nal_ref_idc, 0);
        assert_eq!(header.nal_unit_type, NalUnit::TYPE_SEI);
        assert_eq!(header.rbsp(), RBSP::SupplementalEnhancementInformation);
    }

    #[test]
    fn test_is_vcl() {
        let unit = |byte| NalUnit {
            offset: 0,
            start_code_length: 3,
            header: NalUnitHeader::from_byte(byte),
            payload_range: 4..4,
        };
        for byte in [0x01u8, 0x21, 0x41, 0x65] {
            assert!(unit(byte).is_vcl());
        }
        for byte in [0x06u8, 0x09, 0x67, 0x68, 0x6e, 0x74] {
            assert!(!unit(byte).is_vcl());
        }
    }

    #[test]
    fn test_header_byte_round_trip() {
        for byte in [0x01u8, 0x06, 0x09, 0x41, 0x65, 0x67, 0x68, 0xff] {
            assert_eq!(NalUnitHeader::from_byte(byte).to_byte(), byte);
        }
        assert_eq!(NalUnitHeader::new(0, NalUnit::TYPE_SEI).to_byte(), 0x06);
    }
}
