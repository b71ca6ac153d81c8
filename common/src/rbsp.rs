use crate::nal_unit::NalUnit;

/// `rbsp_stop_one_bit` followed by seven `rbsp_alignment_zero_bit`s.
pub const RBSP_TRAILING_BITS: u8 = 0x80;

/// Kind of `RBSP` carried by a NAL unit, keyed by `nal_unit_type` as in Table 7-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RBSP {
    Unspecified,
    CodedSliceNonIDRPicture,
    CodedSliceDataPartitionA,
    CodedSliceDataPartitionB,
    CodedSliceDataPartitionC,
    CodedSliceIDRPicture,
    SupplementalEnhancementInformation,
    SequenceParameterSet,
    PictureParameterSet,
    AccessUnitDelimiter,
    SequenceEnd,
    StreamEnd,
    FillerData,
    SequenceParameterSetExtension,
    PrefixNALUnit,
    SubsetSequenceParameterSet,
    DepthParameterSet,
    /// Types 17 and 18.
    Reserved,
    CodedSliceAuxiliaryCodedPictureNonPartitioning,
    CodedSliceExtension,
    CodedSliceExtensionDepthViewComponent,
    /// Types 22 and 23.
    ReservedExtension,
}

impl RBSP {
    /// Only the low five bits of `nal_unit_type` are considered.
    pub const fn from_nal_unit_type(nal_unit_type: u8) -> Self {
        match nal_unit_type & 0x1f {
            1 => RBSP::CodedSliceNonIDRPicture,
            2 => RBSP::CodedSliceDataPartitionA,
            3 => RBSP::CodedSliceDataPartitionB,
            4 => RBSP::CodedSliceDataPartitionC,
            5 => RBSP::CodedSliceIDRPicture,
            6 => RBSP::SupplementalEnhancementInformation,
            7 => RBSP::SequenceParameterSet,
            8 => RBSP::PictureParameterSet,
            9 => RBSP::AccessUnitDelimiter,
            10 => RBSP::SequenceEnd,
            11 => RBSP::StreamEnd,
            12 => RBSP::FillerData,
            13 => RBSP::SequenceParameterSetExtension,
            14 => RBSP::PrefixNALUnit,
            15 => RBSP::SubsetSequenceParameterSet,
            16 => RBSP::DepthParameterSet,
            17 | 18 => RBSP::Reserved,
            19 => RBSP::CodedSliceAuxiliaryCodedPictureNonPartitioning,
            20 => RBSP::CodedSliceExtension,
            21 => RBSP::CodedSliceExtensionDepthViewComponent,
            22 | 23 => RBSP::ReservedExtension,
            _ => RBSP::Unspecified,
        }
    }

    /// Slices and slice data partitions of the primary coded picture (types 1 through 5).
    pub const fn is_coded_slice(self) -> bool {
        matches!(
            self,
            RBSP::CodedSliceNonIDRPicture
                | RBSP::CodedSliceDataPartitionA
                | RBSP::CodedSliceDataPartitionB
                | RBSP::CodedSliceDataPartitionC
                | RBSP::CodedSliceIDRPicture
        )
    }

    /// Kinds that may only appear ahead of the first coded slice of an access unit (types 6 to 8
    /// and 14 to 18). One of these after a slice belongs to the next access unit.
    pub const fn precedes_coded_slices(self) -> bool {
        matches!(
            self,
            RBSP::SupplementalEnhancementInformation
                | RBSP::SequenceParameterSet
                | RBSP::PictureParameterSet
                | RBSP::PrefixNALUnit
                | RBSP::SubsetSequenceParameterSet
                | RBSP::DepthParameterSet
                | RBSP::Reserved
        )
    }
}

/// Strips every `EMULATION_PREVENTION_BYTE` that follows two or more zero bytes.
///
/// A `0x03` without the two-zero prefix is payload and is copied through. The zero run restarts
/// after each dropped byte, so `00 00 03 03` keeps its second `0x03`.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut zeros = 0usize;

    for &byte in data {
        if zeros >= 2 && byte == NalUnit::EMULATION_PREVENTION_BYTE {
            zeros = 0;
            continue;
        }
        out.push(byte);
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
    }

    out
}

/// Inserts an `EMULATION_PREVENTION_BYTE` before the third byte of every `00 00 {00,01,02,03}` run.
pub fn insert_emulation_prevention(rbsp: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 1);
    let mut zeros = 0usize;

    for &byte in rbsp {
        if zeros >= 2 && byte <= NalUnit::EMULATION_PREVENTION_BYTE {
            out.push(NalUnit::EMULATION_PREVENTION_BYTE);
            zeros = 0;
        }
        out.push(byte);
        zeros = if byte == 0x00 { zeros + 1 } else { 0 };
    }

    out
}
