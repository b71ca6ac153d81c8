use tracing::trace;

use crate::errors::Malformed;
use crate::nal_unit::{NalUnit, NalUnitHeader};

/// `ByteStream` is an encapsulation of a NAL unit stream containing `START_CODE_PREFIX` and `NalUnit`.
///
/// Iterating yields every `NalUnit` in order. The input is never modified and a fresh
/// `ByteStream` over the same bytes always yields the same sequence.
#[derive(Debug, Clone)]
pub struct ByteStream<'a> {
    cursor: usize,
    data: &'a [u8],
}

impl<'a> ByteStream<'a> {
    /// `data` should be an ordered stream of bytes consisting of a sequence of byte stream `NalUnit`
    /// syntax structures. Bytes ahead of the first start code are skipped.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    /// Finds the next start code at or after `from`. A `zero_byte` only widens the start code to
    /// four bytes when it also lies at or after `from`, so the tail of a previous NAL unit is
    /// never claimed.
    fn find_start_code(&self, from: usize) -> Option<(usize, usize)> {
        let rel = self
            .data
            .get(from..)?
            .windows(NalUnit::START_CODE_PREFIX.len())
            .position(|w| w == NalUnit::START_CODE_PREFIX)?;
        let pos = from + rel;

        match pos > from && self.data[pos - 1] == 0x00 {
            true => Some((pos - 1, NalUnit::FOUR_BYTE_START_CODE.len())),
            false => Some((pos, NalUnit::START_CODE_PREFIX.len())),
        }
    }
}

impl Iterator for ByteStream<'_> {
    type Item = NalUnit;

    fn next(&mut self) -> Option<NalUnit> {
        let Some((offset, start_code_length)) = self.find_start_code(self.cursor) else {
            self.cursor = self.data.len();
            return None;
        };

        let header_at = offset + start_code_length;
        let Some(&header_byte) = self.data.get(header_at) else {
            let error = Malformed::MalformedStartCode { offset };
            trace!(%error, "stopping NAL scan");
            self.cursor = self.data.len();
            return None;
        };

        let payload_start = header_at + 1;
        let end = self
            .find_start_code(payload_start)
            .map_or(self.data.len(), |(next, _)| next);
        self.cursor = end;

        let nal_unit = NalUnit {
            offset,
            start_code_length,
            header: NalUnitHeader::from_byte(header_byte),
            payload_range: payload_start..end,
        };
        trace!(
            offset,
            start_code_length,
            nal_unit_type = nal_unit.nal_unit_type(),
            len = end - offset,
            "found NAL unit"
        );

        Some(nal_unit)
    }
}

/// Scans `data` for Annex-B NAL units.
pub fn scan_nal_units(data: &[u8]) -> ByteStream<'_> {
    ByteStream::new(data)
}

/// `nal_unit_type` of every NAL unit in `data`, in stream order.
pub fn nal_unit_types(data: &[u8]) -> Vec<u8> {
    scan_nal_units(data).map(|n| n.nal_unit_type()).collect()
}
