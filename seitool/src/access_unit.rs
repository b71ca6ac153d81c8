use std::ops::Range;

use common::{scan_nal_units, NalUnit, RBSP};

/// One access unit of a raw Annex-B stream, as byte offsets into that stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    pub range: Range<usize>,
    pub is_keyframe: bool,
}

/// `first_mb_in_slice` is the first `ue(v)` of the slice header, and it is 0 exactly when the
/// first payload bit is set.
fn starts_new_picture(nal_unit: &NalUnit, data: &[u8]) -> bool {
    nal_unit
        .payload(data)
        .first()
        .is_some_and(|&byte| byte & 0x80 != 0)
}

/// Groups the NAL units of `data` into access units.
///
/// An access unit delimiter always opens a new access unit. Once a coded slice has been seen,
/// SEI, SPS, PPS and the prefix/subset types 14 to 18 open the next one, as does a slice that
/// starts a new picture. Bytes ahead of the first start code are ignored.
pub fn split_access_units(data: &[u8]) -> Vec<AccessUnit> {
    let mut units = Vec::new();
    let mut current: Option<AccessUnit> = None;
    let mut seen_vcl = false;

    for nal_unit in scan_nal_units(data) {
        let rbsp = nal_unit.rbsp();
        let opens_new = match rbsp {
            RBSP::AccessUnitDelimiter => true,
            kind if kind.precedes_coded_slices() => seen_vcl,
            kind if kind.is_coded_slice() => seen_vcl && starts_new_picture(&nal_unit, data),
            _ => false,
        };

        if opens_new {
            units.extend(current.take());
            seen_vcl = false;
        }

        let unit = current.get_or_insert(AccessUnit {
            range: nal_unit.offset..nal_unit.offset,
            is_keyframe: false,
        });
        unit.range.end = nal_unit.end();
        unit.is_keyframe |= rbsp == RBSP::CodedSliceIDRPicture;
        seen_vcl |= rbsp.is_coded_slice();
    }

    units.extend(current);
    units
}

#[cfg(test)]
mod tests {
    use common::nal_unit_types;

    use super::*;

    fn stream() -> Vec<u8> {
        vec![
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, // SPS
            0x00, 0x00, 0x00, 0x01, 0x68, 0xce, // PPS
            0x00, 0x00, 0x01, 0x65, 0x88, 0x10, // IDR, first_mb 0
            0x00, 0x00, 0x01, 0x65, 0x40, 0x10, // IDR, second slice of the same picture
            0x00, 0x00, 0x01, 0x41, 0x9a, 0x20, // P, new picture
            0x00, 0x00, 0x00, 0x01, 0x09, 0x10, // AUD
            0x00, 0x00, 0x01, 0x41, 0x9b, 0x30, // P
            0x00, 0x00, 0x01, 0x06, 0x05, 0x80, // SEI
            0x00, 0x00, 0x01, 0x01, 0x9c, 0x40, // non-reference slice
        ]
    }

    #[test]
    fn test_split() {
        let data = stream();
        let units = split_access_units(&data);

        let layouts: Vec<_> = units
            .iter()
            .map(|u| (nal_unit_types(&data[u.range.clone()]), u.is_keyframe))
            .collect();
        assert_eq!(
            layouts,
            vec![
                (vec![7, 8, 5, 5], true),
                (vec![1], false),
                (vec![9, 1], false),
                (vec![6, 1], false),
            ]
        );
    }

    #[test]
    fn test_prefix_nal_opens_next_unit() {
        let data = vec![
            0x00, 0x00, 0x01, 0x65, 0x88, // IDR
            0x00, 0x00, 0x01, 0x76, 0x10, // reserved type 22 stays
            0x00, 0x00, 0x01, 0x6e, 0x20, // prefix NAL, type 14
            0x00, 0x00, 0x01, 0x41, 0x9a, // P
        ];
        let units = split_access_units(&data);

        let layouts: Vec<_> = units
            .iter()
            .map(|u| nal_unit_types(&data[u.range.clone()]))
            .collect();
        assert_eq!(layouts, vec![vec![5, 22], vec![14, 1]]);
        assert!(units[0].is_keyframe);
        assert!(!units[1].is_keyframe);
    }

    #[test]
    fn test_units_cover_stream() {
        let data = stream();
        let units = split_access_units(&data);
        assert_eq!(units[0].range.start, 0);
        assert_eq!(units.last().map(|u| u.range.end), Some(data.len()));
        for pair in units.windows(2) {
            assert_eq!(pair[0].range.end, pair[1].range.start);
        }
    }

    #[test]
    fn test_empty_stream() {
        assert!(split_access_units(&[]).is_empty());
        assert!(split_access_units(&[0x12, 0x34]).is_empty());
    }
}
