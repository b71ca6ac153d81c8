use common::{scan_nal_units, RBSP};
use uuid::Uuid;

use crate::payload::{extract_user_data, parse_sei, Timing, UserDataRecord};

/// Every `user_data_unregistered` record carried by the SEI NAL units of one access unit, in
/// scan order, each stamped with `timing`. With `target` set, only records with that UUID are
/// kept.
pub fn extract_from_access_unit(
    au: &[u8],
    timing: Timing,
    target: Option<&Uuid>,
) -> Vec<UserDataRecord> {
    scan_nal_units(au)
        .filter(|nal_unit| nal_unit.rbsp() == RBSP::SupplementalEnhancementInformation)
        .flat_map(|nal_unit| extract_user_data(&parse_sei(nal_unit.payload(au))))
        .filter(|record| target.map_or(true, |uuid| record.uuid == *uuid))
        .map(|record| UserDataRecord { timing, ..record })
        .collect()
}

/// The receiving side of a session, optionally tuned to a single UUID.
#[derive(Debug, Clone, Default)]
pub struct SeiExtractor {
    target: Option<Uuid>,
}

impl SeiExtractor {
    pub fn new(target: Option<Uuid>) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Option<&Uuid> {
        self.target.as_ref()
    }

    pub fn extract(&self, au: &[u8], timing: Timing) -> Vec<UserDataRecord> {
        extract_from_access_unit(au, timing, self.target.as_ref())
    }
}
