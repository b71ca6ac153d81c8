//! Carries application metadata through H.264 Annex-B streams as SEI `user_data_unregistered`
//! messages.
//!
//! Injection builds a complete SEI NAL unit from a UUID and an opaque body and splices it into an
//! access unit. Extraction scans an access unit and returns every user data record it carries.
//! Malformed bitstream bytes never produce an error: parsing stops and whatever was read before
//! that point is returned.

mod errors;
mod extract;
mod inject;
mod nal;
mod payload;

pub use errors::SeiError;
pub use extract::{extract_from_access_unit, SeiExtractor};
pub use inject::{insertion_offset, should_inject, splice_sei_nal, Placement, SeiInjector};
pub use nal::{build_sei_nal, SEI_NAL_HEADER};
pub use payload::{
    build_sei, extract_user_data, parse_sei, uuid_from_slice, uuid_from_str, PayloadType,
    SeiMessage, Timing, UserDataRecord, UUID_LEN,
};
pub use uuid::Uuid;
