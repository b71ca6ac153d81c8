use thiserror::Error;

/// Contract violations by the caller. Malformed bitstream bytes never produce one of these; see
/// [`common::Malformed`] for how those are handled.
#[derive(Error, Debug)]
pub enum SeiError {
    #[error("access unit buffer is empty")]
    EmptyAccessUnit,

    #[error("UUID must be exactly 16 bytes, got {0}")]
    InvalidUuidLength(usize),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
