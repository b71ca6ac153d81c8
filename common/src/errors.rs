use thiserror::Error;

/// Conditions in untrusted bitstream bytes that end enumeration early.
///
/// These never cross a crate boundary as an `Err`: whatever was parsed before the condition is
/// kept, and the condition itself is only reported through `tracing`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    #[error("start code at offset {offset} is not followed by a NAL header byte")]
    MalformedStartCode { offset: usize },

    #[error("SEI message header at RBSP offset {offset} is cut short")]
    TruncatedSeiHeader { offset: usize },

    #[error("SEI payload declares {declared} bytes but only {available} remain")]
    TruncatedSeiPayload { declared: usize, available: usize },

    #[error("user_data_unregistered payload of {size} bytes cannot hold a 16 byte UUID")]
    PayloadTooShortForUuid { size: usize },
}
