//! RTP wire format per RFC 3550 §5.1.

use thiserror::Error;

mod id;
pub use id::{Pt, Ssrc};

mod header;
pub use header::RtpHeader;

mod packet;
pub use packet::{RtpExtension, RtpPacket};

/// The RTP version field must equal 2.
pub const RTP_VERSION: u8 = 2;

/// Length of the fixed RTP header.
pub const RTP_FIXED_HEADER: usize = 12;

/// ITU-T G.711 PCM µ-law audio (RFC 3551).
pub const RTP_PAYLOAD_PCMU: u8 = 0;
/// ITU-T G.711 PCM A-law audio (RFC 3551).
pub const RTP_PAYLOAD_PCMA: u8 = 8;
/// ITU-T G.722 audio (RFC 3551).
pub const RTP_PAYLOAD_G722: u8 = 9;
/// ITU-T G.729 audio (RFC 3551).
pub const RTP_PAYLOAD_G729: u8 = 18;

/// Errors from the RTP wire codec.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum RtpError {
    /// The buffer is shorter than the 12 byte fixed header.
    #[error("RTP header needs 12 bytes")]
    HeaderTooShort,

    /// The version field is not 2.
    #[error("RTP version is not 2")]
    VersionMismatch,

    /// The declared CSRC count, extension or padding does not fit the buffer.
    #[error("RTP packet shorter than declared contents")]
    InsufficientBytes,

    /// The payload is shorter than the header extension or padding claims.
    #[error("RTP payload too short")]
    PayloadTooShort,

    /// The extension length is not a multiple of 4 bytes.
    #[error("RTP extension length not a multiple of 4")]
    ExtensionMisaligned,

    /// The destination buffer cannot hold the serialized packet.
    #[error("buffer too small for RTP packet")]
    BufferTooSmall,
}
