use thiserror::Error;

use crate::rtp::RtpError;

/// Errors arising in packet- and depacketization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The RTP wire codec rejected the packet.
    #[error(transparent)]
    Rtp(#[from] RtpError),

    /// Packet or payload is too short to process.
    #[error("packet is too short")]
    ShortPacket,

    /// This packetizer instance already consumed its one input.
    #[error("not the first packet")]
    NotFirstPacket,

    /// The same timestamp was supplied twice in a row.
    #[error("timestamp did not advance")]
    InvalidTimestamp,

    /// The allocation callback returned no buffer.
    #[error("packet buffer allocation failed")]
    AllocationFailed,

    /// The configured max packet size leaves no room for payload.
    #[error("max packet size too small: {0}")]
    PacketSizeTooSmall(usize),

    /// An aggregation unit declares more bytes than the packet holds.
    #[error("aggregation unit size larger than buffer: {0} > {1}")]
    StapSizeLargerThanBuffer(usize, usize),

    /// The NAL unit type cannot be carried or synthesized.
    #[error("H264 NALU type is not handled: {0}")]
    NaluTypeIsNotHandled(u8),

    /// A fragment arrived with no reassembly in progress, or an access
    /// unit was cut short. Surfaced again as the loss flag on the next
    /// delivered unit.
    #[error("packet lost")]
    PacketLost,

    /// The ADTS frame length does not match the input.
    #[error("bad ADTS header")]
    BadAdtsHeader,

    /// The AU-header section is malformed.
    #[error("bad AU header section")]
    BadAuHeader,

    /// No handler registered for this payload type.
    #[error("unsupported payload type: {0}")]
    UnsupportedPayload(u8),

    /// No handler registered for this encoding name.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}
