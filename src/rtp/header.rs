use super::{Pt, RtpError, Ssrc, RTP_FIXED_HEADER, RTP_VERSION};

/// Fixed header fields of an RTP packet.
///
/// ```text
///  0               1               2               3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|   CC  |M|     PT      |      sequence number          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                synchronization source (SSRC) identifier       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    /// Always 2.
    pub version: u8,
    /// Whether the payload carries trailing padding.
    pub has_padding: bool,
    /// Whether a header extension follows the CSRC list.
    pub has_extension: bool,
    /// Number of CSRC entries following the fixed header (0-15).
    pub csrc_count: u8,
    /// For video, signals the end of a series of packets that together form
    /// one frame. For audio, marks the beginning of a talkspurt.
    pub marker: bool,
    /// Type of payload being carried.
    pub payload_type: Pt,
    /// Increases by 1 for each RTP packet, wraps mod 65536.
    pub sequence_number: u16,
    /// Timestamp in media time, wraps mod 2^32.
    pub timestamp: u32,
    /// Sender source identifier.
    pub ssrc: Ssrc,
}

impl RtpHeader {
    /// Parse the 12 byte fixed header.
    pub fn parse(buf: &[u8]) -> Result<RtpHeader, RtpError> {
        if buf.len() < RTP_FIXED_HEADER {
            trace!("RTP header too short < 12: {}", buf.len());
            return Err(RtpError::HeaderTooShort);
        }

        let version = (buf[0] & 0b1100_0000) >> 6;
        if version != RTP_VERSION {
            trace!("RTP version is not 2");
            return Err(RtpError::VersionMismatch);
        }

        let has_padding = buf[0] & 0b0010_0000 > 0;
        let has_extension = buf[0] & 0b0001_0000 > 0;
        let csrc_count = buf[0] & 0b0000_1111;
        let marker = buf[1] & 0b1000_0000 > 0;
        let payload_type = (buf[1] & 0b0111_1111).into();
        let sequence_number = u16::from_be_bytes([buf[2], buf[3]]);
        let timestamp = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);

        Ok(RtpHeader {
            version,
            has_padding,
            has_extension,
            csrc_count,
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc: ssrc.into(),
        })
    }

    /// Write the 12 byte fixed header. The buffer must hold at least
    /// [`RTP_FIXED_HEADER`] bytes.
    pub(crate) fn write_to(&self, buf: &mut [u8]) {
        buf[0] = (RTP_VERSION << 6)
            | if self.has_padding { 1 << 5 } else { 0 }
            | if self.has_extension { 1 << 4 } else { 0 }
            | (self.csrc_count & 0b0000_1111);

        buf[1] = (*self.payload_type & 0b0111_1111) | if self.marker { 1 << 7 } else { 0 };

        buf[2..4].copy_from_slice(&self.sequence_number.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
    }
}

impl Default for RtpHeader {
    fn default() -> Self {
        Self {
            version: RTP_VERSION,
            has_padding: false,
            has_extension: false,
            csrc_count: 0,
            marker: false,
            payload_type: 0.into(),
            sequence_number: 0,
            timestamp: 0,
            ssrc: 0.into(),
        }
    }
}
