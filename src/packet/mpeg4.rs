//! RFC 3640 RTP payload format for MPEG-4 elementary streams, in the
//! mpeg4-generic High Bit-rate AAC configuration (§3.3.6): sizeLength=13,
//! indexLength=3, indexDeltaLength=3.

use crate::rtp::{Pt, RtpHeader, RtpPacket, Ssrc, RTP_FIXED_HEADER};

use super::{
    emit, Depacketizer, FrameAccumulator, InputStatus, PacketError, Packetizer, PayloadHandler,
};

/// 2-byte AU-headers-length plus one 2-byte AU header.
const AU_HEADER_SIZE: usize = 4;

/// Packetizes AAC access units.
///
/// An ADTS header, when present, is stripped before packetization. Each
/// RTP packet carries a 4-byte AU-header section declaring the size of the
/// whole access unit, also in every fragment of a split AU. The marker is
/// set on the packet carrying the final fragment.
#[derive(Debug)]
pub struct Mpeg4GenericPacketizer {
    header: RtpHeader,
    max_packet_size: usize,
}

impl Mpeg4GenericPacketizer {
    pub(crate) fn new(pt: Pt, seq: u16, ssrc: Ssrc, max_packet_size: usize) -> Self {
        Mpeg4GenericPacketizer {
            header: RtpHeader {
                payload_type: pt,
                sequence_number: seq,
                ssrc,
                ..Default::default()
            },
            max_packet_size,
        }
    }
}

impl Packetizer for Mpeg4GenericPacketizer {
    fn input(
        &mut self,
        data: &[u8],
        timestamp: u32,
        handler: &mut dyn PayloadHandler,
    ) -> Result<(), PacketError> {
        let mut data = data;

        if data.len() > 7 && data[0] == 0xFF && data[1] & 0xF0 == 0xF0 {
            // ADTS framing. The frame-length field must cover the whole
            // input, header included.
            let frame_len = ((data[3] & 0x03) as usize) << 11
                | (data[4] as usize) << 3
                | ((data[5] >> 5) & 0x07) as usize;
            if frame_len != data.len() {
                trace!("ADTS frame length {} != input {}", frame_len, data.len());
                return Err(PacketError::BadAdtsHeader);
            }
            data = &data[7..];
        }

        if data.is_empty() {
            return Ok(());
        }

        self.header.timestamp = timestamp;

        // AU-headers-length = 16 bits, AU-size in the top 13 bits. The
        // declared size is the full access unit, repeated in every
        // fragment.
        let size = data.len();
        let au_header = [0, 16, (size >> 5) as u8, ((size & 0x1F) << 3) as u8];

        let chunk_max = self.max_packet_size - AU_HEADER_SIZE - RTP_FIXED_HEADER;
        let count = data.chunks(chunk_max).count();

        for (i, chunk) in data.chunks(chunk_max).enumerate() {
            self.header.marker = i == count - 1;
            emit(&self.header, &[&au_header, chunk], handler)?;
            self.header.sequence_number = self.header.sequence_number.wrapping_add(1);
        }

        Ok(())
    }

    fn info(&self) -> (u16, u32) {
        (self.header.sequence_number, self.header.timestamp)
    }
}

/// Depacketizes mpeg4-generic packets back into access units.
///
/// Fragmented access units accumulate until the marker bit or a packet
/// with several AUs triggers delivery. A sequence gap drops the broken
/// access unit; packets belonging to it are discarded until the timestamp
/// changes.
#[derive(Debug)]
pub struct Mpeg4GenericDepacketizer {
    acc: FrameAccumulator,
}

impl Default for Mpeg4GenericDepacketizer {
    fn default() -> Self {
        Mpeg4GenericDepacketizer {
            acc: FrameAccumulator::new(),
        }
    }
}

impl Depacketizer for Mpeg4GenericDepacketizer {
    fn input(
        &mut self,
        packet: &[u8],
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError> {
        let pkt = RtpPacket::deserialize(packet)?;
        if pkt.payload.len() < 4 {
            return Err(PacketError::ShortPacket);
        }

        self.acc.check(&pkt, handler);
        if self.acc.is_waiting() {
            return Ok(InputStatus::Discarded);
        }

        let payload = pkt.payload;
        let header_bits = u16::from_be_bytes([payload[0], payload[1]]) as usize;
        let header_bytes = (header_bits + 7) / 8;
        if header_bytes < 2 || 2 + header_bytes > payload.len() {
            self.acc.mark_lost();
            return Err(PacketError::BadAuHeader);
        }
        if header_bytes % 2 != 0 {
            return Err(PacketError::BadAuHeader);
        }
        let au_count = header_bytes / 2;

        let mut headers = &payload[2..2 + header_bytes];
        let mut units = &payload[2 + header_bytes..];

        for _ in 0..au_count {
            // 13-bit AU-size, then 3 bits of AU-index(-delta).
            let size = ((headers[0] as usize) << 8 | (headers[1] & 0xF8) as usize) >> 3;
            if size > units.len() {
                self.acc.mark_lost();
                return Err(PacketError::PacketLost);
            }

            self.acc.write(&units[..size]);
            headers = &headers[2..];
            units = &units[size..];

            // A lone fragment waits for more; anything complete flushes.
            if au_count > 1 || pkt.header.marker {
                self.acc.flush(handler);
            }
        }

        Ok(InputStatus::Handled)
    }
}
