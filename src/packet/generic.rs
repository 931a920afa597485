use crate::rtp::{Pt, RtpHeader, RtpPacket, Ssrc, RTP_FIXED_HEADER};

use super::{emit, Depacketizer, InputStatus, PacketError, Packetizer, PayloadHandler};

/// Packetizer for payloads with no internal structure (the
/// G.711/G.722/G.729/G.726/G.722.1 family and similar).
///
/// Splits the input into fixed-size chunks, marker bit always 0. One
/// instance packs exactly one input; create a fresh instance per logical
/// unit.
#[derive(Debug)]
pub struct GenericPacketizer {
    header: RtpHeader,
    max_packet_size: usize,
    used: bool,
}

impl GenericPacketizer {
    pub(crate) fn new(pt: Pt, seq: u16, ssrc: Ssrc, max_packet_size: usize) -> Self {
        GenericPacketizer {
            header: RtpHeader {
                payload_type: pt,
                sequence_number: seq,
                ssrc,
                ..Default::default()
            },
            max_packet_size,
            used: false,
        }
    }
}

impl Packetizer for GenericPacketizer {
    fn input(
        &mut self,
        data: &[u8],
        timestamp: u32,
        handler: &mut dyn PayloadHandler,
    ) -> Result<(), PacketError> {
        if self.used {
            return Err(PacketError::NotFirstPacket);
        }
        if self.header.timestamp == timestamp {
            return Err(PacketError::InvalidTimestamp);
        }
        if data.is_empty() {
            return Ok(());
        }
        self.used = true;

        self.header.timestamp = timestamp;
        self.header.marker = false;

        let chunk_max = self.max_packet_size - RTP_FIXED_HEADER;
        for chunk in data.chunks(chunk_max) {
            emit(&self.header, &[chunk], handler)?;
            self.header.sequence_number = self.header.sequence_number.wrapping_add(1);
        }

        Ok(())
    }

    fn info(&self) -> (u16, u32) {
        (self.header.sequence_number, self.header.timestamp)
    }
}

/// Depacketizer for payloads with no internal structure. One RTP packet
/// maps to one delivered unit; no reassembly.
#[derive(Debug, Default)]
pub struct GenericDepacketizer;

impl Depacketizer for GenericDepacketizer {
    fn input(
        &mut self,
        packet: &[u8],
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError> {
        let pkt = RtpPacket::deserialize(packet)?;
        if pkt.payload.is_empty() {
            return Err(PacketError::ShortPacket);
        }

        handler.handle(pkt.payload, pkt.header.timestamp, false);
        Ok(InputStatus::Handled)
    }
}
