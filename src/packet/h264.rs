//! RFC 6184 RTP payload format for H.264 video.
//!
//! The packetizer consumes an Annex-B elementary stream and emits single
//! NAL unit packets or FU-A fragments. The depacketizer additionally
//! accepts the interleaved-mode packet types (STAP-B, MTAP16/24, FU-B).

use crate::rtp::{Pt, RtpHeader, RtpPacket, Ssrc, RTP_FIXED_HEADER};

use super::{emit, Depacketizer, InputStatus, PacketError, Packetizer, PayloadHandler};

pub const STAPA_NALU_TYPE: u8 = 24;
pub const STAPB_NALU_TYPE: u8 = 25;
pub const MTAP16_NALU_TYPE: u8 = 26;
pub const MTAP24_NALU_TYPE: u8 = 27;
pub const FUA_NALU_TYPE: u8 = 28;
pub const FUB_NALU_TYPE: u8 = 29;

pub const FUA_HEADER_SIZE: usize = 2;

pub const NALU_TYPE_BITMASK: u8 = 0x1F;
/// Forbidden-zero bit plus the two NRI bits, carried over into the FU
/// indicator and back into the synthesized NAL header.
pub const NALU_FNRI_BITMASK: u8 = 0xE0;
pub const FU_START_BITMASK: u8 = 0x80;
pub const FU_END_BITMASK: u8 = 0x40;

fn is_valid_nalu_type(t: u8) -> bool {
    (1..24).contains(&t)
}

/// Packetizes an H.264 Annex-B stream into RTP packets.
///
/// One `input` call covers one access unit; all NAL units found in it
/// share the call's timestamp.
#[derive(Debug)]
pub struct H264Packetizer {
    header: RtpHeader,
    max_packet_size: usize,
}

impl H264Packetizer {
    pub(crate) fn new(pt: Pt, seq: u16, ssrc: Ssrc, max_packet_size: usize) -> Self {
        H264Packetizer {
            header: RtpHeader {
                payload_type: pt,
                sequence_number: seq,
                ssrc,
                ..Default::default()
            },
            max_packet_size,
        }
    }

    /// Position and length of the next Annex-B start code at or after
    /// `from`. The position includes all zero bytes preceding the `01`,
    /// which strips trailing zero padding off the previous NAL unit.
    fn next_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
        let mut zero_count = 0;

        for (i, &b) in data[from..].iter().enumerate() {
            if b == 0 {
                zero_count += 1;
                continue;
            }
            if b == 1 && zero_count >= 2 {
                return Some((from + i - zero_count, zero_count + 1));
            }
            zero_count = 0;
        }
        None
    }

    fn emit_nalu(
        &mut self,
        nalu: &[u8],
        handler: &mut dyn PayloadHandler,
    ) -> Result<(), PacketError> {
        if nalu.is_empty() {
            return Ok(());
        }

        let nalu_type = nalu[0] & NALU_TYPE_BITMASK;

        // Single NAL unit packet. The marker signals the last packet of an
        // access unit; set it for primary coded picture slices.
        if RTP_FIXED_HEADER + nalu.len() <= self.max_packet_size {
            self.header.marker = (1..=5).contains(&nalu_type);
            emit(&self.header, &[nalu], handler)?;
            self.header.sequence_number = self.header.sequence_number.wrapping_add(1);
            return Ok(());
        }

        // FU-A. The NAL header byte is not carried as payload; its F/NRI
        // bits go into the FU indicator, its type into the FU header. A
        // too-large NAL unit always produces at least two fragments.
        let indicator = (nalu[0] & NALU_FNRI_BITMASK) | FUA_NALU_TYPE;
        let chunk_max = self.max_packet_size - RTP_FIXED_HEADER - FUA_HEADER_SIZE;

        let body = &nalu[1..];
        let count = body.chunks(chunk_max).count();

        for (i, chunk) in body.chunks(chunk_max).enumerate() {
            let mut fu_header = nalu_type;
            if i == 0 {
                fu_header |= FU_START_BITMASK;
            }
            if i == count - 1 {
                fu_header |= FU_END_BITMASK;
            }

            self.header.marker = i == count - 1;
            let fu = [indicator, fu_header];
            emit(&self.header, &[&fu, chunk], handler)?;
            self.header.sequence_number = self.header.sequence_number.wrapping_add(1);
        }

        Ok(())
    }
}

impl Packetizer for H264Packetizer {
    fn input(
        &mut self,
        data: &[u8],
        timestamp: u32,
        handler: &mut dyn PayloadHandler,
    ) -> Result<(), PacketError> {
        if data.is_empty() {
            return Ok(());
        }

        self.header.timestamp = timestamp;

        let Some((mut start, mut len)) = Self::next_start_code(data, 0) else {
            // No start code, the whole buffer is one NAL unit.
            return self.emit_nalu(data, handler);
        };

        loop {
            let nalu_from = start + len;
            match Self::next_start_code(data, nalu_from) {
                Some((next_start, next_len)) => {
                    self.emit_nalu(&data[nalu_from..next_start], handler)?;
                    start = next_start;
                    len = next_len;
                }
                None => {
                    self.emit_nalu(&data[nalu_from..], handler)?;
                    break;
                }
            }
        }

        Ok(())
    }

    fn info(&self) -> (u16, u32) {
        (self.header.sequence_number, self.header.timestamp)
    }
}

/// Depacketizes H.264 RTP packets back into NAL units.
///
/// Dispatches on the NAL header type of each packet. Aggregation packets
/// (STAP, MTAP) deliver one unit per aggregated NAL; fragmentation units
/// (FU-A, FU-B) are reassembled across packets and delivered on the END
/// fragment.
#[derive(Debug, Default)]
pub struct H264Depacketizer {
    primed: bool,
    seq: u16,
    /// Sticky until the next delivered unit.
    lost: bool,
    /// FU reassembly buffer, starts with the synthesized NAL header.
    fua: Vec<u8>,
}

impl H264Depacketizer {
    fn deliver(&mut self, data: &[u8], timestamp: u32, handler: &mut dyn PayloadHandler) {
        handler.handle(data, timestamp, self.lost);
        self.lost = false;
    }

    /// STAP-A/B (RFC 6184 §5.7.1): a run of `{u16 size, NALU}` entries,
    /// all sharing the packet timestamp. STAP-B carries a 16-bit DON
    /// between the packet NAL header and the first entry.
    fn unpack_stap(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        stapb: bool,
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError> {
        let skip = if stapb { 3 } else { 1 };
        if payload.len() < skip {
            return Err(PacketError::ShortPacket);
        }

        let mut rest = &payload[skip..];
        while rest.len() > 2 {
            let size = u16::from_be_bytes([rest[0], rest[1]]) as usize;
            if size + 2 > rest.len() {
                self.lost = true;
                return Err(PacketError::StapSizeLargerThanBuffer(size, rest.len() - 2));
            }
            if size == 0 {
                trace!("STAP entry with zero size");
                return Err(PacketError::ShortPacket);
            }

            let t = rest[2] & NALU_TYPE_BITMASK;
            if !is_valid_nalu_type(t) {
                return Err(PacketError::NaluTypeIsNotHandled(t));
            }

            self.deliver(&rest[2..2 + size], timestamp, handler);
            rest = &rest[2 + size..];
        }

        Ok(InputStatus::Handled)
    }

    /// MTAP16/24 (RFC 6184 §5.7.2): entries of `{u16 size, u8 DOND,
    /// 16- or 24-bit TS offset, NALU}` where `size` covers everything
    /// after itself. Each unit gets the packet timestamp plus its own
    /// offset, wrapping mod 2^32.
    fn unpack_mtap(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        ts_len: usize,
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError> {
        // Packet NAL header + 16-bit DON base.
        if payload.len() < 3 {
            return Err(PacketError::ShortPacket);
        }

        let mut rest = &payload[3..];
        while rest.len() > 2 {
            let size = u16::from_be_bytes([rest[0], rest[1]]) as usize;
            // DOND + TS offset + at least the NAL header byte.
            if size + 2 > rest.len() || size < 1 + ts_len + 1 {
                self.lost = true;
                return Err(PacketError::StapSizeLargerThanBuffer(size, rest.len() - 2));
            }

            let ts_offset = if ts_len == 2 {
                u16::from_be_bytes([rest[3], rest[4]]) as u32
            } else {
                u32::from_be_bytes([0, rest[3], rest[4], rest[5]])
            };
            let unit_ts = timestamp.wrapping_add(ts_offset);

            let t = rest[3 + ts_len] & NALU_TYPE_BITMASK;
            if !is_valid_nalu_type(t) {
                return Err(PacketError::NaluTypeIsNotHandled(t));
            }

            self.deliver(&rest[3 + ts_len..2 + size], unit_ts, handler);
            rest = &rest[2 + size..];
        }

        Ok(InputStatus::Handled)
    }

    /// FU-A/B (RFC 6184 §5.8). The START fragment restarts the buffer
    /// with the synthesized NAL header, the END fragment delivers it.
    /// FU-B carries a 16-bit DON after the FU header.
    fn unpack_fu(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        skip: usize,
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError> {
        if payload.len() < skip {
            return Err(PacketError::ShortPacket);
        }

        let fu_header = payload[1];

        if fu_header & FU_START_BITMASK != 0 {
            let nal = (payload[0] & NALU_FNRI_BITMASK) | (fu_header & NALU_TYPE_BITMASK);
            if !is_valid_nalu_type(nal & NALU_TYPE_BITMASK) {
                return Err(PacketError::NaluTypeIsNotHandled(nal & NALU_TYPE_BITMASK));
            }
            self.fua.clear();
            self.fua.push(nal);
        } else if self.fua.is_empty() {
            // Continuation with no reassembly in progress.
            self.lost = true;
            return Err(PacketError::PacketLost);
        }

        self.fua.extend_from_slice(&payload[skip..]);

        if fu_header & FU_END_BITMASK != 0 {
            handler.handle(&self.fua, timestamp, self.lost);
            self.lost = false;
            self.fua.clear();
        }

        Ok(InputStatus::Handled)
    }
}

impl Depacketizer for H264Depacketizer {
    fn input(
        &mut self,
        packet: &[u8],
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError> {
        let pkt = RtpPacket::deserialize(packet)?;
        if pkt.payload.is_empty() {
            return Err(PacketError::ShortPacket);
        }

        if !self.primed {
            self.primed = true;
            self.seq = pkt.header.sequence_number.wrapping_sub(1);
        }
        if pkt.header.sequence_number != self.seq.wrapping_add(1) {
            debug!(
                "sequence gap: {} -> {}",
                self.seq, pkt.header.sequence_number
            );
            self.lost = true;
            self.fua.clear();
        }
        self.seq = pkt.header.sequence_number;

        let ts = pkt.header.timestamp;
        let nalu_type = pkt.payload[0] & NALU_TYPE_BITMASK;
        match nalu_type {
            0 | 31 => Ok(InputStatus::Discarded),
            STAPA_NALU_TYPE => self.unpack_stap(pkt.payload, ts, false, handler),
            STAPB_NALU_TYPE => self.unpack_stap(pkt.payload, ts, true, handler),
            MTAP16_NALU_TYPE => self.unpack_mtap(pkt.payload, ts, 2, handler),
            MTAP24_NALU_TYPE => self.unpack_mtap(pkt.payload, ts, 3, handler),
            FUA_NALU_TYPE => self.unpack_fu(pkt.payload, ts, 2, handler),
            FUB_NALU_TYPE => self.unpack_fu(pkt.payload, ts, 4, handler),
            _ => {
                self.deliver(pkt.payload, ts, handler);
                Ok(InputStatus::Handled)
            }
        }
    }
}
