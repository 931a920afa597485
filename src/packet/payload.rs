//! Encoding registry and the session facade binding one packetizer and
//! one depacketizer for a single RTP stream.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::rtp::{
    Pt, Ssrc, RTP_PAYLOAD_G722, RTP_PAYLOAD_G729, RTP_PAYLOAD_PCMA, RTP_PAYLOAD_PCMU,
};

use super::{
    CodecDepacketizer, CodecPacketizer, Depacketizer, GenericDepacketizer, GenericPacketizer,
    H264Depacketizer, H264Packetizer, InputStatus, Mpeg4GenericDepacketizer,
    Mpeg4GenericPacketizer, PacketError, Packetizer, PayloadHandler,
};

/// The payload formats this crate can pack and unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Fixed-size chunking for codecs without payload structure.
    Generic,
    /// H.264 video (RFC 6184).
    H264,
    /// mpeg4-generic AAC audio (RFC 3640).
    Mpeg4Generic,
}

/// Encoding names accepted for dynamic payload types. `None` marks names
/// we recognize but do not carry (H.265 has no implementation here).
static ENCODINGS: Lazy<HashMap<&'static str, Option<Codec>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    // H.264 video (MPEG-4 Part 10) (RFC 6184)
    m.insert("H264", Some(Codec::H264));
    // H.265 video (HEVC) (RFC 7798)
    m.insert("H265", None);
    m.insert("HEVC", None);
    // MPEG-4 elementary streams (RFC 3640 §4.1)
    m.insert("mpeg4-generic", Some(Codec::Mpeg4Generic));
    m.insert("AAC", Some(Codec::Mpeg4Generic));
    // RFC 7587 Opus
    m.insert("OPUS", Some(Codec::Generic));
    // ITU-T G.726 audio 16/24/32/40 kbit/s (RFC 3551)
    m.insert("G726-16", Some(Codec::Generic));
    m.insert("G726-24", Some(Codec::Generic));
    m.insert("G726-32", Some(Codec::Generic));
    m.insert("G726-40", Some(Codec::Generic));
    // RFC 5577 G.722.1
    m.insert("G7221", Some(Codec::Generic));
    m
});

/// Smallest workable `max_packet_size`: the fixed RTP header, the largest
/// per-packet codec header (4 bytes of AU-header section) and one payload
/// byte.
const MIN_PACKET_SIZE: usize = 17;

/// Resolve a `(payload type, encoding name)` pair to a codec.
///
/// Dynamic payload types (96..=127) are matched by encoding name; static
/// types ignore the name and match the RFC 3551 assignment.
fn find(payload_type: u8, encoding: &str) -> Result<Codec, PacketError> {
    if payload_type > 127 {
        return Err(PacketError::UnsupportedPayload(payload_type));
    }

    if payload_type >= 96 && !encoding.is_empty() {
        match ENCODINGS.get(encoding) {
            Some(Some(codec)) => Ok(*codec),
            _ => Err(PacketError::UnsupportedEncoding(encoding.to_string())),
        }
    } else {
        match payload_type {
            RTP_PAYLOAD_PCMU | RTP_PAYLOAD_PCMA | RTP_PAYLOAD_G722 | RTP_PAYLOAD_G729 => {
                Ok(Codec::Generic)
            }
            _ => Err(PacketError::UnsupportedPayload(payload_type)),
        }
    }
}

/// One RTP stream's packetizer/depacketizer pair behind a uniform facade.
#[derive(Debug)]
pub struct PayloadSession {
    codec: Codec,
    packer: CodecPacketizer,
    unpacker: CodecDepacketizer,
}

impl PayloadSession {
    /// Build a session for one `(payload type, encoding)` pair.
    ///
    /// `max_packet_size` bounds every emitted RTP packet, fixed header
    /// included. Fails before any packet processing when the pair has no
    /// registered codec or the size leaves no room for payload.
    pub fn new(
        payload_type: u8,
        encoding: &str,
        seq: u16,
        ssrc: Ssrc,
        max_packet_size: usize,
    ) -> Result<PayloadSession, PacketError> {
        if max_packet_size < MIN_PACKET_SIZE {
            return Err(PacketError::PacketSizeTooSmall(max_packet_size));
        }

        let codec = find(payload_type, encoding)?;
        let pt = Pt::from(payload_type);

        let (packer, unpacker) = match codec {
            Codec::Generic => (
                CodecPacketizer::Generic(GenericPacketizer::new(pt, seq, ssrc, max_packet_size)),
                CodecDepacketizer::Generic(GenericDepacketizer),
            ),
            Codec::H264 => (
                CodecPacketizer::H264(H264Packetizer::new(pt, seq, ssrc, max_packet_size)),
                CodecDepacketizer::H264(H264Depacketizer::default()),
            ),
            Codec::Mpeg4Generic => (
                CodecPacketizer::Mpeg4Generic(Mpeg4GenericPacketizer::new(
                    pt,
                    seq,
                    ssrc,
                    max_packet_size,
                )),
                CodecDepacketizer::Mpeg4Generic(Mpeg4GenericDepacketizer::default()),
            ),
        };

        trace!("payload session: pt {} codec {:?}", payload_type, codec);

        Ok(PayloadSession {
            codec,
            packer,
            unpacker,
        })
    }

    /// The codec this session was resolved to.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Packetize one frame or access unit stamped `timestamp`. The handler
    /// receives one serialized RTP packet per delivery.
    pub fn pack(
        &mut self,
        data: &[u8],
        timestamp: u32,
        handler: &mut dyn PayloadHandler,
    ) -> Result<(), PacketError> {
        self.packer.input(data, timestamp, handler)
    }

    /// Feed one received RTP packet. The handler receives reconstructed
    /// frames or access units as they complete.
    pub fn unpack(
        &mut self,
        packet: &[u8],
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError> {
        self.unpacker.input(packet, handler)
    }

    /// Next sequence number and current timestamp of the packetizer.
    pub fn packer_info(&self) -> (u16, u32) {
        self.packer.info()
    }
}
