//! Payload packetizers and depacketizers.
//!
//! A [`Packetizer`] turns one media frame into RTP packets, a
//! [`Depacketizer`] turns RTP packets back into frames. Both sides hand
//! their output to the caller through the [`PayloadHandler`] callbacks; the
//! [`PayloadSession`] facade binds a matching pair for one RTP stream.

use std::fmt;

use crate::rtp::{RtpHeader, RtpPacket, RTP_FIXED_HEADER};

mod error;
pub use error::PacketError;

mod helper;
pub(crate) use helper::FrameAccumulator;

mod generic;
pub use generic::{GenericDepacketizer, GenericPacketizer};

mod h264;
pub use h264::{H264Depacketizer, H264Packetizer};

mod mpeg4;
pub use mpeg4::{Mpeg4GenericDepacketizer, Mpeg4GenericPacketizer};

mod payload;
pub use payload::{Codec, PayloadSession};

/// Callbacks supplied by the host.
///
/// Buffers for outgoing RTP packets are obtained via [`alloc`] and returned
/// via [`free`] immediately after the [`handle`] delivery returns. This
/// triple is the only memory-lifetime coordination point between the
/// library and its host.
///
/// [`alloc`]: PayloadHandler::alloc
/// [`free`]: PayloadHandler::free
/// [`handle`]: PayloadHandler::handle
pub trait PayloadHandler {
    /// Buffer for one outgoing RTP packet, at least `bytes` long.
    /// `None` means allocation failure and aborts the current input call.
    fn alloc(&mut self, bytes: usize) -> Option<Vec<u8>>;

    /// Release a buffer previously returned by [`PayloadHandler::alloc`].
    fn free(&mut self, buf: Vec<u8>);

    /// One emitted RTP packet (pack side) or one reconstructed frame or
    /// access unit (unpack side). `lost` carries the sticky loss flag
    /// accumulated since the previous delivery.
    fn handle(&mut self, data: &[u8], timestamp: u32, lost: bool);
}

/// Outcome of feeding one RTP packet to a depacketizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    /// The packet was consumed; zero or more units may have been delivered.
    Handled,
    /// The packet was ignored (reserved NAL type, or waiting out a loss).
    Discarded,
}

/// Chunks one media frame into RTP packets.
pub trait Packetizer: fmt::Debug {
    /// Packetize one frame stamped `timestamp`, invoking
    /// [`PayloadHandler::handle`] once per emitted RTP packet. Packets are
    /// emitted in strictly increasing sequence number order.
    fn input(
        &mut self,
        data: &[u8],
        timestamp: u32,
        handler: &mut dyn PayloadHandler,
    ) -> Result<(), PacketError>;

    /// Next sequence number and current timestamp of the header template.
    fn info(&self) -> (u16, u32);
}

/// Reassembles frames from RTP packets.
pub trait Depacketizer: fmt::Debug {
    /// Feed one serialized RTP packet, invoking [`PayloadHandler::handle`]
    /// once per reconstructed unit.
    fn input(
        &mut self,
        packet: &[u8],
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError>;
}

/// Serialize one RTP packet into a handler-allocated buffer and deliver it.
///
/// The payload is the concatenation of `parts`. One alloc/handle/free round
/// per packet.
pub(crate) fn emit(
    header: &RtpHeader,
    parts: &[&[u8]],
    handler: &mut dyn PayloadHandler,
) -> Result<(), PacketError> {
    let body: usize = parts.iter().map(|p| p.len()).sum();
    let total = RTP_FIXED_HEADER + body;

    let Some(mut buf) = handler.alloc(total) else {
        return Err(PacketError::AllocationFailed);
    };
    if buf.len() < total {
        handler.free(buf);
        return Err(PacketError::AllocationFailed);
    }

    let pkt = RtpPacket {
        header: header.clone(),
        csrc: vec![],
        extension: None,
        payload: &[],
    };
    let mut at = match pkt.serialize_header(&mut buf) {
        Ok(n) => n,
        Err(e) => {
            handler.free(buf);
            return Err(e.into());
        }
    };

    for p in parts {
        buf[at..at + p.len()].copy_from_slice(p);
        at += p.len();
    }

    handler.handle(&buf[..total], header.timestamp, false);
    handler.free(buf);
    Ok(())
}

#[derive(Debug)]
pub(crate) enum CodecPacketizer {
    Generic(GenericPacketizer),
    H264(H264Packetizer),
    Mpeg4Generic(Mpeg4GenericPacketizer),
}

#[derive(Debug)]
pub(crate) enum CodecDepacketizer {
    Generic(GenericDepacketizer),
    H264(H264Depacketizer),
    Mpeg4Generic(Mpeg4GenericDepacketizer),
}

impl Packetizer for CodecPacketizer {
    fn input(
        &mut self,
        data: &[u8],
        timestamp: u32,
        handler: &mut dyn PayloadHandler,
    ) -> Result<(), PacketError> {
        use CodecPacketizer::*;
        match self {
            Generic(v) => v.input(data, timestamp, handler),
            H264(v) => v.input(data, timestamp, handler),
            Mpeg4Generic(v) => v.input(data, timestamp, handler),
        }
    }

    fn info(&self) -> (u16, u32) {
        use CodecPacketizer::*;
        match self {
            Generic(v) => v.info(),
            H264(v) => v.info(),
            Mpeg4Generic(v) => v.info(),
        }
    }
}

impl Depacketizer for CodecDepacketizer {
    fn input(
        &mut self,
        packet: &[u8],
        handler: &mut dyn PayloadHandler,
    ) -> Result<InputStatus, PacketError> {
        use CodecDepacketizer::*;
        match self {
            Generic(v) => v.input(packet, handler),
            H264(v) => v.input(packet, handler),
            Mpeg4Generic(v) => v.input(packet, handler),
        }
    }
}
