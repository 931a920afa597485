use crate::rtp::RtpPacket;

use super::PayloadHandler;

/// Slack added on top of the required size when the accumulation buffer
/// grows, to keep reallocations rare. Tunable per instance.
pub(crate) const DEFAULT_GROW_SLACK: usize = 8000;

/// Shared reassembly state for depacketizers that rebuild one frame from
/// several RTP packets.
///
/// Tracks sequence continuity, detects frame boundaries by timestamp change
/// and owns a growable accumulation buffer. The buffer never shrinks within
/// a session, and growing preserves all accumulated bytes.
#[derive(Debug)]
pub(crate) struct FrameAccumulator {
    primed: bool,
    /// Waiting out the remainder of a broken frame.
    lost: bool,
    /// Sticky loss flag, delivered with the next flushed frame.
    flag_lost: bool,
    seq: u16,
    timestamp: u32,
    buf: Vec<u8>,
    size: usize,
    slack: usize,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::with_slack(DEFAULT_GROW_SLACK)
    }

    pub fn with_slack(slack: usize) -> Self {
        FrameAccumulator {
            primed: false,
            lost: false,
            flag_lost: false,
            seq: 0,
            timestamp: 0,
            buf: Vec::new(),
            size: 0,
            slack,
        }
    }

    /// Sequence and timestamp bookkeeping for one incoming packet. Flushes
    /// the previous frame when the timestamp changes.
    pub fn check(&mut self, pkt: &RtpPacket, handler: &mut dyn PayloadHandler) {
        if !self.primed {
            self.primed = true;
            // Suppress a spurious loss signal on the very first packet and
            // force a frame boundary on the first timestamp comparison.
            self.seq = pkt.header.sequence_number.wrapping_sub(1);
            self.timestamp = pkt.header.timestamp.wrapping_add(1);
        }

        if pkt.header.sequence_number != self.seq.wrapping_add(1) {
            debug!(
                "sequence gap: {} -> {}",
                self.seq, pkt.header.sequence_number
            );
            self.size = 0;
            self.lost = true;
            self.flag_lost = true;
            self.timestamp = pkt.header.timestamp;
        }
        self.seq = pkt.header.sequence_number;

        if pkt.header.timestamp != self.timestamp {
            self.flush(handler);
        }
        self.timestamp = pkt.header.timestamp;
    }

    /// True while packets of a broken frame are still arriving.
    pub fn is_waiting(&self) -> bool {
        self.lost
    }

    /// Discard the accumulation and latch the loss flag.
    pub fn mark_lost(&mut self) {
        self.size = 0;
        self.lost = true;
        self.flag_lost = true;
    }

    /// Append payload bytes, growing the buffer when needed.
    pub fn write(&mut self, data: &[u8]) {
        if self.size + data.len() > self.buf.len() {
            let mut grown = vec![0; self.size + data.len() + self.slack];
            grown[..self.size].copy_from_slice(&self.buf[..self.size]);
            self.buf = grown;
        }
        self.buf[self.size..self.size + data.len()].copy_from_slice(data);
        self.size += data.len();
    }

    /// Deliver the accumulated frame, if any, and start a new one.
    pub fn flush(&mut self, handler: &mut dyn PayloadHandler) {
        if self.size > 0 {
            handler.handle(&self.buf[..self.size], self.timestamp, self.flag_lost);
            self.flag_lost = false;
        }
        self.lost = false;
        self.size = 0;
    }
}
