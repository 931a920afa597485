//! Sans-IO RTP payload packetization.
//!
//! Packetizes elementary media streams into RTP packets per [RFC 3550], and
//! reassembles received RTP packets back into frames or access units.
//! Supported payload formats:
//!
//! * H.264 Annex-B video ([RFC 6184]): single NAL unit packets and FU-A
//!   fragmentation on the sending side; single NAL, STAP-A/B, MTAP16/24 and
//!   FU-A/B on the receiving side.
//! * mpeg4-generic (AAC) audio ([RFC 3640]): AU-header wrapping with
//!   optional ADTS handling.
//! * Codecs without internal payload structure (the G.711/G.722/G.729/G.726
//!   family): plain fixed-size chunking.
//!
//! This is a Sans I/O library: there are no sockets, no threads and no async
//! tasks. The caller supplies transport and buffers through the
//! [`PayloadHandler`] callbacks, and drives everything by calling
//! [`PayloadSession::pack`] and [`PayloadSession::unpack`].
//!
//! ```
//! use rtp_payload::{PayloadHandler, PayloadSession};
//!
//! struct Sink(Vec<Vec<u8>>);
//!
//! impl PayloadHandler for Sink {
//!     fn alloc(&mut self, bytes: usize) -> Option<Vec<u8>> {
//!         Some(vec![0; bytes])
//!     }
//!     fn free(&mut self, _buf: Vec<u8>) {}
//!     fn handle(&mut self, data: &[u8], _timestamp: u32, _lost: bool) {
//!         self.0.push(data.to_vec());
//!     }
//! }
//!
//! let mut session = PayloadSession::new(96, "H264", 1000, 0x1234_5678_u32.into(), 1400).unwrap();
//!
//! let mut sink = Sink(Vec::new());
//! let annex_b = [0x00, 0x00, 0x01, 0x65, 0x88, 0x84, 0x21];
//! session.pack(&annex_b, 90_000, &mut sink).unwrap();
//!
//! // One NAL unit small enough for a single RTP packet.
//! assert_eq!(sink.0.len(), 1);
//! ```
//!
//! [RFC 3550]: https://tools.ietf.org/html/rfc3550
//! [RFC 6184]: https://tools.ietf.org/html/rfc6184
//! [RFC 3640]: https://tools.ietf.org/html/rfc3640

#![forbid(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod packet;
pub mod rtp;

pub use packet::{Codec, Depacketizer, InputStatus, PacketError, Packetizer};
pub use packet::{PayloadHandler, PayloadSession};
pub use rtp::{RtpError, RtpHeader, RtpPacket};
