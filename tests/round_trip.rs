use std::sync::Once;

use rtp_payload::rtp::Ssrc;
use rtp_payload::{Codec, InputStatus, PacketError, PayloadHandler, PayloadSession};

pub fn init_log() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    static START: Once = Once::new();

    START.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    });
}

/// Collects everything a session delivers.
#[derive(Debug, Default)]
struct Sink {
    delivered: Vec<(Vec<u8>, u32, bool)>,
}

impl Sink {
    fn data(&self) -> Vec<Vec<u8>> {
        self.delivered.iter().map(|(d, _, _)| d.clone()).collect()
    }
}

impl PayloadHandler for Sink {
    fn alloc(&mut self, bytes: usize) -> Option<Vec<u8>> {
        Some(vec![0; bytes])
    }

    fn free(&mut self, _buf: Vec<u8>) {}

    fn handle(&mut self, data: &[u8], timestamp: u32, lost: bool) {
        self.delivered.push((data.to_vec(), timestamp, lost));
    }
}

#[test]
fn h264_round_trip_with_fragmentation() {
    init_log();

    let mut sender = PayloadSession::new(96, "H264", 100, 0x1234_5678_u32.into(), 60).unwrap();
    let mut receiver = PayloadSession::new(96, "H264", 0, 0x1234_5678_u32.into(), 60).unwrap();

    // Three NAL units: SPS, PPS and a coded slice too large for one packet.
    let sps = [0x67, 0x42, 0xC0, 0x1F];
    let pps = [0x68, 0xCE, 0x3C, 0x80];
    let slice: Vec<u8> = std::iter::once(0x65)
        .chain((0..300).map(|i| (i % 251) as u8))
        .collect();

    let mut stream = Vec::new();
    for nalu in [&sps[..], &pps[..], &slice] {
        stream.extend_from_slice(&[0, 0, 0, 1]);
        stream.extend_from_slice(nalu);
    }

    let mut packets = Sink::default();
    sender.pack(&stream, 90_000, &mut packets).unwrap();
    assert!(packets.delivered.len() > 3, "the slice must fragment");

    let mut frames = Sink::default();
    for (p, _, _) in &packets.delivered {
        receiver.unpack(p, &mut frames).unwrap();
    }

    assert_eq!(frames.data(), vec![sps.to_vec(), pps.to_vec(), slice]);
    assert!(
        frames.delivered.iter().all(|(_, ts, lost)| *ts == 90_000 && !lost),
        "no loss, one timestamp"
    );
}

#[test]
fn h264_sequence_gap_sets_loss_flag() {
    init_log();

    let mut sender = PayloadSession::new(96, "H264", 100, 0x42_u32.into(), 40).unwrap();
    let mut receiver = PayloadSession::new(96, "H264", 0, 0x42_u32.into(), 40).unwrap();

    let mut frames = Sink::default();

    // First frame: fragmented, middle packet dropped.
    let slice_a: Vec<u8> = std::iter::once(0x65).chain((0..120).map(|_| 0xA0)).collect();
    let mut stream = vec![0, 0, 1];
    stream.extend_from_slice(&slice_a);

    let mut packets = Sink::default();
    sender.pack(&stream, 90_000, &mut packets).unwrap();
    assert!(packets.delivered.len() >= 3);

    for (i, (p, _, _)) in packets.delivered.iter().enumerate() {
        if i == 1 {
            continue; // lost in transit
        }
        // The fragment after the gap is rejected as lost.
        let _ = receiver.unpack(p, &mut frames);
    }
    assert!(frames.delivered.is_empty(), "broken frame is not delivered");

    // Second frame arrives intact and carries the loss flag.
    let mut packets = Sink::default();
    sender
        .pack(&[0, 0, 1, 0x65, 1, 2, 3], 93_600, &mut packets)
        .unwrap();
    for (p, _, _) in &packets.delivered {
        receiver.unpack(p, &mut frames).unwrap();
    }

    assert_eq!(frames.delivered, vec![(vec![0x65, 1, 2, 3], 93_600, true)]);
}

#[test]
fn aac_round_trip() {
    init_log();

    let mut sender =
        PayloadSession::new(97, "mpeg4-generic", 1, 0x42_u32.into(), 1400).unwrap();
    let mut receiver = PayloadSession::new(97, "AAC", 0, 0x42_u32.into(), 1400).unwrap();

    let mut frames = Sink::default();
    for (i, ts) in [44_100u32, 45_124, 46_148].into_iter().enumerate() {
        let au: Vec<u8> = (0..64).map(|b| (b + i) as u8).collect();

        let mut packets = Sink::default();
        sender.pack(&au, ts, &mut packets).unwrap();
        assert_eq!(packets.delivered.len(), 1);

        let status = receiver.unpack(&packets.delivered[0].0, &mut frames).unwrap();
        assert_eq!(status, InputStatus::Handled);
        assert_eq!(frames.delivered.last(), Some(&(au, ts, false)));
    }
    assert_eq!(frames.delivered.len(), 3);
}

#[test]
fn aac_fragmentation_marks_the_final_packet() {
    init_log();

    // 20-byte chunks force a 64-byte AU across four packets.
    let mut sender = PayloadSession::new(97, "AAC", 1, 0x42_u32.into(), 36).unwrap();

    let au: Vec<u8> = (0..64).map(|_| fastrand::u8(..)).collect();

    let mut packets = Sink::default();
    sender.pack(&au, 44_100, &mut packets).unwrap();
    assert_eq!(packets.delivered.len(), 4);

    let mut concat = Vec::new();
    for (i, (p, _, _)) in packets.delivered.iter().enumerate() {
        let pkt = rtp_payload::RtpPacket::deserialize(p).unwrap();
        assert_eq!(pkt.header.marker, i == 3, "marker on the final fragment");
        assert_eq!(pkt.header.sequence_number, 1 + i as u16);
        // Every fragment declares the whole access unit's size.
        assert_eq!(&pkt.payload[..4], &[0, 16, (64 >> 5) as u8, (64 & 0x1F) << 3]);
        concat.extend_from_slice(&pkt.payload[4..]);
    }
    assert_eq!(concat, au);
}

#[test]
fn generic_chunking_round_trip() {
    init_log();

    let mut sender = PayloadSession::new(8, "", 500, 0x42_u32.into(), 172).unwrap();
    let mut receiver = PayloadSession::new(8, "", 0, 0x42_u32.into(), 172).unwrap();

    let samples: Vec<u8> = (0..480).map(|_| fastrand::u8(..)).collect();

    let mut packets = Sink::default();
    sender.pack(&samples, 8000, &mut packets).unwrap();
    assert_eq!(packets.delivered.len(), 3, "160-byte chunks");

    let mut out = Sink::default();
    for (p, _, _) in &packets.delivered {
        receiver.unpack(p, &mut out).unwrap();
    }

    let concat: Vec<u8> = out.data().concat();
    assert_eq!(concat, samples);
}

#[test]
fn generic_packer_is_one_shot() {
    init_log();

    let mut sender = PayloadSession::new(0, "", 0, 0x42_u32.into(), 172).unwrap();
    let mut packets = Sink::default();

    sender.pack(&[1, 2, 3], 8000, &mut packets).unwrap();
    assert_eq!(
        sender.pack(&[4, 5, 6], 16_000, &mut packets),
        Err(PacketError::NotFirstPacket)
    );
}

#[test]
fn session_construction_errors() {
    init_log();

    let ssrc = 0x42_u32.into();

    assert!(matches!(
        PayloadSession::new(96, "H265", 0, ssrc, 1400),
        Err(PacketError::UnsupportedEncoding(_))
    ));
    assert!(matches!(
        PayloadSession::new(96, "VP8", 0, ssrc, 1400),
        Err(PacketError::UnsupportedEncoding(_))
    ));
    assert!(matches!(
        PayloadSession::new(200, "H264", 0, ssrc, 1400),
        Err(PacketError::UnsupportedPayload(200))
    ));
    assert!(matches!(
        PayloadSession::new(42, "", 0, ssrc, 1400),
        Err(PacketError::UnsupportedPayload(42))
    ));

    assert_eq!(
        PayloadSession::new(97, "AAC", 0, ssrc, 1400).unwrap().codec(),
        Codec::Mpeg4Generic
    );
}

#[test]
fn random_ssrc_is_carried_in_packed_headers() {
    init_log();

    let ssrc = Ssrc::new();
    let mut sender = PayloadSession::new(96, "H264", 0, ssrc, 1400).unwrap();
    let mut receiver = PayloadSession::new(96, "H264", 0, Ssrc::default(), 1400).unwrap();

    let mut packets = Sink::default();
    sender.pack(&[0, 0, 1, 0x65, 1, 2], 90_000, &mut packets).unwrap();

    let pkt = rtp_payload::RtpPacket::deserialize(&packets.delivered[0].0).unwrap();
    assert_eq!(pkt.header.ssrc, ssrc);

    let mut frames = Sink::default();
    receiver.unpack(&packets.delivered[0].0, &mut frames).unwrap();
    assert_eq!(frames.delivered, vec![(vec![0x65, 1, 2], 90_000, false)]);
}

#[test]
fn packer_info_tracks_sequence_and_timestamp() {
    init_log();

    let mut sender = PayloadSession::new(96, "H264", 65_534, 0x42_u32.into(), 1400).unwrap();
    assert_eq!(sender.packer_info(), (65_534, 0));

    let mut packets = Sink::default();
    let stream = [0, 0, 1, 0x67, 0xAA, 0, 0, 1, 0x68, 0xBB, 0, 0, 1, 0x65, 0xCC];
    sender.pack(&stream, 90_000, &mut packets).unwrap();

    assert_eq!(packets.delivered.len(), 3);
    // 65534, 65535, wrap to 0; next is 1.
    assert_eq!(sender.packer_info(), (1, 90_000));
}
