use super::{RtpError, RtpHeader, RTP_FIXED_HEADER, RTP_VERSION};

/// RTP header extension block (RFC 3550 §5.3.1).
///
/// ```text
///  0               1               2               3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      defined by profile       |           length              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        header extension                       |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpExtension<'a> {
    /// The 16 bit "defined by profile" field.
    pub reserved: u16,
    /// Raw extension bytes. The length must be a multiple of 4.
    pub data: &'a [u8],
}

/// One RTP packet. Borrows the payload and extension bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket<'a> {
    /// The fixed header fields.
    pub header: RtpHeader,
    /// Contributing sources, up to 15 entries.
    pub csrc: Vec<u32>,
    /// Header extension, present when the X bit is set.
    pub extension: Option<RtpExtension<'a>>,
    /// Payload with any padding already subtracted.
    pub payload: &'a [u8],
}

impl<'a> RtpPacket<'a> {
    /// Parse an RTP packet per RFC 3550 §5.1.
    pub fn deserialize(data: &'a [u8]) -> Result<RtpPacket<'a>, RtpError> {
        let header = RtpHeader::parse(data)?;

        let csrc_len = header.csrc_count as usize * 4;
        let mut need = RTP_FIXED_HEADER + csrc_len;
        if header.has_extension {
            need += 4;
        }
        if header.has_padding {
            need += 1;
        }
        if data.len() < need {
            trace!("RTP packet shorter than declared contents");
            return Err(RtpError::InsufficientBytes);
        }

        let mut csrc = Vec::with_capacity(header.csrc_count as usize);
        for i in 0..header.csrc_count as usize {
            let at = RTP_FIXED_HEADER + i * 4;
            csrc.push(u32::from_be_bytes([
                data[at],
                data[at + 1],
                data[at + 2],
                data[at + 3],
            ]));
        }

        let mut payload = &data[RTP_FIXED_HEADER + csrc_len..];

        let extension = if header.has_extension {
            let reserved = u16::from_be_bytes([payload[0], payload[1]]);
            let ext_len = u16::from_be_bytes([payload[2], payload[3]]) as usize * 4;
            if ext_len + 4 > payload.len() {
                trace!("RTP extension larger than payload: {}", ext_len);
                return Err(RtpError::PayloadTooShort);
            }
            let ext = RtpExtension {
                reserved,
                data: &payload[4..4 + ext_len],
            };
            payload = &payload[4 + ext_len..];
            Some(ext)
        } else {
            None
        };

        if header.has_padding {
            // The last byte of the buffer is the padding length, which
            // includes the length byte itself.
            let padding = data[data.len() - 1] as usize;
            if payload.len() < padding {
                trace!("RTP padding larger than payload: {}", padding);
                return Err(RtpError::PayloadTooShort);
            }
            payload = &payload[..payload.len() - padding];
        }

        Ok(RtpPacket {
            header,
            csrc,
            extension,
            payload,
        })
    }

    /// Serialize the fixed header, CSRC list and extension into `out`.
    /// Returns the number of bytes written.
    pub fn serialize_header(&self, out: &mut [u8]) -> Result<usize, RtpError> {
        if self.header.version != RTP_VERSION {
            return Err(RtpError::VersionMismatch);
        }

        let ext_len = self.extension.map(|e| e.data.len()).unwrap_or(0);
        if ext_len % 4 != 0 {
            return Err(RtpError::ExtensionMisaligned);
        }

        let mut head_len = RTP_FIXED_HEADER + 4 * self.csrc.len();
        if self.extension.is_some() {
            head_len += 4;
        }
        if out.len() < head_len + ext_len {
            return Err(RtpError::BufferTooSmall);
        }

        // The CC and X fields mirror what is actually serialized.
        let mut header = self.header.clone();
        header.csrc_count = self.csrc.len() as u8;
        header.has_extension = self.extension.is_some();
        header.write_to(out);

        let mut at = RTP_FIXED_HEADER;
        for c in &self.csrc {
            out[at..at + 4].copy_from_slice(&c.to_be_bytes());
            at += 4;
        }

        if let Some(ext) = &self.extension {
            out[at..at + 2].copy_from_slice(&ext.reserved.to_be_bytes());
            let words = (ext.data.len() / 4) as u16;
            out[at + 2..at + 4].copy_from_slice(&words.to_be_bytes());
            out[at + 4..at + 4 + ext.data.len()].copy_from_slice(ext.data);
            at += 4 + ext.data.len();
        }

        Ok(at)
    }

    /// Serialize header and payload into `out`. Returns the number of bytes
    /// written.
    pub fn serialize(&self, out: &mut [u8]) -> Result<usize, RtpError> {
        let head_len = self.serialize_header(out)?;
        if head_len + self.payload.len() > out.len() {
            return Err(RtpError::BufferTooSmall);
        }
        out[head_len..head_len + self.payload.len()].copy_from_slice(self.payload);
        Ok(head_len + self.payload.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn packet_with(payload: &[u8]) -> RtpPacket<'_> {
        RtpPacket {
            header: RtpHeader {
                marker: true,
                payload_type: 96.into(),
                sequence_number: 47_000,
                timestamp: 3_000_000_000,
                ssrc: 0xDEAD_BEEF_u32.into(),
                ..Default::default()
            },
            csrc: vec![],
            extension: None,
            payload,
        }
    }

    #[test]
    fn header_round_trip_with_csrc_and_extension() {
        let ext_data = [1, 2, 3, 4, 5, 6, 7, 8];
        let payload = [0xAA, 0xBB, 0xCC];

        let mut pkt = packet_with(&payload);
        pkt.csrc = vec![0x1111_1111, 0x2222_2222];
        pkt.extension = Some(RtpExtension {
            reserved: 0xBEDE,
            data: &ext_data,
        });

        let mut buf = [0u8; 64];
        let n = pkt.serialize(&mut buf).unwrap();
        // 12 fixed + 8 csrc + 4 ext header + 8 ext data + 3 payload
        assert_eq!(n, 35);

        let parsed = RtpPacket::deserialize(&buf[..n]).unwrap();
        assert_eq!(parsed.header.sequence_number, 47_000);
        assert_eq!(parsed.header.timestamp, 3_000_000_000);
        assert_eq!(parsed.header.csrc_count, 2);
        assert_eq!(parsed.csrc, vec![0x1111_1111, 0x2222_2222]);
        assert_eq!(
            parsed.extension,
            Some(RtpExtension {
                reserved: 0xBEDE,
                data: &ext_data,
            })
        );
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn deserialize_subtracts_padding() {
        let pkt = packet_with(&[1, 2, 3, 4, 0, 0, 0, 4]);
        let mut buf = [0u8; 32];
        let n = pkt.serialize(&mut buf).unwrap();

        // Flip the padding bit. The last payload byte (4) is the pad length.
        buf[0] |= 0b0010_0000;

        let parsed = RtpPacket::deserialize(&buf[..n]).unwrap();
        assert_eq!(parsed.payload, &[1, 2, 3, 4]);
    }

    #[test]
    fn deserialize_rejects_excess_padding() {
        let pkt = packet_with(&[200]);
        let mut buf = [0u8; 16];
        let n = pkt.serialize(&mut buf).unwrap();

        buf[0] |= 0b0010_0000;

        assert_eq!(
            RtpPacket::deserialize(&buf[..n]),
            Err(RtpError::PayloadTooShort)
        );
    }

    #[test]
    fn deserialize_rejects_truncated_csrc() {
        // CC says 2 entries but none follow.
        let buf = [0x82, 0x60, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            RtpPacket::deserialize(&buf),
            Err(RtpError::InsufficientBytes)
        );
    }

    #[test]
    fn deserialize_rejects_oversized_extension() {
        let pkt = packet_with(&[]);
        let mut buf = [0u8; 16];
        let n = pkt.serialize(&mut buf).unwrap();

        // X bit set, but the declared extension length exceeds the packet.
        buf[0] |= 0b0001_0000;
        let mut data = buf[..n].to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0xFF]);

        assert_eq!(
            RtpPacket::deserialize(&data),
            Err(RtpError::PayloadTooShort)
        );
    }

    #[test]
    fn serialize_rejects_misaligned_extension() {
        let ext_data = [1, 2, 3];
        let mut pkt = packet_with(&[]);
        pkt.extension = Some(RtpExtension {
            reserved: 0,
            data: &ext_data,
        });

        let mut buf = [0u8; 32];
        assert_eq!(
            pkt.serialize(&mut buf),
            Err(RtpError::ExtensionMisaligned)
        );
    }

    #[test]
    fn serialize_rejects_small_buffer() {
        let payload = [0u8; 10];
        let pkt = packet_with(&payload);
        let mut buf = [0u8; 15];
        assert_eq!(pkt.serialize(&mut buf), Err(RtpError::BufferTooSmall));
    }
}
