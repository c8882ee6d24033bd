// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! EAPOL framing (IEEE 802.1X-2010 §11.3) and the EAPOL-Key body
//! (IEEE 802.11-2016 §12.7.2)
//!
//! Parsing borrows from the received buffer; nothing is copied except the
//! fixed-size header fields.

use bytes::{Buf, BufMut};
use wisun_common::codec::{ensure_capacity, get_array, Result as CodecResult};
use wisun_common::{Codec, CodecError};

/// EAPOL protocol version sent in every frame
pub const EAPOL_PROTOCOL_VERSION: u8 = 3;

/// Version, packet type, body length
pub const EAPOL_HEADER_LEN: usize = 4;

/// EAPOL-Key body without key data
pub const EAPOL_KEY_FRAME_BASE_LEN: usize = 95;

/// EAPOL packet type: EAP
pub const EAPOL_EAP_TYPE: u8 = 0;

/// EAPOL packet type: EAPOL-Key
pub const EAPOL_KEY_TYPE: u8 = 3;

/// Key descriptor type: IEEE 802.11 (RSN)
pub const EAPOL_RSN_KEY_DESCRIPTOR: u8 = 2;

/// Key descriptor version: HMAC-SHA1-128 MIC, AES key wrap
pub const KEY_DESCRIPTOR_VERSION: u8 = 2;

const KEY_NONCE_LEN: usize = 32;
const KEY_IV_LEN: usize = 16;
const KEY_RSC_LEN: usize = 8;
const KEY_RESERVED_LEN: usize = 8;
const KEY_MIC_LEN: usize = 16;

/// EAPOL parsing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EapolError {
    /// Frame shorter than its header or declared body
    #[error("EAPOL frame truncated")]
    Truncated,
    /// Protocol version outside 1..=3
    #[error("unsupported EAPOL version {0}")]
    UnsupportedVersion(u8),
    /// EAPOL-Key descriptor other than RSN
    #[error("unsupported key descriptor {0}")]
    UnsupportedDescriptor(u8),
    /// Key data length runs past the end of the body
    #[error("key data length {0} overruns frame")]
    KeyDataOverrun(u16),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// EAPOL header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EapolHeader {
    pub protocol_version: u8,
    pub packet_type: u8,
    pub body_length: u16,
}

impl Codec for EapolHeader {
    fn encoded_len(&self) -> usize {
        EAPOL_HEADER_LEN
    }

    fn decode<B: Buf>(buf: &mut B) -> CodecResult<Self> {
        let [protocol_version, packet_type, hi, lo] = get_array::<_, 4>(buf)?;
        Ok(Self {
            protocol_version,
            packet_type,
            body_length: u16::from_be_bytes([hi, lo]),
        })
    }

    fn encode<B: BufMut>(&self, buf: &mut B) -> CodecResult<()> {
        ensure_capacity(buf, EAPOL_HEADER_LEN)?;
        buf.put_u8(self.protocol_version);
        buf.put_u8(self.packet_type);
        buf.put_u16(self.body_length);
        Ok(())
    }
}

/// Key Information field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyInformation {
    pub description_version: u8,
    pub pairwise_key: bool,
    pub install: bool,
    pub key_ack: bool,
    pub key_mic: bool,
    pub secured_key_frame: bool,
    pub error: bool,
    pub request: bool,
    pub encrypted_key_data: bool,
    pub smk_handshake: bool,
}

impl KeyInformation {
    const VERSION_MASK: u16 = 0x0007;
    const PAIRWISE: u16 = 1 << 3;
    const INSTALL: u16 = 1 << 6;
    const KEY_ACK: u16 = 1 << 7;
    const KEY_MIC: u16 = 1 << 8;
    const SECURE: u16 = 1 << 9;
    const ERROR: u16 = 1 << 10;
    const REQUEST: u16 = 1 << 11;
    const ENCRYPTED_KEY_DATA: u16 = 1 << 12;
    const SMK: u16 = 1 << 13;

    pub fn from_u16(value: u16) -> Self {
        let bit = |mask: u16| value & mask != 0;
        Self {
            // Masked to three bits
            description_version: (value & Self::VERSION_MASK) as u8,
            pairwise_key: bit(Self::PAIRWISE),
            install: bit(Self::INSTALL),
            key_ack: bit(Self::KEY_ACK),
            key_mic: bit(Self::KEY_MIC),
            secured_key_frame: bit(Self::SECURE),
            error: bit(Self::ERROR),
            request: bit(Self::REQUEST),
            encrypted_key_data: bit(Self::ENCRYPTED_KEY_DATA),
            smk_handshake: bit(Self::SMK),
        }
    }

    pub fn to_u16(self) -> u16 {
        let flag = |set: bool, mask: u16| if set { mask } else { 0 };
        (u16::from(self.description_version) & Self::VERSION_MASK)
            | flag(self.pairwise_key, Self::PAIRWISE)
            | flag(self.install, Self::INSTALL)
            | flag(self.key_ack, Self::KEY_ACK)
            | flag(self.key_mic, Self::KEY_MIC)
            | flag(self.secured_key_frame, Self::SECURE)
            | flag(self.error, Self::ERROR)
            | flag(self.request, Self::REQUEST)
            | flag(self.encrypted_key_data, Self::ENCRYPTED_KEY_DATA)
            | flag(self.smk_handshake, Self::SMK)
    }
}

/// EAPOL-Key frame body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EapolKeyFrame<'a> {
    pub key_information: KeyInformation,
    pub key_length: u16,
    pub replay_counter: u64,
    pub key_nonce: [u8; KEY_NONCE_LEN],
    pub key_iv: [u8; KEY_IV_LEN],
    pub key_rsc: [u8; KEY_RSC_LEN],
    pub key_mic: [u8; KEY_MIC_LEN],
    pub key_data: &'a [u8],
}

impl<'a> EapolKeyFrame<'a> {
    /// Initial-Key message: a key request with no install, not pairwise,
    /// replay counter zero and no key length
    pub fn initial_key(key_data: &'a [u8]) -> Self {
        Self {
            key_information: KeyInformation {
                description_version: KEY_DESCRIPTOR_VERSION,
                request: true,
                ..KeyInformation::default()
            },
            key_length: 0,
            replay_counter: 0,
            key_nonce: [0; KEY_NONCE_LEN],
            key_iv: [0; KEY_IV_LEN],
            key_rsc: [0; KEY_RSC_LEN],
            key_mic: [0; KEY_MIC_LEN],
            key_data,
        }
    }

    /// Body length (descriptor type through key data)
    pub fn encoded_len(&self) -> usize {
        EAPOL_KEY_FRAME_BASE_LEN + self.key_data.len()
    }

    fn parse(body: &'a [u8]) -> Result<Self, EapolError> {
        if body.len() < EAPOL_KEY_FRAME_BASE_LEN {
            return Err(EapolError::Truncated);
        }
        let (mut fixed, rest) = body.split_at(EAPOL_KEY_FRAME_BASE_LEN);
        let descriptor = fixed.get_u8();
        if descriptor != EAPOL_RSN_KEY_DESCRIPTOR {
            return Err(EapolError::UnsupportedDescriptor(descriptor));
        }
        let key_information = KeyInformation::from_u16(fixed.get_u16());
        let key_length = fixed.get_u16();
        let replay_counter = fixed.get_u64();
        let key_nonce = get_array(&mut fixed)?;
        let key_iv = get_array(&mut fixed)?;
        let key_rsc = get_array(&mut fixed)?;
        fixed.advance(KEY_RESERVED_LEN);
        let key_mic = get_array(&mut fixed)?;
        let key_data_length = fixed.get_u16();
        let key_data = rest
            .get(..usize::from(key_data_length))
            .ok_or(EapolError::KeyDataOverrun(key_data_length))?;
        Ok(Self {
            key_information,
            key_length,
            replay_counter,
            key_nonce,
            key_iv,
            key_rsc,
            key_mic,
            key_data,
        })
    }

    fn write<B: BufMut>(&self, buf: &mut B) -> CodecResult<()> {
        let key_data_length =
            u16::try_from(self.key_data.len()).map_err(|_| CodecError::BufferFull)?;
        ensure_capacity(buf, self.encoded_len())?;
        buf.put_u8(EAPOL_RSN_KEY_DESCRIPTOR);
        buf.put_u16(self.key_information.to_u16());
        buf.put_u16(self.key_length);
        buf.put_u64(self.replay_counter);
        buf.put_slice(&self.key_nonce);
        buf.put_slice(&self.key_iv);
        buf.put_slice(&self.key_rsc);
        buf.put_bytes(0, KEY_RESERVED_LEN);
        buf.put_slice(&self.key_mic);
        buf.put_u16(key_data_length);
        buf.put_slice(self.key_data);
        Ok(())
    }
}

/// Body of a received EAPOL PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EapolBody<'a> {
    Key(EapolKeyFrame<'a>),
    /// Any other packet type, body left unparsed
    Other(&'a [u8]),
}

/// A received EAPOL PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EapolPdu<'a> {
    pub header: EapolHeader,
    pub body: EapolBody<'a>,
}

impl<'a> EapolPdu<'a> {
    pub fn key_frame(&self) -> Option<&EapolKeyFrame<'a>> {
        match &self.body {
            EapolBody::Key(frame) => Some(frame),
            EapolBody::Other(_) => None,
        }
    }
}

/// Parse an EAPOL PDU
///
/// Bytes past the declared body length are ignored.
///
/// # Errors
///
/// `EapolError` if the header or body is malformed
pub fn parse_pdu(data: &[u8]) -> Result<EapolPdu<'_>, EapolError> {
    let mut buf = data;
    let header = EapolHeader::decode(&mut buf).map_err(|_| EapolError::Truncated)?;
    if !(1..=EAPOL_PROTOCOL_VERSION).contains(&header.protocol_version) {
        return Err(EapolError::UnsupportedVersion(header.protocol_version));
    }
    let body = buf
        .get(..usize::from(header.body_length))
        .ok_or(EapolError::Truncated)?;
    let body = if header.packet_type == EAPOL_KEY_TYPE {
        EapolBody::Key(EapolKeyFrame::parse(body)?)
    } else {
        EapolBody::Other(body)
    };
    Ok(EapolPdu { header, body })
}

/// Length of a complete EAPOL-Key PDU carrying `frame`
pub fn key_pdu_len(frame: &EapolKeyFrame<'_>) -> usize {
    EAPOL_HEADER_LEN + frame.encoded_len()
}

/// Write a complete EAPOL-Key PDU (header and body)
///
/// # Errors
///
/// `CodecError::BufferFull` if `buf` cannot hold the PDU; nothing is written
pub fn write_key_pdu<B: BufMut>(frame: &EapolKeyFrame<'_>, buf: &mut B) -> CodecResult<()> {
    let body_length = u16::try_from(frame.encoded_len()).map_err(|_| CodecError::BufferFull)?;
    ensure_capacity(buf, key_pdu_len(frame))?;
    EapolHeader {
        protocol_version: EAPOL_PROTOCOL_VERSION,
        packet_type: EAPOL_KEY_TYPE,
        body_length,
    }
    .encode(buf)?;
    frame.write(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_information_bits() {
        let info = KeyInformation {
            description_version: 2,
            request: true,
            ..KeyInformation::default()
        };
        assert_eq!(info.to_u16(), 0x0802);
        let decoded = KeyInformation::from_u16(0x1382);
        assert_eq!(decoded.description_version, 2);
        assert!(decoded.key_ack);
        assert!(decoded.key_mic);
        assert!(decoded.secured_key_frame);
        assert!(decoded.encrypted_key_data);
        assert!(!decoded.install);
        assert!(!decoded.pairwise_key);
    }

    #[test]
    fn test_initial_key_pdu_layout() {
        let key_data = [0xdd, 0x05, 0x0c, 0x5a, 0x9e, 0x02, 0x01];
        let frame = EapolKeyFrame::initial_key(&key_data);
        let mut buf = [0u8; EAPOL_HEADER_LEN + EAPOL_KEY_FRAME_BASE_LEN + 7];
        let mut out: &mut [u8] = &mut buf;
        write_key_pdu(&frame, &mut out).unwrap();
        assert_eq!(&buf[..4], &[3, 3, 0, 102]);
        assert_eq!(buf[4], EAPOL_RSN_KEY_DESCRIPTOR);
        assert_eq!(&buf[5..7], &[0x08, 0x02]);
        assert_eq!(&buf[97..99], &[0, 7]);
        assert_eq!(&buf[99..], &key_data);

        let pdu = parse_pdu(&buf).unwrap();
        assert_eq!(pdu.key_frame(), Some(&frame));
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let frame = EapolKeyFrame::initial_key(&[]);
        let mut buf = [0xeeu8; EAPOL_HEADER_LEN + EAPOL_KEY_FRAME_BASE_LEN + 3];
        let mut out: &mut [u8] = &mut buf;
        write_key_pdu(&frame, &mut out).unwrap();
        let pdu = parse_pdu(&buf).unwrap();
        assert_eq!(pdu.key_frame().map(|f| f.key_data.len()), Some(0));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_pdu(&[3, 3, 0]), Err(EapolError::Truncated));
        assert_eq!(parse_pdu(&[4, 3, 0, 0]), Err(EapolError::UnsupportedVersion(4)));
        assert_eq!(parse_pdu(&[3, 3, 0, 10, 2]), Err(EapolError::Truncated));
        assert_eq!(parse_pdu(&[3, 3, 0, 1, 2]), Err(EapolError::Truncated));

        let mut buf = [0u8; EAPOL_HEADER_LEN + EAPOL_KEY_FRAME_BASE_LEN];
        let mut out: &mut [u8] = &mut buf;
        write_key_pdu(&EapolKeyFrame::initial_key(&[]), &mut out).unwrap();
        buf[4] = 254;
        assert_eq!(parse_pdu(&buf), Err(EapolError::UnsupportedDescriptor(254)));
        buf[4] = EAPOL_RSN_KEY_DESCRIPTOR;
        buf[EAPOL_HEADER_LEN + EAPOL_KEY_FRAME_BASE_LEN - 1] = 1;
        assert_eq!(parse_pdu(&buf), Err(EapolError::KeyDataOverrun(1)));
    }

    #[test]
    fn test_parse_other_packet_type() {
        let pdu = parse_pdu(&[3, EAPOL_EAP_TYPE, 0, 2, 0xaa, 0xbb]).unwrap();
        assert_eq!(pdu.body, EapolBody::Other(&[0xaa, 0xbb]));
        assert!(pdu.key_frame().is_none());
    }

    #[test]
    fn test_write_into_short_buffer_fails() {
        let frame = EapolKeyFrame::initial_key(&[]);
        let mut buf = [0u8; EAPOL_KEY_FRAME_BASE_LEN];
        let mut out: &mut [u8] = &mut buf;
        assert_eq!(write_key_pdu(&frame, &mut out), Err(CodecError::BufferFull));
        assert_eq!(buf, [0u8; EAPOL_KEY_FRAME_BASE_LEN]);
    }
}
