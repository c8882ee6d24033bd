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

//! Key Descriptor Element (KDE) codec
//!
//! KDEs ride in the key data field of an EAPOL-Key frame. Each one is an
//! IEEE 802.11 vendor specific element:
//!
//! ```text
//! +------+-----+-----------+-----------+-----------------+
//! | 0xDD | len | OUI (3 B) | type (1B) | data (len-4 B)  |
//! +------+-----+-----------+-----------+-----------------+
//! ```
//!
//! Encoding always emits PMKID, PTKID, GTKL, Node Role, LGTKL in that order.
//! Decoding walks the block once and keeps the first occurrence of each KDE,
//! so the physical order on the wire does not matter.

use bytes::BufMut;
use heapless::Vec;
use wisun_common::codec::{ensure_capacity, get_array, Result as CodecResult};
use wisun_common::CodecError;
use wisun_crypto::{KeyId, KEY_ID_LEN};

/// Element ID of a vendor specific element (all KDEs)
pub const KDE_TYPE: u8 = 0xdd;

/// IEEE 802.11 OUI
pub const IEEE_802_11_OUI: [u8; 3] = [0x00, 0x0f, 0xac];

/// Wi-SUN Alliance OUI
pub const WISUN_OUI: [u8; 3] = [0x0c, 0x5a, 0x9e];

/// Element ID + length
const KDE_HEADER_LEN: usize = 2;

/// OUI + data type
const KDE_SELECTOR_LEN: usize = 4;

pub const KDE_PMKID_LEN: usize = KDE_HEADER_LEN + KDE_SELECTOR_LEN + KEY_ID_LEN;
pub const KDE_PTKID_LEN: usize = KDE_HEADER_LEN + KDE_SELECTOR_LEN + KEY_ID_LEN;
pub const KDE_GTKL_LEN: usize = KDE_HEADER_LEN + KDE_SELECTOR_LEN + 1;
pub const KDE_NR_LEN: usize = KDE_HEADER_LEN + KDE_SELECTOR_LEN + 1;
pub const KDE_LGTKL_LEN: usize = KDE_HEADER_LEN + KDE_SELECTOR_LEN + 1;

/// Largest KDE block the Initial-Key message can carry
pub const KDE_MAX_LEN: usize =
    KDE_PMKID_LEN + KDE_PTKID_LEN + KDE_GTKL_LEN + KDE_NR_LEN + KDE_LGTKL_LEN;

/// KDE decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KdeError {
    /// An element's length field runs past the end of the key data
    #[error("element at offset {offset} overruns key data")]
    Truncated { offset: usize },
    /// A known KDE is shorter than its fixed payload
    #[error("{kind:?} KDE too short ({len} bytes)")]
    TooShort { kind: KdeKind, len: usize },
    /// Encoding buffer exhausted
    #[error("KDE buffer full")]
    BufferFull,
}

impl From<CodecError> for KdeError {
    fn from(_: CodecError) -> Self {
        KdeError::BufferFull
    }
}

/// The KDEs this layer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdeKind {
    Pmkid,
    Ptkid,
    Gtkl,
    NodeRole,
    Lgtkl,
}

impl KdeKind {
    fn oui(self) -> [u8; 3] {
        match self {
            Self::Pmkid => IEEE_802_11_OUI,
            Self::Ptkid | Self::Gtkl | Self::NodeRole | Self::Lgtkl => WISUN_OUI,
        }
    }

    fn data_type(self) -> u8 {
        match self {
            Self::Pmkid => 4,
            Self::Ptkid => 1,
            Self::Gtkl => 2,
            Self::NodeRole => 3,
            Self::Lgtkl => 4,
        }
    }

    fn data_len(self) -> usize {
        match self {
            Self::Pmkid | Self::Ptkid => KEY_ID_LEN,
            Self::Gtkl | Self::NodeRole | Self::Lgtkl => 1,
        }
    }

    fn matches(self, oui: &[u8], data_type: u8) -> bool {
        oui == self.oui() && data_type == self.data_type()
    }

    fn from_selector(oui: &[u8], data_type: u8) -> Option<Self> {
        [
            Self::Pmkid,
            Self::Ptkid,
            Self::Gtkl,
            Self::NodeRole,
            Self::Lgtkl,
        ]
        .into_iter()
        .find(|k| k.matches(oui, data_type))
    }
}

/// Split a known KDE into its kind and payload
fn element_kind(id: u8, body: &[u8]) -> Option<(KdeKind, &[u8])> {
    if id != KDE_TYPE || body.len() < KDE_SELECTOR_LEN {
        return None;
    }
    let (selector, payload) = body.split_at(KDE_SELECTOR_LEN);
    KdeKind::from_selector(&selector[..3], selector[3]).map(|kind| (kind, payload))
}

/// One typed Key Descriptor Element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kde {
    Pmkid(KeyId),
    Ptkid(KeyId),
    Gtkl(u8),
    NodeRole(u8),
    Lgtkl(u8),
}

impl Kde {
    pub fn kind(&self) -> KdeKind {
        match self {
            Self::Pmkid(_) => KdeKind::Pmkid,
            Self::Ptkid(_) => KdeKind::Ptkid,
            Self::Gtkl(_) => KdeKind::Gtkl,
            Self::NodeRole(_) => KdeKind::NodeRole,
            Self::Lgtkl(_) => KdeKind::Lgtkl,
        }
    }

    fn data(&self) -> &[u8] {
        match self {
            Self::Pmkid(id) | Self::Ptkid(id) => id,
            Self::Gtkl(v) | Self::NodeRole(v) | Self::Lgtkl(v) => core::slice::from_ref(v),
        }
    }

    /// Wire length of this element
    pub fn encoded_len(&self) -> usize {
        KDE_HEADER_LEN + KDE_SELECTOR_LEN + self.kind().data_len()
    }

    /// Write this element
    ///
    /// # Errors
    ///
    /// `CodecError::BufferFull` if `buf` cannot take the whole element;
    /// nothing is written in that case.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> CodecResult<()> {
        ensure_capacity(buf, self.encoded_len())?;
        let kind = self.kind();
        buf.put_u8(KDE_TYPE);
        // Fixed payloads are at most 20 bytes
        buf.put_u8((KDE_SELECTOR_LEN + kind.data_len()) as u8);
        buf.put_slice(&kind.oui());
        buf.put_u8(kind.data_type());
        buf.put_slice(self.data());
        Ok(())
    }

    /// Decode one element from its ID and body
    ///
    /// `Ok(None)` for anything that is not a KDE this layer knows: other
    /// element IDs, bodies without a full selector, unknown OUI or type.
    /// Payload bytes past the fixed length are ignored.
    ///
    /// # Errors
    ///
    /// `KdeError::TooShort` if a known KDE is shorter than its fixed payload
    pub fn from_element(id: u8, body: &[u8]) -> core::result::Result<Option<Self>, KdeError> {
        match element_kind(id, body) {
            Some((kind, payload)) => Self::from_data(kind, payload).map(Some),
            None => Ok(None),
        }
    }

    fn from_data(kind: KdeKind, data: &[u8]) -> core::result::Result<Self, KdeError> {
        let mut buf = data;
        let short = |_| KdeError::TooShort {
            kind,
            len: data.len(),
        };
        Ok(match kind {
            KdeKind::Pmkid => Self::Pmkid(get_array(&mut buf).map_err(short)?),
            KdeKind::Ptkid => Self::Ptkid(get_array(&mut buf).map_err(short)?),
            KdeKind::Gtkl => Self::Gtkl(get_array::<_, 1>(&mut buf).map_err(short)?[0]),
            KdeKind::NodeRole => Self::NodeRole(get_array::<_, 1>(&mut buf).map_err(short)?[0]),
            KdeKind::Lgtkl => Self::Lgtkl(get_array::<_, 1>(&mut buf).map_err(short)?[0]),
        })
    }
}

/// Raw element found while walking key data
struct RawElement<'a> {
    offset: usize,
    id: u8,
    body: &'a [u8],
}

/// Walk the elements of a key data block
///
/// Stops at the end of the data or at a `0xDD 0x00` padding element.
fn elements(data: &[u8]) -> impl Iterator<Item = core::result::Result<RawElement<'_>, KdeError>> {
    let mut offset = 0;
    let mut failed = false;
    core::iter::from_fn(move || {
        if failed || offset + KDE_HEADER_LEN > data.len() {
            return None;
        }
        let id = data[offset];
        let len = usize::from(data[offset + 1]);
        if id == KDE_TYPE && len == 0 {
            return None;
        }
        let start = offset + KDE_HEADER_LEN;
        let Some(body) = data.get(start..start + len) else {
            failed = true;
            return Some(Err(KdeError::Truncated { offset }));
        };
        let element = RawElement { offset, id, body };
        offset = start + len;
        Some(Ok(element))
    })
}

/// The set of KDEs carried by an Initial-Key message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KdeSet {
    pub pmkid: Option<KeyId>,
    pub ptkid: Option<KeyId>,
    pub gtkl: Option<u8>,
    pub node_role: Option<u8>,
    pub lgtkl: Option<u8>,
}

impl KdeSet {
    /// Present KDEs in wire order: PMKID, PTKID, GTKL, Node Role, LGTKL
    pub fn iter(&self) -> impl Iterator<Item = Kde> {
        [
            self.pmkid.map(Kde::Pmkid),
            self.ptkid.map(Kde::Ptkid),
            self.gtkl.map(Kde::Gtkl),
            self.node_role.map(Kde::NodeRole),
            self.lgtkl.map(Kde::Lgtkl),
        ]
        .into_iter()
        .flatten()
    }

    pub fn encoded_len(&self) -> usize {
        self.iter().map(|kde| kde.encoded_len()).sum()
    }

    /// Encode all present KDEs in wire order
    ///
    /// # Errors
    ///
    /// `KdeError::BufferFull` if `buf` cannot take the whole block; nothing is
    /// written in that case.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> core::result::Result<(), KdeError> {
        ensure_capacity(buf, self.encoded_len())?;
        for kde in self.iter() {
            kde.encode(buf)?;
        }
        Ok(())
    }

    /// Encode into a scoped buffer sized for the largest Initial-Key block
    pub fn to_vec(&self) -> core::result::Result<Vec<u8, KDE_MAX_LEN>, KdeError> {
        let mut storage = [0u8; KDE_MAX_LEN];
        let len = self.encoded_len();
        {
            let mut out: &mut [u8] = &mut storage;
            self.encode(&mut out)?;
        }
        Vec::from_slice(&storage[..len]).map_err(|()| KdeError::BufferFull)
    }

    /// Decode a key data block
    ///
    /// Each element goes through `Kde::from_element`; the first occurrence of
    /// each KDE wins and the physical order does not matter. Every element is
    /// checked, so a malformed one anywhere rejects the whole block.
    ///
    /// # Errors
    ///
    /// `KdeError` if any element is truncated or a known KDE is too short.
    pub fn decode(data: &[u8]) -> core::result::Result<Self, KdeError> {
        let mut set = Self::default();
        for element in elements(data) {
            let element = element?;
            let Some(kde) = Kde::from_element(element.id, element.body)? else {
                continue;
            };
            log::trace!("KDE {:?} at offset {}", kde.kind(), element.offset);
            set.insert_first(kde);
        }
        Ok(set)
    }

    fn insert_first(&mut self, kde: Kde) {
        match kde {
            Kde::Pmkid(id) => {
                self.pmkid.get_or_insert(id);
            }
            Kde::Ptkid(id) => {
                self.ptkid.get_or_insert(id);
            }
            Kde::Gtkl(v) => {
                self.gtkl.get_or_insert(v);
            }
            Kde::NodeRole(v) => {
                self.node_role.get_or_insert(v);
            }
            Kde::Lgtkl(v) => {
                self.lgtkl.get_or_insert(v);
            }
        }
    }
}
