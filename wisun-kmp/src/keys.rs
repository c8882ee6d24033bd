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

//! Per-peer security key material
//!
//! `SecKeys` is owned by the upper key management context and lent to a
//! protocol instance for the duration of each event. Protocols never free it;
//! it outlives every handshake run against the peer.

use zeroize::Zeroize;

/// Pairwise Master Key length
pub const PMK_LEN: usize = 32;

/// Pairwise Transient Key length (KCK 16 + KEK 16 + TK 16)
pub const PTK_LEN: usize = 48;

/// Group key length (GTK and LGTK)
pub const GTK_LEN: usize = 16;

/// Number of GTK slots
pub const GTK_NUM: usize = 4;

/// Number of LGTK slots
pub const LGTK_NUM: usize = 3;

/// Wi-SUN node role as carried in the Node Role KDE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeRole {
    /// Border router
    BorderRouter,
    /// Full function node (router)
    Ffn,
    /// Limited function node
    Lfn,
    /// Role not known or not indicated
    #[default]
    Unknown,
}

impl NodeRole {
    const WIRE_BR: u8 = 0;
    const WIRE_FFN: u8 = 1;
    const WIRE_LFN: u8 = 2;

    /// Decode a wire value, `None` for anything that is not a valid role
    ///
    /// Inbound Node Role KDEs go through this; an invalid value is recorded
    /// as `Unknown`.
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            Self::WIRE_BR => Some(Self::BorderRouter),
            Self::WIRE_FFN => Some(Self::Ffn),
            Self::WIRE_LFN => Some(Self::Lfn),
            _ => None,
        }
    }

    /// Wire value, `None` for `Unknown` which is never transmitted
    pub fn to_wire(self) -> Option<u8> {
        match self {
            Self::BorderRouter => Some(Self::WIRE_BR),
            Self::Ffn => Some(Self::WIRE_FFN),
            Self::Lfn => Some(Self::WIRE_LFN),
            Self::Unknown => None,
        }
    }
}

/// Lifecycle of an installed group key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKeyStatus {
    /// Installed but not yet announced
    New,
    /// Announced, not yet used for transmission
    Fresh,
    /// In use
    Active,
    /// Superseded, kept until its lifetime ends
    Old,
}

impl GroupKeyStatus {
    /// Live keys are reported in GTKL/LGTKL
    pub fn is_live(self) -> bool {
        matches!(self, Self::Fresh | Self::Active)
    }
}

/// One installed GTK or LGTK
#[derive(Clone)]
pub struct GroupKey {
    key: [u8; GTK_LEN],
    status: GroupKeyStatus,
}

impl GroupKey {
    pub fn new(key: [u8; GTK_LEN], status: GroupKeyStatus) -> Self {
        Self { key, status }
    }

    pub fn key(&self) -> &[u8; GTK_LEN] {
        &self.key
    }

    pub fn status(&self) -> GroupKeyStatus {
        self.status
    }
}

impl Drop for GroupKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl core::fmt::Debug for GroupKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GroupKey")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Errors from group key slot access
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeysError {
    #[error("group key index {0} out of range")]
    InvalidIndex(usize),
    #[error("no group key installed at index {0}")]
    EmptySlot(usize),
}

/// A set of group keys plus the liveness bitmask the peer last declared
#[derive(Debug, Clone)]
pub struct GroupKeySet<const N: usize> {
    keys: [Option<GroupKey>; N],
    /// Liveness bitmask as indicated by the peer (bit n = slot n)
    pub(crate) gtkl: u8,
}

/// GTK slots
pub type GtkSet = GroupKeySet<GTK_NUM>;

/// LGTK slots
pub type LgtkSet = GroupKeySet<LGTK_NUM>;

impl<const N: usize> GroupKeySet<N> {
    pub fn new() -> Self {
        Self {
            keys: core::array::from_fn(|_| None),
            gtkl: 0,
        }
    }

    /// Install `key` in slot `index`, replacing whatever was there
    pub fn insert(
        &mut self,
        index: usize,
        key: [u8; GTK_LEN],
        status: GroupKeyStatus,
    ) -> Result<(), KeysError> {
        let slot = self.keys.get_mut(index).ok_or(KeysError::InvalidIndex(index))?;
        *slot = Some(GroupKey::new(key, status));
        Ok(())
    }

    pub fn set_status(&mut self, index: usize, status: GroupKeyStatus) -> Result<(), KeysError> {
        let slot = self.keys.get_mut(index).ok_or(KeysError::InvalidIndex(index))?;
        match slot {
            Some(key) => {
                key.status = status;
                Ok(())
            }
            None => Err(KeysError::EmptySlot(index)),
        }
    }

    pub fn remove(&mut self, index: usize) -> Result<(), KeysError> {
        let slot = self.keys.get_mut(index).ok_or(KeysError::InvalidIndex(index))?;
        *slot = None;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&GroupKey> {
        self.keys.get(index).and_then(Option::as_ref)
    }

    /// Bitmask of slots whose key is live on this node
    pub fn fresh_gtkl(&self) -> u8 {
        self.keys
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.as_ref().is_some_and(|k| k.status.is_live()))
            .fold(0u8, |mask, (i, _)| mask | (1 << i))
    }

    /// Liveness bitmask the peer declared in its last Initial-Key message
    pub fn gtkl(&self) -> u8 {
        self.gtkl
    }

    pub fn set_gtkl(&mut self, gtkl: u8) {
        self.gtkl = gtkl;
    }
}

impl<const N: usize> Default for GroupKeySet<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Security key material for one peer
pub struct SecKeys {
    pmk: Option<[u8; PMK_LEN]>,
    ptk: Option<[u8; PTK_LEN]>,
    pub(crate) pmk_mismatch: bool,
    pub(crate) ptk_mismatch: bool,
    /// GTK slots and peer GTKL
    pub gtks: GtkSet,
    /// LGTK slots and peer LGTKL
    pub lgtks: LgtkSet,
    pub(crate) node_role: NodeRole,
}

impl SecKeys {
    /// Empty key material: no keys, liveness unknown, role unknown
    pub fn new() -> Self {
        Self {
            pmk: None,
            ptk: None,
            pmk_mismatch: true,
            ptk_mismatch: true,
            gtks: GtkSet::new(),
            lgtks: LgtkSet::new(),
            node_role: NodeRole::Unknown,
        }
    }

    pub fn pmk(&self) -> Option<&[u8; PMK_LEN]> {
        self.pmk.as_ref()
    }

    pub fn set_pmk(&mut self, pmk: [u8; PMK_LEN]) {
        self.pmk.zeroize();
        self.pmk = Some(pmk);
    }

    pub fn clear_pmk(&mut self) {
        self.pmk.zeroize();
    }

    pub fn ptk(&self) -> Option<&[u8; PTK_LEN]> {
        self.ptk.as_ref()
    }

    pub fn set_ptk(&mut self, ptk: [u8; PTK_LEN]) {
        self.ptk.zeroize();
        self.ptk = Some(ptk);
    }

    pub fn clear_ptk(&mut self) {
        self.ptk.zeroize();
    }

    /// True unless the last exchange proved the peer holds our PMK
    pub fn pmk_mismatch(&self) -> bool {
        self.pmk_mismatch
    }

    /// True unless the last exchange proved the peer holds our PTK
    pub fn ptk_mismatch(&self) -> bool {
        self.ptk_mismatch
    }

    pub fn node_role(&self) -> NodeRole {
        self.node_role
    }

    pub fn set_node_role(&mut self, role: NodeRole) {
        self.node_role = role;
    }
}

impl Default for SecKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SecKeys {
    fn drop(&mut self) {
        self.pmk.zeroize();
        self.ptk.zeroize();
    }
}

impl core::fmt::Debug for SecKeys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecKeys")
            .field("pmk", &self.pmk.is_some())
            .field("ptk", &self.ptk.is_some())
            .field("pmk_mismatch", &self.pmk_mismatch)
            .field("ptk_mismatch", &self.ptk_mismatch)
            .field("gtks", &self.gtks)
            .field("lgtks", &self.lgtks)
            .field("node_role", &self.node_role)
            .finish()
    }
}
