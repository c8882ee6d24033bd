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

//! Wi-SUN KMP - Key Identifier Type Definitions
//!
//! This crate defines the contract the key management protocols use to name
//! pairwise keys on the wire. It contains NO real implementations, only the
//! trait and a deterministic mock for tests.
//!
//! The actual derivations are provided by separate crates such as
//! `wisun-crypto-rustcrypto` (HMAC over the RustCrypto ecosystem).
//!
//! ## Key identifiers
//!
//! A PMKID or PTKID is a 16 byte value derived from the key and the two
//! EUI-64 addresses of the pairing. Both peers compute it independently, so
//! the authenticator can tell whether the supplicant still holds the same key
//! without the key itself ever leaving either node.

#![cfg_attr(not(test), no_std)]

use wisun_common::Eui64;

/// Length of a PMKID or PTKID
pub const KEY_ID_LEN: usize = 16;

/// 128-bit key identifier (PMKID or PTKID)
pub type KeyId = [u8; KEY_ID_LEN];

/// Error kinds for key identifier derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Invalid input parameters (for example an empty key)
    #[error("invalid input")]
    InvalidInput,
    /// Derivation failed inside the backend
    #[error("key identifier derivation failed")]
    OperationFailed,
    /// Algorithm not available in this backend
    #[error("unsupported algorithm")]
    Unsupported,
}

/// MAC used to derive key identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyIdAlgorithm {
    /// HMAC-SHA1 truncated to 128 bits (Wi-SUN FAN, IEEE 802.11 AKM 1/2)
    #[default]
    HmacSha1_128,
    /// HMAC-SHA256 truncated to 128 bits (IEEE 802.11 AKM 5/6)
    HmacSha256_128,
}

/// Label mixed into PMKID derivation
pub const PMK_NAME_LABEL: &[u8] = b"PMK Name";

/// Label mixed into PTKID derivation
pub const PTK_NAME_LABEL: &[u8] = b"PTK Name";

/// Trait for key identifier providers
///
/// The address order is always (authenticator, supplicant). Callers pick the
/// order from their own role, so both peers feed identical inputs.
pub trait KeyIdProvider {
    /// Derive the PMKID of `pmk` for the pairing `auth_eui64` / `supp_eui64`
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` if the key is unusable or the backend fails
    fn pmkid(&self, pmk: &[u8], auth_eui64: &Eui64, supp_eui64: &Eui64)
        -> Result<KeyId, CryptoError>;

    /// Derive the PTKID of `ptk` for the pairing `auth_eui64` / `supp_eui64`
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` if the key is unusable or the backend fails
    fn ptkid(&self, ptk: &[u8], auth_eui64: &Eui64, supp_eui64: &Eui64)
        -> Result<KeyId, CryptoError>;
}

/// Mock key identifier provider for testing
///
/// Produces a deterministic identifier by folding the label, key and
/// addresses together. Different keys or addresses give different ids, which
/// is all the protocol logic relies on.
#[derive(Debug, Clone, Default)]
pub struct MockKeyIdProvider {
    /// When set, every derivation fails with `OperationFailed`
    pub fail: bool,
}

impl MockKeyIdProvider {
    /// Create a provider that always succeeds
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// Create a provider whose derivations always fail
    pub fn failing() -> Self {
        Self { fail: true }
    }

    fn derive(
        &self,
        label: &[u8],
        key: &[u8],
        auth_eui64: &Eui64,
        supp_eui64: &Eui64,
    ) -> Result<KeyId, CryptoError> {
        if self.fail {
            return Err(CryptoError::OperationFailed);
        }
        if key.is_empty() {
            return Err(CryptoError::InvalidInput);
        }
        let mut id = [0u8; KEY_ID_LEN];
        for (i, b) in key.iter().enumerate() {
            id[i % KEY_ID_LEN] = id[i % KEY_ID_LEN].rotate_left(3) ^ b;
        }
        for (i, out) in id.iter_mut().enumerate() {
            *out ^= label[i % label.len()]
                ^ auth_eui64.0[i % 8]
                ^ supp_eui64.0[(i + 3) % 8].wrapping_mul(31);
        }
        Ok(id)
    }
}

impl KeyIdProvider for MockKeyIdProvider {
    fn pmkid(
        &self,
        pmk: &[u8],
        auth_eui64: &Eui64,
        supp_eui64: &Eui64,
    ) -> Result<KeyId, CryptoError> {
        self.derive(PMK_NAME_LABEL, pmk, auth_eui64, supp_eui64)
    }

    fn ptkid(
        &self,
        ptk: &[u8],
        auth_eui64: &Eui64,
        supp_eui64: &Eui64,
    ) -> Result<KeyId, CryptoError> {
        self.derive(PTK_NAME_LABEL, ptk, auth_eui64, supp_eui64)
    }
}
