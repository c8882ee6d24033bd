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

//! Wi-SUN KMP Cryptography - RustCrypto Implementation
//!
//! This crate provides an implementation of the `KeyIdProvider` trait using
//! the RustCrypto `hmac`, `sha1` and `sha2` crates.
//!
//! ```text
//! PMKID = Truncate-128(HMAC(PMK, "PMK Name" || AA || SPA))
//! PTKID = Truncate-128(HMAC(PTK, "PTK Name" || AA || SPA))
//! ```
//!
//! where AA is the authenticator EUI-64 and SPA the supplicant EUI-64.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::trace;
use wisun_common::Eui64;
use wisun_crypto::{
    CryptoError, KeyId, KeyIdAlgorithm, KeyIdProvider, KEY_ID_LEN, PMK_NAME_LABEL, PTK_NAME_LABEL,
};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// RustCrypto-based implementation of `KeyIdProvider`
///
/// ## Usage
///
/// ```
/// use wisun_common::Eui64;
/// use wisun_crypto::KeyIdProvider;
/// use wisun_crypto_rustcrypto::RustCryptoKeyIdProvider;
///
/// let provider = RustCryptoKeyIdProvider::new();
/// let aa = Eui64::new([2, 0, 0, 0, 0, 0, 0, 1]);
/// let spa = Eui64::new([2, 0, 0, 0, 0, 0, 0, 2]);
/// let pmkid = provider.pmkid(&[0x11; 32], &aa, &spa).unwrap();
/// assert_eq!(pmkid.len(), 16);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RustCryptoKeyIdProvider {
    algorithm: KeyIdAlgorithm,
}

impl RustCryptoKeyIdProvider {
    /// Create a provider using HMAC-SHA1-128, as Wi-SUN FAN mandates
    pub fn new() -> Self {
        Self::with_algorithm(KeyIdAlgorithm::HmacSha1_128)
    }

    /// Create a provider for a specific MAC
    pub fn with_algorithm(algorithm: KeyIdAlgorithm) -> Self {
        Self { algorithm }
    }

    /// MAC this provider derives identifiers with
    pub fn algorithm(&self) -> KeyIdAlgorithm {
        self.algorithm
    }

    fn derive(
        &self,
        label: &[u8],
        key: &[u8],
        auth_eui64: &Eui64,
        supp_eui64: &Eui64,
    ) -> Result<KeyId, CryptoError> {
        if key.is_empty() {
            return Err(CryptoError::InvalidInput);
        }

        let mut id = [0u8; KEY_ID_LEN];
        match self.algorithm {
            KeyIdAlgorithm::HmacSha1_128 => {
                let mut mac =
                    HmacSha1::new_from_slice(key).map_err(|_| CryptoError::InvalidInput)?;
                mac.update(label);
                mac.update(auth_eui64.as_bytes());
                mac.update(supp_eui64.as_bytes());
                id.copy_from_slice(&mac.finalize().into_bytes()[..KEY_ID_LEN]);
            }
            KeyIdAlgorithm::HmacSha256_128 => {
                let mut mac =
                    HmacSha256::new_from_slice(key).map_err(|_| CryptoError::InvalidInput)?;
                mac.update(label);
                mac.update(auth_eui64.as_bytes());
                mac.update(supp_eui64.as_bytes());
                id.copy_from_slice(&mac.finalize().into_bytes()[..KEY_ID_LEN]);
            }
        }

        trace!(
            "Derived {} for AA {} SPA {} ({:?})",
            core::str::from_utf8(label).unwrap_or("key id"),
            auth_eui64,
            supp_eui64,
            self.algorithm
        );
        Ok(id)
    }
}

impl KeyIdProvider for RustCryptoKeyIdProvider {
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
