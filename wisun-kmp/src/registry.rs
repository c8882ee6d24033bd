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

//! KMP service registry
//!
//! Maps a KMP type to the constructor of the sub-protocol that implements
//! it for this node's role. Populated once at startup, read-only after.

use heapless::Vec;

use crate::config::SecProtConfig;
use crate::key_sec_prot::{AuthKeySecProt, SuppKeySecProt};
use crate::sec_prot::{ProtocolError, SecProt, SecProtContext, SecResult, Step, TxStatus};

/// Registry capacity
pub const KMP_SERVICE_MAX_PROTOCOLS: usize = 8;

/// KMP protocol identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KmpType {
    Ieee8021xMka = 1,
    Ieee80211FourWayHandshake = 6,
    Ieee80211Gkh = 7,
    Tls = 8,
    /// Initial-Key run ahead of MKA (EAP-TLS)
    Ieee8021xMkaKey = 11,
    /// Initial-Key run ahead of GKH
    Ieee80211GkhKey = 12,
}

impl KmpType {
    /// KMP ID carried on the wire; the Initial-Key variants travel as the
    /// protocol they precede
    pub fn wire_id(self) -> u8 {
        match self {
            Self::Ieee8021xMkaKey => Self::Ieee8021xMka as u8,
            Self::Ieee80211GkhKey => Self::Ieee80211Gkh as u8,
            other => other as u8,
        }
    }
}

/// Registration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("no KMP service to register with")]
    MissingService,
    #[error("{0:?} already registered")]
    Duplicate(KmpType),
    #[error("registry full")]
    Full,
    #[error("{0:?} not registered")]
    NotRegistered(KmpType),
}

/// Protocol constructor; runs the instance's `Init` state
pub type SecProtInit = fn(&SecProtConfig) -> SecProtInstance;

/// Size of a protocol's private state
pub type SecProtSize = fn() -> usize;

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    kmp_type: KmpType,
    size: SecProtSize,
    init: SecProtInit,
}

/// Table of registered sub-protocols
#[derive(Debug, Default)]
pub struct KmpService {
    entries: Vec<RegistryEntry, KMP_SERVICE_MAX_PROTOCOLS>,
}

impl KmpService {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `init` as the implementation of `kmp_type`
    ///
    /// # Errors
    ///
    /// `Duplicate` if the type is already registered, `Full` if the table is
    /// exhausted
    pub fn register(
        &mut self,
        kmp_type: KmpType,
        size: SecProtSize,
        init: SecProtInit,
    ) -> Result<(), RegistrationError> {
        if self.lookup(kmp_type).is_some() {
            return Err(RegistrationError::Duplicate(kmp_type));
        }
        self.entries
            .push(RegistryEntry {
                kmp_type,
                size,
                init,
            })
            .map_err(|_| RegistrationError::Full)?;
        log::trace!("registered {:?}", kmp_type);
        Ok(())
    }

    fn lookup(&self, kmp_type: KmpType) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.kmp_type == kmp_type)
    }

    pub fn is_registered(&self, kmp_type: KmpType) -> bool {
        self.lookup(kmp_type).is_some()
    }

    /// Private state size of the protocol registered for `kmp_type`
    pub fn instance_size(&self, kmp_type: KmpType) -> Option<usize> {
        self.lookup(kmp_type).map(|e| (e.size)())
    }

    /// Instantiate the protocol registered for `kmp_type`
    ///
    /// # Errors
    ///
    /// `NotRegistered` if nothing implements `kmp_type`
    pub fn create(
        &self,
        kmp_type: KmpType,
        config: &SecProtConfig,
    ) -> Result<SecProtInstance, RegistrationError> {
        let entry = self
            .lookup(kmp_type)
            .ok_or(RegistrationError::NotRegistered(kmp_type))?;
        Ok((entry.init)(config))
    }
}

/// A running sub-protocol
#[derive(Debug, Clone)]
pub enum SecProtInstance {
    SuppKey(SuppKeySecProt),
    AuthKey(AuthKeySecProt),
}

macro_rules! delegate {
    ($self:ident, $prot:ident => $call:expr) => {
        match $self {
            SecProtInstance::SuppKey($prot) => $call,
            SecProtInstance::AuthKey($prot) => $call,
        }
    };
}

impl SecProt for SecProtInstance {
    fn create_request(&mut self, ctx: &mut SecProtContext<'_>) -> Result<(), ProtocolError> {
        delegate!(self, p => p.create_request(ctx))
    }

    fn create_response(
        &mut self,
        ctx: &mut SecProtContext<'_>,
        result: SecResult,
    ) -> Result<(), ProtocolError> {
        delegate!(self, p => p.create_response(ctx, result))
    }

    fn receive(&mut self, ctx: &mut SecProtContext<'_>, pdu: &[u8]) -> Result<(), ProtocolError> {
        delegate!(self, p => p.receive(ctx, pdu))
    }

    fn tx_status(&mut self, ctx: &mut SecProtContext<'_>, status: TxStatus) {
        delegate!(self, p => p.tx_status(ctx, status));
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_>, ticks: u16) {
        delegate!(self, p => p.timer_timeout(ctx, ticks));
    }

    fn step(&mut self, ctx: &mut SecProtContext<'_>) -> Step {
        delegate!(self, p => p.step(ctx))
    }

    fn result(&self) -> SecResult {
        delegate!(self, p => p.result())
    }

    fn timer_running(&self) -> bool {
        delegate!(self, p => p.timer_running())
    }

    fn is_finished(&self) -> bool {
        delegate!(self, p => p.is_finished())
    }
}

fn key_sec_prot_size() -> usize {
    core::mem::size_of::<SuppKeySecProt>().max(core::mem::size_of::<AuthKeySecProt>())
}

fn supp_key_sec_prot_init(config: &SecProtConfig) -> SecProtInstance {
    SecProtInstance::SuppKey(SuppKeySecProt::new(config))
}

fn auth_key_sec_prot_init(config: &SecProtConfig) -> SecProtInstance {
    SecProtInstance::AuthKey(AuthKeySecProt::new(config))
}

fn key_sec_prot_register(
    service: Option<&mut KmpService>,
    init: SecProtInit,
) -> Result<(), RegistrationError> {
    let service = service.ok_or(RegistrationError::MissingService)?;
    service.register(KmpType::Ieee8021xMkaKey, key_sec_prot_size, init)?;
    service.register(KmpType::Ieee80211GkhKey, key_sec_prot_size, init)
}

/// Register the supplicant Initial-Key protocol for both Initial-Key types
///
/// # Errors
///
/// `MissingService` without a registry, otherwise any `register` error
pub fn supp_key_sec_prot_register(
    service: Option<&mut KmpService>,
) -> Result<(), RegistrationError> {
    key_sec_prot_register(service, supp_key_sec_prot_init)
}

/// Register the authenticator Initial-Key protocol for both Initial-Key types
///
/// # Errors
///
/// `MissingService` without a registry, otherwise any `register` error
pub fn auth_key_sec_prot_register(
    service: Option<&mut KmpService>,
) -> Result<(), RegistrationError> {
    key_sec_prot_register(service, auth_key_sec_prot_init)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_sec_prot::{AuthKeyState, SuppKeyState};

    #[test]
    fn test_register_both_key_types() {
        let mut service = KmpService::new();
        supp_key_sec_prot_register(Some(&mut service)).unwrap();
        assert!(service.is_registered(KmpType::Ieee8021xMkaKey));
        assert!(service.is_registered(KmpType::Ieee80211GkhKey));
        assert!(!service.is_registered(KmpType::Tls));
        assert!(service.instance_size(KmpType::Ieee80211GkhKey).unwrap() > 0);
    }

    #[test]
    fn test_missing_service() {
        assert_eq!(
            auth_key_sec_prot_register(None),
            Err(RegistrationError::MissingService)
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let mut service = KmpService::new();
        auth_key_sec_prot_register(Some(&mut service)).unwrap();
        assert_eq!(
            supp_key_sec_prot_register(Some(&mut service)),
            Err(RegistrationError::Duplicate(KmpType::Ieee8021xMkaKey))
        );
    }

    #[test]
    fn test_registry_full() {
        let mut service = KmpService::new();
        for t in [
            KmpType::Ieee8021xMka,
            KmpType::Ieee80211FourWayHandshake,
            KmpType::Ieee80211Gkh,
            KmpType::Ieee8021xMkaKey,
            KmpType::Ieee80211GkhKey,
        ] {
            service.register(t, key_sec_prot_size, supp_key_sec_prot_init).unwrap();
        }
        // Fewer distinct types exist than slots; pad the table directly
        let filler = service.entries[0];
        while service.entries.len() < KMP_SERVICE_MAX_PROTOCOLS {
            service.entries.push(filler).unwrap();
        }
        assert_eq!(
            service.register(KmpType::Tls, key_sec_prot_size, supp_key_sec_prot_init),
            Err(RegistrationError::Full)
        );
    }

    #[test]
    fn test_create_runs_init() {
        let mut service = KmpService::new();
        supp_key_sec_prot_register(Some(&mut service)).unwrap();
        let config = SecProtConfig::default();
        match service.create(KmpType::Ieee80211GkhKey, &config).unwrap() {
            SecProtInstance::SuppKey(p) => assert_eq!(p.state(), SuppKeyState::CreateReq),
            SecProtInstance::AuthKey(_) => panic!("wrong role"),
        }
        assert_eq!(
            service.create(KmpType::Tls, &config).unwrap_err(),
            RegistrationError::NotRegistered(KmpType::Tls)
        );

        let mut service = KmpService::new();
        auth_key_sec_prot_register(Some(&mut service)).unwrap();
        let instance = service.create(KmpType::Ieee8021xMkaKey, &config).unwrap();
        assert!(matches!(
            instance,
            SecProtInstance::AuthKey(ref p) if p.state() == AuthKeyState::InitialKeyReceived
        ));
        assert!(instance.timer_running());
    }

    #[test]
    fn test_wire_ids() {
        assert_eq!(KmpType::Ieee8021xMkaKey.wire_id(), 1);
        assert_eq!(KmpType::Ieee80211GkhKey.wire_id(), 7);
        assert_eq!(KmpType::Tls.wire_id(), 8);
    }
}
