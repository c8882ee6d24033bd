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

//! Reference dispatcher for the Wi-SUN Initial-Key exchange
//!
//! This crate provides the glue between the no_std Sans-IO `wisun-kmp`
//! protocol instances and a pair of in-memory nodes.
//!
//! # Architecture
//!
//! - `SecProtInstance` is the pure no_std state machine
//! - `KmpSession` owns one node's keys and drives its instance
//! - `LoopbackTransport` queues frames instead of putting them on a link
//! - Key identifiers are derived with `RustCryptoKeyIdProvider`

pub mod session;

use thiserror::Error;
use tracing::{debug, info, warn};
use wisun_common::Eui64;
use wisun_crypto::KeyIdAlgorithm;
use wisun_crypto_rustcrypto::RustCryptoKeyIdProvider;
use wisun_kmp::keys::{GroupKeyStatus, KeysError, GTK_LEN, PMK_LEN, PTK_LEN};
use wisun_kmp::{
    auth_key_sec_prot_register, supp_key_sec_prot_register, KmpService, KmpType, NodeRole,
    PeerAddrs, ProtocolError, RegistrationError, SecKeys, SecProtConfig, SecResult, TxStatus,
};

pub use session::{KmpEvent, KmpSession, LoopbackTransport, RecordingDispatcher, TxMode};
pub use wisun_kmp;

/// Errors that can occur while running a simulated exchange
#[derive(Debug, Error)]
pub enum SimError {
    #[error("registry error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("key setup error: {0}")]
    Keys(#[from] KeysError),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("{0} did not finish")]
    Stalled(&'static str),
}

/// Decode a fixed-length hex string (separators `:` and `-` allowed)
///
/// # Errors
///
/// `SimError::Hex` for bad digits, `SimError::Length` for the wrong size
pub fn parse_hex<const N: usize>(s: &str) -> Result<[u8; N], SimError> {
    let digits: String = s.chars().filter(|c| !matches!(c, ':' | '-')).collect();
    let bytes = hex::decode(digits)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| SimError::Length {
        expected: N,
        actual,
    })
}

/// Parse an EUI-64 such as `02:00:00:00:00:00:00:01`
///
/// # Errors
///
/// See `parse_hex`
pub fn parse_eui64(s: &str) -> Result<Eui64, SimError> {
    parse_hex(s).map(Eui64::new)
}

/// Key material one simulated node starts with
#[derive(Debug, Clone)]
pub struct NodeSetup {
    pub eui64: Eui64,
    pub pmk: Option<[u8; PMK_LEN]>,
    pub ptk: Option<[u8; PTK_LEN]>,
    pub node_role: NodeRole,
    /// Bitmask of GTK slots holding an active key
    pub live_gtks: u8,
    /// Bitmask of LGTK slots holding an active key
    pub live_lgtks: u8,
}

impl NodeSetup {
    pub fn new(eui64: Eui64) -> Self {
        Self {
            eui64,
            pmk: None,
            ptk: None,
            node_role: NodeRole::Unknown,
            live_gtks: 0,
            live_lgtks: 0,
        }
    }

    /// Build the node's key store
    ///
    /// # Errors
    ///
    /// `KeysError::InvalidIndex` if a mask names a slot that does not exist
    pub fn keys(&self) -> Result<SecKeys, SimError> {
        let mut keys = SecKeys::new();
        if let Some(pmk) = self.pmk {
            keys.set_pmk(pmk);
        }
        if let Some(ptk) = self.ptk {
            keys.set_ptk(ptk);
        }
        keys.set_node_role(self.node_role);
        for i in 0..8u8 {
            let key = [i + 1; GTK_LEN];
            if self.live_gtks & (1 << i) != 0 {
                keys.gtks.insert(usize::from(i), key, GroupKeyStatus::Active)?;
            }
            if self.live_lgtks & (1 << i) != 0 {
                keys.lgtks.insert(usize::from(i), key, GroupKeyStatus::Active)?;
            }
        }
        Ok(keys)
    }
}

/// One supplicant/authenticator run
#[derive(Debug, Clone)]
pub struct Scenario {
    pub supplicant: NodeSetup,
    pub authenticator: NodeSetup,
    pub kmp_type: KmpType,
    pub tx_mode: TxMode,
    /// Bytes the transport reserves in front of each PDU
    pub header_size: usize,
    pub algorithm: KeyIdAlgorithm,
    pub config: SecProtConfig,
}

impl Scenario {
    pub fn new(supplicant: NodeSetup, authenticator: NodeSetup) -> Self {
        Self {
            supplicant,
            authenticator,
            kmp_type: KmpType::Ieee80211GkhKey,
            tx_mode: TxMode::Deliver,
            header_size: 0,
            algorithm: KeyIdAlgorithm::default(),
            config: SecProtConfig::default(),
        }
    }
}

/// What both sides saw and what the authenticator learned
#[derive(Debug, Clone)]
pub struct ExchangeReport {
    pub supplicant_events: Vec<KmpEvent>,
    pub authenticator_events: Vec<KmpEvent>,
    pub supplicant_result: SecResult,
    pub authenticator_result: SecResult,
    /// Initial-Key PDU as sent, if any
    pub pdu: Option<Vec<u8>>,
    /// Why the authenticator rejected the PDU
    pub receive_error: Option<ProtocolError>,
    pub pmk_live: bool,
    pub ptk_live: bool,
    pub node_role: NodeRole,
    pub gtkl: u8,
    pub lgtkl: u8,
}

fn settle(
    session: &mut KmpSession<RustCryptoKeyIdProvider>,
    node: &'static str,
    ticks: u16,
) -> Result<(), SimError> {
    for _ in 0..4 {
        if session.is_done() {
            return Ok(());
        }
        session.tick(ticks);
    }
    if session.is_done() {
        Ok(())
    } else {
        Err(SimError::Stalled(node))
    }
}

/// Run a complete Initial-Key exchange between two in-memory nodes
///
/// # Errors
///
/// `SimError` if a node cannot be set up or an instance never finishes.
/// Protocol failures on the wire are part of the report, not errors.
pub fn run_initial_key_exchange(scenario: &Scenario) -> Result<ExchangeReport, SimError> {
    let mut supp_service = KmpService::new();
    supp_key_sec_prot_register(Some(&mut supp_service))?;
    let mut auth_service = KmpService::new();
    auth_key_sec_prot_register(Some(&mut auth_service))?;

    let provider = RustCryptoKeyIdProvider::with_algorithm(scenario.algorithm);
    let supp_eui64 = scenario.supplicant.eui64;
    let auth_eui64 = scenario.authenticator.eui64;

    let mut supp = KmpSession::new(
        "supplicant",
        &supp_service,
        scenario.kmp_type,
        &scenario.config,
        scenario.supplicant.keys()?,
        provider.clone(),
        PeerAddrs::new(supp_eui64, auth_eui64),
        LoopbackTransport::new(scenario.header_size, scenario.tx_mode),
    )?;
    let mut auth = KmpSession::new(
        "authenticator",
        &auth_service,
        scenario.kmp_type,
        &scenario.config,
        scenario.authenticator.keys()?,
        provider,
        PeerAddrs::new(auth_eui64, supp_eui64),
        LoopbackTransport::new(scenario.header_size, TxMode::Deliver),
    )?;

    supp.create_request()?;
    let pdu = supp.transport.pop();
    let mut receive_error = None;

    match (&pdu, supp.transport.mode()) {
        (Some(frame), TxMode::Deliver) => {
            supp.tx_status(TxStatus::Ok);
            info!("delivering {} byte Initial-Key PDU", frame.len());
            if let Err(e) = auth.receive(frame) {
                warn!("authenticator rejected PDU: {}", e);
                receive_error = Some(e);
            }
            if auth.dispatcher.events.contains(&KmpEvent::CreateInd) {
                auth.create_response(SecResult::Ok)?;
            }
        }
        (Some(_), TxMode::NoAck) => {
            info!("Initial-Key PDU lost");
            supp.tx_status(TxStatus::NoAck);
            auth.tick(scenario.config.total_timeout_ticks);
        }
        _ => {
            debug!("nothing sent, waiting out authenticator");
            auth.tick(scenario.config.total_timeout_ticks);
        }
    }

    let cleanup = scenario.config.finished_timeout_ticks;
    settle(&mut supp, "supplicant", cleanup)?;
    settle(&mut auth, "authenticator", cleanup)?;

    Ok(ExchangeReport {
        supplicant_result: supp.result(),
        authenticator_result: auth.result(),
        pdu,
        receive_error,
        pmk_live: !auth.keys.pmk_mismatch(),
        ptk_live: !auth.keys.ptk_mismatch(),
        node_role: auth.keys.node_role(),
        gtkl: auth.keys.gtks.gtkl(),
        lgtkl: auth.keys.lgtks.gtkl(),
        supplicant_events: supp.dispatcher.events,
        authenticator_events: auth.dispatcher.events,
    })
}
