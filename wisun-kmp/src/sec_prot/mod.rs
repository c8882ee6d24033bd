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

//! Generic Security Protocol Engine
//!
//! Every KMP sub-protocol (Initial-Key, 4WH, GKH, ...) is a `SecProt`: a
//! small state machine driven by external events.
//!
//! ## Event surface
//!
//! ```text
//! dispatcher ── create_request / create_response ──▶ SecProt
//!            ── receive(pdu) ──────────────────────▶
//!            ── tx_status(status) ─────────────────▶
//!            ── timer_timeout(ticks) ──────────────▶
//!            ◀── create_conf / create_ind / finished_ind / finished ──
//! ```
//!
//! Each handler updates state and result first, then calls
//! `state_machine`, which steps until a state needs an external event.
//!
//! Following the "State Context Pattern", everything a handler touches but
//! does not own (key material, transport, dispatcher callbacks, key-id
//! provider) is lent through `SecProtContext` for the duration of one event.

use wisun_common::Eui64;
use wisun_crypto::{KeyId, KeyIdProvider};

use crate::config::SecProtConfig;
use crate::eapol::EapolError;
use crate::kde::KdeError;
use crate::keys::SecKeys;

/// Why a transmission failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxFailure {
    /// Peer did not acknowledge
    NoAck,
    /// Any other link failure
    Unspecified,
}

/// Outcome of a sub-protocol run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecResult {
    #[default]
    Ok,
    AllocationFailure,
    TxFailure(TxFailure),
    ParseFailure,
    Timeout,
    Error,
}

impl SecResult {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Link layer report for a previously sent PDU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Ok,
    NoAck,
    Unspecified,
}

/// Synchronous transport refusal
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error("transport rejected frame")]
    Rejected,
    #[error("transport unavailable")]
    Unavailable,
}

/// Errors returned from protocol event handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed EAPOL frame: {0}")]
    Eapol(#[from] EapolError),
    #[error("EAPOL packet type {0} is not EAPOL-Key")]
    NotEapolKey(u8),
    #[error("EAPOL-Key frame carries no key data")]
    NoKeyData,
    #[error("encrypted key data is not supported")]
    EncryptedKeyData,
    #[error("malformed key data: {0}")]
    Kde(#[from] KdeError),
    #[error("PDU buffer allocation failed")]
    AllocationFailure,
    #[error("transmit failed: {0}")]
    Tx(#[from] TxError),
    #[error("operation not supported by this protocol")]
    Unsupported,
    #[error("event not expected in current state")]
    UnexpectedEvent,
}

impl ProtocolError {
    /// Result recorded when this error ends a handler
    pub fn result(self) -> SecResult {
        match self {
            Self::AllocationFailure => SecResult::AllocationFailure,
            Self::Tx(_) => SecResult::TxFailure(TxFailure::Unspecified),
            Self::Eapol(_)
            | Self::NotEapolKey(_)
            | Self::NoKeyData
            | Self::EncryptedKeyData
            | Self::Kde(_) => SecResult::ParseFailure,
            Self::Unsupported | Self::UnexpectedEvent => SecResult::Error,
        }
    }
}

/// Outbound EAPOL path below the protocol
pub trait EapolTransport {
    /// Bytes the transport needs reserved in front of the EAPOL PDU
    fn header_size(&self) -> usize;

    /// Queue one frame (header reservation plus PDU) for transmission
    ///
    /// # Errors
    ///
    /// `TxError` if the frame was not accepted
    fn send(&mut self, frame: &[u8]) -> Result<(), TxError>;
}

/// Callbacks from a protocol instance into its owning dispatcher
pub trait KmpDispatcher {
    /// Initiator side: the request is being sent
    fn create_conf(&mut self, result: SecResult);

    /// Responder side: a request arrived, the dispatcher should answer with
    /// `create_response`
    fn create_ind(&mut self);

    /// Negotiation is over; `keys` is set when the protocol hands back new
    /// material
    fn finished_ind(&mut self, result: SecResult, keys: Option<&SecKeys>);

    /// Instance may be deleted
    fn finished(&mut self);
}

/// Addresses of the two ends of a pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddrs {
    pub local: Eui64,
    pub remote: Eui64,
}

impl PeerAddrs {
    pub fn new(local: Eui64, remote: Eui64) -> Self {
        Self { local, remote }
    }

    /// (authenticator, supplicant) ordering as seen from our role
    pub fn auth_supp(&self, is_auth: bool) -> (&Eui64, &Eui64) {
        if is_auth {
            (&self.local, &self.remote)
        } else {
            (&self.remote, &self.local)
        }
    }
}

/// Everything a handler borrows for one event
pub struct SecProtContext<'a> {
    pub keys: &'a mut SecKeys,
    pub transport: &'a mut dyn EapolTransport,
    pub dispatcher: &'a mut dyn KmpDispatcher,
    pub key_ids: &'a dyn KeyIdProvider,
    pub addrs: PeerAddrs,
}

impl SecProtContext<'_> {
    /// PMKID of the local PMK, `None` if there is no PMK or derivation fails
    pub fn pmkid_generate(&self, is_auth: bool) -> Option<KeyId> {
        let pmk = self.keys.pmk()?;
        let (auth, supp) = self.addrs.auth_supp(is_auth);
        self.key_ids
            .pmkid(pmk, auth, supp)
            .map_err(|e| log::warn!("PMKID derivation failed: {}", e))
            .ok()
    }

    /// PTKID of the local PTK, `None` if there is no PTK or derivation fails
    pub fn ptkid_generate(&self, is_auth: bool) -> Option<KeyId> {
        let ptk = self.keys.ptk()?;
        let (auth, supp) = self.addrs.auth_supp(is_auth);
        self.key_ids
            .ptkid(ptk, auth, supp)
            .map_err(|e| log::warn!("PTKID derivation failed: {}", e))
            .ok()
    }
}

/// States every protocol machine shares
pub trait ProtocolState: Copy + PartialEq + core::fmt::Debug {
    const INIT: Self;
    const FINISH: Self;
    const FINISHED: Self;
}

/// Whether the drive loop keeps stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Wait for an external event
    Block,
}

/// State, result and timer shared by every protocol instance
#[derive(Debug, Clone)]
pub struct SecProtCommon<S> {
    state: S,
    result: SecResult,
    ticks: u16,
    timer_running: bool,
    config: SecProtConfig,
}

impl<S: ProtocolState> SecProtCommon<S> {
    pub fn new(config: &SecProtConfig) -> Self {
        Self {
            state: S::INIT,
            result: SecResult::Ok,
            ticks: config.total_timeout_ticks,
            timer_running: false,
            config: *config,
        }
    }

    pub fn state(&self) -> S {
        self.state
    }

    /// Move to `state`
    ///
    /// A finished instance never re-enters `FINISH`. Entering `FINISH`
    /// restarts the lifetime countdown.
    pub fn set_state(&mut self, state: S) {
        if state == S::FINISH {
            if self.state == S::FINISHED {
                return;
            }
            self.ticks = self.config.total_timeout_ticks;
        }
        log::trace!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    pub fn result(&self) -> SecResult {
        self.result
    }

    pub fn set_result(&mut self, result: SecResult) {
        self.result = result;
    }

    pub fn is_result_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn start_timer(&mut self) {
        self.timer_running = true;
    }

    pub fn stop_timer(&mut self) {
        self.timer_running = false;
    }

    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn ticks(&self) -> u16 {
        self.ticks
    }

    pub fn set_ticks(&mut self, ticks: u16) {
        self.ticks = ticks;
    }

    /// Arm the cleanup window between `finished_ind` and `finished`
    pub fn arm_finished_timer(&mut self) {
        self.ticks = self.config.finished_timeout_ticks;
    }

    /// Count down `ticks`
    ///
    /// Returns true when the countdown reached zero and the machine must be
    /// driven. Expiry outside `FINISHED` records `Timeout` and moves to
    /// `FINISH`, or straight to `FINISHED` from `INIT`.
    pub fn timeout_handle(&mut self, ticks: u16) -> bool {
        if !self.timer_running {
            return false;
        }
        if self.ticks > ticks {
            self.ticks -= ticks;
            return false;
        }
        self.ticks = 0;
        if self.state != S::FINISHED {
            log::debug!("protocol timeout in {:?}", self.state);
            self.result = SecResult::Timeout;
            if self.state == S::INIT {
                self.set_state(S::FINISHED);
            } else {
                self.set_state(S::FINISH);
            }
        }
        true
    }
}

/// A KMP sub-protocol instance
///
/// Handlers for events a role does not take default to
/// `ProtocolError::Unsupported`.
pub trait SecProt {
    /// Start the exchange as initiator
    ///
    /// # Errors
    ///
    /// `ProtocolError::Unsupported` for responder roles, `UnexpectedEvent`
    /// outside the request state
    fn create_request(&mut self, _ctx: &mut SecProtContext<'_>) -> Result<(), ProtocolError> {
        Err(ProtocolError::Unsupported)
    }

    /// Answer a `create_ind` as responder
    ///
    /// # Errors
    ///
    /// `ProtocolError::Unsupported` for initiator roles, `UnexpectedEvent`
    /// outside the response state
    fn create_response(
        &mut self,
        _ctx: &mut SecProtContext<'_>,
        _result: SecResult,
    ) -> Result<(), ProtocolError> {
        Err(ProtocolError::Unsupported)
    }

    /// Deliver a received EAPOL PDU
    ///
    /// # Errors
    ///
    /// The parse error that terminated the exchange, or `UnexpectedEvent` /
    /// `Unsupported` when the PDU was not accepted at all
    fn receive(&mut self, _ctx: &mut SecProtContext<'_>, _pdu: &[u8]) -> Result<(), ProtocolError> {
        Err(ProtocolError::Unsupported)
    }

    /// Link layer report for the last sent PDU
    fn tx_status(&mut self, ctx: &mut SecProtContext<'_>, status: TxStatus);

    /// Periodic tick from the dispatcher
    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_>, ticks: u16);

    /// Run the current state once
    fn step(&mut self, ctx: &mut SecProtContext<'_>) -> Step;

    /// Step until a state blocks
    fn state_machine(&mut self, ctx: &mut SecProtContext<'_>) {
        while self.step(ctx) == Step::Continue {}
    }

    fn result(&self) -> SecResult;

    /// True while the instance wants `timer_timeout` events
    fn timer_running(&self) -> bool;

    /// True once `finished` has been or is about to be signalled
    fn is_finished(&self) -> bool;
}
