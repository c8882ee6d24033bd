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

//! Authenticator side of the Initial-Key exchange
//!
//! ```text
//! Init ─▶ InitialKeyReceived ─(receive ok)─▶ CreateResp ─(create_response)─▶ Finish ─▶ Finished
//!                  └──────────── receive failed ──────────────────────────────────────────▲
//! ```
//!
//! A failed receive skips `create_ind` and `finished_ind` and signals
//! `finished` straight away.

use super::initial_key_handle;
use crate::config::SecProtConfig;
use crate::sec_prot::{
    ProtocolError, ProtocolState, SecProt, SecProtCommon, SecProtContext, SecResult, Step,
    TxStatus,
};

/// Authenticator Initial-Key states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKeyState {
    Init,
    /// Waiting for the supplicant's PDU
    InitialKeyReceived,
    /// Waiting for `create_response`
    CreateResp,
    Finish,
    Finished,
}

impl ProtocolState for AuthKeyState {
    const INIT: Self = Self::Init;
    const FINISH: Self = Self::Finish;
    const FINISHED: Self = Self::Finished;
}

/// Authenticator Initial-Key protocol instance
#[derive(Debug, Clone)]
pub struct AuthKeySecProt {
    common: SecProtCommon<AuthKeyState>,
}

impl AuthKeySecProt {
    /// Create an instance and run its `Init` state
    pub fn new(config: &SecProtConfig) -> Self {
        let mut prot = Self {
            common: SecProtCommon::new(config),
        };
        prot.init();
        prot
    }

    fn init(&mut self) {
        log::debug!("Initial-key init");
        self.common.set_state(AuthKeyState::InitialKeyReceived);
        self.common.start_timer();
    }

    pub fn state(&self) -> AuthKeyState {
        self.common.state()
    }
}

impl SecProt for AuthKeySecProt {
    fn create_response(
        &mut self,
        ctx: &mut SecProtContext<'_>,
        result: SecResult,
    ) -> Result<(), ProtocolError> {
        if self.common.state() != AuthKeyState::CreateResp {
            return Err(ProtocolError::UnexpectedEvent);
        }
        self.common.set_result(result);
        self.state_machine(ctx);
        Ok(())
    }

    fn receive(&mut self, ctx: &mut SecProtContext<'_>, pdu: &[u8]) -> Result<(), ProtocolError> {
        if self.common.state() != AuthKeyState::InitialKeyReceived {
            log::info!("Initial-key PDU from {} ignored", ctx.addrs.remote);
            return Err(ProtocolError::UnexpectedEvent);
        }
        let outcome = initial_key_handle(ctx, pdu);
        if let Err(e) = outcome {
            log::info!("Initial-key from {} rejected: {}", ctx.addrs.remote, e);
            self.common.set_result(e.result());
        }
        self.state_machine(ctx);
        outcome
    }

    // Nothing is sent on this side
    fn tx_status(&mut self, _ctx: &mut SecProtContext<'_>, status: TxStatus) {
        log::trace!("tx status {:?} ignored", status);
    }

    fn timer_timeout(&mut self, ctx: &mut SecProtContext<'_>, ticks: u16) {
        if self.common.timeout_handle(ticks) {
            self.state_machine(ctx);
        }
    }

    fn step(&mut self, ctx: &mut SecProtContext<'_>) -> Step {
        match self.common.state() {
            AuthKeyState::Init => {
                self.init();
                Step::Block
            }
            AuthKeyState::InitialKeyReceived => {
                if !self.common.is_result_ok() {
                    self.common.set_state(AuthKeyState::Finished);
                    return Step::Continue;
                }
                ctx.dispatcher.create_ind();
                self.common.set_state(AuthKeyState::CreateResp);
                Step::Block
            }
            AuthKeyState::CreateResp => {
                self.common.set_state(AuthKeyState::Finish);
                Step::Continue
            }
            AuthKeyState::Finish => {
                ctx.dispatcher.finished_ind(self.common.result(), None);
                self.common.set_state(AuthKeyState::Finished);
                self.common.arm_finished_timer();
                Step::Block
            }
            AuthKeyState::Finished => {
                if self.common.timer_running() {
                    log::debug!("Initial-key finished, eui-64: {}", ctx.addrs.remote);
                    self.common.stop_timer();
                    ctx.dispatcher.finished();
                }
                Step::Block
            }
        }
    }

    fn result(&self) -> SecResult {
        self.common.result()
    }

    fn timer_running(&self) -> bool {
        self.common.timer_running()
    }

    fn is_finished(&self) -> bool {
        self.common.state() == AuthKeyState::Finished
    }
}
